//! White lane-marking segmentation.
//!
//! Pipeline: RGB -> 8-bit HSV, inclusive in-range threshold for the bright /
//! low-saturation band, AND with the region of interest, morphological
//! opening.

use lanesight_core::{rgb_to_hsv, ColorImageView, GrayImage, Hsv};
use serde::{Deserialize, Serialize};

use crate::morphology::open;
use crate::roi::RoiPolygon;

#[cfg(feature = "tracing")]
use tracing::instrument;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum SegmentError {
    #[error("HSV lower bound {lower:?} exceeds upper bound {upper:?}")]
    InvalidHsvRange { lower: Hsv, upper: Hsv },
    #[error("opening kernel must be odd and in 1..=511 (got {0})")]
    InvalidKernel(usize),
    #[error("ROI polygon needs at least 3 vertices (got {0})")]
    TooFewRoiVertices(usize),
    #[error("ROI polygon encloses no area (area={area})")]
    DegenerateRoi { area: f64 },
}

/// Largest supported opening kernel side.
pub const MAX_OPENING_KERNEL: usize = 2 * u8::MAX as usize + 1;

fn default_hsv_lower() -> Hsv {
    Hsv::new(0, 0, 200)
}

fn default_hsv_upper() -> Hsv {
    Hsv::new(180, 70, 255)
}

fn default_opening_kernel() -> usize {
    5
}

/// Segmentation thresholds.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SegmenterParams {
    /// Inclusive lower HSV bound (H in `[0, 180)`).
    #[serde(default = "default_hsv_lower")]
    pub hsv_lower: Hsv,
    /// Inclusive upper HSV bound.
    #[serde(default = "default_hsv_upper")]
    pub hsv_upper: Hsv,
    /// Side of the square structuring element used for opening.
    #[serde(default = "default_opening_kernel")]
    pub opening_kernel: usize,
}

impl Default for SegmenterParams {
    fn default() -> Self {
        Self {
            hsv_lower: default_hsv_lower(),
            hsv_upper: default_hsv_upper(),
            opening_kernel: default_opening_kernel(),
        }
    }
}

impl SegmenterParams {
    pub fn validate(&self) -> Result<(), SegmentError> {
        let (lo, hi) = (self.hsv_lower, self.hsv_upper);
        if lo.h > hi.h || lo.s > hi.s || lo.v > hi.v {
            return Err(SegmentError::InvalidHsvRange {
                lower: lo,
                upper: hi,
            });
        }
        let k = self.opening_kernel;
        if k == 0 || k % 2 == 0 || k > MAX_OPENING_KERNEL {
            return Err(SegmentError::InvalidKernel(self.opening_kernel));
        }
        Ok(())
    }
}

/// Threshold a frame in HSV space: 255 where every channel is within the
/// inclusive range, 0 elsewhere.
pub fn threshold_hsv(frame: &ColorImageView<'_>, lower: &Hsv, upper: &Hsv) -> GrayImage {
    let data = frame
        .data
        .chunks_exact(3)
        .map(|px| {
            let hsv = rgb_to_hsv([px[0], px[1], px[2]]);
            if hsv.within(lower, upper) {
                255
            } else {
                0
            }
        })
        .collect();
    GrayImage {
        width: frame.width,
        height: frame.height,
        data,
    }
}

/// Binary lane-marking segmenter.
#[derive(Clone, Debug)]
pub struct LaneSegmenter {
    params: SegmenterParams,
}

impl LaneSegmenter {
    pub fn new(params: SegmenterParams) -> Result<Self, SegmentError> {
        params.validate()?;
        Ok(Self { params })
    }

    #[inline]
    pub fn params(&self) -> &SegmenterParams {
        &self.params
    }

    /// Produce the lane mask for a frame restricted to `roi`. An empty mask
    /// is a normal result.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "debug", skip(self, frame, roi), fields(w = frame.width, h = frame.height))
    )]
    pub fn segment(&self, frame: &ColorImageView<'_>, roi: &RoiPolygon) -> GrayImage {
        let mut mask = threshold_hsv(frame, &self.params.hsv_lower, &self.params.hsv_upper);
        let roi_mask = roi.rasterize(frame.width, frame.height);
        for (m, r) in mask.data.iter_mut().zip(roi_mask.data.iter()) {
            *m &= *r;
        }
        let opened = open(&mask, self.params.opening_kernel);
        log::trace!(
            "segmented {} lane pixels ({} before opening)",
            opened.count_nonzero(),
            mask.count_nonzero()
        );
        opened
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lanesight_core::ColorImage;

    fn frame_with_stripe(x0: usize, x1: usize, color: [u8; 3]) -> ColorImage {
        let mut img = ColorImage::filled(64, 48, [50, 50, 50]);
        for y in 0..48 {
            for x in x0..x1 {
                img.put_pixel(x, y, color);
            }
        }
        img
    }

    #[test]
    fn white_stripe_is_segmented() {
        let img = frame_with_stripe(20, 30, [240, 240, 240]);
        let seg = LaneSegmenter::new(SegmenterParams::default()).unwrap();
        let mask = seg.segment(&img.view(), &RoiPolygon::full_frame(64, 48));
        assert_eq!(mask.count_nonzero(), 10 * 48);
        assert_eq!(mask.get(25, 10), 255);
        assert_eq!(mask.get(5, 10), 0);
    }

    #[test]
    fn saturated_colour_is_rejected() {
        // bright yellow: V = 255 but S is far above 70
        let img = frame_with_stripe(20, 30, [250, 220, 40]);
        let seg = LaneSegmenter::new(SegmenterParams::default()).unwrap();
        let mask = seg.segment(&img.view(), &RoiPolygon::full_frame(64, 48));
        assert_eq!(mask.count_nonzero(), 0);
    }

    #[test]
    fn roi_clips_the_mask() {
        let img = ColorImage::filled(64, 48, [255, 255, 255]);
        let seg = LaneSegmenter::new(SegmenterParams::default()).unwrap();
        let roi = RoiPolygon::road_trapezoid(64, 48);
        let mask = seg.segment(&img.view(), &roi);
        assert_eq!(mask.get(32, 2), 0);
        assert_eq!(mask.get(32, 40), 255);
    }

    #[test]
    fn dark_frame_yields_empty_mask() {
        let img = ColorImage::filled(32, 32, [20, 20, 20]);
        let seg = LaneSegmenter::new(SegmenterParams::default()).unwrap();
        let mask = seg.segment(&img.view(), &RoiPolygon::full_frame(32, 32));
        assert_eq!(mask.count_nonzero(), 0);
    }

    #[test]
    fn params_validation() {
        let mut p = SegmenterParams::default();
        p.opening_kernel = 4;
        assert_eq!(p.validate(), Err(SegmentError::InvalidKernel(4)));
        p.opening_kernel = MAX_OPENING_KERNEL + 2;
        assert_eq!(
            p.validate(),
            Err(SegmentError::InvalidKernel(MAX_OPENING_KERNEL + 2))
        );
        p.opening_kernel = 5;
        p.hsv_lower = Hsv::new(0, 80, 200);
        assert!(matches!(
            p.validate(),
            Err(SegmentError::InvalidHsvRange { .. })
        ));
    }

    #[test]
    fn params_deserialize_with_defaults() {
        let p: SegmenterParams = serde_json::from_str(r#"{"opening_kernel": 3}"#).unwrap();
        assert_eq!(p.opening_kernel, 3);
        assert_eq!(p.hsv_lower, Hsv::new(0, 0, 200));
    }
}
