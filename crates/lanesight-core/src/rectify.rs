//! Fixed bird's-eye rectification of the road plane.
//!
//! The source quad is a trapezoid covering the lower 70 % of the frame, whose
//! top edge spans 20 %..80 % of the width. It is mapped onto the full output
//! rectangle, so the rectified frame has the same size as the input.

use crate::{homography_from_4pt, warp_perspective_rgb, ColorImage, ColorImageView, Homography};
use nalgebra::Point2;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Fraction of the width where the top edge of the road trapezoid starts.
pub const TRAPEZOID_TOP_LEFT_FRAC: f64 = 0.2;
/// Fraction of the width where the top edge of the road trapezoid ends.
pub const TRAPEZOID_TOP_RIGHT_FRAC: f64 = 0.8;
/// Fraction of the height where the top edge of the road trapezoid sits.
pub const TRAPEZOID_TOP_FRAC: f64 = 0.3;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RectifyError {
    #[error("frame dimensions must be positive (width={width}, height={height})")]
    InvalidDimensions { width: usize, height: usize },
    #[error("perspective quad is degenerate for a {width}x{height} frame")]
    DegenerateQuad { width: usize, height: usize },
    #[error("frame is {got_w}x{got_h}, rectifier was built for {want_w}x{want_h}")]
    SizeMismatch {
        want_w: usize,
        want_h: usize,
        got_w: usize,
        got_h: usize,
    },
}

/// Road trapezoid in image pixels, ordered bottom-left, bottom-right,
/// top-left, top-right. Corners are truncated to whole pixels.
pub fn road_trapezoid(width: usize, height: usize) -> [Point2<f32>; 4] {
    let w = width as f64;
    let h = height as f64;
    let top = (h * TRAPEZOID_TOP_FRAC).floor() as f32;
    [
        Point2::new(0.0, height as f32),
        Point2::new(width as f32, height as f32),
        Point2::new((w * TRAPEZOID_TOP_LEFT_FRAC).floor() as f32, top),
        Point2::new((w * TRAPEZOID_TOP_RIGHT_FRAC).floor() as f32, top),
    ]
}

/// Full output rectangle, in the same corner order as [`road_trapezoid`].
pub fn full_rectangle(width: usize, height: usize) -> [Point2<f32>; 4] {
    let w = width as f32;
    let h = height as f32;
    [
        Point2::new(0.0, h),
        Point2::new(w, h),
        Point2::new(0.0, 0.0),
        Point2::new(w, 0.0),
    ]
}

#[derive(Clone, Debug)]
pub struct PerspectiveRectifier {
    width: usize,
    height: usize,
    src: [Point2<f32>; 4],
    dst: [Point2<f32>; 4],
    bird_from_img: Homography,
    img_from_bird: Homography,
}

impl PerspectiveRectifier {
    /// Build the rectifier for a given frame size.
    pub fn new(width: usize, height: usize) -> Result<Self, RectifyError> {
        if width == 0 || height == 0 {
            return Err(RectifyError::InvalidDimensions { width, height });
        }
        let src = road_trapezoid(width, height);
        let dst = full_rectangle(width, height);
        if src[2].x >= src[3].x || src[2].y >= src[0].y {
            return Err(RectifyError::DegenerateQuad { width, height });
        }

        let bird_from_img = homography_from_4pt(&src, &dst)
            .ok_or(RectifyError::DegenerateQuad { width, height })?;
        let img_from_bird = bird_from_img
            .inverse()
            .ok_or(RectifyError::DegenerateQuad { width, height })?;

        log::debug!(
            "bird's-eye homography for {}x{}: {:?}",
            width,
            height,
            bird_from_img.to_array()
        );

        Ok(Self {
            width,
            height,
            src,
            dst,
            bird_from_img,
            img_from_bird,
        })
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Source trapezoid (image coordinates).
    pub fn source_quad(&self) -> [Point2<f32>; 4] {
        self.src
    }

    /// Destination rectangle (bird's-eye coordinates).
    pub fn dest_quad(&self) -> [Point2<f32>; 4] {
        self.dst
    }

    /// Homography mapping image points to bird's-eye points.
    pub fn forward(&self) -> &Homography {
        &self.bird_from_img
    }

    /// Homography mapping bird's-eye points back to the image.
    pub fn inverse(&self) -> &Homography {
        &self.img_from_bird
    }

    #[inline]
    pub fn to_bird_eye(&self, p_img: Point2<f32>) -> Point2<f32> {
        self.bird_from_img.apply(p_img)
    }

    #[inline]
    pub fn to_image(&self, p_bird: Point2<f32>) -> Point2<f32> {
        self.img_from_bird.apply(p_bird)
    }

    /// Warp a frame into the bird's-eye view. The frame must match the size
    /// the rectifier was built for.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "debug", skip(self, frame), fields(w = frame.width, h = frame.height))
    )]
    pub fn rectify(&self, frame: &ColorImageView<'_>) -> Result<ColorImage, RectifyError> {
        if frame.width != self.width || frame.height != self.height {
            return Err(RectifyError::SizeMismatch {
                want_w: self.width,
                want_h: self.height,
                got_w: frame.width,
                got_h: frame.height,
            });
        }
        Ok(warp_perspective_rgb(
            frame,
            &self.img_from_bird,
            self.width,
            self.height,
        ))
    }
}

/// Holds the rectifier for the most recent frame size; rebuilt only when the
/// size changes.
#[derive(Clone, Debug, Default)]
pub struct RectifierCache {
    current: Option<PerspectiveRectifier>,
    rebuilds: usize,
}

impl RectifierCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&mut self, width: usize, height: usize) -> Result<&PerspectiveRectifier, RectifyError> {
        let stale = !matches!(
            &self.current,
            Some(r) if r.width == width && r.height == height
        );
        if stale {
            log::info!("building bird's-eye rectifier for {}x{}", width, height);
            self.current = Some(PerspectiveRectifier::new(width, height)?);
            self.rebuilds += 1;
        }
        match &self.current {
            Some(r) => Ok(r),
            None => Err(RectifyError::InvalidDimensions { width, height }),
        }
    }

    /// How many times a rectifier has been built.
    pub fn rebuilds(&self) -> usize {
        self.rebuilds
    }
}
