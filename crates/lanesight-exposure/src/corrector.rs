//! Lookup-table gamma correction.

use lanesight_core::{mean_gray, ColorImage, ColorImageView};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// 256-entry power-law table: `out = 255 * (in / 255)^(1 / gamma)`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GammaLut {
    table: [u8; 256],
}

impl GammaLut {
    /// Build the table. `gamma` must be positive and finite; callers pass
    /// values already clamped by a validated policy.
    pub fn new(gamma: f64) -> Self {
        let inv = 1.0 / gamma;
        let mut table = [0u8; 256];
        for (i, slot) in table.iter_mut().enumerate() {
            let v = 255.0 * (i as f64 / 255.0).powf(inv);
            *slot = v.round().clamp(0.0, 255.0) as u8;
        }
        Self { table }
    }

    #[inline]
    pub fn map(&self, v: u8) -> u8 {
        self.table[v as usize]
    }

    pub fn table(&self) -> &[u8; 256] {
        &self.table
    }

    /// Apply the table to every channel of every pixel.
    pub fn apply(&self, frame: &ColorImageView<'_>) -> ColorImage {
        let data = frame.data.iter().map(|&v| self.map(v)).collect();
        ColorImage {
            width: frame.width,
            height: frame.height,
            data,
        }
    }

    pub fn apply_in_place(&self, frame: &mut ColorImage) {
        for v in frame.data.iter_mut() {
            *v = self.table[*v as usize];
        }
    }
}

/// One-shot gamma correction.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "debug", skip(frame), fields(w = frame.width, h = frame.height))
)]
pub fn apply_gamma(frame: &ColorImageView<'_>, gamma: f64) -> ColorImage {
    GammaLut::new(gamma).apply(frame)
}

/// Mean grayscale brightness of a frame, in `[0, 255]`.
pub fn measure_brightness(frame: &ColorImageView<'_>) -> f64 {
    mean_gray(frame)
}
