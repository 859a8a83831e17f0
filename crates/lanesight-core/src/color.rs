//! Colour-space helpers using the conventional 8-bit encodings.
//!
//! Grayscale uses the BT.601 luma weights in 14-bit fixed point; HSV uses the
//! compact 8-bit layout with hue halved into `[0, 180)` and saturation/value in
//! `[0, 255]`.

use crate::{ColorImageView, GrayImage};
use serde::{Deserialize, Serialize};

const LUMA_SHIFT: u32 = 14;
const LUMA_R: u32 = 4899;
const LUMA_G: u32 = 9617;
const LUMA_B: u32 = 1868;

/// 8-bit HSV triple (H in `[0, 180)`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hsv {
    pub h: u8,
    pub s: u8,
    pub v: u8,
}

impl Hsv {
    pub const fn new(h: u8, s: u8, v: u8) -> Self {
        Self { h, s, v }
    }

    /// Inclusive per-channel range check.
    #[inline]
    pub fn within(&self, lower: &Hsv, upper: &Hsv) -> bool {
        (lower.h..=upper.h).contains(&self.h)
            && (lower.s..=upper.s).contains(&self.s)
            && (lower.v..=upper.v).contains(&self.v)
    }
}

#[inline]
pub fn rgb_to_gray(rgb: [u8; 3]) -> u8 {
    let [r, g, b] = rgb;
    let y = r as u32 * LUMA_R + g as u32 * LUMA_G + b as u32 * LUMA_B + (1 << (LUMA_SHIFT - 1));
    (y >> LUMA_SHIFT).min(255) as u8
}

pub fn to_gray(src: &ColorImageView<'_>) -> GrayImage {
    let data = src
        .data
        .chunks_exact(3)
        .map(|px| rgb_to_gray([px[0], px[1], px[2]]))
        .collect();
    GrayImage {
        width: src.width,
        height: src.height,
        data,
    }
}

/// Mean of the grayscale conversion, without materialising the gray buffer.
pub fn mean_gray(src: &ColorImageView<'_>) -> f64 {
    let n = src.width * src.height;
    if n == 0 {
        return 0.0;
    }
    let sum: u64 = src
        .data
        .chunks_exact(3)
        .map(|px| rgb_to_gray([px[0], px[1], px[2]]) as u64)
        .sum();
    sum as f64 / n as f64
}

#[inline]
pub fn rgb_to_hsv(rgb: [u8; 3]) -> Hsv {
    let [r, g, b] = rgb;
    let v = r.max(g).max(b);
    let min = r.min(g).min(b);
    let diff = (v - min) as f32;

    let s = if v == 0 {
        0
    } else {
        (diff * 255.0 / v as f32).round() as u8
    };

    if diff == 0.0 {
        return Hsv::new(0, s, v);
    }

    let (r, g, b) = (r as f32, g as f32, b as f32);
    let vf = v as f32;
    let mut h = if vf == r {
        60.0 * (g - b) / diff
    } else if vf == g {
        120.0 + 60.0 * (b - r) / diff
    } else {
        240.0 + 60.0 * (r - g) / diff
    };
    if h < 0.0 {
        h += 360.0;
    }
    let h = ((h / 2.0).round() as u32 % 180) as u8;
    Hsv::new(h, s, v)
}
