//! Core types and utilities for lane-offset estimation.
//!
//! This crate holds the image buffers shared by the other `lanesight-*`
//! crates, colour conversion, and the fixed bird's-eye rectification. It does
//! *not* depend on any concrete image library.

mod color;
mod homography;
mod image;
mod logger;
mod rectify;

pub use color::{mean_gray, rgb_to_gray, rgb_to_hsv, to_gray, Hsv};
pub use homography::{homography_from_4pt, warp_perspective_rgb, Homography};
pub use image::{
    sample_bilinear_rgb, ColorImage, ColorImageView, GrayImage, GrayImageView, ImageError,
};
pub use rectify::{
    full_rectangle, road_trapezoid, PerspectiveRectifier, RectifierCache, RectifyError,
    TRAPEZOID_TOP_FRAC, TRAPEZOID_TOP_LEFT_FRAC, TRAPEZOID_TOP_RIGHT_FRAC,
};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::init_with_level;
