//! Conversions between workspace buffers and `image` buffers, so the
//! `imageproc` operators can run on lane masks.

use lanesight_core::{GrayImage, GrayImageView};

/// Copy a mask into an `image::GrayImage`. `None` when the buffer does not
/// match its dimensions.
pub(crate) fn to_luma(mask: &GrayImageView<'_>) -> Option<image::GrayImage> {
    let w = u32::try_from(mask.width).ok()?;
    let h = u32::try_from(mask.height).ok()?;
    if mask.data.len() != mask.width * mask.height {
        return None;
    }
    image::GrayImage::from_raw(w, h, mask.data.to_vec())
}

pub(crate) fn from_luma(img: image::GrayImage) -> GrayImage {
    GrayImage {
        width: img.width() as usize,
        height: img.height() as usize,
        data: img.into_raw(),
    }
}
