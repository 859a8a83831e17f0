//! Binary morphology with square structuring elements.
//!
//! A `k x k` square is the L∞ ball of radius `k / 2`, so the operators run on
//! `imageproc`'s distance-transform morphology with [`Norm::LInf`]. Pixels
//! outside the image count as neither foreground nor background, so borders
//! are neither eroded nor grown artificially. Output masks are 0 / 255.

use imageproc::distance_transform::Norm;
use imageproc::morphology;
use lanesight_core::GrayImage;

use crate::raster::{from_luma, to_luma};

type Operator = fn(&image::GrayImage, Norm, u8) -> image::GrayImage;

fn apply(src: &GrayImage, kernel: usize, op: Operator) -> GrayImage {
    if kernel <= 1 || src.width == 0 || src.height == 0 {
        return src.clone();
    }
    let radius = u8::try_from(kernel / 2).unwrap_or(u8::MAX);
    match to_luma(&src.view()) {
        Some(luma) => from_luma(op(&luma, Norm::LInf, radius)),
        None => {
            log::warn!(
                "mask buffer does not match {}x{}, skipping morphology",
                src.width,
                src.height
            );
            src.clone()
        }
    }
}

pub fn erode(src: &GrayImage, kernel: usize) -> GrayImage {
    apply(src, kernel, morphology::erode)
}

pub fn dilate(src: &GrayImage, kernel: usize) -> GrayImage {
    apply(src, kernel, morphology::dilate)
}

/// Erosion followed by dilation: removes foreground specks that cannot
/// contain the structuring element, keeps larger shapes intact.
pub fn open(src: &GrayImage, kernel: usize) -> GrayImage {
    apply(src, kernel, morphology::open)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fill_rect(img: &mut GrayImage, x0: usize, y0: usize, w: usize, h: usize) {
        for y in y0..y0 + h {
            for x in x0..x0 + w {
                img.set(x, y, 255);
            }
        }
    }

    #[test]
    fn opening_removes_small_specks() {
        let mut img = GrayImage::new(40, 40);
        fill_rect(&mut img, 5, 5, 3, 3);
        fill_rect(&mut img, 20, 30, 4, 1);
        let opened = open(&img, 5);
        assert_eq!(opened.count_nonzero(), 0);
    }

    #[test]
    fn opening_keeps_rectangles_at_least_kernel_sized() {
        let mut img = GrayImage::new(40, 40);
        fill_rect(&mut img, 10, 10, 8, 12);
        let opened = open(&img, 5);
        assert_eq!(opened, img);
    }

    #[test]
    fn opening_trims_thin_spurs() {
        let mut img = GrayImage::new(40, 40);
        fill_rect(&mut img, 10, 10, 10, 10);
        // 2 px wide spur sticking out of the square
        fill_rect(&mut img, 20, 14, 8, 2);
        let opened = open(&img, 5);
        assert_eq!(opened.get(24, 15), 0);
        assert_eq!(opened.get(15, 15), 255);
    }

    #[test]
    fn border_touching_shapes_survive() {
        let mut img = GrayImage::new(20, 20);
        fill_rect(&mut img, 0, 0, 6, 20);
        let opened = open(&img, 5);
        assert_eq!(opened, img);
    }

    #[test]
    fn kernel_one_is_identity() {
        let mut img = GrayImage::new(5, 5);
        img.set(2, 2, 255);
        assert_eq!(open(&img, 1), img);
    }

    #[test]
    fn dilate_grows_a_point_into_a_square() {
        let mut img = GrayImage::new(9, 9);
        img.set(4, 4, 255);
        assert_eq!(dilate(&img, 5).count_nonzero(), 25);
        assert_eq!(erode(&img, 5).count_nonzero(), 0);
    }
}
