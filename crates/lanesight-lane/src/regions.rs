//! Outermost connected foreground regions of a binary mask.
//!
//! Components are labelled 8-connected with `imageproc`'s region labelling.
//! Border following (`imageproc::contours`) then keeps only components whose
//! outer border is not nested inside another component's hole, so a blob
//! drawn inside a ring does not count as a separate marking.

use std::collections::HashMap;

use image::Luma;
use imageproc::contours::{find_contours, BorderType};
use imageproc::region_labelling::{connected_components, Connectivity};
use lanesight_core::GrayImageView;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::raster::to_luma;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// One outermost 8-connected foreground component.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Region {
    /// Pixel count.
    pub area: usize,
    /// Raw image moments over the region pixels.
    pub m00: u64,
    pub m10: u64,
    pub m01: u64,
    /// Inclusive bounding box `[min_x, min_y, max_x, max_y]`.
    pub bbox: [usize; 4],
    /// Outer border pixels in tracing order.
    pub boundary: Vec<Point2<i32>>,
}

impl Region {
    fn with_boundary(boundary: Vec<Point2<i32>>) -> Self {
        Self {
            area: 0,
            m00: 0,
            m10: 0,
            m01: 0,
            bbox: [usize::MAX, usize::MAX, 0, 0],
            boundary,
        }
    }

    fn add_pixel(&mut self, x: usize, y: usize) {
        self.area += 1;
        self.m00 += 1;
        self.m10 += x as u64;
        self.m01 += y as u64;
        self.bbox[0] = self.bbox[0].min(x);
        self.bbox[1] = self.bbox[1].min(y);
        self.bbox[2] = self.bbox[2].max(x);
        self.bbox[3] = self.bbox[3].max(y);
    }

    /// Integer centroid x (`floor(m10 / m00)`), `None` for a zero moment.
    pub fn centroid_x(&self) -> Option<i32> {
        if self.m00 == 0 {
            return None;
        }
        Some((self.m10 / self.m00) as i32)
    }

    pub fn centroid(&self) -> Option<Point2<f32>> {
        if self.m00 == 0 {
            return None;
        }
        let n = self.m00 as f64;
        Some(Point2::new(
            (self.m10 as f64 / n) as f32,
            (self.m01 as f64 / n) as f32,
        ))
    }
}

/// Extract the outermost 8-connected non-zero components of `mask`. Regions
/// are returned in the scan order of their first pixel.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "debug", skip(mask), fields(w = mask.width, h = mask.height))
)]
pub fn extract_regions(mask: &GrayImageView<'_>) -> Vec<Region> {
    let Some(luma) = to_luma(mask) else {
        log::warn!(
            "mask buffer does not match {}x{}, no regions extracted",
            mask.width,
            mask.height
        );
        return Vec::new();
    };
    let labels = connected_components(&luma, Connectivity::Eight, Luma([0u8]));

    // label -> outer border of every top-level component
    let mut outer: HashMap<u32, Vec<Point2<i32>>> = HashMap::new();
    for contour in find_contours::<i32>(&luma) {
        if !matches!(contour.border_type, BorderType::Outer) || contour.parent.is_some() {
            continue;
        }
        let Some(start) = contour.points.first() else {
            continue;
        };
        let label = labels.get_pixel(start.x as u32, start.y as u32)[0];
        outer.entry(label).or_insert_with(|| {
            contour
                .points
                .iter()
                .map(|p| Point2::new(p.x, p.y))
                .collect()
        });
    }

    let mut slots: HashMap<u32, usize> = HashMap::with_capacity(outer.len());
    let mut regions: Vec<Region> = Vec::with_capacity(outer.len());
    for (x, y, px) in labels.enumerate_pixels() {
        let label = px[0];
        if label == 0 {
            continue;
        }
        let slot = match slots.get(&label) {
            Some(&slot) => slot,
            None => {
                // nested components have no top-level border
                let Some(boundary) = outer.remove(&label) else {
                    continue;
                };
                regions.push(Region::with_boundary(boundary));
                slots.insert(label, regions.len() - 1);
                regions.len() - 1
            }
        };
        regions[slot].add_pixel(x as usize, y as usize);
    }

    regions
}

#[cfg(test)]
mod tests {
    use super::*;
    use lanesight_core::GrayImage;

    fn fill_rect(img: &mut GrayImage, x0: usize, y0: usize, w: usize, h: usize) {
        for y in y0..y0 + h {
            for x in x0..x0 + w {
                img.set(x, y, 255);
            }
        }
    }

    #[test]
    fn separate_blobs_become_separate_regions() {
        let mut img = GrayImage::new(30, 20);
        fill_rect(&mut img, 2, 2, 4, 4);
        fill_rect(&mut img, 20, 10, 5, 3);
        let regions = extract_regions(&img.view());
        assert_eq!(regions.len(), 2);
        assert_eq!(regions[0].area, 16);
        assert_eq!(regions[0].bbox, [2, 2, 5, 5]);
        assert_eq!(regions[1].area, 15);
        assert_eq!(regions[1].centroid_x(), Some(22));
    }

    #[test]
    fn diagonal_touch_is_connected() {
        let mut img = GrayImage::new(4, 4);
        img.set(0, 0, 255);
        img.set(1, 1, 255);
        img.set(2, 2, 255);
        let regions = extract_regions(&img.view());
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].area, 3);
    }

    #[test]
    fn boundary_of_a_filled_square() {
        let mut img = GrayImage::new(10, 10);
        fill_rect(&mut img, 2, 2, 5, 5);
        let regions = extract_regions(&img.view());
        let boundary = &regions[0].boundary;
        for corner in [(2, 2), (6, 2), (6, 6), (2, 6)] {
            assert!(boundary.contains(&Point2::new(corner.0, corner.1)));
        }
        assert!(boundary
            .iter()
            .all(|p| p.x == 2 || p.x == 6 || p.y == 2 || p.y == 6));
        assert!(!boundary.contains(&Point2::new(4, 4)));
    }

    #[test]
    fn blobs_inside_a_hole_are_not_regions() {
        let mut img = GrayImage::new(40, 40);
        // 2 px ring
        fill_rect(&mut img, 5, 5, 30, 2);
        fill_rect(&mut img, 5, 33, 30, 2);
        fill_rect(&mut img, 5, 5, 2, 30);
        fill_rect(&mut img, 33, 5, 2, 30);
        fill_rect(&mut img, 15, 15, 6, 6);

        let regions = extract_regions(&img.view());
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].area, 2 * 30 * 2 + 2 * 26 * 2);
        assert_eq!(regions[0].bbox, [5, 5, 34, 34]);
    }

    #[test]
    fn ring_touching_the_image_border_is_kept() {
        let mut img = GrayImage::new(12, 12);
        fill_rect(&mut img, 0, 0, 12, 12);
        for y in 3..9 {
            for x in 3..9 {
                img.set(x, y, 0);
            }
        }
        let regions = extract_regions(&img.view());
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].area, 144 - 36);
    }

    #[test]
    fn centroid_is_floor_of_moment_ratio() {
        let mut img = GrayImage::new(10, 3);
        img.set(3, 1, 255);
        img.set(4, 1, 255);
        let r = &extract_regions(&img.view())[0];
        assert_eq!(r.m10, 7);
        assert_eq!(r.centroid_x(), Some(3));
        assert_eq!(r.centroid().unwrap().x, 3.5);
    }

    #[test]
    fn empty_mask_has_no_regions() {
        let img = GrayImage::new(8, 8);
        assert!(extract_regions(&img.view()).is_empty());
    }
}
