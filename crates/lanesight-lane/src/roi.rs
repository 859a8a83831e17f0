//! Region-of-interest polygons and their rasterization.

use image::Luma;
use imageproc::drawing::draw_polygon_mut;
use imageproc::point::Point;
use lanesight_core::{road_trapezoid, GrayImage};
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::raster::from_luma;
use crate::SegmentError;

/// Closed polygon in pixel coordinates.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RoiPolygon {
    vertices: Vec<Point2<f32>>,
}

impl RoiPolygon {
    /// Validate and wrap a vertex list. Needs at least 3 finite vertices
    /// enclosing a non-zero area.
    pub fn new(vertices: Vec<Point2<f32>>) -> Result<Self, SegmentError> {
        if vertices.len() < 3 {
            return Err(SegmentError::TooFewRoiVertices(vertices.len()));
        }
        if vertices.iter().any(|p| !p.x.is_finite() || !p.y.is_finite()) {
            return Err(SegmentError::DegenerateRoi { area: f64::NAN });
        }
        let area = shoelace_area(&vertices);
        if area <= 0.0 {
            return Err(SegmentError::DegenerateRoi { area });
        }
        Ok(Self { vertices })
    }

    /// The whole frame; used on the bird's-eye view.
    pub fn full_frame(width: usize, height: usize) -> Self {
        let w = width as f32;
        let h = height as f32;
        Self {
            vertices: vec![
                Point2::new(0.0, h),
                Point2::new(w, h),
                Point2::new(w, 0.0),
                Point2::new(0.0, 0.0),
            ],
        }
    }

    /// Road trapezoid on the unrectified frame: full width at the bottom,
    /// 20 %..80 % of the width at 30 % of the height.
    pub fn road_trapezoid(width: usize, height: usize) -> Self {
        let [bl, br, tl, tr] = road_trapezoid(width, height);
        Self {
            vertices: vec![bl, br, tr, tl],
        }
    }

    pub fn vertices(&self) -> &[Point2<f32>] {
        &self.vertices
    }

    pub fn area(&self) -> f64 {
        shoelace_area(&self.vertices)
    }

    /// Rasterize into a `width x height` mask (255 inside, 0 outside) with
    /// `imageproc`'s scanline polygon fill. Vertices are rounded to the pixel
    /// grid and edge pixels count as inside; parts outside the frame are
    /// clipped.
    pub fn rasterize(&self, width: usize, height: usize) -> GrayImage {
        let (Ok(w), Ok(h)) = (u32::try_from(width), u32::try_from(height)) else {
            return GrayImage::new(width, height);
        };
        if w == 0 || h == 0 {
            return GrayImage::new(width, height);
        }
        let mut canvas = image::GrayImage::new(w, h);
        let poly = self.pixel_vertices();
        // a polygon smaller than a pixel covers nothing
        if poly.len() >= 2 {
            draw_polygon_mut(&mut canvas, &poly, Luma([255u8]));
        }
        from_luma(canvas)
    }

    /// Vertices on the pixel grid, without repeats and without a closing
    /// vertex equal to the first.
    fn pixel_vertices(&self) -> Vec<Point<i32>> {
        let mut poly: Vec<Point<i32>> = Vec::with_capacity(self.vertices.len());
        for v in &self.vertices {
            let p = Point::new(v.x.round() as i32, v.y.round() as i32);
            if poly.last() != Some(&p) {
                poly.push(p);
            }
        }
        while poly.len() > 1 && poly.first() == poly.last() {
            poly.pop();
        }
        poly
    }
}

fn shoelace_area(vertices: &[Point2<f32>]) -> f64 {
    let n = vertices.len();
    let mut twice = 0.0_f64;
    for i in 0..n {
        let p = vertices[i];
        let q = vertices[(i + 1) % n];
        twice += p.x as f64 * q.y as f64 - q.x as f64 * p.y as f64;
    }
    (0.5 * twice).abs()
}
