//! Overlay rendering for the processed frame.
//!
//! Draws the ROI outline, the outlines of the regions that made it into a
//! band, the frame centre line, a marker per band position and, when the
//! offset is outside the dead band, an arrow from the centre to the lane
//! reference. No text is rendered.

use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_hollow_polygon_mut, draw_line_segment_mut};
use imageproc::point::Point;
use lanesight_core::ColorImage;
use lanesight_lane::{BandGroups, LaneEstimate, RoiPolygon, DEAD_BAND_PX};

const ROI_COLOR: Rgb<u8> = Rgb([0, 0, 255]);
const REGION_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
const CENTER_COLOR: Rgb<u8> = Rgb([255, 255, 0]);
const BAND_COLOR: Rgb<u8> = Rgb([255, 0, 255]);
const OFF_CENTER_COLOR: Rgb<u8> = Rgb([255, 165, 0]);

/// Distance of the offset arrow from the bottom edge.
pub const ARROW_ROW_FROM_BOTTOM: usize = 60;

/// Convert to an `image` buffer (both are packed RGB8).
pub fn to_rgb_image(frame: &ColorImage) -> Option<RgbImage> {
    RgbImage::from_raw(frame.width as u32, frame.height as u32, frame.data.clone())
}

fn from_rgb_image(img: RgbImage) -> ColorImage {
    let (w, h) = (img.width() as usize, img.height() as usize);
    ColorImage {
        width: w,
        height: h,
        data: img.into_raw(),
    }
}

fn thick_hline(canvas: &mut RgbImage, x0: f32, x1: f32, y: f32, color: Rgb<u8>) {
    for dy in [-1.0, 0.0, 1.0] {
        draw_line_segment_mut(canvas, (x0, y + dy), (x1, y + dy), color);
    }
}

fn draw_arrow(canvas: &mut RgbImage, from_x: f32, to_x: f32, y: f32, color: Rgb<u8>) {
    thick_hline(canvas, from_x, to_x, y, color);
    // head: 30 % of the shaft, at +-30 degrees
    let len = 0.3 * (to_x - from_x).abs();
    let back = if to_x > from_x { -1.0 } else { 1.0 };
    let (dx, dy) = (back * len * 0.866, len * 0.5);
    for sign in [-1.0, 1.0] {
        for t in [-1.0, 0.0, 1.0] {
            draw_line_segment_mut(
                canvas,
                (to_x, y + t),
                (to_x + dx, y + sign * dy + t),
                color,
            );
        }
    }
}

/// Render the overlay on a copy of `frame` (the frame the mask was computed
/// on).
pub fn annotate(
    frame: &ColorImage,
    roi: &RoiPolygon,
    groups: &BandGroups,
    estimate: &LaneEstimate,
) -> ColorImage {
    let Some(mut canvas) = to_rgb_image(frame) else {
        return frame.clone();
    };
    let (w, h) = (frame.width, frame.height);
    if w == 0 || h == 0 {
        return frame.clone();
    }

    let poly: Vec<Point<f32>> = roi
        .vertices()
        .iter()
        .map(|p| {
            Point::new(
                p.x.clamp(0.0, (w - 1) as f32),
                p.y.clamp(0.0, (h - 1) as f32),
            )
        })
        .collect();
    draw_hollow_polygon_mut(&mut canvas, &poly, ROI_COLOR);

    for member in groups.iter().flat_map(|g| g.members.iter()) {
        for p in &member.region.boundary {
            canvas.put_pixel(p.x as u32, p.y as u32, REGION_COLOR);
        }
    }

    let center_x = (w / 2) as f32;
    draw_line_segment_mut(&mut canvas, (center_x, 0.0), (center_x, (h - 1) as f32), CENTER_COLOR);

    let marker_y = (h / 2) as i32;
    let b = estimate.bands;
    for x in [b.left, b.middle, b.right].into_iter().flatten() {
        draw_filled_circle_mut(&mut canvas, (x, marker_y), 6, BAND_COLOR);
    }

    if let Some(reference) = estimate.reference_x {
        if estimate.offset_px.abs() > DEAD_BAND_PX && h > ARROW_ROW_FROM_BOTTOM {
            let y = (h - ARROW_ROW_FROM_BOTTOM) as f32;
            draw_arrow(&mut canvas, center_x, reference as f32, y, OFF_CENTER_COLOR);
        }
    }

    from_rgb_image(canvas)
}
