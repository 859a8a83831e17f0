//! Lane-marking segmentation and lateral offset estimation.
//!
//! Two stages, both stateless per frame:
//! - [`LaneSegmenter`] turns an RGB frame into a binary mask of white,
//!   low-saturation pixels inside a region of interest, cleaned by a
//!   morphological opening.
//! - [`estimate`] labels the mask's outermost connected regions, buckets the large ones
//!   into left / middle / right bands and reduces them to one reference x and
//!   a signed offset from the frame centre.
//!
//! ```
//! use lanesight_core::ColorImage;
//! use lanesight_lane::{estimate, Direction, LaneSegmenter, RoiPolygon, SegmenterParams};
//!
//! let mut frame = ColorImage::filled(640, 360, [60, 60, 60]);
//! for y in 200..340 {
//!     for x in 270..=290 {
//!         frame.put_pixel(x, y, [255, 255, 255]);
//!     }
//! }
//! let segmenter = LaneSegmenter::new(SegmenterParams::default()).unwrap();
//! let mask = segmenter.segment(&frame.view(), &RoiPolygon::full_frame(640, 360));
//! let lane = estimate(&mask.view(), 640);
//! assert_eq!(lane.offset_px, 40);
//! assert_eq!(lane.direction, Direction::Left);
//! ```

mod estimate;
mod morphology;
mod raster;
mod regions;
mod roi;
mod segment;

pub use estimate::{
    cluster_regions, estimate, estimate_from_regions, Band, BandGroup, BandGroups, BandMember,
    BandPositions, Direction, LaneEstimate, DEAD_BAND_PX, LEFT_BAND_FRAC, MIN_REGION_AREA,
    RIGHT_BAND_FRAC,
};
pub use morphology::{dilate, erode, open};
pub use regions::{extract_regions, Region};
pub use roi::RoiPolygon;
pub use segment::{
    threshold_hsv, LaneSegmenter, SegmentError, SegmenterParams, MAX_OPENING_KERNEL,
};
