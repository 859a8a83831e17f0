//! Reduction of lane-marking regions to one lateral offset.
//!
//! Regions above the area threshold are bucketed into left / middle / right
//! bands by centroid x. The middle band wins; otherwise the midpoint of the
//! left and right bands is used. The estimate is per frame, with no memory of
//! earlier frames.

use lanesight_core::GrayImageView;
use serde::{Deserialize, Serialize};

use crate::regions::{extract_regions, Region};

/// Regions with this many pixels or fewer are ignored.
pub const MIN_REGION_AREA: usize = 300;
/// Left band: centroid x below `width * LEFT_BAND_FRAC`.
pub const LEFT_BAND_FRAC: f64 = 0.33;
/// Right band: centroid x at or above `width * RIGHT_BAND_FRAC`.
pub const RIGHT_BAND_FRAC: f64 = 0.67;
/// Offsets within `[-DEAD_BAND_PX, DEAD_BAND_PX]` count as centred.
pub const DEAD_BAND_PX: i32 = 5;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Band {
    Left,
    Middle,
    Right,
}

impl Band {
    pub fn classify(x: i32, width: usize) -> Band {
        let x = x as f64;
        let w = width as f64;
        if x < w * LEFT_BAND_FRAC {
            Band::Left
        } else if x < w * RIGHT_BAND_FRAC {
            Band::Middle
        } else {
            Band::Right
        }
    }
}

/// Direction label for an offset.
///
/// `Left` means the lane reference lies left of the frame centre (positive
/// offset), i.e. the camera has drifted right of the lane.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    Left,
    Right,
    Center,
    #[default]
    None,
}

impl Direction {
    pub fn from_offset(offset_px: i32) -> Direction {
        if offset_px > DEAD_BAND_PX {
            Direction::Left
        } else if offset_px < -DEAD_BAND_PX {
            Direction::Right
        } else {
            Direction::Center
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Left => "LEFT",
            Direction::Right => "RIGHT",
            Direction::Center => "CENTER",
            Direction::None => "NONE",
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Representative x of each band, `None` for empty bands.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BandPositions {
    pub left: Option<i32>,
    pub middle: Option<i32>,
    pub right: Option<i32>,
}

/// Per-frame lane estimate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaneEstimate {
    pub reference_x: Option<i32>,
    /// `floor(width / 2) - reference_x`; 0 when there is no reference.
    pub offset_px: i32,
    pub direction: Direction,
    pub bands: BandPositions,
}

impl LaneEstimate {
    /// Derive reference, offset and direction from the band positions.
    pub fn from_bands(bands: BandPositions, width: usize) -> Self {
        let reference_x = match bands {
            BandPositions {
                middle: Some(m), ..
            } => Some(m),
            BandPositions {
                left: Some(l),
                right: Some(r),
                ..
            } => Some((l + r).div_euclid(2)),
            _ => None,
        };

        match reference_x {
            Some(reference) => {
                let center = (width / 2) as i32;
                let offset_px = center - reference;
                Self {
                    reference_x,
                    offset_px,
                    direction: Direction::from_offset(offset_px),
                    bands,
                }
            }
            None => Self {
                reference_x: None,
                offset_px: 0,
                direction: Direction::None,
                bands,
            },
        }
    }

    pub fn is_detected(&self) -> bool {
        self.reference_x.is_some()
    }
}

/// A retained region with its integer centroid.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BandMember {
    pub centroid_x: i32,
    pub region: Region,
}

/// Regions assigned to one band.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BandGroup {
    pub band: Band,
    pub members: Vec<BandMember>,
}

impl BandGroup {
    fn new(band: Band) -> Self {
        Self {
            band,
            members: Vec::new(),
        }
    }

    /// Floor of the mean member centroid.
    pub fn position(&self) -> Option<i32> {
        if self.members.is_empty() {
            return None;
        }
        let total: i64 = self.members.iter().map(|m| m.centroid_x as i64).sum();
        Some(total.div_euclid(self.members.len() as i64) as i32)
    }
}

/// Regions bucketed by band.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BandGroups {
    pub left: BandGroup,
    pub middle: BandGroup,
    pub right: BandGroup,
    /// Regions dropped by the area threshold or a zero moment.
    pub discarded: usize,
}

impl BandGroups {
    pub fn positions(&self) -> BandPositions {
        BandPositions {
            left: self.left.position(),
            middle: self.middle.position(),
            right: self.right.position(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &BandGroup> {
        [&self.left, &self.middle, &self.right].into_iter()
    }

    pub fn retained(&self) -> usize {
        self.iter().map(|g| g.members.len()).sum()
    }
}

/// Filter regions by area and moment, then bucket them by centroid x.
pub fn cluster_regions(regions: Vec<Region>, width: usize) -> BandGroups {
    let mut groups = BandGroups {
        left: BandGroup::new(Band::Left),
        middle: BandGroup::new(Band::Middle),
        right: BandGroup::new(Band::Right),
        discarded: 0,
    };

    for region in regions {
        if region.area <= MIN_REGION_AREA {
            groups.discarded += 1;
            continue;
        }
        let Some(centroid_x) = region.centroid_x() else {
            groups.discarded += 1;
            continue;
        };
        let member = BandMember { centroid_x, region };
        match Band::classify(centroid_x, width) {
            Band::Left => groups.left.members.push(member),
            Band::Middle => groups.middle.members.push(member),
            Band::Right => groups.right.members.push(member),
        }
    }

    groups
}

/// Cluster pre-extracted regions and derive the estimate.
pub fn estimate_from_regions(regions: Vec<Region>, width: usize) -> (LaneEstimate, BandGroups) {
    let groups = cluster_regions(regions, width);
    let estimate = LaneEstimate::from_bands(groups.positions(), width);
    log::debug!(
        "lane estimate: bands={:?} reference={:?} offset={} direction={} (kept {}, dropped {})",
        estimate.bands,
        estimate.reference_x,
        estimate.offset_px,
        estimate.direction,
        groups.retained(),
        groups.discarded
    );
    (estimate, groups)
}

/// Estimate the lane offset from a binary mask of width `frame_width`.
pub fn estimate(mask: &GrayImageView<'_>, frame_width: usize) -> LaneEstimate {
    estimate_from_regions(extract_regions(mask), frame_width).0
}
