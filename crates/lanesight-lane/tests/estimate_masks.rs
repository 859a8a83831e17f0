use lanesight_core::GrayImage;
use lanesight_lane::{estimate, estimate_from_regions, extract_regions, Direction};

fn fill_rect(mask: &mut GrayImage, x0: usize, x1: usize, y0: usize, y1: usize) {
    for y in y0..=y1 {
        for x in x0..=x1 {
            mask.set(x, y, 255);
        }
    }
}

#[test]
fn symmetric_stripes_are_centred() {
    let mut mask = GrayImage::new(640, 360);
    fill_rect(&mut mask, 95, 105, 100, 359);
    fill_rect(&mut mask, 535, 545, 100, 359);

    let lane = estimate(&mask.view(), 640);
    assert_eq!(lane.bands.left, Some(100));
    assert_eq!(lane.bands.right, Some(540));
    assert_eq!(lane.reference_x, Some(320));
    assert_eq!(lane.offset_px, 0);
    assert_eq!(lane.direction, Direction::Center);
}

#[test]
fn single_middle_blob_sets_reference() {
    let mut mask = GrayImage::new(640, 360);
    fill_rect(&mut mask, 270, 290, 250, 340);

    let lane = estimate(&mask.view(), 640);
    assert_eq!(lane.reference_x, Some(280));
    assert_eq!(lane.offset_px, 40);
    assert_eq!(lane.direction, Direction::Left);
}

#[test]
fn blob_right_of_centre_steers_right() {
    let mut mask = GrayImage::new(640, 360);
    fill_rect(&mut mask, 350, 370, 250, 340);

    let lane = estimate(&mask.view(), 640);
    assert_eq!(lane.reference_x, Some(360));
    assert_eq!(lane.offset_px, -40);
    assert_eq!(lane.direction, Direction::Right);
}

#[test]
fn small_regions_are_ignored() {
    let mut mask = GrayImage::new(640, 360);
    // 10 x 30 = 300 pixels: not strictly above the threshold
    fill_rect(&mut mask, 300, 309, 200, 229);
    fill_rect(&mut mask, 100, 104, 10, 14);

    let (lane, groups) = estimate_from_regions(extract_regions(&mask.view()), 640);
    assert_eq!(lane.direction, Direction::None);
    assert_eq!(lane.offset_px, 0);
    assert_eq!(lane.reference_x, None);
    assert_eq!(groups.retained(), 0);
    assert_eq!(groups.discarded, 2);
}

#[test]
fn offsets_at_the_dead_band_edge_are_centred() {
    for (x0, expected) in [(305usize, 5), (315, -5)] {
        let mut mask = GrayImage::new(640, 360);
        // centroid = x0 + 10
        fill_rect(&mut mask, x0, x0 + 20, 200, 300);
        let lane = estimate(&mask.view(), 640);
        assert_eq!(lane.offset_px, expected);
        assert_eq!(lane.direction, Direction::Center);
    }
}

#[test]
fn empty_mask_reports_none() {
    let mask = GrayImage::new(320, 240);
    let lane = estimate(&mask.view(), 320);
    assert_eq!(lane.direction, Direction::None);
    assert!(!lane.is_detected());
}

#[test]
fn only_one_side_band_reports_none() {
    let mut mask = GrayImage::new(640, 360);
    fill_rect(&mut mask, 50, 70, 100, 300);
    let lane = estimate(&mask.view(), 640);
    assert_eq!(lane.bands.left, Some(60));
    assert_eq!(lane.direction, Direction::None);
}

#[test]
fn marking_inside_a_ring_hole_is_not_counted() {
    let mut mask = GrayImage::new(640, 360);
    // 4 px hollow rectangle, centroid x = 300
    fill_rect(&mut mask, 200, 400, 100, 103);
    fill_rect(&mut mask, 200, 400, 297, 300);
    fill_rect(&mut mask, 200, 203, 104, 296);
    fill_rect(&mut mask, 397, 400, 104, 296);
    // 31 x 51 blob inside the hole, centroid x = 225
    fill_rect(&mut mask, 210, 240, 150, 200);

    let regions = extract_regions(&mask.view());
    assert_eq!(regions.len(), 1);
    assert_eq!(regions[0].centroid_x(), Some(300));

    let (lane, groups) = estimate_from_regions(regions, 640);
    assert_eq!(groups.retained(), 1);
    assert_eq!(lane.reference_x, Some(300));
    assert_eq!(lane.offset_px, 20);
    assert_eq!(lane.direction, Direction::Left);
}
