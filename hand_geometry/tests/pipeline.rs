mod common;

use common::synthetic_hand::{in_hand, v_sign_rgb, HEIGHT, WIDTH};
use hand_geometry::core_modules::convex_hull;
use hand_geometry::core_modules::defect_finder::DefectFinder;
use hand_geometry::core_modules::region::region::{label_regions, largest_region, LabelAllocator};
use hand_geometry::{BinaryMask, DefectConfig, ForegroundMask, HandPipeline, PipelineConfig};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[tokio::test]
async fn v_sign_produces_consistent_descriptors() {
    init_logging();
    let pipeline = HandPipeline::new(PipelineConfig::default()).expect("default config is valid");
    let geometry = pipeline.process_frame(&v_sign_rgb()).await.expect("frame processed");

    // the speck is labelled first but the hand wins on area
    assert_eq!(geometry.region_label, Some(2));
    assert!(!geometry.contour.is_empty());
    assert!(geometry.hull.len() >= 3);
    assert!(geometry.hull.is_convex());
    for p in geometry.contour.points() {
        assert!(geometry.hull.contains(*p), "{p:?} outside hull");
    }
    assert_eq!(geometry.defects.len(), 1, "{:?}", geometry.defects);
    let gap = geometry.defects[0];
    assert!(gap.distance >= DefectConfig::default().min_defect_depth);
    assert!(gap.distance > 25.0, "{gap:?}");
    assert!((42..58).contains(&gap.deepest_point.x), "{gap:?}");
    assert!((57..=62).contains(&gap.deepest_point.y), "{gap:?}");

    let expected_area = (0..HEIGHT)
        .flat_map(|y| (0..WIDTH).map(move |x| (x, y)))
        .filter(|&(x, y)| in_hand(x, y))
        .count();
    assert_eq!(geometry.pca.count, expected_area);
    let angle = geometry.pca.orientation.expect("hand has pixels");
    assert!(angle.abs() < 1.0, "mirror-symmetric hand should point up, got {angle}");
}

#[tokio::test]
async fn processing_the_same_frame_twice_is_identical() {
    init_logging();
    let pipeline = HandPipeline::new(PipelineConfig::default()).expect("default config is valid");
    let raster = v_sign_rgb();
    let first = pipeline.process_frame(&raster).await.expect("frame processed");
    let second = pipeline.process_frame(&raster).await.expect("frame processed");

    assert_eq!(first, second);
    let deepest = |g: &hand_geometry::HandGeometry| -> Vec<_> {
        g.defects.iter().map(|d| (d.deepest_point, d.distance.to_bits())).collect()
    };
    assert_eq!(deepest(&first), deepest(&second));
}

#[tokio::test]
async fn gap_between_fingers_is_the_only_defect_of_the_silhouette_hull() {
    init_logging();
    let mask = ForegroundMask::from_raster(&v_sign_rgb());
    let mut labels = LabelAllocator::new();
    let regions = label_regions(&mask, &mut labels);
    let hand = largest_region(&regions).expect("hand present");
    let hand_mask = hand.to_mask(mask.width(), mask.height());

    let hull = convex_hull::hull(&hand.pixels).await.expect("quadrant tasks join");
    let defects = DefectFinder::new(DefectConfig::default())
        .expect("default config is valid")
        .find_defects(&hull, &hand_mask)
        .await
        .expect("edge tasks join");

    assert_eq!(defects.len(), 1, "{defects:?}");
    let gap = defects[0];
    assert!((42..58).contains(&gap.deepest_point.x), "{gap:?}");
    assert!((57..=62).contains(&gap.deepest_point.y), "{gap:?}");
    assert!(gap.distance > 25.0);
}
