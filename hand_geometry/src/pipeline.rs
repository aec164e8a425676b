// THEORY:
// The `pipeline` module is the top-level API for a single frame. It chains every
// stage of the engine behind one call and returns a `HandGeometry` bundle.
//
// Stages, in order:
// 1.  Foreground mask from the segmented raster, split into 8-connected regions.
//     The largest region is the hand; everything else is discarded.
// 2.  Edge detection over the whole raster.
// 3.  Contour tracing from the first edge pixel (raster order) around the hand's
//     bounding box. When the detector found no edge there the hand's own mask is
//     traced instead.
// 4.  Convex hull of the contour, convexity defects of the hand mask against that
//     hull, and PCA over the hand's pixels.
//
// The pipeline keeps no state between frames. Running it twice on the same raster
// yields the same `HandGeometry`.

use crate::config::PipelineConfig;
use crate::core_modules::contour_tracer::{self, ContourPath, Facing};
use crate::core_modules::convex_hull::{self, HullPolygon};
use crate::core_modules::defect_finder::{ConvexDefect, DefectFinder};
use crate::core_modules::edge_detector::EdgeDetector;
use crate::core_modules::geometry::Point;
use crate::core_modules::orientation::{self, PcaStats};
use crate::core_modules::raster::{BinaryMask, EdgeMask, ForegroundMask, RasterBuffer};
use crate::core_modules::region::region::{label_regions, largest_region, BoundingBox, Label, LabelAllocator};
use crate::error::Result;
use log::debug;
use std::time::Instant;

/// Edge ridges can sit one pixel outside the silhouette, so the search for the
/// contour start looks slightly beyond the hand's bounding box.
const EDGE_SEARCH_MARGIN: i32 = 2;

/// The geometric descriptors of one frame.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HandGeometry {
    /// Label of the region taken as the hand, `None` when the frame has no foreground.
    pub region_label: Option<Label>,
    pub contour: ContourPath,
    pub hull: HullPolygon,
    pub defects: Vec<ConvexDefect>,
    pub pca: PcaStats,
}

impl HandGeometry {
    pub fn is_empty(&self) -> bool {
        self.region_label.is_none()
    }

    /// Deepest defect first.
    pub fn defects_by_depth(&self) -> Vec<ConvexDefect> {
        let mut defects = self.defects.clone();
        defects.sort_by(|a, b| b.distance.total_cmp(&a.distance));
        defects
    }
}

/// Runs every stage of the engine on one frame.
#[derive(Debug, Clone)]
pub struct HandPipeline {
    config: PipelineConfig,
    edge_detector: EdgeDetector,
    defect_finder: DefectFinder,
}

impl HandPipeline {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            edge_detector: EdgeDetector::new(config.edge.clone())?,
            defect_finder: DefectFinder::new(config.defect.clone())?,
            config,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub async fn process_frame(&self, raster: &RasterBuffer) -> Result<HandGeometry> {
        let frame_start = Instant::now();
        let (width, height) = (raster.width() as usize, raster.height() as usize);

        // --- 1. Segmentation ---
        let foreground = ForegroundMask::from_raster(raster);
        let mut labels = LabelAllocator::new();
        let regions = label_regions(&foreground, &mut labels);
        let Some(hand) = largest_region(&regions) else {
            debug!("HandPipeline: no foreground in {}x{} frame", width, height);
            return Ok(HandGeometry::default());
        };
        let hand_mask = hand.to_mask(width, height);
        debug!(
            "HandPipeline: {} regions, hand is #{} with {} px ({:?})",
            regions.len(),
            hand.label,
            hand.area(),
            frame_start.elapsed()
        );

        // --- 2. Edges ---
        let stage = Instant::now();
        let edges = self.edge_detector.find_edges(raster);
        debug!("HandPipeline: edges in {:?}", stage.elapsed());

        // --- 3. Contour ---
        let stage = Instant::now();
        let search = hand.bounding_box.grown(EDGE_SEARCH_MARGIN);
        let contour = match first_edge_within(&edges, &search) {
            Some(start) => contour_tracer::trace(&edges, start, Facing::North),
            None => {
                debug!("HandPipeline: no edge inside the hand, tracing the region mask");
                contour_tracer::trace(&hand_mask, hand.first, Facing::North)
            }
        };
        debug!("HandPipeline: contour of {} steps in {:?}", contour.perimeter(), stage.elapsed());

        // --- 4. Hull, defects, orientation ---
        let stage = Instant::now();
        let hull = convex_hull::hull(contour.points()).await?;
        debug!("HandPipeline: hull of {} vertices in {:?}", hull.len(), stage.elapsed());

        let stage = Instant::now();
        let defects = self.defect_finder.find_defects(&hull, &hand_mask).await?;
        debug!("HandPipeline: {} defects in {:?}", defects.len(), stage.elapsed());

        let pca = orientation::estimate(&hand.pixels);
        debug!(
            "HandPipeline: orientation {:?} deg, frame done in {:?}",
            pca.orientation,
            frame_start.elapsed()
        );

        Ok(HandGeometry {
            region_label: Some(hand.label),
            contour,
            hull,
            defects,
            pca,
        })
    }
}

/// First edge pixel in raster order inside `bounds`.
fn first_edge_within(edges: &EdgeMask, bounds: &BoundingBox) -> Option<Point> {
    for y in bounds.min.y..=bounds.max.y {
        for x in bounds.min.x..=bounds.max.x {
            if edges.is_set_at(x as i64, y as i64) {
                return Some(Point::new(x, y));
            }
        }
    }
    None
}
