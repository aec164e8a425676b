// THEORY:
// This file is the main entry point for the `hand_geometry` library crate. It turns
// a segmented hand frame into the geometric descriptors a gesture recogniser needs:
// the outer contour, its convex hull, the convexity defects between fingers and the
// principal orientation of the hand.
//
// The primary goal is to export `HandPipeline` (one frame at a time) and
// `ParallelPipeline` (independent frames on a worker pool) together with their
// configuration and output types. Every stage in `core_modules` is public as well,
// so a caller can run a single stage on its own buffers.

pub mod config;
pub mod core_modules;
pub mod error;
pub mod parallel_pipeline;
pub mod pipeline;

pub use config::{load_config, parse_config, DefectConfig, EdgeConfig, PipelineConfig};
pub use core_modules::contour_tracer::{ContourPath, Facing};
pub use core_modules::convex_hull::HullPolygon;
pub use core_modules::defect_finder::ConvexDefect;
pub use core_modules::geometry::{Point, Vector2};
pub use core_modules::orientation::PcaStats;
pub use core_modules::raster::{BinaryMask, EdgeMask, ForegroundMask, RasterBuffer};
pub use error::{GeometryError, Result};
pub use parallel_pipeline::{FrameAnalysis, ParallelPipeline};
pub use pipeline::{HandGeometry, HandPipeline};
