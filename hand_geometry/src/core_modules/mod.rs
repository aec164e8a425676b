pub mod contour_tracer;
pub mod convex_hull;
pub mod defect_finder;
pub mod edge_detector;
pub mod geometry;
pub mod orientation;
pub mod pixel;
pub mod raster;
pub mod region;
