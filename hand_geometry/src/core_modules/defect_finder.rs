// THEORY:
// The `DefectFinder` measures how far the hand silhouette falls short of its convex
// hull, one hull edge at a time. The gaps between fingers show up as deep defects;
// a straight stretch of boundary shows up as none.
//
// Key architectural principles:
// 1.  **Snakes, Not Contour Scans**: For every hull edge a row of control points
//     (a "snake") is laid just inside the edge and pushed inward along the edge's
//     normal until each point lands on foreground. The point that travelled
//     furthest marks the bottom of the gap. The snake never needs the contour.
// 2.  **Reduced Resolution**: Relaxation runs on a block-reduced foreground mask
//     (any covered pixel counts), which halves the work per factor and bridges
//     one-pixel cracks in the segmentation. Results are scaled back before the
//     depth is measured.
// 3.  **Arena With Indices**: Control points live in one `Vec`; neighbours refer
//     to each other through `prev` / `next` indices, never through references.
// 4.  **Bounded Travel**: A point that leaves the mask or exceeds the travel budget
//     is locked as exhausted and carries no depth.
// 5.  **Edge Parallelism**: Edges are independent. Each runs as a blocking task over
//     an `Arc` of the reduced mask and writes into its own result slot.

use crate::config::DefectConfig;
use crate::core_modules::convex_hull::HullPolygon;
use crate::core_modules::geometry::{perpendicular_distance, Point, Vector2};
use crate::core_modules::raster::{BinaryMask, ForegroundMask};
use crate::error::Result;
use futures::future::join_all;
use log::{debug, warn};
use std::sync::Arc;
use tokio::task;

/// A gap between the silhouette and one hull edge.
///
/// Two defects are equal when they start at the same hull vertex.
#[derive(Debug, Clone, Copy)]
pub struct ConvexDefect {
    pub start_point: Point,
    pub end_point: Point,
    pub deepest_point: Point,
    /// Perpendicular distance of `deepest_point` from the start-end line.
    pub distance: f64,
}

impl PartialEq for ConvexDefect {
    fn eq(&self, other: &Self) -> bool {
        self.start_point == other.start_point
    }
}

impl Eq for ConvexDefect {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnakeState {
    Free,
    /// Landed on foreground.
    Locked,
    /// Left the mask or ran out of travel.
    Exhausted,
}

/// One control point of a snake.
#[derive(Debug, Clone)]
pub struct SnakePoint {
    /// Position in reduced-mask coordinates.
    pub position: Vector2,
    /// Distance travelled inward so far.
    pub displacement: f64,
    pub state: SnakeState,
    pub prev: Option<usize>,
    pub next: Option<usize>,
    steps: usize,
}

impl SnakePoint {
    fn depth(&self) -> Option<f64> {
        (self.state == SnakeState::Locked).then_some(self.displacement)
    }
}

/// The control points laid along one hull edge.
#[derive(Debug, Clone)]
pub struct Snake {
    points: Vec<SnakePoint>,
    normal: Vector2,
}

impl Snake {
    /// Lays control points along `from -> to` (reduced coordinates), offset inward.
    ///
    /// Returns `None` when the edge is too short to hold a single point.
    pub fn along_edge(from: Vector2, to: Vector2, spacing: f64, normal_offset: f64) -> Option<Self> {
        let direction = to - from;
        let length = direction.length();
        let count = (length / spacing).ceil() as i64 - 1;
        if count <= 0 {
            return None;
        }
        let unit = direction.normalized()?;
        let normal = Vector2::new(-unit.y, unit.x);

        let count = count as usize;
        let points = (1..=count)
            .map(|k| {
                let t = k as f64 / (count + 1) as f64;
                SnakePoint {
                    position: from + direction * t + normal * normal_offset,
                    displacement: 0.0,
                    state: SnakeState::Free,
                    prev: k.checked_sub(2),
                    next: (k < count).then_some(k),
                    steps: 0,
                }
            })
            .collect();
        Some(Self { points, normal })
    }

    pub fn points(&self) -> &[SnakePoint] {
        &self.points
    }

    /// Moves every free point inward until all are locked. Returns the number of
    /// iterations taken.
    pub fn relax(&mut self, mask: &ForegroundMask, step: f64, max_steps: usize) -> usize {
        let mut iterations = 0;
        loop {
            let mut moving = 0;
            for point in self.points.iter_mut().filter(|p| p.state == SnakeState::Free) {
                let (cx, cy) = (point.position.x.floor() as i64, point.position.y.floor() as i64);
                if cx < 0 || cy < 0 || cx >= mask.width() as i64 || cy >= mask.height() as i64 {
                    point.state = SnakeState::Exhausted;
                } else if mask.is_set(cx as usize, cy as usize) {
                    point.state = SnakeState::Locked;
                } else if point.steps >= max_steps {
                    point.state = SnakeState::Exhausted;
                } else {
                    point.position = point.position + self.normal * step;
                    point.displacement += step;
                    point.steps += 1;
                    moving += 1;
                }
            }
            if moving == 0 {
                break;
            }
            iterations += 1;
        }
        iterations
    }

    /// Indices of locked points at least as deep as both arena neighbours.
    pub fn local_maxima(&self) -> Vec<usize> {
        let neighbour_depth = |index: Option<usize>| {
            index
                .and_then(|i| self.points[i].depth())
                .unwrap_or(f64::NEG_INFINITY)
        };
        self.points
            .iter()
            .enumerate()
            .filter_map(|(i, p)| {
                let depth = p.depth()?;
                (depth >= neighbour_depth(p.prev) && depth >= neighbour_depth(p.next)).then_some(i)
            })
            .collect()
    }

    /// The deepest local maximum; the first one on a tie.
    pub fn deepest(&self) -> Option<&SnakePoint> {
        let mut best: Option<&SnakePoint> = None;
        for index in self.local_maxima() {
            let candidate = &self.points[index];
            if best.is_none_or(|b| candidate.displacement > b.displacement) {
                best = Some(candidate);
            }
        }
        best
    }

    pub fn exhausted_count(&self) -> usize {
        self.points.iter().filter(|p| p.state == SnakeState::Exhausted).count()
    }
}

/// Finds convexity defects by snake relaxation along each hull edge.
#[derive(Debug, Clone)]
pub struct DefectFinder {
    config: DefectConfig,
}

impl DefectFinder {
    pub fn new(config: DefectConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &DefectConfig {
        &self.config
    }

    /// Reduces a full-resolution mask the way `find_defects` does.
    pub fn reduce(&self, mask: &ForegroundMask) -> ForegroundMask {
        mask.downsample(self.config.downsample_factor)
    }

    /// Relaxes one edge `start -> end` (full resolution) against an already reduced mask.
    pub fn relax_edge(&self, reduced: &ForegroundMask, start: Point, end: Point) -> Option<ConvexDefect> {
        let factor = self.config.downsample_factor as f64;
        let from = start.to_vector() * (1.0 / factor);
        let to = end.to_vector() * (1.0 / factor);
        let mut snake = Snake::along_edge(from, to, self.config.spacing, self.config.normal_offset)?;

        let (w, h) = (reduced.width() as f64, reduced.height() as f64);
        let max_steps = ((w * w + h * h).sqrt() / self.config.step).ceil() as usize + 1;
        let iterations = snake.relax(reduced, self.config.step, max_steps);

        let exhausted = snake.exhausted_count();
        if exhausted > 0 {
            warn!(
                "DefectFinder: {} of {} snake points exhausted on edge ({}, {}) -> ({}, {})",
                exhausted,
                snake.points().len(),
                start.x,
                start.y,
                end.x,
                end.y
            );
        }

        let deepest = snake.deepest()?;
        let deepest_point = (deepest.position * factor).round();
        let distance = perpendicular_distance(deepest_point.to_vector(), start.to_vector(), end.to_vector());
        debug!(
            "DefectFinder: edge ({}, {}) -> ({}, {}) relaxed in {} iterations, depth {:.2}",
            start.x, start.y, end.x, end.y, iterations, distance
        );
        if distance < self.config.min_defect_depth {
            return None;
        }
        Some(ConvexDefect {
            start_point: start,
            end_point: end,
            deepest_point,
            distance,
        })
    }

    /// One relaxation per hull edge, run as parallel blocking tasks.
    pub async fn find_defects(&self, hull: &HullPolygon, mask: &ForegroundMask) -> Result<Vec<ConvexDefect>> {
        if hull.len() < 2 {
            return Ok(Vec::new());
        }
        let reduced = Arc::new(self.reduce(mask));

        let tasks = hull.edges().map(|(start, end)| {
            let finder = self.clone();
            let reduced = Arc::clone(&reduced);
            task::spawn_blocking(move || finder.relax_edge(&reduced, start, end))
        });

        let mut defects: Vec<ConvexDefect> = Vec::new();
        for slot in join_all(tasks).await {
            if let Some(defect) = slot? {
                if !defects.contains(&defect) {
                    defects.push(defect);
                }
            }
        }
        Ok(defects)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const APEX: Point = Point::new(40, 35);

    /// An 80x60 frame with a filled rectangle and a V-shaped notch cut down from
    /// the top edge to `APEX`.
    fn notched_rectangle(with_notch: bool) -> ForegroundMask {
        ForegroundMask::from_fn(80, 60, |x, y| {
            let inside = (10..70).contains(&x) && (10..50).contains(&y);
            let (xf, yf) = (x as f64, y as f64);
            let in_notch = with_notch && yf < 35.0 && (xf - 40.0).abs() < 15.0 * (35.0 - yf) / 25.0;
            inside && !in_notch
        })
    }

    fn rectangle_hull() -> HullPolygon {
        HullPolygon::new(vec![
            Point::new(10, 10),
            Point::new(69, 10),
            Point::new(69, 49),
            Point::new(10, 49),
        ])
    }

    fn finder() -> DefectFinder {
        DefectFinder::new(DefectConfig::default()).expect("default config is valid")
    }

    #[test]
    fn short_edges_hold_no_control_points() {
        assert!(Snake::along_edge(Vector2::new(0.0, 0.0), Vector2::new(1.5, 0.0), 2.0, 1.0).is_none());
        assert!(Snake::along_edge(Vector2::new(3.0, 3.0), Vector2::new(3.0, 3.0), 2.0, 1.0).is_none());
    }

    #[test]
    fn control_points_are_linked_and_offset_inward() {
        let snake = Snake::along_edge(Vector2::new(0.0, 0.0), Vector2::new(10.0, 0.0), 2.0, 1.0)
            .expect("edge long enough");
        let points = snake.points();
        assert_eq!(points.len(), 4);
        assert_eq!(points[0].prev, None);
        assert_eq!(points[0].next, Some(1));
        assert_eq!(points[3].prev, Some(2));
        assert_eq!(points[3].next, None);
        // left-to-right edge on screen: inside is below
        assert!(points.iter().all(|p| (p.position.y - 1.0).abs() < 1e-12));
    }

    #[test]
    fn v_notch_defect_sits_near_the_apex() {
        let mask = notched_rectangle(true);
        let finder = finder();
        let reduced = finder.reduce(&mask);
        let defect = finder
            .relax_edge(&reduced, Point::new(10, 10), Point::new(69, 10))
            .expect("notch is deep enough");

        let tolerance = 3 * finder.config().downsample_factor as i32 / 2;
        assert!((defect.deepest_point.x - APEX.x).abs() <= tolerance, "{defect:?}");
        assert!((defect.deepest_point.y - APEX.y).abs() <= tolerance, "{defect:?}");
        assert!(defect.distance > 20.0);
        assert_eq!(defect.start_point, Point::new(10, 10));
    }

    #[test]
    fn flat_edges_produce_no_defect() {
        let mask = notched_rectangle(false);
        let finder = finder();
        let reduced = finder.reduce(&mask);
        for (start, end) in rectangle_hull().edges() {
            assert!(finder.relax_edge(&reduced, start, end).is_none());
        }
    }

    #[test]
    fn points_walking_off_the_mask_carry_no_depth() {
        let empty = ForegroundMask::new(8, 8);
        let mut snake = Snake::along_edge(Vector2::new(0.0, 2.0), Vector2::new(8.0, 2.0), 2.0, 1.0)
            .expect("edge long enough");
        snake.relax(&empty, 0.5, 100);
        assert_eq!(snake.exhausted_count(), snake.points().len());
        assert!(snake.local_maxima().is_empty());
        assert!(snake.deepest().is_none());
    }

    #[tokio::test]
    async fn notched_hand_reports_one_defect() {
        let mask = notched_rectangle(true);
        let defects = finder()
            .find_defects(&rectangle_hull(), &mask)
            .await
            .expect("edge tasks join");
        assert_eq!(defects.len(), 1);
        assert_eq!(defects[0].end_point, Point::new(69, 10));
    }

    #[tokio::test]
    async fn degenerate_hulls_have_no_defects() {
        let mask = notched_rectangle(true);
        let single = HullPolygon::new(vec![Point::new(5, 5)]);
        assert!(finder().find_defects(&single, &mask).await.expect("no tasks").is_empty());
        assert!(finder().find_defects(&HullPolygon::default(), &mask).await.expect("no tasks").is_empty());
    }
}
