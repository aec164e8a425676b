// THEORY:
// The `ConvexHullBuilder` wraps a point set (normally the traced contour) in its
// convex hull using a divide-by-quadrant incremental scheme.
//
// Key architectural principles:
// 1.  **Eight Extremes, Four Chains**: The leftmost, rightmost, topmost and
//     bottommost points (two of each, split by the other axis) anchor four
//     independent chains: top-right, bottom-right, bottom-left and top-left. A
//     point can only be a hull vertex of the chain whose strict region contains
//     it, so the chains never interact.
// 2.  **Monotone Keys**: Along each chain one coordinate is monotone. Candidates
//     are visited in that order from one shared sorted list and their slot is
//     found by binary search on the key.
// 3.  **One Turn Test**: "Outside the chain" and "still convex" are both decided by
//     the sign of a single integer cross product in the hull's winding (clockwise
//     on screen, y down). There is no per-quadrant slope logic to get wrong.
// 4.  **Parallel Quadrants**: The four chains share nothing but read-only sorted
//     lists, so `hull` builds them as four blocking tasks over `Arc`-shared data.
//     `hull_blocking` runs the same code sequentially.

use crate::core_modules::geometry::{cross, Point};
use crate::error::Result;
use futures::future::join_all;
use std::sync::Arc;
use tokio::task;

/// A convex polygon, clockwise on screen (y down), without a repeated closing vertex.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HullPolygon {
    vertices: Vec<Point>,
}

impl HullPolygon {
    pub fn new(vertices: Vec<Point>) -> Self {
        Self { vertices }
    }

    pub fn vertices(&self) -> &[Point] {
        &self.vertices
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Consecutive vertex pairs, including the closing edge from the last vertex
    /// back to the first.
    pub fn edges(&self) -> impl Iterator<Item = (Point, Point)> + '_ {
        let n = self.vertices.len();
        (0..n).map(move |i| (self.vertices[i], self.vertices[(i + 1) % n]))
    }

    /// True when no consecutive triple turns against the winding.
    pub fn is_convex(&self) -> bool {
        let n = self.vertices.len();
        if n < 3 {
            return true;
        }
        (0..n).all(|i| cross(self.vertices[i], self.vertices[(i + 1) % n], self.vertices[(i + 2) % n]) >= 0)
    }

    /// True when `p` lies inside or on the polygon.
    pub fn contains(&self, p: Point) -> bool {
        match self.vertices.len() {
            0 => false,
            1 => self.vertices[0] == p,
            _ => self.edges().all(|(a, b)| cross(a, b, p) >= 0),
        }
    }

    fn from_chains(chains: Vec<Vec<Point>>) -> Self {
        let mut vertices: Vec<Point> = Vec::new();
        for p in chains.into_iter().flatten() {
            if vertices.last() != Some(&p) {
                vertices.push(p);
            }
        }
        if vertices.len() > 1 && vertices.first() == vertices.last() {
            vertices.pop();
        }
        Self { vertices }
    }
}

/// The eight anchor points of a point set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Extremes {
    pub left_upper: Point,
    pub left_lower: Point,
    pub right_upper: Point,
    pub right_lower: Point,
    pub top_left: Point,
    pub top_right: Point,
    pub bottom_left: Point,
    pub bottom_right: Point,
}

impl Extremes {
    /// Ties on the primary axis are broken toward the point that extends the
    /// bounding box along the other axis.
    pub fn find(points: &[Point]) -> Option<Self> {
        let first = *points.first()?;
        let mut e = Extremes {
            left_upper: first,
            left_lower: first,
            right_upper: first,
            right_lower: first,
            top_left: first,
            top_right: first,
            bottom_left: first,
            bottom_right: first,
        };
        for &p in &points[1..] {
            if (p.x, p.y) < (e.left_upper.x, e.left_upper.y) {
                e.left_upper = p;
            }
            if p.x < e.left_lower.x || (p.x == e.left_lower.x && p.y > e.left_lower.y) {
                e.left_lower = p;
            }
            if p.x > e.right_upper.x || (p.x == e.right_upper.x && p.y < e.right_upper.y) {
                e.right_upper = p;
            }
            if (p.x, p.y) > (e.right_lower.x, e.right_lower.y) {
                e.right_lower = p;
            }
            if (p.y, p.x) < (e.top_left.y, e.top_left.x) {
                e.top_left = p;
            }
            if p.y < e.top_right.y || (p.y == e.top_right.y && p.x > e.top_right.x) {
                e.top_right = p;
            }
            if p.y > e.bottom_left.y || (p.y == e.bottom_left.y && p.x < e.bottom_left.x) {
                e.bottom_left = p;
            }
            if (p.y, p.x) > (e.bottom_right.y, e.bottom_right.x) {
                e.bottom_right = p;
            }
        }
        Some(e)
    }
}

/// The four chains, in the order they are concatenated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quadrant {
    TopRight,
    BottomRight,
    BottomLeft,
    TopLeft,
}

impl Quadrant {
    pub const ALL: [Quadrant; 4] = [
        Quadrant::TopRight,
        Quadrant::BottomRight,
        Quadrant::BottomLeft,
        Quadrant::TopLeft,
    ];

    /// First and last vertex of the chain.
    pub fn anchors(self, e: &Extremes) -> (Point, Point) {
        match self {
            Quadrant::TopRight => (e.top_right, e.right_upper),
            Quadrant::BottomRight => (e.right_lower, e.bottom_right),
            Quadrant::BottomLeft => (e.bottom_left, e.left_lower),
            Quadrant::TopLeft => (e.left_upper, e.top_left),
        }
    }

    /// Strict region in which a point can become a vertex of this chain.
    pub fn contains(self, e: &Extremes, p: Point) -> bool {
        match self {
            Quadrant::TopRight => p.x > e.top_right.x && p.y < e.right_upper.y,
            Quadrant::BottomRight => p.x > e.bottom_right.x && p.y > e.right_lower.y,
            Quadrant::BottomLeft => p.x < e.bottom_left.x && p.y > e.left_lower.y,
            Quadrant::TopLeft => p.x < e.top_left.x && p.y < e.left_upper.y,
        }
    }

    /// Coordinate that increases monotonically along the chain.
    fn key(self, p: Point) -> i64 {
        match self {
            Quadrant::TopRight => p.x as i64,
            Quadrant::BottomRight => p.y as i64,
            Quadrant::BottomLeft => -(p.x as i64),
            Quadrant::TopLeft => -(p.y as i64),
        }
    }

    fn walks_x_order(self) -> bool {
        matches!(self, Quadrant::TopRight | Quadrant::BottomLeft)
    }

    fn walks_reversed(self) -> bool {
        matches!(self, Quadrant::BottomLeft | Quadrant::TopLeft)
    }
}

fn insert_candidate(quadrant: Quadrant, chain: &mut Vec<Point>, p: Point) {
    let key = quadrant.key(p);
    let slot = chain.partition_point(|c| quadrant.key(*c) < key);
    if slot == 0 || slot >= chain.len() {
        return;
    }
    if cross(chain[slot - 1], chain[slot], p) >= 0 {
        return;
    }
    chain.insert(slot, p);

    let mut i = slot;
    while i >= 2 && cross(chain[i - 2], chain[i - 1], chain[i]) <= 0 {
        chain.remove(i - 1);
        i -= 1;
    }
    while i + 2 < chain.len() && cross(chain[i], chain[i + 1], chain[i + 2]) <= 0 {
        chain.remove(i + 1);
    }
}

/// Builds one quadrant's chain from the shared sorted list.
pub fn build_chain(quadrant: Quadrant, extremes: &Extremes, sorted: &[Point]) -> Vec<Point> {
    let (first, last) = quadrant.anchors(extremes);
    if first == last {
        return vec![first];
    }
    let mut chain = vec![first, last];
    let mut visit = |p: &Point| {
        if quadrant.contains(extremes, *p) {
            insert_candidate(quadrant, &mut chain, *p);
        }
    };
    if quadrant.walks_reversed() {
        sorted.iter().rev().for_each(&mut visit);
    } else {
        sorted.iter().for_each(&mut visit);
    }
    chain
}

fn sorted_lists(points: &[Point]) -> (Vec<Point>, Vec<Point>) {
    let mut by_x = points.to_vec();
    by_x.sort_unstable_by_key(|p| (p.x, p.y));
    let mut by_y = points.to_vec();
    by_y.sort_unstable_by_key(|p| (p.y, p.x));
    (by_x, by_y)
}

/// Convex hull with the four quadrant chains built as parallel blocking tasks.
pub async fn hull(points: &[Point]) -> Result<HullPolygon> {
    let Some(extremes) = Extremes::find(points) else {
        return Ok(HullPolygon::default());
    };
    let (by_x, by_y) = sorted_lists(points);
    let (by_x, by_y) = (Arc::new(by_x), Arc::new(by_y));

    let tasks = Quadrant::ALL.iter().map(|&quadrant| {
        let sorted = if quadrant.walks_x_order() {
            Arc::clone(&by_x)
        } else {
            Arc::clone(&by_y)
        };
        task::spawn_blocking(move || build_chain(quadrant, &extremes, &sorted))
    });

    let mut chains = Vec::with_capacity(Quadrant::ALL.len());
    for joined in join_all(tasks).await {
        chains.push(joined?);
    }
    Ok(HullPolygon::from_chains(chains))
}

/// Sequential variant of [`hull`].
pub fn hull_blocking(points: &[Point]) -> HullPolygon {
    let Some(extremes) = Extremes::find(points) else {
        return HullPolygon::default();
    };
    let (by_x, by_y) = sorted_lists(points);
    let chains = Quadrant::ALL
        .iter()
        .map(|&quadrant| {
            let sorted = if quadrant.walks_x_order() { &by_x } else { &by_y };
            build_chain(quadrant, &extremes, sorted)
        })
        .collect();
    HullPolygon::from_chains(chains)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pts(raw: &[(i32, i32)]) -> Vec<Point> {
        raw.iter().map(|&(x, y)| Point::new(x, y)).collect()
    }

    const CIRCLE: [(i32, i32); 12] = [
        (0, -10),
        (6, -8),
        (8, -6),
        (10, 0),
        (8, 6),
        (6, 8),
        (0, 10),
        (-6, 8),
        (-8, 6),
        (-10, 0),
        (-8, -6),
        (-6, -8),
    ];

    /// Deterministic pseudo-random cloud.
    fn cloud(n: usize) -> Vec<Point> {
        let mut state: u64 = 0x2545_F491_4F6C_DD1D;
        (0..n)
            .map(|_| {
                state = state.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1_442_695_040_888_963_407);
                let x = ((state >> 33) % 200) as i32 - 100;
                let y = ((state >> 13) % 150) as i32 - 75;
                Point::new(x, y)
            })
            .collect()
    }

    #[test]
    fn regular_polygon_yields_exactly_its_vertices() {
        let mut input = pts(&CIRCLE);
        // interior points, one of them collinear with a hull edge
        input.extend(pts(&[(5, -5), (7, -7), (1, 1), (-3, 2)]));
        input.reverse();

        let polygon = hull_blocking(&input);
        assert_eq!(polygon.vertices(), pts(&CIRCLE).as_slice());
        assert!(polygon.is_convex());
    }

    #[test]
    fn square_with_interior_and_edge_points() {
        let input = pts(&[(0, 0), (10, 0), (10, 10), (0, 10), (5, 0), (10, 4), (3, 3), (0, 7), (6, 10)]);
        let polygon = hull_blocking(&input);
        assert_eq!(polygon.vertices(), pts(&[(10, 0), (10, 10), (0, 10), (0, 0)]).as_slice());
        for p in &input {
            assert!(polygon.contains(*p));
        }
    }

    #[test]
    fn collinear_points_reduce_to_endpoints() {
        let diagonal = pts(&[(0, 0), (5, 5), (10, 10), (3, 3)]);
        let polygon = hull_blocking(&diagonal);
        assert_eq!(polygon.len(), 2);
        assert!(polygon.vertices().contains(&Point::new(0, 0)));
        assert!(polygon.vertices().contains(&Point::new(10, 10)));

        let horizontal = pts(&[(0, 4), (3, 4), (7, 4)]);
        assert_eq!(hull_blocking(&horizontal).vertices(), pts(&[(7, 4), (0, 4)]).as_slice());
    }

    #[test]
    fn degenerate_inputs() {
        assert!(hull_blocking(&[]).is_empty());
        let single = hull_blocking(&pts(&[(4, 2), (4, 2), (4, 2)]));
        assert_eq!(single.vertices(), &[Point::new(4, 2)]);
    }

    #[test]
    fn cloud_hull_encloses_every_point() {
        let input = cloud(400);
        let polygon = hull_blocking(&input);
        assert!(polygon.len() >= 3);
        assert!(polygon.is_convex());
        for p in &input {
            assert!(polygon.contains(*p), "{p:?} outside hull");
        }
        // strictly convex: no vertex sits on the line through its neighbours
        let n = polygon.len();
        for i in 0..n {
            let v = polygon.vertices();
            assert!(cross(v[i], v[(i + 1) % n], v[(i + 2) % n]) > 0);
        }
    }

    #[test]
    fn extremes_break_ties_outward() {
        let e = Extremes::find(&pts(&[(0, 2), (0, 8), (5, 0), (9, 0), (9, 3), (9, 6)])).expect("non-empty");
        assert_eq!(e.left_upper, Point::new(0, 2));
        assert_eq!(e.left_lower, Point::new(0, 8));
        assert_eq!(e.top_left, Point::new(5, 0));
        assert_eq!(e.top_right, Point::new(9, 0));
        assert_eq!(e.right_upper, Point::new(9, 0));
        assert_eq!(e.right_lower, Point::new(9, 6));
    }

    #[tokio::test]
    async fn parallel_quadrants_match_sequential_build() {
        let input = cloud(1_000);
        let parallel = hull(&input).await.expect("quadrant tasks join");
        assert_eq!(parallel, hull_blocking(&input));
        assert!(hull(&[]).await.expect("empty input").is_empty());
    }
}
