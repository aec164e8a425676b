// THEORY:
// The `geometry` module holds the small amount of shared math every other stage
// leans on: integer pixel coordinates, the 8-neighbour offset table, turn tests,
// point-to-line distances and the 256-bin histogram that drives Otsu's threshold.
//
// Key architectural principles:
// 1.  **Image Coordinates**: x grows to the right and y grows DOWNWARD. Every sign
//     convention in the crate (hull winding, inward normals, orientation angles)
//     is derived from this single fact.
// 2.  **Exact Integer Turns**: Turn tests on pixel coordinates are computed in
//     `i64`, so convexity decisions never depend on floating point rounding.
// 3.  **Stateless Helpers**: Nothing here allocates per call beyond its output
//     and nothing keeps state between calls.

use std::ops::{Add, Mul, Sub};

/// An integer pixel coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// True when `other` is one of the 8 neighbours of `self` (or `self` itself).
    pub fn is_8_adjacent(&self, other: &Point) -> bool {
        (self.x - other.x).abs() <= 1 && (self.y - other.y).abs() <= 1
    }

    pub fn to_vector(self) -> Vector2 {
        Vector2::new(self.x as f64, self.y as f64)
    }
}

/// A real-valued 2D vector, used for sub-pixel positions and directions.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vector2 {
    pub x: f64,
    pub y: f64,
}

impl Vector2 {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn dot(self, other: Vector2) -> f64 {
        self.x * other.x + self.y * other.y
    }

    pub fn length(self) -> f64 {
        self.dot(self).sqrt()
    }

    /// Unit vector in the same direction, or `None` for a zero-length vector.
    pub fn normalized(self) -> Option<Vector2> {
        let length = self.length();
        if length <= f64::EPSILON {
            return None;
        }
        Some(Vector2::new(self.x / length, self.y / length))
    }

    /// Rounds to the nearest pixel coordinate.
    pub fn round(self) -> Point {
        Point::new(self.x.round() as i32, self.y.round() as i32)
    }
}

impl Add for Vector2 {
    type Output = Vector2;
    fn add(self, rhs: Vector2) -> Vector2 {
        Vector2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Vector2 {
    type Output = Vector2;
    fn sub(self, rhs: Vector2) -> Vector2 {
        Vector2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Vector2 {
    type Output = Vector2;
    fn mul(self, rhs: f64) -> Vector2 {
        Vector2::new(self.x * rhs, self.y * rhs)
    }
}

/// The 8 neighbour offsets, clockwise from east (y down).
pub const NEIGHBOUR_OFFSETS: [(i32, i32); 8] = [
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
    (-1, -1),
    (0, -1),
    (1, -1),
];

/// Flat index of `(x, y)` in a tightly packed row-major grid.
#[inline]
pub fn offset(x: usize, y: usize, width: usize) -> usize {
    y * width + x
}

/// Neighbour of `(x, y)` shifted by `(dx, dy)`, or `None` when it leaves the grid.
#[inline]
pub fn shifted(x: usize, y: usize, dx: i32, dy: i32, width: usize, height: usize) -> Option<(usize, usize)> {
    let nx = x as i64 + dx as i64;
    let ny = y as i64 + dy as i64;
    if nx < 0 || ny < 0 || nx >= width as i64 || ny >= height as i64 {
        return None;
    }
    Some((nx as usize, ny as usize))
}

/// Z component of `(a - o) x (b - o)`.
///
/// With y pointing down, a positive value means `o -> a -> b` turns clockwise on
/// screen. Hull polygons in this crate wind that way.
#[inline]
pub fn cross(o: Point, a: Point, b: Point) -> i64 {
    let (ax, ay) = (a.x as i64 - o.x as i64, a.y as i64 - o.y as i64);
    let (bx, by) = (b.x as i64 - o.x as i64, b.y as i64 - o.y as i64);
    ax * by - ay * bx
}

/// Perpendicular distance from `p` to the infinite line through `a` and `b`.
///
/// Falls back to the distance from `a` when the line is degenerate.
pub fn perpendicular_distance(p: Vector2, a: Vector2, b: Vector2) -> f64 {
    let direction = b - a;
    let length = direction.length();
    if length <= f64::EPSILON {
        return (p - a).length();
    }
    let relative = p - a;
    (direction.x * relative.y - direction.y * relative.x).abs() / length
}

/// A 256-bin histogram over 8-bit values.
#[derive(Debug, Clone)]
pub struct Histogram {
    bins: [u64; 256],
    total: u64,
}

impl Default for Histogram {
    fn default() -> Self {
        Self {
            bins: [0; 256],
            total: 0,
        }
    }
}

impl Histogram {
    pub fn from_values<I: IntoIterator<Item = u8>>(values: I) -> Self {
        let mut histogram = Self::default();
        for value in values {
            histogram.add(value);
        }
        histogram
    }

    pub fn add(&mut self, value: u8) {
        self.bins[value as usize] += 1;
        self.total += 1;
    }

    pub fn count(&self, value: u8) -> u64 {
        self.bins[value as usize]
    }

    /// Otsu's threshold: the value `t` maximising the between-class variance of
    /// `[0, t]` versus `(t, 255]`.
    ///
    /// Returns 0 for an empty histogram or one where every sample shares a bin.
    pub fn otsu_threshold(&self) -> u8 {
        if self.total == 0 {
            return 0;
        }
        let total = self.total as f64;
        let weighted_total: f64 = self
            .bins
            .iter()
            .enumerate()
            .map(|(value, &count)| value as f64 * count as f64)
            .sum();

        let mut weight_background = 0.0;
        let mut sum_background = 0.0;
        let mut best_variance = -1.0;
        let mut threshold = 0u8;

        for (value, &count) in self.bins.iter().enumerate() {
            weight_background += count as f64;
            if weight_background == 0.0 {
                continue;
            }
            let weight_foreground = total - weight_background;
            if weight_foreground == 0.0 {
                break;
            }
            sum_background += value as f64 * count as f64;

            let mean_background = sum_background / weight_background;
            let mean_foreground = (weighted_total - sum_background) / weight_foreground;
            let variance = weight_background * weight_foreground * (mean_background - mean_foreground).powi(2);
            if variance > best_variance {
                best_variance = variance;
                threshold = value as u8;
            }
        }

        threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn neighbour_offsets_cover_the_ring_once() {
        let mut seen = std::collections::HashSet::new();
        for (dx, dy) in NEIGHBOUR_OFFSETS {
            assert!(dx.abs() <= 1 && dy.abs() <= 1);
            assert!(!(dx == 0 && dy == 0));
            assert!(seen.insert((dx, dy)));
        }
        assert_eq!(seen.len(), 8);
    }

    #[test]
    fn cross_is_positive_for_screen_clockwise_turns() {
        // right along the top, then down the right side
        let turn = cross(Point::new(0, 0), Point::new(10, 0), Point::new(10, 10));
        assert!(turn > 0);
        assert_eq!(cross(Point::new(0, 0), Point::new(5, 5), Point::new(10, 10)), 0);
    }

    #[test]
    fn perpendicular_distance_to_horizontal_line() {
        let d = perpendicular_distance(
            Vector2::new(3.0, 7.0),
            Vector2::new(0.0, 2.0),
            Vector2::new(10.0, 2.0),
        );
        assert!((d - 5.0).abs() < 1e-12);
        let degenerate = perpendicular_distance(
            Vector2::new(3.0, 4.0),
            Vector2::new(0.0, 0.0),
            Vector2::new(0.0, 0.0),
        );
        assert!((degenerate - 5.0).abs() < 1e-12);
    }

    #[test]
    fn otsu_splits_a_bimodal_histogram_between_the_modes() {
        let mut values = vec![20u8; 500];
        values.extend(std::iter::repeat(200u8).take(500));
        let histogram = Histogram::from_values(values);
        let t = histogram.otsu_threshold();
        assert!((20..200).contains(&t), "threshold {t}");
    }

    #[test]
    fn otsu_degenerates_to_zero_for_a_single_bin() {
        let histogram = Histogram::from_values(std::iter::repeat(90u8).take(40));
        assert_eq!(histogram.otsu_threshold(), 0);
        assert_eq!(Histogram::default().otsu_threshold(), 0);
    }

    #[test]
    fn shifted_rejects_out_of_grid_neighbours() {
        assert_eq!(shifted(0, 0, -1, 0, 4, 4), None);
        assert_eq!(shifted(3, 3, 1, 1, 4, 4), None);
        assert_eq!(shifted(1, 1, 1, -1, 4, 4), Some((2, 0)));
    }
}
