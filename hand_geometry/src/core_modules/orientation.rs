// THEORY:
// The `OrientationEstimator` summarises a point cloud (the hand's foreground pixels)
// by its centroid and principal axis. The principal axis of an open hand runs from
// the wrist toward the fingers, so its tilt against "straight up" is the hand's
// orientation.
//
// Key architectural principles:
// 1.  **Closed-Form 2x2 PCA**: The covariance matrix is symmetric 2x2, so both
//     eigenvalues come from the characteristic quadratic. No iterative solver.
// 2.  **Sample Statistics**: Variance and covariance use the N-1 denominator. With
//     fewer than two points they are zero, not undefined.
// 3.  **Deterministic Sign**: An eigenvector is only defined up to sign. The primary
//     one is flipped to point up the screen (y <= 0), which leaves its x sign tied
//     to the opposite of the covariance because y grows downward.
// 4.  **Defined Emptiness**: No points means no orientation, reported as `None`.

use crate::core_modules::geometry::{Point, Vector2};
use crate::core_modules::raster::BinaryMask;

const UP: Vector2 = Vector2::new(0.0, -1.0);

/// Second-order statistics of a point cloud.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PcaStats {
    pub count: usize,
    pub mean: Vector2,
    pub var_x: f64,
    pub var_y: f64,
    pub cov_xy: f64,
    /// Largest first.
    pub eigenvalues: [f64; 2],
    /// Unit vectors matching `eigenvalues`; the primary one points up the screen.
    pub eigenvectors: [Vector2; 2],
    /// Signed tilt of the primary axis from "up", in degrees. Positive leans right.
    pub orientation: Option<f64>,
}

impl PcaStats {
    pub fn primary_axis(&self) -> Vector2 {
        self.eigenvectors[0]
    }

    pub fn centroid(&self) -> Option<Vector2> {
        (self.count > 0).then_some(self.mean)
    }
}

/// Unit eigenvector of `[[a, b], [b, c]]` for `lambda`.
fn eigenvector(a: f64, b: f64, c: f64, lambda: f64) -> Vector2 {
    let from_first_row = Vector2::new(b, lambda - a);
    let from_second_row = Vector2::new(lambda - c, b);
    let candidate = if from_first_row.length() >= from_second_row.length() {
        from_first_row
    } else {
        from_second_row
    };
    candidate.normalized().unwrap_or_else(|| {
        if lambda == a {
            Vector2::new(1.0, 0.0)
        } else {
            Vector2::new(0.0, 1.0)
        }
    })
}

/// Flips `v` so it points up with an x sign opposite to the covariance.
fn orient_primary(v: Vector2, cov: f64) -> Vector2 {
    let x = if cov > 0.0 { -v.x.abs() } else { v.x.abs() };
    Vector2::new(x, -v.y.abs())
}

/// Angle between `axis` and straight up via the law of cosines, signed by `axis.x`.
fn tilt_from_up(axis: Vector2) -> f64 {
    let chord = axis - UP;
    let cosine = ((2.0 - chord.dot(chord)) / 2.0).clamp(-1.0, 1.0);
    let degrees = cosine.acos().to_degrees();
    if axis.x < 0.0 { -degrees } else { degrees }
}

/// Principal component analysis over `points`.
pub fn estimate(points: &[Point]) -> PcaStats {
    let n = points.len();
    if n == 0 {
        return PcaStats::default();
    }

    let (sum_x, sum_y) = points
        .iter()
        .fold((0.0, 0.0), |(sx, sy), p| (sx + p.x as f64, sy + p.y as f64));
    let mean = Vector2::new(sum_x / n as f64, sum_y / n as f64);

    let (mut sxx, mut syy, mut sxy) = (0.0, 0.0, 0.0);
    for p in points {
        let (dx, dy) = (p.x as f64 - mean.x, p.y as f64 - mean.y);
        sxx += dx * dx;
        syy += dy * dy;
        sxy += dx * dy;
    }
    let (var_x, var_y, cov_xy) = if n > 1 {
        let denominator = (n - 1) as f64;
        (sxx / denominator, syy / denominator, sxy / denominator)
    } else {
        (0.0, 0.0, 0.0)
    };

    let half_trace = (var_x + var_y) / 2.0;
    let discriminant = (((var_x - var_y) / 2.0).powi(2) + cov_xy * cov_xy).max(0.0);
    let root = discriminant.sqrt();
    let eigenvalues = [half_trace + root, half_trace - root];

    let primary = orient_primary(eigenvector(var_x, cov_xy, var_y, eigenvalues[0]), cov_xy);
    let secondary = Vector2::new(-primary.y, primary.x);

    PcaStats {
        count: n,
        mean,
        var_x,
        var_y,
        cov_xy,
        eigenvalues,
        eigenvectors: [primary, secondary],
        orientation: Some(tilt_from_up(primary)),
    }
}

/// [`estimate`] over every set cell of a mask.
pub fn estimate_mask<M: BinaryMask + ?Sized>(mask: &M) -> PcaStats {
    estimate(&mask.set_points())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::raster::ForegroundMask;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn empty_input_has_no_orientation() {
        let stats = estimate(&[]);
        assert_eq!(stats.count, 0);
        assert!(stats.orientation.is_none());
        assert!(stats.centroid().is_none());
    }

    #[test]
    fn single_point_has_zero_spread() {
        let stats = estimate(&[Point::new(3, 4)]);
        assert_eq!(stats.mean, Vector2::new(3.0, 4.0));
        assert_eq!((stats.var_x, stats.var_y, stats.cov_xy), (0.0, 0.0, 0.0));
        assert!(stats.orientation.is_some());
    }

    #[test]
    fn tall_symmetric_shape_points_straight_up() {
        let mask = ForegroundMask::from_fn(20, 40, |x, y| (7..13).contains(&x) && (5..35).contains(&y));
        let stats = estimate_mask(&mask);
        assert!(close(stats.mean.x, 9.5));
        assert!(close(stats.cov_xy, 0.0));
        assert!(stats.eigenvalues[0] > stats.eigenvalues[1]);
        assert_eq!(stats.primary_axis(), Vector2::new(0.0, -1.0));
        let angle = stats.orientation.expect("non-empty");
        assert!(angle.abs() < 1e-9, "angle {angle}");
    }

    #[test]
    fn wide_shape_is_ninety_degrees() {
        let points: Vec<Point> = (0..30).flat_map(|x| (0..4).map(move |y| Point::new(x, y))).collect();
        let stats = estimate(&points);
        assert_eq!(stats.primary_axis(), Vector2::new(1.0, 0.0));
        assert!(close(stats.orientation.expect("non-empty"), 90.0));
    }

    #[test]
    fn diagonal_sign_follows_covariance() {
        // "\" on screen: y grows with x, the axis leans left when pointing up
        let falling: Vec<Point> = (0..10).map(|i| Point::new(i, i)).collect();
        let stats = estimate(&falling);
        assert!(stats.cov_xy > 0.0);
        assert!(stats.primary_axis().x < 0.0 && stats.primary_axis().y < 0.0);
        assert!((stats.orientation.expect("non-empty") + 45.0).abs() < 1e-6);

        // "/" on screen
        let rising: Vec<Point> = (0..10).map(|i| Point::new(i, -i)).collect();
        let stats = estimate(&rising);
        assert!(stats.cov_xy < 0.0);
        assert!((stats.orientation.expect("non-empty") - 45.0).abs() < 1e-6);
    }

    #[test]
    fn eigenvectors_are_orthonormal() {
        let points: Vec<Point> = (0..50).map(|i| Point::new(i % 7 * 3, i / 2 + (i % 5))).collect();
        let stats = estimate(&points);
        let [e0, e1] = stats.eigenvectors;
        assert!(close(e0.length(), 1.0));
        assert!(close(e1.length(), 1.0));
        assert!(e0.dot(e1).abs() < 1e-12);
        assert!(e0.y <= 0.0);
    }
}
