// THEORY:
// The `ContourTracer` walks the outer boundary of a shape in a binary mask with
// Pavlidis' square tracing. It never looks at more than three cells per step, so a
// walk costs O(boundary) regardless of the shape's area.
//
// Key architectural principles:
// 1.  **Explicit Facing**: The tracer's state is a position plus one of four
//     facings. Turning is +/-1 modulo 4; there is no angle arithmetic.
// 2.  **Three Candidates**: From each cell only the front-left diagonal, the front
//     cell and the front-right diagonal are tested, in that order. Entering the
//     front-left diagonal turns the tracer left; the other two keep its facing.
//     When all three are background the tracer turns right in place, at most three
//     times. A cell with no foreground neighbour in any facing is isolated.
// 3.  **Stateful Termination**: The walk ends when both position AND facing equal
//     the start state. Checking position alone ends thin shapes too early.
// 4.  **Bounded**: A step cap proportional to the mask area stops any walk that
//     fails to close, with a warning instead of a hang.

use crate::core_modules::geometry::Point;
use crate::core_modules::raster::BinaryMask;
use log::warn;

/// One of the four axis-aligned facings. Y grows downward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Facing {
    North,
    East,
    South,
    West,
}

impl Facing {
    pub fn turn_left(self) -> Facing {
        match self {
            Facing::North => Facing::West,
            Facing::West => Facing::South,
            Facing::South => Facing::East,
            Facing::East => Facing::North,
        }
    }

    pub fn turn_right(self) -> Facing {
        match self {
            Facing::North => Facing::East,
            Facing::East => Facing::South,
            Facing::South => Facing::West,
            Facing::West => Facing::North,
        }
    }

    /// Unit step in this facing.
    pub fn delta(self) -> (i32, i32) {
        match self {
            Facing::North => (0, -1),
            Facing::East => (1, 0),
            Facing::South => (0, 1),
            Facing::West => (-1, 0),
        }
    }
}

/// A closed boundary walk.
///
/// The first point is the start point and, unless the start is isolated, the
/// last point is the terminal return to it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ContourPath {
    points: Vec<Point>,
}

impl ContourPath {
    pub fn new(points: Vec<Point>) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Number of steps taken. The terminal return is a step; the start is not.
    pub fn perimeter(&self) -> usize {
        self.points.len().saturating_sub(1)
    }

    /// True when the walk came back to where it started.
    pub fn is_closed(&self) -> bool {
        match (self.points.first(), self.points.last()) {
            (Some(first), Some(last)) => first == last,
            _ => false,
        }
    }
}

/// The first set cell in raster order, facing North.
///
/// Its west and north neighbours are background, so the walk starts on the
/// outer boundary.
pub fn find_start<M: BinaryMask + ?Sized>(mask: &M) -> Option<(Point, Facing)> {
    for y in 0..mask.height() {
        for x in 0..mask.width() {
            if mask.is_set(x, y) {
                return Some((Point::new(x as i32, y as i32), Facing::North));
            }
        }
    }
    None
}

fn is_set<M: BinaryMask + ?Sized>(mask: &M, point: Point, dx: i32, dy: i32) -> bool {
    mask.is_set_at(point.x as i64 + dx as i64, point.y as i64 + dy as i64)
}

/// Traces the boundary containing `start`, beginning in `facing`.
pub fn trace<M: BinaryMask + ?Sized>(mask: &M, start: Point, facing: Facing) -> ContourPath {
    let mut points = vec![start];
    if !mask.is_set_at(start.x as i64, start.y as i64) {
        return ContourPath::new(points);
    }

    let step_cap = 4 * mask.width().max(1) * mask.height().max(1);
    let mut position = start;
    let mut current = facing;
    let mut moved = false;
    let mut steps = 0usize;

    'walk: loop {
        let mut rotations = 0;
        loop {
            let (fx, fy) = current.delta();
            let (lx, ly) = current.turn_left().delta();
            let (rx, ry) = current.turn_right().delta();

            let next = if is_set(mask, position, fx + lx, fy + ly) {
                Some((Point::new(position.x + fx + lx, position.y + fy + ly), current.turn_left()))
            } else if is_set(mask, position, fx, fy) {
                Some((Point::new(position.x + fx, position.y + fy), current))
            } else if is_set(mask, position, fx + rx, fy + ry) {
                Some((Point::new(position.x + fx + rx, position.y + fy + ry), current))
            } else {
                None
            };

            match next {
                Some((point, next_facing)) => {
                    position = point;
                    current = next_facing;
                    moved = true;
                    points.push(point);
                    break;
                }
                None if rotations < 3 => {
                    rotations += 1;
                    current = current.turn_right();
                    if moved && position == start && current == facing {
                        break 'walk;
                    }
                }
                // isolated cell
                None => break 'walk,
            }
        }

        if position == start && current == facing {
            break;
        }
        steps += 1;
        if steps >= step_cap {
            warn!(
                "ContourTracer::trace stopped after {} steps without closing at ({}, {})",
                steps, start.x, start.y
            );
            break;
        }
    }

    ContourPath::new(points)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::raster::ForegroundMask;

    fn rectangle(width: usize, height: usize, x0: usize, y0: usize, x1: usize, y1: usize) -> ForegroundMask {
        ForegroundMask::from_fn(width, height, |x, y| (x0..x1).contains(&x) && (y0..y1).contains(&y))
    }

    #[test]
    fn facing_turns_are_inverse() {
        for facing in [Facing::North, Facing::East, Facing::South, Facing::West] {
            assert_eq!(facing.turn_left().turn_right(), facing);
            assert_eq!(facing.turn_right().turn_right().turn_right().turn_right(), facing);
        }
    }

    #[test]
    fn isolated_pixel_halts_with_single_point() {
        let mask = ForegroundMask::from_points(5, 5, &[Point::new(2, 2)]);
        let (start, facing) = find_start(&mask).expect("one pixel set");
        assert_eq!((start, facing), (Point::new(2, 2), Facing::North));

        let path = trace(&mask, start, facing);
        assert_eq!(path.points(), &[Point::new(2, 2)]);
        assert_eq!(path.perimeter(), 0);
    }

    #[test]
    fn filled_rectangle_walks_its_boundary_once() {
        let (x0, y0, x1, y1) = (4usize, 3usize, 10usize, 8usize);
        let mask = rectangle(15, 12, x0, y0, x1, y1);
        let (start, facing) = find_start(&mask).expect("rectangle present");
        assert_eq!(start, Point::new(4, 3));

        let path = trace(&mask, start, facing);
        let (w, h) = (x1 - x0, y1 - y0);
        assert!(path.is_closed());
        assert_eq!(path.perimeter(), 2 * w + 2 * h - 4);

        for pair in path.points().windows(2) {
            assert!(pair[0].is_8_adjacent(&pair[1]), "{:?} -> {:?}", pair[0], pair[1]);
            assert_ne!(pair[0], pair[1]);
        }
        for p in path.points() {
            let on_boundary =
                p.x == x0 as i32 || p.x == x1 as i32 - 1 || p.y == y0 as i32 || p.y == y1 as i32 - 1;
            assert!(on_boundary, "{p:?} is interior");
        }
        let unique: std::collections::HashSet<_> = path.points().iter().collect();
        assert_eq!(unique.len(), path.perimeter());
    }

    #[test]
    fn thin_line_is_walked_out_and_back() {
        let mask = ForegroundMask::from_points(5, 3, &[Point::new(1, 1), Point::new(2, 1), Point::new(3, 1)]);
        let path = trace(&mask, Point::new(1, 1), Facing::North);
        assert_eq!(
            path.points(),
            &[
                Point::new(1, 1),
                Point::new(2, 1),
                Point::new(3, 1),
                Point::new(2, 1),
                Point::new(1, 1)
            ]
        );
    }

    #[test]
    fn empty_mask_has_no_start() {
        let mask = ForegroundMask::new(4, 4);
        assert!(find_start(&mask).is_none());
    }

    #[test]
    fn diagonal_staircase_stays_eight_connected() {
        let points: Vec<Point> = (0..6).map(|i| Point::new(i + 1, i + 1)).collect();
        let mask = ForegroundMask::from_points(9, 9, &points);
        let (start, facing) = find_start(&mask).expect("staircase present");
        let path = trace(&mask, start, facing);
        assert!(path.is_closed());
        assert!(path.points().windows(2).all(|w| w[0].is_8_adjacent(&w[1])));
        for p in &points {
            assert!(path.points().contains(p));
        }
    }
}
