// THEORY:
// The `region` module splits a foreground mask into its 8-connected components so
// the pipeline can pick the hand (the largest one) and ignore specks left over by
// the segmentation.
//
// Key architectural principles:
// 1.  **Explicit Label Source**: Labels come from a `LabelAllocator` the caller owns
//     and passes in. A fresh allocator per frame means labels restart every frame
//     and nothing is shared between frames or threads.
// 2.  **Iterative Growth**: Regions are grown with an explicit stack and a visited
//     grid, so a large hand cannot overflow the call stack.
// 3.  **Stateless Utility**: `label_regions` has no memory of previous calls.

use crate::core_modules::geometry::{offset, shifted, Point, NEIGHBOUR_OFFSETS};
use crate::core_modules::raster::{BinaryMask, ForegroundMask};

pub mod region {
    use super::*;

    /// A per-frame region label. Labels start at 1.
    pub type Label = u32;

    /// Hands out increasing region labels.
    #[derive(Debug, Clone)]
    pub struct LabelAllocator {
        next: Label,
    }

    impl Default for LabelAllocator {
        fn default() -> Self {
            Self { next: 1 }
        }
    }

    impl LabelAllocator {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn allocate(&mut self) -> Label {
            let label = self.next;
            self.next += 1;
            label
        }

        /// Number of labels handed out so far.
        pub fn issued(&self) -> u32 {
            self.next - 1
        }
    }

    /// Inclusive pixel bounds.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct BoundingBox {
        pub min: Point,
        pub max: Point,
    }

    impl BoundingBox {
        pub fn contains(&self, p: Point) -> bool {
            p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
        }

        /// The box grown by `margin` pixels on every side.
        pub fn grown(&self, margin: i32) -> BoundingBox {
            BoundingBox {
                min: Point::new(self.min.x - margin, self.min.y - margin),
                max: Point::new(self.max.x + margin, self.max.y + margin),
            }
        }

        pub fn width(&self) -> u32 {
            (self.max.x - self.min.x + 1) as u32
        }

        pub fn height(&self) -> u32 {
            (self.max.y - self.min.y + 1) as u32
        }
    }

    /// One 8-connected component of a mask.
    #[derive(Debug, Clone, PartialEq)]
    pub struct Region {
        pub label: Label,
        /// Member pixels, in the order the fill reached them.
        pub pixels: Vec<Point>,
        pub bounding_box: BoundingBox,
        /// The member that comes first in raster order; the fill's seed.
        pub first: Point,
    }

    impl Region {
        pub fn area(&self) -> usize {
            self.pixels.len()
        }

        /// A mask of the given size with only this region set.
        pub fn to_mask(&self, width: usize, height: usize) -> ForegroundMask {
            ForegroundMask::from_points(width, height, &self.pixels)
        }
    }

    /// Labels every 8-connected component of `mask`, in raster order of their seeds.
    pub fn label_regions<M: BinaryMask + ?Sized>(mask: &M, labels: &mut LabelAllocator) -> Vec<Region> {
        let (width, height) = (mask.width(), mask.height());
        let mut visited = vec![false; width * height];
        let mut regions = Vec::new();

        for y in 0..height {
            for x in 0..width {
                if visited[offset(x, y, width)] || !mask.is_set(x, y) {
                    continue;
                }
                regions.push(grow_region(mask, &mut visited, x, y, labels.allocate()));
            }
        }
        regions
    }

    fn grow_region<M: BinaryMask + ?Sized>(
        mask: &M,
        visited: &mut [bool],
        seed_x: usize,
        seed_y: usize,
        label: Label,
    ) -> Region {
        let (width, height) = (mask.width(), mask.height());
        let seed = Point::new(seed_x as i32, seed_y as i32);
        let mut pixels = Vec::new();
        let mut bounds = BoundingBox { min: seed, max: seed };
        let mut stack = vec![(seed_x, seed_y)];
        visited[offset(seed_x, seed_y, width)] = true;

        while let Some((x, y)) = stack.pop() {
            let p = Point::new(x as i32, y as i32);
            bounds.min = Point::new(bounds.min.x.min(p.x), bounds.min.y.min(p.y));
            bounds.max = Point::new(bounds.max.x.max(p.x), bounds.max.y.max(p.y));
            pixels.push(p);

            for (dx, dy) in NEIGHBOUR_OFFSETS {
                let Some((nx, ny)) = shifted(x, y, dx, dy, width, height) else {
                    continue;
                };
                let index = offset(nx, ny, width);
                if !visited[index] && mask.is_set(nx, ny) {
                    visited[index] = true;
                    stack.push((nx, ny));
                }
            }
        }

        Region {
            label,
            pixels,
            bounding_box: bounds,
            first: seed,
        }
    }

    /// The region with the most pixels; the lowest label wins a tie.
    pub fn largest_region(regions: &[Region]) -> Option<&Region> {
        regions.iter().fold(None, |best: Option<&Region>, r| match best {
            Some(b) if b.area() >= r.area() => Some(b),
            _ => Some(r),
        })
    }

}
