// THEORY:
// The `raster` module defines every buffer that flows between the stages of the
// engine. It is the bridge between the caller's camera frame and the geometric
// analysis, and its job is to make bad input impossible to carry further.
//
// Key architectural principles:
// 1.  **Validated Input**: A `RasterBuffer` can only be built through `new`, which
//     rejects zero-sized frames, unsupported channel depths, short strides and
//     buffers whose length does not divide into rows. Every later stage can index
//     the buffer without re-checking.
// 2.  **Planes for Intermediates**: Greyscale, blurred, magnitude and angle images
//     are tightly packed `Plane<T>` grids. They are owned by one stage at a time and
//     handed to the next, never shared for writing.
// 3.  **Masks Behind a Trait**: Both the edge mask and the foreground mask answer the
//     same question ("is this cell set?"), so the contour tracer is written once
//     against `BinaryMask` and runs on either.

use crate::core_modules::geometry::{offset, Point};
use crate::core_modules::pixel::pixel::Pixel;
use crate::error::{GeometryError, Result};
use image::{RgbImage, Rgba, RgbaImage};

/// A row-major frame of 3 (RGB) or 4 (RGBA) channel samples with an explicit stride.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterBuffer {
    width: u32,
    height: u32,
    depth: u8,
    stride: usize,
    data: Vec<u8>,
}

impl RasterBuffer {
    /// Validates the dimensions and takes ownership of `data`.
    pub fn new(width: u32, height: u32, depth: u8, stride: usize, data: Vec<u8>) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(GeometryError::ZeroSized { width, height });
        }
        if depth != 3 && depth != 4 {
            return Err(GeometryError::UnsupportedDepth(depth));
        }
        let minimum = width as usize * depth as usize;
        if stride < minimum {
            return Err(GeometryError::InvalidStride { stride, minimum });
        }
        if data.len() % stride != 0 {
            return Err(GeometryError::LengthNotDivisible {
                len: data.len(),
                stride,
            });
        }
        let rows = data.len() / stride;
        if rows != height as usize {
            return Err(GeometryError::SizeMismatch {
                expected: height as usize,
                actual: rows,
            });
        }
        Ok(Self {
            width,
            height,
            depth,
            stride,
            data,
        })
    }

    /// A raster without row padding.
    pub fn packed(width: u32, height: u32, depth: u8, data: Vec<u8>) -> Result<Self> {
        Self::new(width, height, depth, width as usize * depth as usize, data)
    }

    pub fn from_rgba_image(image: &RgbaImage) -> Result<Self> {
        Self::packed(image.width(), image.height(), 4, image.as_raw().clone())
    }

    pub fn from_rgb_image(image: &RgbImage) -> Result<Self> {
        Self::packed(image.width(), image.height(), 3, image.as_raw().clone())
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn depth(&self) -> u8 {
        self.depth
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// The samples of row `y`, without the stride padding.
    pub fn row(&self, y: u32) -> &[u8] {
        let start = y as usize * self.stride;
        &self.data[start..start + self.width as usize * self.depth as usize]
    }

    pub fn pixel(&self, x: u32, y: u32) -> Pixel {
        let depth = self.depth as usize;
        let start = x as usize * depth;
        Pixel::from(&self.row(y)[start..start + depth])
    }

    /// Iterates over the pixels of each row, left to right, top to bottom.
    pub fn pixels(&self) -> impl Iterator<Item = Pixel> + '_ {
        let depth = self.depth as usize;
        (0..self.height).flat_map(move |y| self.row(y).chunks_exact(depth).map(Pixel::from))
    }

    /// Copies the frame into an RGBA image with every pixel fully opaque.
    pub fn to_rgba_image(&self) -> RgbaImage {
        RgbaImage::from_fn(self.width, self.height, |x, y| Rgba(self.pixel(x, y).opaque().into()))
    }
}

/// A tightly packed single-channel grid.
#[derive(Debug, Clone, PartialEq)]
pub struct Plane<T> {
    width: usize,
    height: usize,
    data: Vec<T>,
}

impl<T: Copy + Default> Plane<T> {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![T::default(); width * height],
        }
    }

    pub fn from_vec(width: usize, height: usize, data: Vec<T>) -> Self {
        debug_assert_eq!(data.len(), width * height);
        Self { width, height, data }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> T {
        self.data[offset(x, y, self.width)]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, value: T) {
        let index = offset(x, y, self.width);
        self.data[index] = value;
    }

    pub fn data(&self) -> &[T] {
        &self.data
    }

    pub fn map<U: Copy + Default>(&self, f: impl Fn(T) -> U) -> Plane<U> {
        Plane::from_vec(self.width, self.height, self.data.iter().map(|&v| f(v)).collect())
    }
}

impl Plane<u8> {
    /// Grey debug export; alpha is always fully opaque.
    pub fn to_rgba_image(&self) -> RgbaImage {
        RgbaImage::from_fn(self.width as u32, self.height as u32, |x, y| {
            let v = self.get(x as usize, y as usize);
            Rgba([v, v, v, 255])
        })
    }
}

/// Read access shared by every binary mask in the crate.
pub trait BinaryMask {
    fn width(&self) -> usize;
    fn height(&self) -> usize;
    fn is_set(&self, x: usize, y: usize) -> bool;

    /// Bounds-checked lookup; everything outside the grid is background.
    fn is_set_at(&self, x: i64, y: i64) -> bool {
        if x < 0 || y < 0 || x >= self.width() as i64 || y >= self.height() as i64 {
            return false;
        }
        self.is_set(x as usize, y as usize)
    }

    /// All set cells in raster order.
    fn set_points(&self) -> Vec<Point> {
        let mut points = Vec::new();
        for y in 0..self.height() {
            for x in 0..self.width() {
                if self.is_set(x, y) {
                    points.push(Point::new(x as i32, y as i32));
                }
            }
        }
        points
    }
}

/// Pixels belonging to the hand silhouette.
#[derive(Debug, Clone, PartialEq)]
pub struct ForegroundMask {
    plane: Plane<bool>,
}

impl ForegroundMask {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            plane: Plane::new(width, height),
        }
    }

    /// Marks every pixel with a non-zero colour channel.
    pub fn from_raster(raster: &RasterBuffer) -> Self {
        let data = raster.pixels().map(|p| p.is_foreground()).collect();
        Self {
            plane: Plane::from_vec(raster.width() as usize, raster.height() as usize, data),
        }
    }

    /// A mask with exactly `points` set; points outside the grid are ignored.
    pub fn from_points(width: usize, height: usize, points: &[Point]) -> Self {
        let mut mask = Self::new(width, height);
        for p in points {
            if p.x >= 0 && p.y >= 0 && (p.x as usize) < width && (p.y as usize) < height {
                mask.plane.set(p.x as usize, p.y as usize, true);
            }
        }
        mask
    }

    pub fn from_fn(width: usize, height: usize, f: impl Fn(usize, usize) -> bool) -> Self {
        let mut mask = Self::new(width, height);
        for y in 0..height {
            for x in 0..width {
                if f(x, y) {
                    mask.plane.set(x, y, true);
                }
            }
        }
        mask
    }

    pub fn set(&mut self, x: usize, y: usize, value: bool) {
        self.plane.set(x, y, value);
    }

    pub fn count(&self) -> usize {
        self.plane.data().iter().filter(|&&v| v).count()
    }

    /// Block-reduces the mask by `factor`; a reduced cell is set when any pixel it
    /// covers is set. Partial blocks at the right and bottom edges are kept.
    pub fn downsample(&self, factor: usize) -> ForegroundMask {
        let factor = factor.max(1);
        let width = self.plane.width().div_ceil(factor);
        let height = self.plane.height().div_ceil(factor);
        let mut reduced = ForegroundMask::new(width, height);
        for y in 0..self.plane.height() {
            for x in 0..self.plane.width() {
                if self.plane.get(x, y) {
                    reduced.plane.set(x / factor, y / factor, true);
                }
            }
        }
        reduced
    }
}

impl BinaryMask for ForegroundMask {
    fn width(&self) -> usize {
        self.plane.width()
    }

    fn height(&self) -> usize {
        self.plane.height()
    }

    fn is_set(&self, x: usize, y: usize) -> bool {
        self.plane.get(x, y)
    }
}

/// Per-pixel edge classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EdgeClass {
    #[default]
    None,
    Weak,
    Strong,
}

/// Edge classification grid with the dimensions of its source raster.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeMask {
    plane: Plane<EdgeClass>,
}

impl EdgeMask {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            plane: Plane::new(width, height),
        }
    }

    pub fn class(&self, x: usize, y: usize) -> EdgeClass {
        self.plane.get(x, y)
    }

    pub fn set_class(&mut self, x: usize, y: usize, class: EdgeClass) {
        self.plane.set(x, y, class);
    }

    pub fn edge_count(&self) -> usize {
        self.plane.data().iter().filter(|&&c| c == EdgeClass::Strong).count()
    }

    /// Number of edge pixels in column `x`.
    pub fn column_count(&self, x: usize) -> usize {
        (0..self.plane.height()).filter(|&y| self.class(x, y) == EdgeClass::Strong).count()
    }

    /// Black/white debug export.
    pub fn to_rgba_image(&self) -> RgbaImage {
        self.plane
            .map(|c| if c == EdgeClass::Strong { 255u8 } else { 0u8 })
            .to_rgba_image()
    }
}

impl BinaryMask for EdgeMask {
    fn width(&self) -> usize {
        self.plane.width()
    }

    fn height(&self) -> usize {
        self.plane.height()
    }

    fn is_set(&self, x: usize, y: usize) -> bool {
        self.plane.get(x, y) == EdgeClass::Strong
    }
}
