// THEORY:
// The `EdgeDetector` turns a segmented hand frame into a thin, connected edge mask.
// It is a Canny-style chain in which every step consumes the previous step's output
// and nothing else:
//
// 1.  **Greyscale**: Rec. 601 luminance per pixel; opacity plays no part.
// 2.  **Gaussian Blur**: An integer kernel built from `sigma`. The continuous kernel
//     is rescaled so its smallest weight becomes 1, which keeps the convolution in
//     integer arithmetic. Pixels within the kernel radius of the border are copied
//     through untouched (no wraparound, no reflection).
// 3.  **Gradient**: Fixed 3x3 Sobel kernels give magnitude and an undirected angle
//     in [0, 180) degrees.
// 4.  **Non-Maximum Suppression**: Each pixel is compared with its two neighbours
//     along its quantised gradient direction and dropped unless it is the local
//     ridge. On an exact tie the earlier pixel in raster order keeps the ridge, so
//     a symmetric step produces a single-pixel line.
// 5.  **Dual Threshold**: Otsu's method over the surviving magnitudes picks the
//     global cutoff; the high and low thresholds are fractions of it.
// 6.  **Hysteresis**: Weak pixels survive only when 8-connected to a strong one.
//     The walk is iterative with an explicit stack and a visited grid.
//
// Pixels within `EdgeConfig::border_margin` of the border are never edges.

use crate::config::EdgeConfig;
use crate::core_modules::geometry::{shifted, Histogram, NEIGHBOUR_OFFSETS};
use crate::core_modules::raster::{BinaryMask, EdgeClass, EdgeMask, Plane, RasterBuffer};
use crate::error::Result;
use log::debug;

/// Per-pixel gradient direction in degrees, [0, 180).
pub type GradientAngleMap = Plane<f32>;

const SOBEL_X: [[i32; 3]; 3] = [[-1, 0, 1], [-2, 0, 2], [-1, 0, 1]];
const SOBEL_Y: [[i32; 3]; 3] = [[-1, -2, -1], [0, 0, 0], [1, 2, 1]];

/// Upper bound on the centre weight of an integer kernel. Wide kernels with a
/// small sigma would otherwise need weights far beyond this.
const MAX_KERNEL_WEIGHT: f64 = u32::MAX as f64;

/// An integer-approximated, square Gaussian kernel.
#[derive(Debug, Clone, PartialEq)]
pub struct GaussianKernel {
    size: usize,
    weights: Vec<u64>,
    sum: u64,
}

impl GaussianKernel {
    /// Builds a `size` x `size` kernel. `size` must be odd.
    pub fn new(size: usize, sigma: f64) -> Self {
        let radius = (size / 2) as i64;
        let two_sigma_sq = 2.0 * sigma * sigma;
        let normaliser = 1.0 / (std::f64::consts::PI * two_sigma_sq);

        let continuous: Vec<f64> = (-radius..=radius)
            .flat_map(|dy| (-radius..=radius).map(move |dx| (dx, dy)))
            .map(|(dx, dy)| normaliser * (-((dx * dx + dy * dy) as f64) / two_sigma_sq).exp())
            .collect();

        let min = continuous.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = continuous.iter().cloned().fold(0.0, f64::max);
        let mut scale = if min > 0.0 && min < 1.0 { 1.0 / min } else { 1.0 };
        if max * scale > MAX_KERNEL_WEIGHT {
            // corners round to zero instead of the centre overflowing
            scale = MAX_KERNEL_WEIGHT / max;
        }
        let mut weights: Vec<u64> = continuous.iter().map(|v| (v * scale).round() as u64).collect();
        let mut sum: u64 = weights.iter().sum();
        if sum == 0 {
            // every weight rounded away; fall back to the identity kernel
            weights[continuous.len() / 2] = 1;
            sum = 1;
        }

        Self { size, weights, sum }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn radius(&self) -> usize {
        self.size / 2
    }

    pub fn weight(&self, kx: usize, ky: usize) -> u64 {
        self.weights[ky * self.size + kx]
    }

    pub fn sum(&self) -> u64 {
        self.sum
    }
}

/// Sobel output: magnitude and undirected angle planes.
#[derive(Debug, Clone)]
pub struct Gradient {
    pub magnitude: Plane<f32>,
    pub angle: GradientAngleMap,
}

/// The thresholds chosen for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    pub otsu: f32,
    pub high: f32,
    pub low: f32,
}

/// Step 1: luminance plane.
pub fn greyscale(raster: &RasterBuffer) -> Plane<u8> {
    let data = raster.pixels().map(|p| p.grey()).collect();
    Plane::from_vec(raster.width() as usize, raster.height() as usize, data)
}

/// Step 2: integer Gaussian convolution; the border band is copied unmodified.
pub fn blur(source: &Plane<u8>, kernel: &GaussianKernel) -> Plane<u8> {
    let (width, height) = (source.width(), source.height());
    let radius = kernel.radius();
    let mut output = source.clone();
    if width <= 2 * radius || height <= 2 * radius {
        return output;
    }

    for y in radius..height - radius {
        for x in radius..width - radius {
            let mut acc: u64 = 0;
            for ky in 0..kernel.size() {
                for kx in 0..kernel.size() {
                    let sample = source.get(x + kx - radius, y + ky - radius) as u64;
                    acc += sample * kernel.weight(kx, ky);
                }
            }
            output.set(x, y, (acc / kernel.sum()).min(255) as u8);
        }
    }
    output
}

/// Undirected gradient angle in degrees, 90 when `gx` is zero.
fn gradient_angle(gx: f32, gy: f32) -> f32 {
    if gx == 0.0 {
        return 90.0;
    }
    let degrees = (gy / gx).atan().to_degrees();
    if degrees < 0.0 { degrees + 180.0 } else { degrees }
}

/// Step 3: Sobel gradient over the interior `margin` band.
pub fn sobel(source: &Plane<u8>, margin: usize) -> Gradient {
    let (width, height) = (source.width(), source.height());
    let mut magnitude = Plane::new(width, height);
    let mut angle = Plane::new(width, height);
    let margin = margin.max(1);
    if width <= 2 * margin || height <= 2 * margin {
        return Gradient { magnitude, angle };
    }

    for y in margin..height - margin {
        for x in margin..width - margin {
            let mut gx = 0i32;
            let mut gy = 0i32;
            for (ky, (row_x, row_y)) in SOBEL_X.iter().zip(SOBEL_Y.iter()).enumerate() {
                for kx in 0..3 {
                    let sample = source.get(x + kx - 1, y + ky - 1) as i32;
                    gx += row_x[kx] * sample;
                    gy += row_y[kx] * sample;
                }
            }
            let (gx, gy) = (gx as f32, gy as f32);
            magnitude.set(x, y, (gx * gx + gy * gy).sqrt());
            angle.set(x, y, gradient_angle(gx, gy));
        }
    }
    Gradient { magnitude, angle }
}

/// The two neighbours along the quantised gradient direction, earlier-in-raster first.
fn band_neighbours(angle: f32) -> [(i32, i32); 2] {
    if angle <= 22.5 || angle > 157.5 {
        [(-1, 0), (1, 0)]
    } else if angle <= 67.5 {
        [(-1, -1), (1, 1)]
    } else if angle <= 112.5 {
        [(0, -1), (0, 1)]
    } else {
        [(1, -1), (-1, 1)]
    }
}

/// Step 4: keeps only ridge pixels of the magnitude plane.
pub fn suppress_non_maxima(gradient: &Gradient, margin: usize) -> Plane<f32> {
    let magnitude = &gradient.magnitude;
    let (width, height) = (magnitude.width(), magnitude.height());
    let mut output = Plane::new(width, height);
    let margin = margin.max(1);
    if width <= 2 * margin || height <= 2 * margin {
        return output;
    }

    for y in margin..height - margin {
        for x in margin..width - margin {
            let value = magnitude.get(x, y);
            let [(bx, by), (ax, ay)] = band_neighbours(gradient.angle.get(x, y));
            let before = magnitude.get((x as i32 + bx) as usize, (y as i32 + by) as usize);
            let after = magnitude.get((x as i32 + ax) as usize, (y as i32 + ay) as usize);
            if value > before && value >= after {
                output.set(x, y, value);
            }
        }
    }
    output
}

#[inline]
fn histogram_bin(magnitude: f32) -> u8 {
    magnitude.round().clamp(0.0, 255.0) as u8
}

/// Step 5: Otsu-derived dual threshold over the surviving magnitudes.
pub fn classify(suppressed: &Plane<f32>, high_ratio: f64, low_ratio: f64) -> (EdgeMask, Thresholds) {
    let survivors = suppressed.data().iter().filter(|&&m| m > 0.0);
    let histogram = Histogram::from_values(survivors.map(|&m| histogram_bin(m)));
    let otsu = histogram.otsu_threshold() as f32;
    let high = otsu * high_ratio as f32;
    let low = high * low_ratio as f32;

    let (width, height) = (suppressed.width(), suppressed.height());
    let mut mask = EdgeMask::new(width, height);
    for y in 0..height {
        for x in 0..width {
            let value = suppressed.get(x, y);
            if value <= 0.0 {
                continue;
            }
            let value = value.min(255.0);
            let class = if value >= high {
                EdgeClass::Strong
            } else if value >= low {
                EdgeClass::Weak
            } else {
                EdgeClass::None
            };
            mask.set_class(x, y, class);
        }
    }
    (mask, Thresholds { otsu, high, low })
}

/// Step 6: promotes weak pixels 8-connected to a strong one.
pub fn link_hysteresis(classified: &EdgeMask) -> EdgeMask {
    let (width, height) = (classified.width(), classified.height());
    let mut linked = EdgeMask::new(width, height);
    let mut visited = vec![false; width * height];
    let mut stack: Vec<(usize, usize)> = Vec::new();

    for y in 0..height {
        for x in 0..width {
            if visited[y * width + x] || classified.class(x, y) != EdgeClass::Strong {
                continue;
            }
            visited[y * width + x] = true;
            linked.set_class(x, y, EdgeClass::Strong);
            stack.push((x, y));

            while let Some((cx, cy)) = stack.pop() {
                for (dx, dy) in NEIGHBOUR_OFFSETS {
                    let Some((nx, ny)) = shifted(cx, cy, dx, dy, width, height) else {
                        continue;
                    };
                    let index = ny * width + nx;
                    if visited[index] || classified.class(nx, ny) == EdgeClass::None {
                        continue;
                    }
                    visited[index] = true;
                    linked.set_class(nx, ny, EdgeClass::Strong);
                    stack.push((nx, ny));
                }
            }
        }
    }
    linked
}

/// Canny-style edge detector for segmented hand frames.
#[derive(Debug, Clone)]
pub struct EdgeDetector {
    config: EdgeConfig,
    kernel: GaussianKernel,
}

impl EdgeDetector {
    pub fn new(config: EdgeConfig) -> Result<Self> {
        config.validate()?;
        let kernel = GaussianKernel::new(config.kernel_size, config.sigma);
        Ok(Self { config, kernel })
    }

    pub fn kernel(&self) -> &GaussianKernel {
        &self.kernel
    }

    /// Runs the whole chain on one frame.
    pub fn find_edges(&self, raster: &RasterBuffer) -> EdgeMask {
        let margin = self.config.border_margin();
        let grey = greyscale(raster);
        let blurred = blur(&grey, &self.kernel);
        let gradient = sobel(&blurred, margin);
        let suppressed = suppress_non_maxima(&gradient, margin);
        let (classified, thresholds) = classify(&suppressed, self.config.high_ratio, self.config.low_ratio);
        let edges = link_hysteresis(&classified);
        debug!(
            "EdgeDetector::find_edges {}x{} otsu={} high={} low={} edges={}",
            raster.width(),
            raster.height(),
            thresholds.otsu,
            thresholds.high,
            thresholds.low,
            edges.edge_count()
        );
        edges
    }
}
