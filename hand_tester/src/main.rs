use anyhow::{Context, Result};
use clap::Parser;
use futures::future::join_all;
use hand_geometry::core_modules::edge_detector::EdgeDetector;
use hand_geometry::{
    load_config, HandGeometry, HandPipeline, ParallelPipeline, PipelineConfig, Point, RasterBuffer,
};
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder, Rgba, RgbaImage};
use log::info;
use std::fs::File;
use std::path::{Path, PathBuf};

const CONTOUR: Rgba<u8> = Rgba([0, 255, 0, 255]);
const HULL: Rgba<u8> = Rgba([0, 128, 255, 255]);
const DEFECT: Rgba<u8> = Rgba([255, 0, 0, 255]);
const AXIS: Rgba<u8> = Rgba([255, 255, 0, 255]);

#[derive(Parser)]
#[command(name = "hand_tester")]
#[command(about = "Run the hand geometry pipeline on a segmented still frame")]
#[command(version)]
struct Cli {
    /// Path to the segmented input image (non-hand pixels black).
    input: PathBuf,

    /// Path to write the annotated overlay (PNG).
    #[arg(long)]
    overlay: Option<PathBuf>,

    /// Path to write the raw edge mask (PNG).
    #[arg(long)]
    edges: Option<PathBuf>,

    /// Pipeline configuration (JSON). Defaults are used when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Also push this many copies of the frame through the parallel pipeline.
    #[arg(long, default_value_t = 0)]
    repeat: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    // --- 1. Setup ---
    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => PipelineConfig::default(),
    };
    let image = image::open(&cli.input)
        .with_context(|| format!("failed to open image {}", cli.input.display()))?;
    let raster = if image.color().has_alpha() {
        RasterBuffer::from_rgba_image(&image.to_rgba8())?
    } else {
        RasterBuffer::from_rgb_image(&image.to_rgb8())?
    };
    info!("Loaded {} ({}x{})", cli.input.display(), raster.width(), raster.height());

    // --- 2. Single Frame ---
    let pipeline = HandPipeline::new(config.clone())?;
    let geometry = pipeline.process_frame(&raster).await?;
    report(&geometry);

    if let Some(path) = &cli.edges {
        let edges = EdgeDetector::new(config.edge.clone())?.find_edges(&raster);
        save_png(path, &edges.to_rgba_image())?;
        info!("Edge mask written to {}", path.display());
    }

    if let Some(path) = &cli.overlay {
        let mut overlay = raster.to_rgba_image();
        draw_geometry(&mut overlay, &geometry);
        save_png(path, &overlay)?;
        info!("Overlay written to {}", path.display());
    }

    // --- 3. Throughput ---
    if cli.repeat > 0 {
        let parallel = ParallelPipeline::new(config)?;
        let frames = (0..cli.repeat).map(|_| parallel.process_frame(raster.clone()));
        let started = std::time::Instant::now();
        let results = join_all(frames).await;
        let mut worker_time = std::time::Duration::ZERO;
        for result in results {
            let analysis = result?;
            anyhow::ensure!(analysis.geometry == geometry, "frame {} differs", analysis.frame_id);
            worker_time += analysis.elapsed;
        }
        info!(
            "{} frames on {} workers in {:?} (worker time {:?})",
            cli.repeat,
            parallel.worker_count(),
            started.elapsed(),
            worker_time
        );
        parallel.shutdown().await?;
    }

    Ok(())
}

fn report(geometry: &HandGeometry) {
    let Some(label) = geometry.region_label else {
        info!("No hand found");
        return;
    };
    info!(
        "Hand region #{}: contour {} steps, hull {} vertices",
        label,
        geometry.contour.perimeter(),
        geometry.hull.len()
    );
    for (i, defect) in geometry.defects_by_depth().iter().enumerate() {
        info!(
            "  defect {}: ({}, {}) -> ({}, {}), deepest ({}, {}), depth {:.1}",
            i,
            defect.start_point.x,
            defect.start_point.y,
            defect.end_point.x,
            defect.end_point.y,
            defect.deepest_point.x,
            defect.deepest_point.y,
            defect.distance
        );
    }
    if let (Some(centroid), Some(angle)) = (geometry.pca.centroid(), geometry.pca.orientation) {
        info!("Centroid ({:.1}, {:.1}), orientation {:.1} deg", centroid.x, centroid.y, angle);
    }
}

fn put(image: &mut RgbaImage, x: i32, y: i32, color: Rgba<u8>) {
    if x >= 0 && y >= 0 && (x as u32) < image.width() && (y as u32) < image.height() {
        image.put_pixel(x as u32, y as u32, color);
    }
}

/// Bresenham line.
fn draw_line(image: &mut RgbaImage, from: Point, to: Point, color: Rgba<u8>) {
    let (dx, dy) = ((to.x - from.x).abs(), -(to.y - from.y).abs());
    let (sx, sy) = (if from.x < to.x { 1 } else { -1 }, if from.y < to.y { 1 } else { -1 });
    let (mut x, mut y, mut err) = (from.x, from.y, dx + dy);
    loop {
        put(image, x, y, color);
        if x == to.x && y == to.y {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
}

fn draw_cross(image: &mut RgbaImage, at: Point, radius: i32, color: Rgba<u8>) {
    for d in -radius..=radius {
        put(image, at.x + d, at.y, color);
        put(image, at.x, at.y + d, color);
    }
}

fn draw_geometry(image: &mut RgbaImage, geometry: &HandGeometry) {
    for p in geometry.contour.points() {
        put(image, p.x, p.y, CONTOUR);
    }
    for (a, b) in geometry.hull.edges() {
        draw_line(image, a, b, HULL);
    }
    for defect in &geometry.defects {
        draw_cross(image, defect.deepest_point, 3, DEFECT);
    }
    if let Some(centroid) = geometry.pca.centroid() {
        let axis = geometry.pca.primary_axis();
        let length = geometry.pca.eigenvalues[0].max(0.0).sqrt() * 2.0;
        draw_line(image, centroid.round(), (centroid + axis * length).round(), AXIS);
        draw_cross(image, centroid.round(), 2, AXIS);
    }
}

fn save_png(path: &Path, image: &RgbaImage) -> Result<()> {
    let output = File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    PngEncoder::new(output).write_image(image.as_raw(), image.width(), image.height(), ExtendedColorType::Rgba8)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_reaches_both_endpoints() {
        let mut image = RgbaImage::new(10, 10);
        draw_line(&mut image, Point::new(1, 8), Point::new(7, 2), HULL);
        assert_eq!(*image.get_pixel(1, 8), HULL);
        assert_eq!(*image.get_pixel(7, 2), HULL);
        assert_eq!(*image.get_pixel(4, 5), HULL);
    }

    #[test]
    fn drawing_clips_to_the_image() {
        let mut image = RgbaImage::new(4, 4);
        draw_cross(&mut image, Point::new(0, 0), 3, DEFECT);
        assert_eq!(*image.get_pixel(3, 0), DEFECT);
        assert_eq!(*image.get_pixel(1, 1), Rgba([0, 0, 0, 0]));
    }
}
