// THEORY:
// All tunable behaviour of the engine is gathered into `PipelineConfig`. Every
// section has defaults matching the reference behaviour, so an empty JSON object is
// a valid configuration and a caller only spells out what it wants to change.
// Values are validated once, before the first frame, so the stages themselves can
// assume sane parameters.

use crate::error::{GeometryError, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Parameters of the Canny-style edge detector.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EdgeConfig {
    /// Side of the square Gaussian kernel. Must be odd and at least 3.
    pub kernel_size: usize,
    /// Standard deviation of the Gaussian.
    pub sigma: f64,
    /// High threshold as a fraction of the Otsu threshold.
    pub high_ratio: f64,
    /// Low threshold as a fraction of the high threshold.
    pub low_ratio: f64,
}

impl Default for EdgeConfig {
    fn default() -> Self {
        Self {
            kernel_size: 5,
            sigma: 1.0,
            high_ratio: 0.4,
            low_ratio: 0.5,
        }
    }
}

impl EdgeConfig {
    pub fn validate(&self) -> Result<()> {
        if self.kernel_size < 3 || self.kernel_size % 2 == 0 {
            return Err(GeometryError::InvalidConfig(format!(
                "kernel_size must be odd and >= 3, got {}",
                self.kernel_size
            )));
        }
        if !(self.sigma > 0.0) {
            return Err(GeometryError::InvalidConfig(format!("sigma must be positive, got {}", self.sigma)));
        }
        for (name, ratio) in [("high_ratio", self.high_ratio), ("low_ratio", self.low_ratio)] {
            if !(ratio > 0.0 && ratio <= 1.0) {
                return Err(GeometryError::InvalidConfig(format!("{name} must be in (0, 1], got {ratio}")));
            }
        }
        Ok(())
    }

    /// Pixels closer than this to the border are never classified as edges.
    pub fn border_margin(&self) -> usize {
        self.kernel_size / 2 + 1
    }
}

/// Parameters of the snake relaxation used to find convexity defects.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DefectConfig {
    /// Block size used to reduce the foreground mask before relaxation.
    pub downsample_factor: usize,
    /// Approximate distance between control points, in reduced cells.
    pub spacing: f64,
    /// Initial inward offset of the control points from the hull edge, in reduced cells.
    pub normal_offset: f64,
    /// Distance a free control point moves per iteration, in reduced cells.
    pub step: f64,
    /// Defects shallower than this (full-resolution pixels) are discarded.
    pub min_defect_depth: f64,
}

impl Default for DefectConfig {
    fn default() -> Self {
        Self {
            downsample_factor: 2,
            spacing: 2.0,
            normal_offset: 1.0,
            step: 0.5,
            min_defect_depth: 5.0,
        }
    }
}

impl DefectConfig {
    pub fn validate(&self) -> Result<()> {
        if self.downsample_factor == 0 {
            return Err(GeometryError::InvalidConfig("downsample_factor must be >= 1".into()));
        }
        for (name, value) in [
            ("spacing", self.spacing),
            ("normal_offset", self.normal_offset),
            ("step", self.step),
        ] {
            if !(value > 0.0) {
                return Err(GeometryError::InvalidConfig(format!("{name} must be positive, got {value}")));
            }
        }
        if self.min_defect_depth < 0.0 {
            return Err(GeometryError::InvalidConfig("min_defect_depth must not be negative".into()));
        }
        Ok(())
    }
}

/// Configuration for the `HandPipeline` and `ParallelPipeline`.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub edge: EdgeConfig,
    pub defect: DefectConfig,
    /// Worker tasks in the parallel pipeline; 0 means one per CPU.
    pub worker_count: usize,
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<()> {
        self.edge.validate()?;
        self.defect.validate()
    }

    pub fn effective_worker_count(&self) -> usize {
        if self.worker_count == 0 {
            num_cpus::get().max(1)
        } else {
            self.worker_count
        }
    }
}

/// Reads and validates a JSON configuration file.
pub fn load_config(path: &Path) -> Result<PipelineConfig> {
    let data = fs::read_to_string(path).map_err(|e| GeometryError::Config {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    let config = parse_config(&data).map_err(|e| match e {
        GeometryError::InvalidConfig(reason) => GeometryError::Config {
            path: path.display().to_string(),
            reason,
        },
        other => other,
    })?;
    Ok(config)
}

/// Parses and validates a JSON configuration string.
pub fn parse_config(json: &str) -> Result<PipelineConfig> {
    let config: PipelineConfig =
        serde_json::from_str(json).map_err(|e| GeometryError::InvalidConfig(e.to_string()))?;
    config.validate()?;
    Ok(config)
}
