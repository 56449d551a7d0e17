//! Job description parsing.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Deserialize;
use voxel_mesher::samplers::{ConstantDensity, PlaneDensity, SingleVoxelDensity, SphereDensity};
use voxel_mesher::{AssemblyOptions, DensitySource, ExtractionOptions, Settings, SimplifierSettings};

/// One meshing job: a chunk grid, a density shape and the pipeline options.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct JobConfig {
  pub settings: Settings,
  pub extraction: ExtractionOptions,
  pub assembly: AssemblyOptions,
  /// LOD chain; takes precedence over `assembly.lods` when non-empty.
  pub lods: Vec<SimplifierSettings>,
  pub shape: ShapeConfig,
}

/// Built-in density shape, selected by `kind`.
#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ShapeConfig {
  Sphere(SphereDensity),
  Plane(PlaneDensity),
  SingleVoxel(SingleVoxelDensity),
  Constant(ConstantDensity),
}

impl Default for ShapeConfig {
  fn default() -> Self {
    Self::Sphere(SphereDensity::default())
  }
}

impl ShapeConfig {
  pub fn into_source(self) -> Arc<dyn DensitySource> {
    match self {
      Self::Sphere(sphere) => Arc::new(sphere),
      Self::Plane(plane) => Arc::new(plane),
      Self::SingleVoxel(voxel) => Arc::new(voxel),
      Self::Constant(constant) => Arc::new(constant),
    }
  }
}

impl JobConfig {
  /// Load and validate a job from a TOML file.
  pub fn load(path: &Path) -> Result<Self> {
    let content = std::fs::read_to_string(path)
      .with_context(|| format!("Failed to read job file: {}", path.display()))?;
    Self::parse(&content).with_context(|| format!("Invalid job file: {}", path.display()))
  }

  /// Parse and validate a job from TOML text.
  pub fn parse(content: &str) -> Result<Self> {
    let mut config: JobConfig = toml::from_str(content).context("Failed to parse job TOML")?;
    if !config.lods.is_empty() {
      config.assembly.lods = std::mem::take(&mut config.lods);
    }

    config.settings.validate()?;
    config.assembly.validate()?;

    Ok(config)
  }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;
