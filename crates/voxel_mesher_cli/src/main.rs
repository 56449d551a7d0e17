//! Batch front end for voxel_mesher.
//!
//! Reads a TOML job, extracts one chunk from a built-in density shape,
//! assembles every LOD and writes `lod<N>.obj` per LOD into the output
//! directory.

mod config;
mod obj;

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use log::{info, warn};
use voxel_mesher::{assemble, extract, Algorithm, RunControl};

use config::JobConfig;

/// Iso-surface mesher for voxel density fields.
#[derive(Parser, Debug)]
#[command(name = "mesh_voxels")]
#[command(about = "Extracts and simplifies a voxel chunk into Wavefront OBJ files")]
struct Args {
  /// Path to the job TOML file.
  #[arg(short, long)]
  config: PathBuf,

  /// Directory receiving one OBJ per LOD.
  #[arg(short, long, default_value = "out")]
  output: PathBuf,

  /// Override the extraction algorithm from the job file.
  #[arg(short, long, value_enum)]
  algorithm: Option<AlgorithmArg>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum AlgorithmArg {
  Simple,
  Dual,
  Tetrahedral,
}

impl From<AlgorithmArg> for Algorithm {
  fn from(arg: AlgorithmArg) -> Self {
    match arg {
      AlgorithmArg::Simple => Algorithm::Simple,
      AlgorithmArg::Dual => Algorithm::Dual,
      AlgorithmArg::Tetrahedral => Algorithm::Tetrahedral,
    }
  }
}

fn main() -> Result<()> {
  env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
  let args = Args::parse();

  info!("Loading job from: {}", args.config.display());
  let mut job = JobConfig::load(&args.config)?;
  if let Some(algorithm) = args.algorithm {
    job.extraction.algorithm = algorithm.into();
  }

  if args.output.is_file() {
    anyhow::bail!("Output path is a file: {}", args.output.display());
  }
  std::fs::create_dir_all(&args.output)
    .with_context(|| format!("Failed to create output dir: {}", args.output.display()))?;

  let settings = job.settings;
  let source = job.shape.into_source();
  let mut control = RunControl::default();

  info!(
    "Extracting {}x{}x{} voxels with {:?}",
    settings.units.x, settings.units.y, settings.units.z, job.extraction.algorithm
  );
  let start = Instant::now();
  let mut mesh = extract(&settings, &job.extraction, &*source, &mut control)?;
  info!(
    "Extracted {} vertices, {} triangles in {:.1} ms",
    mesh.vertex_count(),
    mesh.triangle_count(),
    start.elapsed().as_secs_f64() * 1000.0
  );

  let start = Instant::now();
  let lods = assemble(&settings, &job.assembly, &*source, &mut mesh, &mut control)?;
  info!(
    "Assembled {} LODs in {:.1} ms",
    lods.len(),
    start.elapsed().as_secs_f64() * 1000.0
  );

  for (index, lod) in lods.iter().enumerate() {
    let path = args.output.join(format!("lod{index}.obj"));
    if lod.is_empty() {
      warn!("LOD {index} is empty");
    }
    obj::write_obj(lod, &path, !settings.inverted)?;
    info!(
      "  lod{index}: {} vertices, {} triangles -> {}",
      lod.vertex_count(),
      lod.triangle_count(),
      path.display()
    );
  }

  info!("Done! Output written to: {}", args.output.display());
  Ok(())
}
