use super::*;
use crate::error::{ConfigError, MesherError};
use crate::samplers::{ConstantDensity, SphereDensity};
use crate::types::{Algorithm, SimplifierSettings};

fn sphere_settings() -> Settings {
  Settings::new().with_units(IVec3::splat(16)).with_resolution(100.0)
}

fn sphere_source(settings: &Settings) -> Arc<dyn DensitySource> {
  Arc::new(SphereDensity::centered(settings.units, 5.0))
}

fn enqueue_sphere(stage: &mut ChunkMeshingStage, slot: IVec3, algorithm: Algorithm) -> u64 {
  let settings = sphere_settings();
  stage.enqueue(
    slot,
    settings,
    ExtractionOptions::new().with_algorithm(algorithm),
    AssemblyOptions::new(),
    sphere_source(&settings),
  )
}

#[test]
fn test_single_request() {
  let mut stage = ChunkMeshingStage::new();

  let id = enqueue_sphere(&mut stage, IVec3::ZERO, Algorithm::Simple);
  assert_eq!(id, 0);
  assert_eq!(stage.pending_count(), 1);

  let processed = stage.tick();
  assert_eq!(processed, 1);
  assert_eq!(stage.pending_count(), 0);
  assert_eq!(stage.completed_count(), 1);

  let completions = stage.drain_completions();
  assert_eq!(completions.len(), 1);
  assert_eq!(completions[0].id, 0);
  let lods = completions[0].lods.as_ref().unwrap();
  assert_eq!(lods.len(), 1);
  assert!(!lods[0].is_empty());
  assert!(stage.is_idle());
}

#[test]
fn test_multiple_requests() {
  let mut stage = ChunkMeshingStage::new();
  let algorithms = [Algorithm::Simple, Algorithm::Dual, Algorithm::Tetrahedral];

  for (x, algorithm) in algorithms.into_iter().enumerate() {
    enqueue_sphere(&mut stage, IVec3::new(x as i32, 0, 0), algorithm);
  }
  assert_eq!(stage.pending_count(), 3);

  assert_eq!(stage.tick(), 3);
  let completions = stage.drain_completions();

  // Collected in request order.
  let ids: Vec<u64> = completions.iter().map(|c| c.id).collect();
  assert_eq!(ids, vec![0, 1, 2]);
  for (x, completion) in completions.iter().enumerate() {
    assert_eq!(completion.slot, IVec3::new(x as i32, 0, 0));
    let lods = completion.lods.as_ref().unwrap();
    assert!(lods[0].triangle_count() > 0);
  }
}

#[test]
fn test_chunks_match_sequential_pipeline() {
  let settings = sphere_settings();
  let source = sphere_source(&settings);
  let assembly = AssemblyOptions::new()
    .with_lod(SimplifierSettings::new())
    .with_lod(SimplifierSettings::new().with_quality(0.5));

  let mut stage = ChunkMeshingStage::new();
  for _ in 0..4 {
    stage.enqueue(
      IVec3::ZERO,
      settings,
      ExtractionOptions::new(),
      assembly.clone(),
      Arc::clone(&source),
    );
  }
  stage.tick();

  let mut control = RunControl::default();
  let mut mesh = extract(&settings, &ExtractionOptions::new(), &*source, &mut control).unwrap();
  let expected = assemble(&settings, &assembly, &*source, &mut mesh, &mut control).unwrap();

  for completion in stage.drain_completions() {
    let lods = completion.lods.unwrap();
    assert_eq!(lods.len(), 2);
    for (lod, reference) in lods.iter().zip(&expected) {
      assert_eq!(lod.positions, reference.positions);
      assert_eq!(lod.indices, reference.indices);
    }
  }
}

#[test]
fn test_failed_chunk_does_not_stop_the_batch() {
  let mut stage = ChunkMeshingStage::new();
  let broken = sphere_settings().with_resolution(0.0);
  stage.enqueue(
    IVec3::ZERO,
    broken,
    ExtractionOptions::new(),
    AssemblyOptions::new(),
    Arc::new(ConstantDensity::new(0.0)),
  );
  enqueue_sphere(&mut stage, IVec3::X, Algorithm::Simple);

  assert_eq!(stage.tick(), 2);
  let completions = stage.drain_completions();
  assert!(matches!(
    completions[0].lods,
    Err(MesherError::Config(ConfigError::ZeroResolution(_)))
  ));
  assert_eq!(completions[0].assemble_time_us, 0);
  assert!(completions[1].lods.is_ok());
}

#[test]
fn test_empty_field_gives_empty_lod() {
  let mut stage = ChunkMeshingStage::new();
  stage.enqueue(
    IVec3::ZERO,
    sphere_settings(),
    ExtractionOptions::new(),
    AssemblyOptions::new(),
    Arc::new(ConstantDensity::new(0.0)),
  );
  stage.tick();

  let completions = stage.drain_completions();
  let lods = completions[0].lods.as_ref().unwrap();
  assert_eq!(lods.len(), 1);
  assert!(lods[0].is_empty());
}

#[test]
fn test_empty_tick() {
  let mut stage = ChunkMeshingStage::new();
  assert!(stage.is_idle());

  assert_eq!(stage.tick(), 0);
  assert!(stage.drain_completions().is_empty());
}

#[test]
fn test_cancel_before_tick_is_cleared() {
  let mut stage = ChunkMeshingStage::new();
  stage.token().cancel();
  enqueue_sphere(&mut stage, IVec3::ZERO, Algorithm::Simple);

  stage.tick();
  assert!(stage.drain_completions()[0].lods.is_ok());
}

#[cfg(feature = "metrics")]
#[test]
fn test_tick_feeds_metrics() {
  let mut stage = ChunkMeshingStage::new();
  enqueue_sphere(&mut stage, IVec3::ZERO, Algorithm::Simple);
  enqueue_sphere(&mut stage, IVec3::X, Algorithm::Dual);
  stage.tick();

  let completions = stage.drain_completions();
  let emitted: u64 = completions
    .iter()
    .map(|c| c.lods.as_ref().unwrap()[0].vertex_count() as u64)
    .sum();

  let metrics = stage.metrics();
  assert_eq!(metrics.total_chunks, 2);
  assert_eq!(metrics.failed_chunks, 0);
  assert_eq!(metrics.total_vertices(), emitted);
  assert_eq!(metrics.extract_timings.len(), 2);
  assert_eq!(metrics.tick_timings.len(), 1);
}
