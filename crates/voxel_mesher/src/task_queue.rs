//! Batch stage for meshing many chunks at once.
//!
//! Enqueue → Tick → Completions. Every chunk gets its own density cache and
//! mesh, so a tick fans the pending requests out over rayon with nothing
//! shared but the density sources and the stage's cancellation token.
//!
//! ```text
//! enqueue(slot, ..) ─► pending ─► tick() ─► par_iter: extract ─► assemble
//!                                                            │
//!                          drain_completions() ◄── completed ◄┘
//! ```

use std::sync::Arc;

use glam::IVec3;
use rayon::prelude::*;
use tracing::{debug, debug_span, warn};
use web_time::Instant;

use crate::assemble::assemble;
use crate::control::{CancellationToken, RunControl};
use crate::density::DensitySource;
use crate::error::Result;
use crate::extract::extract;
use crate::metrics::MeshingMetrics;
use crate::types::{AssemblyOptions, ExtractionOptions, MeshData, Settings};

/// One chunk waiting to be meshed.
#[derive(Clone)]
pub struct ChunkRequest {
  /// Unique identifier for this request
  pub id: u64,
  /// Chunk slot in the world grid
  pub slot: IVec3,
  pub settings: Settings,
  pub extraction: ExtractionOptions,
  pub assembly: AssemblyOptions,
  pub source: Arc<dyn DensitySource>,
}

/// Finished chunk.
#[derive(Debug)]
pub struct ChunkCompletion {
  /// Request ID this completion corresponds to
  pub id: u64,
  pub slot: IVec3,
  /// One entry per LOD, or the error that ended this chunk's run.
  pub lods: Result<Vec<MeshData>>,
  /// Extraction time in microseconds
  pub extract_time_us: u64,
  /// Assembly time in microseconds (0 if extraction failed)
  pub assemble_time_us: u64,
}

/// Meshing stage that processes chunk requests in parallel.
pub struct ChunkMeshingStage {
  pending: Vec<ChunkRequest>,
  completed: Vec<ChunkCompletion>,
  next_id: u64,
  token: CancellationToken,
  metrics: MeshingMetrics,
}

impl Default for ChunkMeshingStage {
  fn default() -> Self {
    Self::new()
  }
}

impl ChunkMeshingStage {
  pub fn new() -> Self {
    Self {
      pending: Vec::new(),
      completed: Vec::new(),
      next_id: 0,
      token: CancellationToken::new(),
      metrics: MeshingMetrics::new(),
    }
  }

  /// Enqueue a chunk, returning the assigned ID.
  pub fn enqueue(
    &mut self,
    slot: IVec3,
    settings: Settings,
    extraction: ExtractionOptions,
    assembly: AssemblyOptions,
    source: Arc<dyn DensitySource>,
  ) -> u64 {
    let id = self.next_id;
    self.next_id += 1;

    self.pending.push(ChunkRequest {
      id,
      slot,
      settings,
      extraction,
      assembly,
      source,
    });

    id
  }

  /// Token observed by every chunk of a tick. Cancelling it from another
  /// thread turns the remaining chunks of the running tick into
  /// `Err(Cancelled)` completions; the next tick clears it.
  pub fn token(&self) -> CancellationToken {
    self.token.clone()
  }

  /// Process all pending requests in parallel and move completions to output.
  /// Returns the number of requests processed this tick.
  pub fn tick(&mut self) -> usize {
    if self.pending.is_empty() {
      return 0;
    }

    let requests = std::mem::take(&mut self.pending);
    let count = requests.len();
    let span = debug_span!("batch_tick", chunks = count);
    let _enter = span.enter();
    let start = Instant::now();

    self.token.reset();
    let token = &self.token;
    let completions: Vec<ChunkCompletion> = requests
      .into_par_iter()
      .map(|request| mesh_chunk(request, token))
      .collect();

    for completion in &completions {
      self.metrics.record_extract_timing(completion.extract_time_us);
      match &completion.lods {
        Ok(lods) => {
          self.metrics.record_assemble_timing(completion.assemble_time_us);
          self.metrics.record_chunk(lods);
        }
        Err(err) => {
          warn!(id = completion.id, slot = ?completion.slot, %err, "chunk failed");
          self.metrics.record_failure();
        }
      }
    }

    let elapsed_us = start.elapsed().as_micros() as u64;
    self.metrics.record_tick_timing(elapsed_us);
    debug!(chunks = count, elapsed_us, "batch tick finished");

    self.completed.extend(completions);
    count
  }

  /// Take all completed chunks.
  pub fn drain_completions(&mut self) -> Vec<ChunkCompletion> {
    std::mem::take(&mut self.completed)
  }

  pub fn pending_count(&self) -> usize {
    self.pending.len()
  }

  /// Number of completed results waiting to be drained.
  pub fn completed_count(&self) -> usize {
    self.completed.len()
  }

  /// True when no work remains.
  pub fn is_idle(&self) -> bool {
    self.pending.is_empty() && self.completed.is_empty()
  }

  pub fn metrics(&self) -> &MeshingMetrics {
    &self.metrics
  }

  pub fn metrics_mut(&mut self) -> &mut MeshingMetrics {
    &mut self.metrics
  }
}

fn mesh_chunk(request: ChunkRequest, token: &CancellationToken) -> ChunkCompletion {
  let mut control = RunControl::new(token.clone());
  let source = &*request.source;

  let start = Instant::now();
  let extracted = extract(&request.settings, &request.extraction, source, &mut control);
  let extract_time_us = start.elapsed().as_micros() as u64;

  let (lods, assemble_time_us) = match extracted {
    Ok(mut mesh) => {
      let start = Instant::now();
      let lods = assemble(&request.settings, &request.assembly, source, &mut mesh, &mut control);
      (lods, start.elapsed().as_micros() as u64)
    }
    Err(err) => (Err(err), 0),
  };

  ChunkCompletion {
    id: request.id,
    slot: request.slot,
    lods,
    extract_time_us,
    assemble_time_us,
  }
}

#[cfg(test)]
#[path = "task_queue_test.rs"]
mod task_queue_test;
