//! Error types for the meshing pipeline.

use thiserror::Error;

/// Settings rejected before a run starts.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
  /// A grid axis does not exceed the lattice margin.
  #[error("grid axis {axis} has {units} voxels, need more than {margin}")]
  UnitsTooSmall { axis: char, units: i32, margin: i32 },

  /// Resolution is zero (or close enough to it).
  #[error("voxel resolution {0} is zero")]
  ZeroResolution(f64),

  /// A LOD asks for a quality outside `[0, 1]`.
  #[error("LOD {lod} quality {quality} is outside [0, 1]")]
  InvalidQuality { lod: usize, quality: f64 },
}

/// Errors produced by a meshing run.
#[derive(Error, Debug)]
pub enum MesherError {
  #[error("invalid configuration: {0}")]
  Config(#[from] ConfigError),

  /// The run observed its cancellation token. Any partial output must be
  /// discarded.
  #[error("run cancelled")]
  Cancelled,

  #[error("task is already running")]
  AlreadyRunning,

  /// The worker finished without delivering a result.
  #[error("worker dropped its result")]
  TaskLost,

  /// Waited on a task that was never started.
  #[error("task has not been started")]
  NotStarted,

  #[error("failed to build worker pool: {0}")]
  ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Topology edits rejected by [`crate::mesh::DynamicMesh`].
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeshError {
  #[error("vertex {0} does not exist")]
  InvalidVertex(u32),

  #[error("triangle {0} does not exist")]
  InvalidTriangle(u32),

  /// Two corners of the triangle reference the same vertex.
  #[error("triangle ({0}, {1}, {2}) is degenerate")]
  DegenerateTriangle(u32, u32, u32),

  #[error("vertex {0} is still referenced by triangles")]
  VertexInUse(u32),
}

pub type Result<T> = std::result::Result<T, MesherError>;
