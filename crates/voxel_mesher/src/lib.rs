//! voxel_mesher - Engine independent iso-surface meshing for voxel chunks
//!
//! Turns a scalar density field sampled on a chunk grid into render-ready
//! triangle meshes with several levels of detail.
//!
//! # Features
//!
//! - **Three extractors**: classic marching cubes, dual marching cubes and
//!   marching tetrahedra, all behind one [`extract`] entry point
//! - **Lazy density cache**: each sample is pulled from the [`DensitySource`]
//!   once per run
//! - **Edge-collapse simplification**: plain or volume-preserving quadric
//!   error metrics with boundary and manifold guards
//! - **Render data**: positions, gradient or face normals, tangents, UVs and
//!   colors per LOD
//! - **Background execution**: restartable tasks with cooperative
//!   cancellation, plus a rayon batch stage for many chunks
//!
//! # Example
//!
//! ```ignore
//! use voxel_mesher::{assemble, extract, samplers::SphereDensity, RunControl};
//!
//! let settings = Settings::new();
//! let source = SphereDensity::centered(settings.units, 10.0);
//! let mut control = RunControl::default();
//!
//! let mut mesh = extract(&settings, &ExtractionOptions::new(), &source, &mut control)?;
//! let lods = assemble(&settings, &AssemblyOptions::new(), &source, &mut mesh, &mut control)?;
//!
//! println!("LOD0: {} vertices, {} triangles",
//!     lods[0].vertex_count(), lods[0].triangle_count());
//! ```

pub mod constants;
pub mod error;
pub mod tables;
pub mod types;

// Re-export commonly used items
pub use error::{ConfigError, MeshError, MesherError, Result};
pub use types::{
  Algorithm, AssemblyOptions, DensityPoint, ExtractionOptions, LinearColor, MeshData, MinMaxAABB,
  NormalMode, QuadricKind, Settings, SimplifierSettings, Tangent, TargetKind,
};

// Grid and world coordinate conversions
pub mod coords;

// Density sources and the per-run cache
pub mod density;
pub mod samplers;
pub use density::{DensityField, DensitySource};

// Cancellation and checkpoints shared by every pass
pub mod control;
pub use control::{CancellationToken, RunControl};

// Editable indexed triangle mesh
pub mod mesh;
pub use mesh::{CompactMap, DynamicMesh};

// Iso-surface extraction
pub mod extract;
pub use extract::{extract, Extractor};

// Edge-collapse simplification
pub mod simplify;
pub use simplify::{simplify, MeshSimplifier};

// Render data assembly
pub mod assemble;
pub use assemble::{assemble, MeshAssembler};

// Background tasks and worker pools
pub mod task;
pub mod threading;
pub use task::{
  BackgroundTask, ConvertToMeshDataTask, GenerateVoxelDataTask, MeshingTask, TaskControl,
};
pub use threading::{TaskId, WorkerPool};

// Batch stage for parallel chunk meshing
pub mod task_queue;
pub use task_queue::{ChunkCompletion, ChunkMeshingStage, ChunkRequest};

// Engine-agnostic metrics
pub mod metrics;
pub use metrics::MeshingMetrics;

#[cfg(test)]
mod test_utils;
