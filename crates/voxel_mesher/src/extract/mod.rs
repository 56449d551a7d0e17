//! Iso-surface extraction over the interior voxel lattice.
//!
//! # Pipeline
//!
//! ```text
//! ┌───────────────┐     ┌─────────────────┐     ┌─────────────────────┐
//! │ DensitySource │ ──► │  DensityField   │ ──► │  per-cell strategy  │
//! │ (caller)      │     │  (lazy cache)   │     │  simple/dual/tetra  │
//! └───────────────┘     └─────────────────┘     └──────────┬──────────┘
//!                                                          │
//!                                               ┌──────────▼──────────┐
//!                                               │  DynamicMesh        │
//!                                               │  (voxel-space)      │
//!                                               └─────────────────────┘
//! ```
//!
//! Every strategy winds triangles so that `(b - a) x (c - a)` points toward
//! the inside of the surface (higher density). The inversion flag reverses
//! that winding when triangles are appended.
//!
//! Cells are visited with X fastest, then Y, then Z. The cancellation token
//! is polled before every cell; an `Err(Cancelled)` leaves the mesh in an
//! unspecified state.

mod dual;
mod simple;
mod tetra;

use std::collections::HashMap;

use glam::{DVec3, IVec3};
use tracing::{debug, debug_span, trace};

use crate::constants::{lattice_cell, lattice_len, INTERPOLATION_EPSILON};
use crate::control::RunControl;
use crate::density::{DensityField, DensitySource};
use crate::error::Result;
use crate::mesh::DynamicMesh;
use crate::types::{Algorithm, ExtractionOptions, Settings};

/// Run one extraction pass and return the voxel-space mesh.
///
/// Validates `settings` first; an invalid grid fails before the source is
/// ever sampled.
pub fn extract<S: DensitySource + ?Sized>(
  settings: &Settings,
  options: &ExtractionOptions,
  source: &S,
  control: &mut RunControl,
) -> Result<DynamicMesh> {
  let mut extractor = Extractor::new(*settings, *options, source)?;
  extractor.run(control)?;
  Ok(extractor.take_mesh())
}

/// Owns the density cache and vertex dedupe maps of one extraction.
pub struct Extractor<'s, S: DensitySource + ?Sized> {
  settings: Settings,
  options: ExtractionOptions,
  field: DensityField<'s, S>,
  mesh: DynamicMesh,
  /// Simple and tetrahedral sharing: exact position bits to vertex id.
  position_points: HashMap<[u64; 3], u32>,
  /// Dual sharing: (cell, patch edge mask) to vertex id.
  dual_points: HashMap<(IVec3, u16), u32>,
}

impl<'s, S: DensitySource + ?Sized> Extractor<'s, S> {
  pub fn new(settings: Settings, options: ExtractionOptions, source: &'s S) -> Result<Self> {
    settings.validate()?;
    Ok(Self {
      field: DensityField::new(&settings, source),
      settings,
      options,
      mesh: DynamicMesh::new(),
      position_points: HashMap::new(),
      dual_points: HashMap::new(),
    })
  }

  pub fn settings(&self) -> &Settings {
    &self.settings
  }

  pub fn options(&self) -> &ExtractionOptions {
    &self.options
  }

  /// Density samples cached so far. Samples survive between runs since the
  /// source is pure.
  pub fn field(&self) -> &DensityField<'s, S> {
    &self.field
  }

  pub fn mesh(&self) -> &DynamicMesh {
    &self.mesh
  }

  /// Walk the whole lattice, replacing any mesh from a previous run.
  pub fn run(&mut self, control: &mut RunControl) -> Result<()> {
    let span = debug_span!(
      "extract",
      algorithm = ?self.options.algorithm,
      units = ?self.settings.units
    );
    let _enter = span.enter();

    self.mesh = DynamicMesh::new();
    self.position_points.clear();
    self.dual_points.clear();

    let interval = self.options.reset_runaway_iteration_count;
    for index in 0..lattice_len(self.settings.units) {
      control.step(index, interval)?;
      let cell = lattice_cell(index, self.settings.units);
      match self.options.algorithm {
        Algorithm::Simple => self.polygonize_cube(cell),
        Algorithm::Dual => self.polygonize_dual(cell),
        Algorithm::Tetrahedral => self.polygonize_tetrahedra(cell),
      }
    }

    debug!(
      vertices = self.mesh.vertex_count(),
      triangles = self.mesh.triangle_count(),
      cached = self.field.cached_count(),
      "extraction finished"
    );
    Ok(())
  }

  /// Move the mesh out, leaving an empty one behind.
  pub fn take_mesh(&mut self) -> DynamicMesh {
    std::mem::take(&mut self.mesh)
  }

  /// Drop the mesh, dedupe maps and every cached density sample.
  pub fn reset(&mut self) {
    self.mesh = DynamicMesh::new();
    self.position_points.clear();
    self.dual_points.clear();
    self.field.clear();
  }

  // ---------------------------------------------------------------------------
  // Shared helpers
  // ---------------------------------------------------------------------------

  /// Append `position`, reusing an existing vertex at the exact same spot
  /// when point sharing is on.
  fn position_vertex(&mut self, position: DVec3) -> u32 {
    if !self.options.use_shared_points {
      return self.mesh.append_vertex(position);
    }
    let key = position.to_array().map(f64::to_bits);
    let mesh = &mut self.mesh;
    *self
      .position_points
      .entry(key)
      .or_insert_with(|| mesh.append_vertex(position))
  }

  /// Append a triangle wound toward the inside, reversed when inverted.
  fn add_triangle(&mut self, a: u32, b: u32, c: u32) {
    let triangle = if self.settings.inverted {
      [c, b, a]
    } else {
      [a, b, c]
    };
    // Snapped crossings can collapse two corners onto one shared vertex.
    if let Err(err) = self.mesh.append_triangle(triangle) {
      trace!(%err, "skipped triangle");
    }
  }
}

/// Iso crossing on the grid edge `p1-p2`.
///
/// Endpoints are put in lexicographic order first, so both cells sharing an
/// edge compute bit-identical points. Crossings within
/// [`INTERPOLATION_EPSILON`] of an endpoint snap to it.
pub fn vertex_interp(p1: IVec3, p2: IVec3, v1: f64, v2: f64, iso_level: f64) -> DVec3 {
  let ((p1, v1), (p2, v2)) = if p2.to_array() < p1.to_array() {
    ((p2, v2), (p1, v1))
  } else {
    ((p1, v1), (p2, v2))
  };
  let (p1, p2) = (p1.as_dvec3(), p2.as_dvec3());

  if (iso_level - v1).abs() < INTERPOLATION_EPSILON {
    return p1;
  }
  if (iso_level - v2).abs() < INTERPOLATION_EPSILON {
    return p2;
  }
  if (v1 - v2).abs() < INTERPOLATION_EPSILON {
    return p1;
  }
  let mu = (iso_level - v1) / (v2 - v1);
  p1 + (p2 - p1) * mu
}
