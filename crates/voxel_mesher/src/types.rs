//! Core data types for iso-surface meshing.

use glam::{DVec2, DVec3, IVec3};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::constants::{
  DEFAULT_ISO_LEVEL, DEFAULT_RESET_RUNAWAY_ITERATION_COUNT, DEFAULT_RESOLUTION, DEFAULT_UNITS,
  MARGIN, RESOLUTION_EPSILON,
};
use crate::error::ConfigError;

// =============================================================================
// Settings
// =============================================================================

/// Grid description shared by extraction and assembly. Immutable per run.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct Settings {
  /// Voxels per axis, margin included.
  pub units: IVec3,

  /// World units per voxel.
  pub resolution: f64,

  /// Density threshold: `density >= iso_level` is inside.
  pub iso_level: f64,

  /// Reverse triangle winding (and flip normals) for inside-out surfaces.
  pub inverted: bool,

  /// World extent in chunks, used by chunk-slot conversions.
  pub world_size: IVec3,
}

impl Default for Settings {
  fn default() -> Self {
    Self {
      units: DEFAULT_UNITS,
      resolution: DEFAULT_RESOLUTION,
      iso_level: DEFAULT_ISO_LEVEL,
      inverted: false,
      world_size: IVec3::ONE,
    }
  }
}

impl Settings {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_units(mut self, units: IVec3) -> Self {
    self.units = units;
    self
  }

  pub fn with_resolution(mut self, resolution: f64) -> Self {
    self.resolution = resolution;
    self
  }

  pub fn with_iso_level(mut self, iso_level: f64) -> Self {
    self.iso_level = iso_level;
    self
  }

  pub fn with_inverted(mut self, inverted: bool) -> Self {
    self.inverted = inverted;
    self
  }

  pub fn with_world_size(mut self, world_size: IVec3) -> Self {
    self.world_size = world_size;
    self
  }

  /// Check the grid can host at least one interior cell per axis.
  pub fn validate(&self) -> Result<(), ConfigError> {
    for (axis, units) in [('x', self.units.x), ('y', self.units.y), ('z', self.units.z)] {
      if units <= MARGIN {
        return Err(ConfigError::UnitsTooSmall {
          axis,
          units,
          margin: MARGIN,
        });
      }
    }
    if !(self.resolution.abs() > RESOLUTION_EPSILON) {
      return Err(ConfigError::ZeroResolution(self.resolution));
    }
    Ok(())
  }

  /// Total voxel count (`Units.x * Units.y * Units.z`).
  #[inline]
  pub fn voxel_count(&self) -> i64 {
    self.units.x as i64 * self.units.y as i64 * self.units.z as i64
  }
}

// =============================================================================
// Density
// =============================================================================

/// Linear RGBA color.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LinearColor {
  pub r: f32,
  pub g: f32,
  pub b: f32,
  pub a: f32,
}

impl LinearColor {
  pub const BLACK: Self = Self::new(0.0, 0.0, 0.0, 1.0);
  pub const WHITE: Self = Self::new(1.0, 1.0, 1.0, 1.0);

  pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
    Self { r, g, b, a }
  }
}

/// One sample of the density field.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DensityPoint {
  pub value: f64,
  pub color: LinearColor,
}

impl DensityPoint {
  pub const fn new(value: f64, color: LinearColor) -> Self {
    Self { value, color }
  }

  /// Sample with a black color.
  pub const fn from_value(value: f64) -> Self {
    Self::new(value, LinearColor::BLACK)
  }
}

// =============================================================================
// Run configuration
// =============================================================================

/// Iso-surface extraction strategy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(rename_all = "snake_case"))]
pub enum Algorithm {
  /// Classic case-table marching cubes.
  #[default]
  Simple,
  /// Dual marching cubes: one vertex per crossing patch, quads around edges.
  Dual,
  /// Marching tetrahedra over a six-way cube split.
  Tetrahedral,
}

/// Options for one extraction pass.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct ExtractionOptions {
  pub algorithm: Algorithm,

  /// Deduplicate vertices shared between neighbouring cells.
  pub use_shared_points: bool,

  /// Dual only: resolve ambiguous neighbouring configurations consistently.
  pub force_manifold: bool,

  /// Fire the checkpoint callback every N iterations (0 disables it).
  pub reset_runaway_iteration_count: u32,
}

impl Default for ExtractionOptions {
  fn default() -> Self {
    Self {
      algorithm: Algorithm::Simple,
      use_shared_points: true,
      force_manifold: true,
      reset_runaway_iteration_count: DEFAULT_RESET_RUNAWAY_ITERATION_COUNT,
    }
  }
}

impl ExtractionOptions {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_algorithm(mut self, algorithm: Algorithm) -> Self {
    self.algorithm = algorithm;
    self
  }

  pub fn with_shared_points(mut self, shared: bool) -> Self {
    self.use_shared_points = shared;
    self
  }

  pub fn with_force_manifold(mut self, force: bool) -> Self {
    self.force_manifold = force;
    self
  }

  pub fn with_reset_runaway_iteration_count(mut self, count: u32) -> Self {
    self.reset_runaway_iteration_count = count;
    self
  }
}

/// Normal computation mode for assembled meshes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(rename_all = "snake_case"))]
pub enum NormalMode {
  /// Density gradient, blended between neighbouring samples by the
  /// fractional vertex position.
  #[default]
  GradientAdvanced,
  /// Central-difference density gradient at the truncated vertex position.
  GradientBasic,
  /// Cross products of triangle edges.
  Triangle,
}

/// Error metric driving edge collapses.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(rename_all = "snake_case"))]
pub enum QuadricKind {
  /// Sum of squared distances to the incident face planes.
  #[default]
  Qem,
  /// Plane quadric constrained to keep the enclosed volume.
  VolumePreserving,
}

/// What the LOD quality fraction is applied to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(rename_all = "snake_case"))]
pub enum TargetKind {
  #[default]
  VertexCount,
  TriangleCount,
}

/// Simplification request for one LOD.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct SimplifierSettings {
  /// Fraction of vertices (or triangles) to keep, in `[0, 1]`.
  pub quality: f64,
  pub quadric: QuadricKind,
  pub target: TargetKind,
  /// Never move or remove vertices on open mesh borders.
  pub preserve_boundary: bool,
}

impl Default for SimplifierSettings {
  fn default() -> Self {
    Self {
      quality: 1.0,
      quadric: QuadricKind::Qem,
      target: TargetKind::VertexCount,
      preserve_boundary: true,
    }
  }
}

impl SimplifierSettings {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_quality(mut self, quality: f64) -> Self {
    self.quality = quality;
    self
  }

  pub fn with_quadric(mut self, quadric: QuadricKind) -> Self {
    self.quadric = quadric;
    self
  }

  pub fn with_target(mut self, target: TargetKind) -> Self {
    self.target = target;
    self
  }

  pub fn with_preserve_boundary(mut self, preserve: bool) -> Self {
    self.preserve_boundary = preserve;
    self
  }
}

/// Options for turning an extracted mesh into render data.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct AssemblyOptions {
  pub normal_mode: NormalMode,

  /// Overwrite normals per triangle/vertex instead of accumulating them.
  pub flat_shading: bool,

  /// One output per entry. Each LOD simplifies the previous LOD's mesh.
  /// Empty means a single full-quality LOD.
  pub lods: Vec<SimplifierSettings>,

  /// Fire the checkpoint callback every N items (0 disables it).
  pub reset_runaway_iteration_count: u32,
}

impl Default for AssemblyOptions {
  fn default() -> Self {
    Self {
      normal_mode: NormalMode::GradientAdvanced,
      flat_shading: false,
      lods: Vec::new(),
      reset_runaway_iteration_count: DEFAULT_RESET_RUNAWAY_ITERATION_COUNT,
    }
  }
}

impl AssemblyOptions {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_normal_mode(mut self, mode: NormalMode) -> Self {
    self.normal_mode = mode;
    self
  }

  pub fn with_flat_shading(mut self, flat: bool) -> Self {
    self.flat_shading = flat;
    self
  }

  pub fn with_lod(mut self, lod: SimplifierSettings) -> Self {
    self.lods.push(lod);
    self
  }

  pub fn with_reset_runaway_iteration_count(mut self, count: u32) -> Self {
    self.reset_runaway_iteration_count = count;
    self
  }

  /// LOD list with the single full-quality default filled in when empty.
  pub fn effective_lods(&self) -> Vec<SimplifierSettings> {
    if self.lods.is_empty() {
      vec![SimplifierSettings::default()]
    } else {
      self.lods.clone()
    }
  }

  pub fn validate(&self) -> Result<(), ConfigError> {
    for (lod, settings) in self.lods.iter().enumerate() {
      if !(0.0..=1.0).contains(&settings.quality) {
        return Err(ConfigError::InvalidQuality {
          lod,
          quality: settings.quality,
        });
      }
    }
    Ok(())
  }
}

// =============================================================================
// Output
// =============================================================================

/// Axis-aligned bounding box.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MinMaxAABB {
  pub min: DVec3,
  pub max: DVec3,
}

impl MinMaxAABB {
  /// Create AABB with inverted extents (ready for encapsulation).
  pub fn empty() -> Self {
    Self {
      min: DVec3::INFINITY,
      max: DVec3::NEG_INFINITY,
    }
  }

  pub fn new(min: DVec3, max: DVec3) -> Self {
    Self { min, max }
  }

  /// Expand AABB to include a point.
  #[inline]
  pub fn encapsulate(&mut self, point: DVec3) {
    self.min = self.min.min(point);
    self.max = self.max.max(point);
  }

  /// Check if AABB is valid (min <= max on all axes).
  pub fn is_valid(&self) -> bool {
    self.min.cmple(self.max).all()
  }

  pub fn size(&self) -> DVec3 {
    if self.is_valid() {
      self.max - self.min
    } else {
      DVec3::ZERO
    }
  }
}

impl Default for MinMaxAABB {
  fn default() -> Self {
    Self::empty()
  }
}

/// Tangent direction plus the sign of the bitangent.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Tangent {
  pub x: DVec3,
  pub flip_y: bool,
}

/// Render data for one LOD.
#[derive(Clone, Debug, Default)]
pub struct MeshData {
  /// Chunk-local positions.
  pub positions: Vec<DVec3>,
  pub normals: Vec<DVec3>,
  pub tangents: Vec<Tangent>,
  pub uvs: Vec<DVec2>,
  pub colors: Vec<LinearColor>,
  /// Triangle indices (3 per triangle).
  pub indices: Vec<u32>,
  pub bounds: MinMaxAABB,
}

impl MeshData {
  pub fn new() -> Self {
    Self::default()
  }

  /// Returns true if no geometry was generated.
  pub fn is_empty(&self) -> bool {
    self.positions.is_empty()
  }

  pub fn vertex_count(&self) -> usize {
    self.positions.len()
  }

  pub fn triangle_count(&self) -> usize {
    self.indices.len() / 3
  }

  /// Clear all buffers, preserving capacity.
  pub fn clear(&mut self) {
    self.positions.clear();
    self.normals.clear();
    self.tangents.clear();
    self.uvs.clear();
    self.colors.clear();
    self.indices.clear();
    self.bounds = MinMaxAABB::empty();
  }
}

#[cfg(test)]
#[path = "types_test.rs"]
mod types_test;
