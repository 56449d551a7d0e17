//! Lazily populated density cache for one extraction run.
//!
//! # Storage
//!
//! ```text
//! slot:    0          1 .. total         total + 1
//!          │          │                  │
//!          └─ below   └─ voxels          └─ past the end
//!             grid       (linear index      of the grid
//!                         + 1)
//! ```
//!
//! Slots are filled on first access by calling the [`DensitySource`]. Out of
//! range coordinates clamp onto the two sentinel slots, so a stray read one
//! step outside the grid is stable and never indexes out of bounds.

use glam::IVec3;

use crate::coords::voxel_to_linear_index;
use crate::types::{DensityPoint, LinearColor, Settings};

/// Produces density samples for voxel coordinates.
///
/// Implementations must be pure: the same coordinates always give the same
/// sample within one run.
pub trait DensitySource: Send + Sync {
  fn density_at(&self, coords: IVec3) -> DensityPoint;
}

impl<F> DensitySource for F
where
  F: Fn(IVec3) -> DensityPoint + Send + Sync,
{
  #[inline]
  fn density_at(&self, coords: IVec3) -> DensityPoint {
    self(coords)
  }
}

/// Arena-backed cache of density samples over one chunk grid.
pub struct DensityField<'s, S: DensitySource + ?Sized> {
  units: IVec3,
  source: &'s S,
  points: Vec<Option<DensityPoint>>,
  cached: usize,
}

impl<'s, S: DensitySource + ?Sized> DensityField<'s, S> {
  pub fn new(settings: &Settings, source: &'s S) -> Self {
    let total = settings.voxel_count().max(0) as usize;
    Self {
      units: settings.units,
      source,
      points: vec![None; total + 2],
      cached: 0,
    }
  }

  #[inline]
  fn slot(&self, coords: IVec3) -> usize {
    (voxel_to_linear_index(coords, self.units) + 1) as usize
  }

  /// Sample at `coords`, constructing and caching it on first access.
  #[inline]
  pub fn get(&mut self, coords: IVec3) -> DensityPoint {
    let slot = self.slot(coords);
    if let Some(point) = self.points[slot] {
      return point;
    }
    let point = self.source.density_at(coords);
    self.points[slot] = Some(point);
    self.cached += 1;
    point
  }

  #[inline]
  pub fn value(&mut self, coords: IVec3) -> f64 {
    self.get(coords).value
  }

  #[inline]
  pub fn color(&mut self, coords: IVec3) -> LinearColor {
    self.get(coords).color
  }

  pub fn is_cached(&self, coords: IVec3) -> bool {
    self.points[self.slot(coords)].is_some()
  }

  /// Number of populated slots.
  pub fn cached_count(&self) -> usize {
    self.cached
  }

  pub fn units(&self) -> IVec3 {
    self.units
  }

  /// Drop every cached sample, keeping the allocation.
  pub fn clear(&mut self) {
    self.points.fill(None);
    self.cached = 0;
  }
}

#[cfg(test)]
#[path = "density_test.rs"]
mod density_test;
