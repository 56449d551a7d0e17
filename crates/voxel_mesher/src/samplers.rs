//! Simple density sources for testing and debugging.
//!
//! These sources are deterministic functions of voxel coordinates that are
//! easy to verify by eye. Use them to exercise the pipeline without an
//! external density generator.

use glam::{DVec3, IVec3};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::density::DensitySource;
use crate::types::{DensityPoint, LinearColor};

/// Same sample everywhere. Produces no surface.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct ConstantDensity {
  pub value: f64,
  pub color: LinearColor,
}

impl ConstantDensity {
  pub fn new(value: f64) -> Self {
    Self {
      value,
      color: LinearColor::BLACK,
    }
  }

  pub fn with_color(mut self, color: LinearColor) -> Self {
    self.color = color;
    self
  }
}

impl DensitySource for ConstantDensity {
  fn density_at(&self, _coords: IVec3) -> DensityPoint {
    DensityPoint::new(self.value, self.color)
  }
}

/// Solid ball: `inside` within `radius` voxels of `center`, `outside`
/// elsewhere.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct SphereDensity {
  /// Center in voxel coordinates.
  pub center: DVec3,
  /// Radius in voxels (inclusive).
  pub radius: f64,
  pub inside: f64,
  pub outside: f64,
  pub color: LinearColor,
}

impl Default for SphereDensity {
  fn default() -> Self {
    Self {
      center: DVec3::splat(16.0),
      radius: 8.0,
      inside: 1.0,
      outside: 0.0,
      color: LinearColor::WHITE,
    }
  }
}

impl SphereDensity {
  pub fn new(center: DVec3, radius: f64) -> Self {
    Self {
      center,
      radius,
      ..Self::default()
    }
  }

  /// Sphere centered in a grid of `units` voxels.
  pub fn centered(units: IVec3, radius: f64) -> Self {
    Self::new(units.as_dvec3() * 0.5, radius)
  }

  pub fn with_values(mut self, inside: f64, outside: f64) -> Self {
    self.inside = inside;
    self.outside = outside;
    self
  }

  pub fn with_color(mut self, color: LinearColor) -> Self {
    self.color = color;
    self
  }
}

impl DensitySource for SphereDensity {
  fn density_at(&self, coords: IVec3) -> DensityPoint {
    let inside = coords.as_dvec3().distance_squared(self.center) <= self.radius * self.radius;
    let value = if inside { self.inside } else { self.outside };
    DensityPoint::new(value, self.color)
  }
}

/// One hot voxel in an otherwise empty grid.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct SingleVoxelDensity {
  pub voxel: IVec3,
  pub inside: f64,
  pub outside: f64,
}

impl Default for SingleVoxelDensity {
  fn default() -> Self {
    Self {
      voxel: IVec3::splat(4),
      inside: 1.5,
      outside: -0.5,
    }
  }
}

impl SingleVoxelDensity {
  pub fn new(voxel: IVec3) -> Self {
    Self {
      voxel,
      ..Self::default()
    }
  }

  /// `iso + 1` at the voxel and `iso - 1` everywhere else.
  pub fn around_iso(voxel: IVec3, iso_level: f64) -> Self {
    Self {
      voxel,
      inside: iso_level + 1.0,
      outside: iso_level - 1.0,
    }
  }
}

impl DensitySource for SingleVoxelDensity {
  fn density_at(&self, coords: IVec3) -> DensityPoint {
    let value = if coords == self.voxel {
      self.inside
    } else {
      self.outside
    };
    DensityPoint::from_value(value)
  }
}

/// Horizontal ground plane with a linear ramp across it.
///
/// `value = clamp(0.5 + (height - y) * falloff, 0, 1)`, so with the default
/// iso level of 0.5 the surface sits exactly at `y = height`.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct PlaneDensity {
  /// Surface height in voxels.
  pub height: f64,
  /// Density change per voxel along -Y.
  pub falloff: f64,
  pub color: LinearColor,
}

impl Default for PlaneDensity {
  fn default() -> Self {
    Self {
      height: 16.0,
      falloff: 0.25,
      color: LinearColor::WHITE,
    }
  }
}

impl PlaneDensity {
  pub fn new(height: f64) -> Self {
    Self {
      height,
      ..Self::default()
    }
  }

  pub fn with_falloff(mut self, falloff: f64) -> Self {
    self.falloff = falloff;
    self
  }

  pub fn with_color(mut self, color: LinearColor) -> Self {
    self.color = color;
    self
  }
}

impl DensitySource for PlaneDensity {
  fn density_at(&self, coords: IVec3) -> DensityPoint {
    let value = (0.5 + (self.height - coords.y as f64) * self.falloff).clamp(0.0, 1.0);
    DensityPoint::new(value, self.color)
  }
}
