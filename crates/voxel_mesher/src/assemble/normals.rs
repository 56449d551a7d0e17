//! Surface normals and tangent frames.
//!
//! Gradient normals sample the density field around the vertex position and
//! point down the gradient, away from the dense side of the iso-surface.
//! Triangle normals come from the face cross product and are flipped to
//! match, since extraction winds faces toward the dense side.
//!
//! # Gradient stencils
//!
//! ```text
//! basic:     g[d] = ρ(c + e_d) - ρ(c - e_d)            c = trunc(p)
//!
//! advanced:  t    = p[d] + 0.5 - trunc(p[d] + 0.5)
//!            g[d] = (ρ(c) - ρ(c - e_d)) * (1 - t)
//!                 + (ρ(c + e_d) - ρ(c)) * t
//! ```
//!
//! The advanced stencil blends the backward and forward differences by the
//! fractional vertex position, so the normal follows a vertex as it slides
//! along a cell edge.

use glam::{DMat3, DVec3, IVec3};

use crate::density::{DensityField, DensitySource};
use crate::types::{NormalMode, Tangent};

/// Raw face normal `(b - a) x (c - a)`. Points toward the dense side for
/// extracted triangles.
#[inline]
pub fn face_cross([a, b, c]: [DVec3; 3]) -> DVec3 {
  (b - a).cross(c - a)
}

/// Outward face normal of an extracted triangle, unnormalized.
#[inline]
pub fn outward_face_normal(positions: [DVec3; 3], inverted: bool) -> DVec3 {
  let cross = face_cross(positions);
  if inverted {
    cross
  } else {
    -cross
  }
}

/// Central-difference density gradient at the truncated position.
pub fn gradient_basic<S: DensitySource + ?Sized>(
  field: &mut DensityField<'_, S>,
  position: DVec3,
) -> DVec3 {
  let c = position.as_ivec3();
  let mut gradient = DVec3::ZERO;
  for (axis, step) in IVec3::AXES.into_iter().enumerate() {
    gradient[axis] = field.value(c + step) - field.value(c - step);
  }
  gradient
}

/// Density gradient blended between backward and forward differences by
/// the fractional position.
pub fn gradient_advanced<S: DensitySource + ?Sized>(
  field: &mut DensityField<'_, S>,
  position: DVec3,
) -> DVec3 {
  let c = position.as_ivec3();
  let mut gradient = DVec3::ZERO;
  for (axis, step) in IVec3::AXES.into_iter().enumerate() {
    let shifted = position[axis] + 0.5;
    let t = shifted - (shifted as i32) as f64;
    let below = field.value(c - step);
    let here = field.value(c);
    let above = field.value(c + step);
    gradient[axis] = (here - below) * (1.0 - t) + (above - here) * t;
  }
  gradient
}

/// Unit surface normal from the density gradient. Zero when the field is
/// flat around `position`.
///
/// Inversion only changes winding; gradient normals point away from the
/// dense side either way.
pub fn gradient_normal<S: DensitySource + ?Sized>(
  field: &mut DensityField<'_, S>,
  position: DVec3,
  mode: NormalMode,
) -> DVec3 {
  let gradient = match mode {
    NormalMode::GradientBasic => gradient_basic(field, position),
    _ => gradient_advanced(field, position),
  };
  (-gradient).normalize_or_zero()
}

/// Tangent frame for `normal` using the branchless orthonormal basis of Duff
/// et al. (2017).
///
/// `flip_y` records a left-handed `(tangent, bitangent, normal)` basis and is
/// toggled for inverted surfaces, whose winding is mirrored.
pub fn tangent_for_normal(normal: DVec3, inverted: bool) -> Tangent {
  let (tangent, bitangent) = normal.any_orthonormal_pair();
  let determinant = DMat3::from_cols(tangent, bitangent, normal).determinant();
  Tangent {
    x: tangent,
    flip_y: (determinant < 0.0) != inverted,
  }
}

#[cfg(test)]
#[path = "normals_test.rs"]
mod normals_test;
