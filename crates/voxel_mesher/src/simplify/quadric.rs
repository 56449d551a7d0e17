//! Error quadrics driving edge collapses.
//!
//! A quadric is the symmetric 4x4 matrix `Q` whose form `v^T Q v` (with
//! `v = [x, y, z, 1]`) sums the squared distances of a point to a set of
//! planes. Per-vertex quadrics start as the area-weighted sum of the planes
//! of the incident triangles; collapsing an edge adds its two quadrics.
//!
//! # Storage
//!
//! ```text
//! [a00 a01 a02 a03]
//! [    a11 a12 a13]      data = [a00, a01, a02, a03,
//! [        a22 a23]              a11, a12, a13,
//! [            a33]              a22, a23, a33]
//! ```

use glam::{DMat3, DMat4, DVec3, DVec4};

/// Relative determinant below which a system counts as singular.
const SINGULAR_EPSILON: f64 = 1.0e-9;

/// Optimal points further than this many edge lengths from the edge
/// midpoint come from ill-conditioned systems and are discarded.
const MAX_OPTIMAL_REACH: f64 = 4.0;

/// Error metric accumulated per vertex by the simplifier.
pub trait ErrorQuadric: Copy + Default + Send + Sync + 'static {
  /// Quadric of one triangle.
  fn from_triangle(p0: DVec3, p1: DVec3, p2: DVec3) -> Self;

  fn add(&self, other: &Self) -> Self;

  /// Error of placing the merged vertex at `point`.
  fn evaluate(&self, point: DVec3) -> f64;

  /// Position minimizing [`Self::evaluate`] for the collapse of `v1-v2`.
  fn optimal_point(&self, v1: DVec3, v2: DVec3) -> DVec3;
}

/// Best of the edge midpoint and its two endpoints. Ties keep the midpoint.
fn best_on_edge(evaluate: impl Fn(DVec3) -> f64, v1: DVec3, v2: DVec3) -> DVec3 {
  let mut best = (v1 + v2) * 0.5;
  let mut best_error = evaluate(best);
  for candidate in [v1, v2] {
    let error = evaluate(candidate);
    if error < best_error {
      best = candidate;
      best_error = error;
    }
  }
  best
}

/// Whether a solved optimum is usable for the collapse of `v1-v2`.
fn within_reach(point: DVec3, v1: DVec3, v2: DVec3) -> bool {
  let reach = MAX_OPTIMAL_REACH * v1.distance(v2).max(f64::EPSILON);
  point.is_finite() && point.distance((v1 + v2) * 0.5) <= reach
}

// =============================================================================
// Plain quadric error metric
// =============================================================================

/// Garland-Heckbert plane quadric, weighted by triangle area.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct QuadricError {
  data: [f64; 10],
}

impl QuadricError {
  /// Quadric of the plane `a*x + b*y + c*z + d = 0` (unit normal), scaled.
  pub fn from_plane(normal: DVec3, d: f64, weight: f64) -> Self {
    let DVec3 { x: a, y: b, z: c } = normal;
    Self {
      data: [
        a * a, a * b, a * c, a * d,
        b * b, b * c, b * d,
        c * c, c * d,
        d * d,
      ]
      .map(|v| v * weight),
    }
  }

  /// Upper-left 3x3 block.
  fn linear(&self) -> DMat3 {
    let d = &self.data;
    DMat3::from_cols(
      DVec3::new(d[0], d[1], d[2]),
      DVec3::new(d[1], d[4], d[5]),
      DVec3::new(d[2], d[5], d[7]),
    )
  }

  /// Last column without the constant term.
  fn offset(&self) -> DVec3 {
    DVec3::new(self.data[3], self.data[6], self.data[8])
  }

  /// Minimizer of the quadric alone, when the system is well conditioned.
  fn solve(&self) -> Option<DVec3> {
    let a = self.linear();
    let scale = (a.x_axis.x + a.y_axis.y + a.z_axis.z).powi(3);
    let det = a.determinant();
    if !(scale > 0.0) || det.abs() <= SINGULAR_EPSILON * scale {
      return None;
    }
    Some(a.inverse() * -self.offset())
  }
}

impl ErrorQuadric for QuadricError {
  fn from_triangle(p0: DVec3, p1: DVec3, p2: DVec3) -> Self {
    let cross = (p1 - p0).cross(p2 - p0);
    let length = cross.length();
    if length <= f64::EPSILON {
      return Self::default();
    }
    let normal = cross / length;
    Self::from_plane(normal, -normal.dot(p0), length * 0.5)
  }

  fn add(&self, other: &Self) -> Self {
    let mut data = self.data;
    for (value, other) in data.iter_mut().zip(other.data) {
      *value += other;
    }
    Self { data }
  }

  #[inline]
  fn evaluate(&self, point: DVec3) -> f64 {
    let d = &self.data;
    let DVec3 { x, y, z } = point;
    x * x * d[0]
      + 2.0 * x * y * d[1]
      + 2.0 * x * z * d[2]
      + 2.0 * x * d[3]
      + y * y * d[4]
      + 2.0 * y * z * d[5]
      + 2.0 * y * d[6]
      + z * z * d[7]
      + 2.0 * z * d[8]
      + d[9]
  }

  fn optimal_point(&self, v1: DVec3, v2: DVec3) -> DVec3 {
    match self.solve() {
      Some(point) if within_reach(point, v1, v2) => point,
      _ => best_on_edge(|p| self.evaluate(p), v1, v2),
    }
  }
}

// =============================================================================
// Volume-preserving quadric
// =============================================================================

/// Plane quadric plus the linear volume constraint of the incident triangles.
///
/// Moving a vertex of triangle `t` to `x` changes the enclosed volume by
/// `N_t . (x - p0_t) / 6` with `N_t` the unnormalized face normal. Summing
/// over the fan gives `dV = (g . x - h) / 6`. The optimum minimizes the
/// plane error subject to `dV = 0`; the error adds `dV²`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct VolumePreservingQuadric {
  plane: QuadricError,
  /// Sum of unnormalized face normals.
  g: DVec3,
  /// Sum of `N_t . p0_t`.
  h: f64,
}

impl VolumePreservingQuadric {
  /// Volume change caused by moving the merged vertex to `point`.
  pub fn volume_change(&self, point: DVec3) -> f64 {
    (self.g.dot(point) - self.h) / 6.0
  }

  /// Solve the Lagrange system `[A n; n^T 0] [x; l] = [-b; h / |g|]` with
  /// `n = g / |g|`.
  fn solve(&self) -> Option<DVec3> {
    let length = self.g.length();
    let n = self.g / length;
    let a = self.plane.linear();
    let system = DMat4::from_cols(
      a.x_axis.extend(n.x),
      a.y_axis.extend(n.y),
      a.z_axis.extend(n.z),
      n.extend(0.0),
    );
    let trace = a.x_axis.x + a.y_axis.y + a.z_axis.z;
    let det = system.determinant();
    if !(trace > 0.0) || det.abs() <= SINGULAR_EPSILON * trace * trace {
      return None;
    }
    let rhs = (-self.plane.offset()).extend(self.h / length);
    let solution: DVec4 = system.inverse() * rhs;
    Some(solution.truncate())
  }
}

impl ErrorQuadric for VolumePreservingQuadric {
  fn from_triangle(p0: DVec3, p1: DVec3, p2: DVec3) -> Self {
    let g = (p1 - p0).cross(p2 - p0);
    Self {
      plane: QuadricError::from_triangle(p0, p1, p2),
      g,
      h: g.dot(p0),
    }
  }

  fn add(&self, other: &Self) -> Self {
    Self {
      plane: self.plane.add(&other.plane),
      g: self.g + other.g,
      h: self.h + other.h,
    }
  }

  #[inline]
  fn evaluate(&self, point: DVec3) -> f64 {
    let volume = self.volume_change(point);
    self.plane.evaluate(point) + volume * volume
  }

  fn optimal_point(&self, v1: DVec3, v2: DVec3) -> DVec3 {
    // Without a volume gradient the constraint is void.
    if self.g.length_squared() <= f64::EPSILON {
      return self.plane.optimal_point(v1, v2);
    }
    match self.solve() {
      Some(point) if within_reach(point, v1, v2) => point,
      _ => best_on_edge(|p| self.evaluate(p), v1, v2),
    }
  }
}

#[cfg(test)]
#[path = "quadric_test.rs"]
mod quadric_test;
