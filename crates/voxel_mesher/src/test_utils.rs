//! Fixtures shared by unit tests.

use std::collections::HashMap;

use glam::{DVec3, IVec3};

use crate::control::RunControl;
use crate::extract::extract;
use crate::mesh::DynamicMesh;
use crate::samplers::SphereDensity;
use crate::types::{Algorithm, ExtractionOptions, Settings};

/// 8³ grid at resolution 100 with the default iso level of 0.5.
pub fn small_settings() -> Settings {
  Settings::new().with_units(IVec3::splat(8)).with_resolution(100.0)
}

/// Occurrences of each directed edge over all live triangles.
pub fn directed_edges(mesh: &DynamicMesh) -> HashMap<(u32, u32), usize> {
  let mut edges = HashMap::new();
  for [a, b, c] in mesh.triangles() {
    for edge in [(a, b), (b, c), (c, a)] {
      *edges.entry(edge).or_insert(0) += 1;
    }
  }
  edges
}

/// Closed and consistently oriented: every directed edge appears exactly
/// once and so does its reverse.
pub fn is_closed(mesh: &DynamicMesh) -> bool {
  let edges = directed_edges(mesh);
  !edges.is_empty()
    && edges
      .iter()
      .all(|(&(a, b), &count)| count == 1 && edges.get(&(b, a)) == Some(&1))
}

/// Signed volume enclosed by the mesh. Negative for inward-wound surfaces.
pub fn signed_volume(mesh: &DynamicMesh) -> f64 {
  mesh
    .triangle_ids()
    .filter_map(|t| mesh.triangle_positions(t))
    .map(|[a, b, c]| a.dot(b.cross(c)) / 6.0)
    .sum()
}

/// Flat `n x n` quad grid in the XY plane, wound toward +Z.
pub fn grid_mesh(n: u32) -> DynamicMesh {
  let mut mesh = DynamicMesh::new();
  for y in 0..=n {
    for x in 0..=n {
      mesh.append_vertex(DVec3::new(x as f64, y as f64, 0.0));
    }
  }
  let id = |x: u32, y: u32| y * (n + 1) + x;
  for y in 0..n {
    for x in 0..n {
      let (a, b, c, d) = (id(x, y), id(x + 1, y), id(x + 1, y + 1), id(x, y + 1));
      let _ = mesh.append_triangle([a, b, c]);
      let _ = mesh.append_triangle([a, c, d]);
    }
  }
  mesh
}

/// Extract a centered sphere of `radius` voxels.
pub fn sphere_mesh(units: i32, radius: f64, algorithm: Algorithm) -> DynamicMesh {
  let settings = Settings::new()
    .with_units(IVec3::splat(units))
    .with_resolution(100.0);
  let source = SphereDensity::centered(settings.units, radius);
  let options = ExtractionOptions::new().with_algorithm(algorithm);
  extract(&settings, &options, &source, &mut RunControl::default())
    .unwrap_or_else(|err| panic!("sphere extraction failed: {err}"))
}
