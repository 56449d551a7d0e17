//! Editable triangle mesh produced by extraction and consumed by the
//! simplifier and assembler.
//!
//! Vertices and triangles live in flat arrays addressed by `u32` ids.
//! Removal only flags an element as dead, so ids stay stable while the
//! simplifier edits topology. [`DynamicMesh::compact`] physically drops dead
//! elements and renumbers the survivors densely.
//!
//! ```text
//! vertices:   [v0][v1][--][v3][v4]      "--" = removed
//! triangles:  [t0][--][t2]
//!                 compact()
//! vertices:   [v0][v1][v3→2][v4→3]
//! triangles:  [t0][t2→1]               (indices rewritten)
//! ```

use glam::DVec3;
use smallvec::SmallVec;

use crate::error::MeshError;

/// Triangles touching one vertex. Most vertices of an extracted surface have
/// six or fewer.
pub type TriangleList = SmallVec<[u32; 8]>;

/// Id remapping produced by [`DynamicMesh::compact`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CompactMap {
  /// New id for every old vertex id (`None` when it was removed).
  pub vertices: Vec<Option<u32>>,
  /// New id for every old triangle id.
  pub triangles: Vec<Option<u32>>,
}

#[derive(Clone, Debug, Default)]
pub struct DynamicMesh {
  positions: Vec<DVec3>,
  vertex_alive: Vec<bool>,
  vertex_triangles: Vec<TriangleList>,
  triangles: Vec<[u32; 3]>,
  triangle_alive: Vec<bool>,
  vertex_count: usize,
  triangle_count: usize,
}

impl DynamicMesh {
  pub fn new() -> Self {
    Self::default()
  }

  /// Build a mesh from raw buffers. Degenerate or out-of-range triangles are
  /// skipped.
  pub fn from_buffers(positions: &[DVec3], triangles: &[[u32; 3]]) -> Self {
    let mut mesh = Self::new();
    for &position in positions {
      mesh.append_vertex(position);
    }
    for &triangle in triangles {
      let _ = mesh.append_triangle(triangle);
    }
    mesh
  }

  // ---------------------------------------------------------------------------
  // Counts and ids
  // ---------------------------------------------------------------------------

  #[inline]
  pub fn vertex_count(&self) -> usize {
    self.vertex_count
  }

  #[inline]
  pub fn triangle_count(&self) -> usize {
    self.triangle_count
  }

  /// One past the largest vertex id ever handed out.
  #[inline]
  pub fn max_vertex_id(&self) -> u32 {
    self.positions.len() as u32
  }

  #[inline]
  pub fn max_triangle_id(&self) -> u32 {
    self.triangles.len() as u32
  }

  #[inline]
  pub fn is_vertex(&self, vertex: u32) -> bool {
    self.vertex_alive.get(vertex as usize).copied().unwrap_or(false)
  }

  #[inline]
  pub fn is_triangle(&self, triangle: u32) -> bool {
    self.triangle_alive.get(triangle as usize).copied().unwrap_or(false)
  }

  pub fn vertex_ids(&self) -> impl Iterator<Item = u32> + '_ {
    (0..self.max_vertex_id()).filter(|&v| self.is_vertex(v))
  }

  pub fn triangle_ids(&self) -> impl Iterator<Item = u32> + '_ {
    (0..self.max_triangle_id()).filter(|&t| self.is_triangle(t))
  }

  /// True when no element has been removed since the last compaction.
  pub fn is_compact(&self) -> bool {
    self.vertex_count == self.positions.len() && self.triangle_count == self.triangles.len()
  }

  // ---------------------------------------------------------------------------
  // Access
  // ---------------------------------------------------------------------------

  #[inline]
  pub fn vertex(&self, vertex: u32) -> Option<DVec3> {
    self.is_vertex(vertex).then(|| self.positions[vertex as usize])
  }

  pub fn set_vertex(&mut self, vertex: u32, position: DVec3) -> Result<(), MeshError> {
    if !self.is_vertex(vertex) {
      return Err(MeshError::InvalidVertex(vertex));
    }
    self.positions[vertex as usize] = position;
    Ok(())
  }

  #[inline]
  pub fn triangle(&self, triangle: u32) -> Option<[u32; 3]> {
    self.is_triangle(triangle).then(|| self.triangles[triangle as usize])
  }

  /// Corner positions of a live triangle.
  pub fn triangle_positions(&self, triangle: u32) -> Option<[DVec3; 3]> {
    let [a, b, c] = self.triangle(triangle)?;
    Some([
      self.positions[a as usize],
      self.positions[b as usize],
      self.positions[c as usize],
    ])
  }

  /// Unnormalized face normal `(b - a) x (c - a)`; its length is twice the
  /// triangle area.
  pub fn triangle_cross(&self, triangle: u32) -> Option<DVec3> {
    let [a, b, c] = self.triangle_positions(triangle)?;
    Some((b - a).cross(c - a))
  }

  /// Live triangles referencing `vertex`.
  #[inline]
  pub fn vertex_triangles(&self, vertex: u32) -> &[u32] {
    self
      .vertex_triangles
      .get(vertex as usize)
      .map(|list| list.as_slice())
      .unwrap_or(&[])
  }

  /// Distinct vertices sharing a triangle with `vertex`.
  pub fn vertex_neighbors(&self, vertex: u32) -> SmallVec<[u32; 12]> {
    let mut neighbors = SmallVec::new();
    for &triangle in self.vertex_triangles(vertex) {
      for corner in self.triangles[triangle as usize] {
        if corner != vertex && !neighbors.contains(&corner) {
          neighbors.push(corner);
        }
      }
    }
    neighbors
  }

  /// Number of live triangles using the edge `a-b`.
  pub fn edge_triangle_count(&self, a: u32, b: u32) -> usize {
    self
      .vertex_triangles(a)
      .iter()
      .filter(|&&t| self.triangles[t as usize].contains(&b))
      .count()
  }

  /// A vertex on an edge used by exactly one triangle.
  pub fn is_boundary_vertex(&self, vertex: u32) -> bool {
    self
      .vertex_neighbors(vertex)
      .iter()
      .any(|&n| self.edge_triangle_count(vertex, n) == 1)
  }

  pub fn boundary_vertices(&self) -> Vec<u32> {
    self.vertex_ids().filter(|&v| self.is_boundary_vertex(v)).collect()
  }

  // ---------------------------------------------------------------------------
  // Edits
  // ---------------------------------------------------------------------------

  pub fn append_vertex(&mut self, position: DVec3) -> u32 {
    let id = self.positions.len() as u32;
    self.positions.push(position);
    self.vertex_alive.push(true);
    self.vertex_triangles.push(TriangleList::new());
    self.vertex_count += 1;
    id
  }

  pub fn append_triangle(&mut self, triangle: [u32; 3]) -> Result<u32, MeshError> {
    let [a, b, c] = triangle;
    for vertex in triangle {
      if !self.is_vertex(vertex) {
        return Err(MeshError::InvalidVertex(vertex));
      }
    }
    if a == b || b == c || a == c {
      return Err(MeshError::DegenerateTriangle(a, b, c));
    }

    let id = self.triangles.len() as u32;
    self.triangles.push(triangle);
    self.triangle_alive.push(true);
    for vertex in triangle {
      self.vertex_triangles[vertex as usize].push(id);
    }
    self.triangle_count += 1;
    Ok(id)
  }

  pub fn remove_triangle(&mut self, triangle: u32) -> Result<(), MeshError> {
    if !self.is_triangle(triangle) {
      return Err(MeshError::InvalidTriangle(triangle));
    }
    for vertex in self.triangles[triangle as usize] {
      self.vertex_triangles[vertex as usize].retain(|t| *t != triangle);
    }
    self.triangle_alive[triangle as usize] = false;
    self.triangle_count -= 1;
    Ok(())
  }

  /// Remove a vertex that no triangle references.
  pub fn remove_vertex(&mut self, vertex: u32) -> Result<(), MeshError> {
    if !self.is_vertex(vertex) {
      return Err(MeshError::InvalidVertex(vertex));
    }
    if !self.vertex_triangles[vertex as usize].is_empty() {
      return Err(MeshError::VertexInUse(vertex));
    }
    self.vertex_alive[vertex as usize] = false;
    self.vertex_count -= 1;
    Ok(())
  }

  /// Rewrite every triangle of `from` to use `to` instead. Triangles that
  /// already contain `to` must have been removed by the caller.
  pub(crate) fn reassign_vertex(&mut self, from: u32, to: u32) {
    let moved = std::mem::take(&mut self.vertex_triangles[from as usize]);
    for &triangle in &moved {
      for corner in self.triangles[triangle as usize].iter_mut() {
        if *corner == from {
          *corner = to;
        }
      }
    }
    self.vertex_triangles[to as usize].extend(moved);
  }

  /// Reverse the winding of every triangle.
  pub fn reverse_orientation(&mut self) {
    for triangle in self.triangles.iter_mut() {
      triangle.swap(0, 2);
    }
  }

  /// Drop removed elements and renumber the rest densely, preserving order.
  pub fn compact(&mut self) -> CompactMap {
    let mut map = CompactMap {
      vertices: vec![None; self.positions.len()],
      triangles: vec![None; self.triangles.len()],
    };

    let mut positions = Vec::with_capacity(self.vertex_count);
    for (old, &alive) in self.vertex_alive.iter().enumerate() {
      if alive {
        map.vertices[old] = Some(positions.len() as u32);
        positions.push(self.positions[old]);
      }
    }

    let mut triangles = Vec::with_capacity(self.triangle_count);
    let mut vertex_triangles = vec![TriangleList::new(); positions.len()];
    for (old, &alive) in self.triangle_alive.iter().enumerate() {
      if !alive {
        continue;
      }
      let id = triangles.len() as u32;
      let mut remapped = [0u32; 3];
      for (slot, vertex) in remapped.iter_mut().zip(self.triangles[old]) {
        // Live triangles only reference live vertices.
        if let Some(new) = map.vertices[vertex as usize] {
          *slot = new;
          vertex_triangles[new as usize].push(id);
        }
      }
      map.triangles[old] = Some(id);
      triangles.push(remapped);
    }

    self.vertex_alive = vec![true; positions.len()];
    self.triangle_alive = vec![true; triangles.len()];
    self.vertex_count = positions.len();
    self.triangle_count = triangles.len();
    self.positions = positions;
    self.triangles = triangles;
    self.vertex_triangles = vertex_triangles;
    map
  }

  // ---------------------------------------------------------------------------
  // Export
  // ---------------------------------------------------------------------------

  /// Positions of live vertices in id order.
  pub fn positions(&self) -> Vec<DVec3> {
    self.vertex_ids().map(|v| self.positions[v as usize]).collect()
  }

  /// Live triangles in id order. Indices are raw vertex ids, so compact the
  /// mesh first when they must address [`Self::positions`].
  pub fn triangles(&self) -> Vec<[u32; 3]> {
    self.triangle_ids().map(|t| self.triangles[t as usize]).collect()
  }

  /// Flat index buffer of [`Self::triangles`].
  pub fn indices(&self) -> Vec<u32> {
    self.triangles().into_iter().flatten().collect()
  }
}

#[cfg(test)]
#[path = "mesh_test.rs"]
mod mesh_test;
