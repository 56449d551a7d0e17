//! Greedy edge-collapse simplification.
//!
//! # Algorithm
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │ 1. Per-vertex quadric = sum of incident triangle quadrics            │
//! │ 2. Every edge → candidate (error, kept vertex, removed vertex, pos)  │
//! │ 3. Pop cheapest candidate; skip if either vertex changed since       │
//! │ 4. Validate (link condition, duplicates, flips, boundary rule)       │
//! │ 5. Collapse: removed vertex's triangles move to the kept vertex      │
//! │ 6. Re-queue every edge around the kept vertex                        │
//! │ 7. Repeat until the target count is met or the queue runs dry        │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Candidates are invalidated lazily: each vertex carries a stamp that is
//! bumped on every change, and a candidate only applies while both stamps it
//! captured are current.
//!
//! # Boundary rule
//!
//! With boundary preservation on, an edge between two boundary vertices
//! never collapses, and an interior vertex collapsing into a boundary vertex
//! lands exactly on it. Boundary vertices therefore never move or vanish.
//!
//! Vertices on an edge shared by more than two triangles are locked.

mod quadric;

pub use quadric::{ErrorQuadric, QuadricError, VolumePreservingQuadric};

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use glam::DVec3;
use smallvec::SmallVec;
use tracing::{debug, debug_span, warn};

use crate::control::RunControl;
use crate::error::{MeshError, Result};
use crate::mesh::DynamicMesh;
use crate::types::{QuadricKind, SimplifierSettings, TargetKind};

/// Squared length under which a face normal counts as degenerate.
const DEGENERATE_AREA: f64 = 1.0e-20;

/// Edge collapse candidate in the priority queue.
#[derive(Debug)]
struct CollapseCandidate {
  error: f64,
  keep: u32,
  remove: u32,
  position: DVec3,
  stamps: (u32, u32),
}

impl PartialEq for CollapseCandidate {
  fn eq(&self, other: &Self) -> bool {
    self.cmp(other) == Ordering::Equal
  }
}

impl Eq for CollapseCandidate {}

impl PartialOrd for CollapseCandidate {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
    Some(self.cmp(other))
  }
}

impl Ord for CollapseCandidate {
  fn cmp(&self, other: &Self) -> Ordering {
    // Min-heap on error, NaN sorts last.
    other.error.total_cmp(&self.error)
  }
}

/// Edge-collapse simplifier over a [`DynamicMesh`], generic over the error
/// metric.
pub struct MeshSimplifier<'m, Q: ErrorQuadric> {
  mesh: &'m mut DynamicMesh,
  quadrics: Vec<Q>,
  stamps: Vec<u32>,
  locked: Vec<bool>,
  preserve_boundary: bool,
  collapses: usize,
}

impl<'m, Q: ErrorQuadric> MeshSimplifier<'m, Q> {
  pub fn new(mesh: &'m mut DynamicMesh) -> Self {
    Self {
      mesh,
      quadrics: Vec::new(),
      stamps: Vec::new(),
      locked: Vec::new(),
      preserve_boundary: true,
      collapses: 0,
    }
  }

  pub fn with_preserve_boundary(mut self, preserve: bool) -> Self {
    self.preserve_boundary = preserve;
    self
  }

  /// Collapses applied so far.
  pub fn collapse_count(&self) -> usize {
    self.collapses
  }

  /// Collapse edges until at most `target` vertices remain. A target at or
  /// above the current count is a no-op.
  pub fn simplify_to_vertex_count(&mut self, target: usize, control: &RunControl) -> Result<()> {
    self.reduce(|mesh| mesh.vertex_count() <= target, control)
  }

  /// Collapse edges until at most `target` triangles remain.
  pub fn simplify_to_triangle_count(
    &mut self,
    target: usize,
    control: &RunControl,
  ) -> Result<()> {
    self.reduce(|mesh| mesh.triangle_count() <= target, control)
  }

  fn reduce(&mut self, done: impl Fn(&DynamicMesh) -> bool, control: &RunControl) -> Result<()> {
    if done(&*self.mesh) {
      return Ok(());
    }

    let mut heap = self.initialize();
    while !done(&*self.mesh) {
      control.check()?;
      let Some(candidate) = heap.pop() else {
        debug!(
          vertices = self.mesh.vertex_count(),
          triangles = self.mesh.triangle_count(),
          "no valid collapse left"
        );
        break;
      };

      let (keep, remove) = (candidate.keep, candidate.remove);
      if !self.mesh.is_vertex(keep)
        || !self.mesh.is_vertex(remove)
        || candidate.stamps != (self.stamps[keep as usize], self.stamps[remove as usize])
      {
        continue;
      }
      if !self.can_collapse(keep, remove, candidate.position) {
        continue;
      }
      if let Err(err) = self.collapse(keep, remove, candidate.position) {
        warn!(%err, keep, remove, "collapse failed");
        continue;
      }
      self.collapses += 1;

      for neighbor in self.mesh.vertex_neighbors(keep) {
        if let Some(candidate) = self.candidate(keep, neighbor) {
          heap.push(candidate);
        }
      }
    }
    Ok(())
  }

  /// Build per-vertex quadrics, lock flags and the initial queue.
  fn initialize(&mut self) -> BinaryHeap<CollapseCandidate> {
    let vertex_slots = self.mesh.max_vertex_id() as usize;
    self.quadrics = vec![Q::default(); vertex_slots];
    self.stamps.resize(vertex_slots, 0);
    self.locked = vec![false; vertex_slots];

    for triangle in self.mesh.triangle_ids() {
      let (Some(corners), Some([a, b, c])) = (
        self.mesh.triangle(triangle),
        self.mesh.triangle_positions(triangle),
      ) else {
        continue;
      };
      let quadric = Q::from_triangle(a, b, c);
      for vertex in corners {
        self.quadrics[vertex as usize] = self.quadrics[vertex as usize].add(&quadric);
      }
    }

    let mut heap = BinaryHeap::new();
    let vertices: Vec<u32> = self.mesh.vertex_ids().collect();
    for &vertex in &vertices {
      self.locked[vertex as usize] = self
        .mesh
        .vertex_neighbors(vertex)
        .iter()
        .any(|&n| self.mesh.edge_triangle_count(vertex, n) > 2);
    }
    for vertex in vertices {
      for neighbor in self.mesh.vertex_neighbors(vertex) {
        if vertex < neighbor {
          if let Some(candidate) = self.candidate(vertex, neighbor) {
            heap.push(candidate);
          }
        }
      }
    }
    heap
  }

  /// Collapse candidate for the edge `a-b`, honouring the boundary rule.
  fn candidate(&self, a: u32, b: u32) -> Option<CollapseCandidate> {
    if self.locked[a as usize] || self.locked[b as usize] {
      return None;
    }
    let (pa, pb) = (self.mesh.vertex(a)?, self.mesh.vertex(b)?);
    let quadric = self.quadrics[a as usize].add(&self.quadrics[b as usize]);

    let (keep, remove, position) = if self.preserve_boundary {
      match (self.mesh.is_boundary_vertex(a), self.mesh.is_boundary_vertex(b)) {
        (true, true) => return None,
        (true, false) => (a, b, pa),
        (false, true) => (b, a, pb),
        (false, false) => (a, b, quadric.optimal_point(pa, pb)),
      }
    } else {
      (a, b, quadric.optimal_point(pa, pb))
    };

    Some(CollapseCandidate {
      error: quadric.evaluate(position),
      keep,
      remove,
      position,
      stamps: (self.stamps[keep as usize], self.stamps[remove as usize]),
    })
  }

  /// Topology and geometry checks for moving `keep` to `position` and
  /// merging `remove` into it.
  fn can_collapse(&self, keep: u32, remove: u32, position: DVec3) -> bool {
    let mesh = &*self.mesh;

    // Triangles on the edge, and the vertices opposite it.
    let shared: SmallVec<[u32; 4]> = mesh
      .vertex_triangles(remove)
      .iter()
      .copied()
      .filter(|&t| mesh.triangle(t).is_some_and(|tri| tri.contains(&keep)))
      .collect();
    if shared.is_empty() {
      return false;
    }

    // Link condition: the only common neighbours are the opposite vertices.
    let keep_neighbors = mesh.vertex_neighbors(keep);
    let common = mesh
      .vertex_neighbors(remove)
      .iter()
      .filter(|&n| keep_neighbors.contains(n))
      .count();
    if common != shared.len() {
      return false;
    }

    // Two boundary vertices joined by an interior edge would pinch.
    if shared.len() > 1 && mesh.is_boundary_vertex(keep) && mesh.is_boundary_vertex(remove) {
      return false;
    }

    // The removed vertex's surviving triangles must not duplicate existing
    // triangles of the kept vertex.
    for &triangle in mesh.vertex_triangles(remove) {
      if shared.contains(&triangle) {
        continue;
      }
      let Some(corners) = mesh.triangle(triangle) else {
        continue;
      };
      let mut moved = corners.map(|v| if v == remove { keep } else { v });
      moved.sort_unstable();
      let duplicate = mesh.vertex_triangles(keep).iter().any(|&other| {
        mesh.triangle(other).is_some_and(|mut existing| {
          existing.sort_unstable();
          existing == moved
        })
      });
      if duplicate {
        return false;
      }
    }

    // No surviving triangle may flip or collapse to zero area.
    for vertex in [keep, remove] {
      for &triangle in mesh.vertex_triangles(vertex) {
        if shared.contains(&triangle) {
          continue;
        }
        let (Some(corners), Some(positions)) =
          (mesh.triangle(triangle), mesh.triangle_positions(triangle))
        else {
          continue;
        };
        let before = (positions[1] - positions[0]).cross(positions[2] - positions[0]);
        if before.length_squared() <= DEGENERATE_AREA {
          continue;
        }
        let mut after = positions;
        for (slot, corner) in after.iter_mut().zip(corners) {
          if corner == keep || corner == remove {
            *slot = position;
          }
        }
        let after = (after[1] - after[0]).cross(after[2] - after[0]);
        if after.dot(before) <= 0.0 || after.length_squared() <= DEGENERATE_AREA {
          return false;
        }
      }
    }
    true
  }

  fn collapse(
    &mut self,
    keep: u32,
    remove: u32,
    position: DVec3,
  ) -> std::result::Result<(), MeshError> {
    let shared: SmallVec<[u32; 4]> = self
      .mesh
      .vertex_triangles(remove)
      .iter()
      .copied()
      .filter(|&t| self.mesh.triangle(t).is_some_and(|tri| tri.contains(&keep)))
      .collect();

    let mut opposite: SmallVec<[u32; 4]> = SmallVec::new();
    for &triangle in &shared {
      if let Some(corners) = self.mesh.triangle(triangle) {
        opposite.extend(corners.into_iter().filter(|&v| v != keep && v != remove));
      }
      self.mesh.remove_triangle(triangle)?;
    }

    self.mesh.reassign_vertex(remove, keep);
    self.mesh.remove_vertex(remove)?;
    self.mesh.set_vertex(keep, position)?;

    self.quadrics[keep as usize] = self.quadrics[keep as usize].add(&self.quadrics[remove as usize]);
    self.stamps[keep as usize] = self.stamps[keep as usize].wrapping_add(1);

    for vertex in opposite {
      if self.mesh.is_vertex(vertex) && self.mesh.vertex_triangles(vertex).is_empty() {
        self.mesh.remove_vertex(vertex)?;
      }
    }
    Ok(())
  }
}

/// Simplify `mesh` as requested by one LOD entry, then compact it.
///
/// Quality is clamped to `[0, 1]`. A quality of (nearly) one or a target
/// count of zero leaves the mesh untouched. Returns the number of collapses.
pub fn simplify(
  mesh: &mut DynamicMesh,
  lod: &SimplifierSettings,
  control: &RunControl,
) -> Result<usize> {
  let quality = lod.quality.clamp(0.0, 1.0);
  if (1.0 - quality).abs() <= f64::EPSILON {
    return Ok(0);
  }

  let current = match lod.target {
    TargetKind::VertexCount => mesh.vertex_count(),
    TargetKind::TriangleCount => mesh.triangle_count(),
  };
  let target = (current as f64 * quality).floor() as usize;
  if target == 0 {
    return Ok(0);
  }

  let span = debug_span!("simplify", quadric = ?lod.quadric, target_kind = ?lod.target, target);
  let _enter = span.enter();

  let collapses = match lod.quadric {
    QuadricKind::Qem => run::<QuadricError>(mesh, lod, target, control)?,
    QuadricKind::VolumePreserving => run::<VolumePreservingQuadric>(mesh, lod, target, control)?,
  };
  control.check()?;
  mesh.compact();

  debug!(
    collapses,
    vertices = mesh.vertex_count(),
    triangles = mesh.triangle_count(),
    "simplified"
  );
  Ok(collapses)
}

fn run<Q: ErrorQuadric>(
  mesh: &mut DynamicMesh,
  lod: &SimplifierSettings,
  target: usize,
  control: &RunControl,
) -> Result<usize> {
  let mut simplifier = MeshSimplifier::<Q>::new(mesh).with_preserve_boundary(lod.preserve_boundary);
  match lod.target {
    TargetKind::VertexCount => simplifier.simplify_to_vertex_count(target, control)?,
    TargetKind::TriangleCount => simplifier.simplify_to_triangle_count(target, control)?,
  }
  Ok(simplifier.collapse_count())
}
