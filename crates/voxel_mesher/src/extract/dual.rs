//! Dual marching cubes.
//!
//! Instead of placing vertices on grid edges, every crossing patch of a cell
//! gets one vertex (the average of its edge crossings). Each crossed grid
//! edge is then surrounded by a quad joining the patch vertices of the four
//! cells that share it.
//!
//! ```text
//!   X edge from c to c+x, looking down -X:
//!
//!        c-y ─────── c              quad = (c, c-z, c-y-z, c-y)
//!         │          │
//!         │    ●     │  ← crossing
//!         │          │
//!     c-y-z ─────── c-z
//! ```

use glam::{DVec3, IVec3};

use super::Extractor;
use crate::constants::DUAL_CORNER_OFFSETS;
use crate::density::DensitySource;
use crate::tables::{DUAL_EDGE_CORNERS, DUAL_POINTS, NOT_PROBLEMATIC, PROBLEMATIC_CONFIGS};

/// For each axis: the four cells around the positive grid edge leaving a
/// voxel, as (offset subtracted from the voxel, edge bit within that cell).
const QUAD_CELLS: [[(IVec3, u16); 4]; 3] = [
  [
    (IVec3::ZERO, 1),
    (IVec3::Z, 4),
    (IVec3::new(0, 1, 1), 64),
    (IVec3::Y, 16),
  ],
  [
    (IVec3::ZERO, 256),
    (IVec3::Z, 2048),
    (IVec3::new(1, 0, 1), 1024),
    (IVec3::X, 512),
  ],
  [
    (IVec3::ZERO, 8),
    (IVec3::X, 2),
    (IVec3::new(1, 1, 0), 32),
    (IVec3::Y, 128),
  ],
];

impl<S: DensitySource + ?Sized> Extractor<'_, S> {
  /// Emit the quads around the three positive grid edges leaving `cell`.
  pub(super) fn polygonize_dual(&mut self, cell: IVec3) {
    let iso_level = self.settings.iso_level;
    let here = self.field.value(cell) >= iso_level;

    for (axis, quad) in QUAD_CELLS.iter().enumerate() {
      let there = self.field.value(cell + IVec3::AXES[axis]) >= iso_level;
      if here == there {
        continue;
      }

      let [v0, v1, v2, v3] = quad.map(|(offset, edge)| self.dual_vertex(cell - offset, edge));

      // The quad cell order turns the opposite way around Y and Z.
      let entering = !here;
      let reverse = if axis == 0 { entering } else { !entering };
      if reverse {
        self.add_triangle(v0, v3, v1);
        self.add_triangle(v3, v2, v1);
      } else {
        self.add_triangle(v0, v1, v3);
        self.add_triangle(v1, v2, v3);
      }
    }
  }

  /// Vertex for the patch of `cell` that contains `edge`.
  fn dual_vertex(&mut self, cell: IVec3, edge: u16) -> u32 {
    let code = self.dual_point_code(cell, edge);
    if !self.options.use_shared_points {
      let position = self.dual_point(cell, code);
      return self.mesh.append_vertex(position);
    }

    if let Some(&vertex) = self.dual_points.get(&(cell, code)) {
      return vertex;
    }
    let position = self.dual_point(cell, code);
    let vertex = self.mesh.append_vertex(position);
    self.dual_points.insert((cell, code), vertex);
    vertex
  }

  /// Corner configuration of `cell`: bit `i` set when dual corner `i` is
  /// inside.
  fn cell_config(&mut self, cell: IVec3) -> usize {
    let iso_level = self.settings.iso_level;
    let mut config = 0;
    for (corner, offset) in DUAL_CORNER_OFFSETS.iter().enumerate() {
      if self.field.value(cell + *offset) >= iso_level {
        config |= 1 << corner;
      }
    }
    config
  }

  /// Edge mask of the patch of `cell` containing `edge`, or 0.
  ///
  /// With manifold forcing, an ambiguous configuration whose neighbour
  /// across the ambiguous face is ambiguous as well is read inverted, so
  /// the two cells agree on how the face is split.
  fn dual_point_code(&mut self, cell: IVec3, edge: u16) -> u16 {
    let mut config = self.cell_config(cell);

    if self.options.force_manifold {
      let face = PROBLEMATIC_CONFIGS[config];
      if face != NOT_PROBLEMATIC {
        let axis = (face >> 1) as usize;
        let mut neighbor = cell;
        neighbor[axis] += if face & 1 == 1 { 1 } else { -1 };
        if neighbor[axis] >= 1 && neighbor[axis] < self.settings.units[axis] - 1 {
          let neighbor_config = self.cell_config(neighbor);
          if PROBLEMATIC_CONFIGS[neighbor_config] != NOT_PROBLEMATIC {
            config ^= 0xff;
          }
        }
      }
    }

    DUAL_POINTS[config]
      .iter()
      .copied()
      .find(|patch| patch & edge != 0)
      .unwrap_or(0)
  }

  /// Average of the edge crossings in patch `code`, offset by `cell`. An
  /// empty patch lands on the cell center.
  fn dual_point(&mut self, cell: IVec3, code: u16) -> DVec3 {
    let iso_level = self.settings.iso_level;
    let mut values = [0.0; 8];
    for (corner, offset) in DUAL_CORNER_OFFSETS.iter().enumerate() {
      values[corner] = self.field.value(cell + *offset);
    }

    let mut sum = DVec3::ZERO;
    let mut count = 0;
    for (edge, &[a, b]) in DUAL_EDGE_CORNERS.iter().enumerate() {
      if code & (1 << edge) == 0 {
        continue;
      }
      let (a, b) = (a as usize, b as usize);
      let t = (iso_level - values[a]) / (values[b] - values[a]);
      let (pa, pb) = (
        DUAL_CORNER_OFFSETS[a].as_dvec3(),
        DUAL_CORNER_OFFSETS[b].as_dvec3(),
      );
      sum += pa + (pb - pa) * t;
      count += 1;
    }

    if count == 0 {
      return cell.as_dvec3() + DVec3::splat(0.5);
    }
    cell.as_dvec3() + sum / count as f64
  }
}
