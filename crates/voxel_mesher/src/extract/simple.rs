//! Classic case-table marching cubes.

use glam::IVec3;

use super::{vertex_interp, Extractor};
use crate::constants::CUBE_CORNER_OFFSETS;
use crate::density::DensitySource;
use crate::tables::{CUBE_EDGE_CORNERS, CUBE_EDGE_TABLE, TRIANGLE_TABLE};

impl<S: DensitySource + ?Sized> Extractor<'_, S> {
  /// Emit the triangles of the cube whose lowest corner is `cell`.
  pub(super) fn polygonize_cube(&mut self, cell: IVec3) {
    let iso_level = self.settings.iso_level;

    let mut values = [0.0; 8];
    let mut config = 0usize;
    for (corner, offset) in CUBE_CORNER_OFFSETS.iter().enumerate() {
      values[corner] = self.field.value(cell + *offset);
      if values[corner] >= iso_level {
        config |= 1 << corner;
      }
    }

    let crossed = CUBE_EDGE_TABLE[config];
    if crossed == 0 {
      return;
    }

    let mut edge_vertices = [0u32; 12];
    for (edge, &[a, b]) in CUBE_EDGE_CORNERS.iter().enumerate() {
      if crossed & (1 << edge) == 0 {
        continue;
      }
      let (a, b) = (a as usize, b as usize);
      let position = vertex_interp(
        cell + CUBE_CORNER_OFFSETS[a],
        cell + CUBE_CORNER_OFFSETS[b],
        values[a],
        values[b],
        iso_level,
      );
      edge_vertices[edge] = self.position_vertex(position);
    }

    for triangle in TRIANGLE_TABLE[config].chunks_exact(3) {
      if triangle[0] < 0 {
        break;
      }
      self.add_triangle(
        edge_vertices[triangle[0] as usize],
        edge_vertices[triangle[1] as usize],
        edge_vertices[triangle[2] as usize],
      );
    }
  }
}
