//! Marching tetrahedra over a six-way cube split.
//!
//! The density is linear inside each tetrahedron, so its iso-surface is a
//! plane separating the inside corners from the outside ones. Triangles are
//! oriented against that separation: the face normal must point from the
//! outside corners' centroid toward the inside corners' centroid.

use glam::{DVec3, IVec3};

use super::{vertex_interp, Extractor};
use crate::constants::CUBE_CORNER_OFFSETS;
use crate::density::DensitySource;
use crate::tables::{TETRAHEDRA, TETRA_CASES};

impl<S: DensitySource + ?Sized> Extractor<'_, S> {
  pub(super) fn polygonize_tetrahedra(&mut self, cell: IVec3) {
    let iso_level = self.settings.iso_level;

    let mut values = [0.0; 8];
    for (corner, offset) in CUBE_CORNER_OFFSETS.iter().enumerate() {
      values[corner] = self.field.value(cell + *offset);
    }

    for tetrahedron in TETRAHEDRA {
      let corners = tetrahedron.map(|c| c as usize);

      let mut config = 0usize;
      let (mut inside, mut outside) = (DVec3::ZERO, DVec3::ZERO);
      let mut inside_count = 0;
      for (i, &corner) in corners.iter().enumerate() {
        let position = CUBE_CORNER_OFFSETS[corner].as_dvec3();
        if values[corner] >= iso_level {
          config |= 1 << i;
          inside += position;
          inside_count += 1;
        } else {
          outside += position;
        }
      }

      let case = TETRA_CASES[config];
      if case.count == 0 {
        continue;
      }
      let toward_inside =
        inside / inside_count as f64 - outside / (corners.len() - inside_count) as f64;

      for &triangle in &case.triangles[..case.count as usize] {
        let points = triangle.map(|[a, b]| {
          let (a, b) = (corners[a as usize], corners[b as usize]);
          vertex_interp(
            cell + CUBE_CORNER_OFFSETS[a],
            cell + CUBE_CORNER_OFFSETS[b],
            values[a],
            values[b],
            iso_level,
          )
        });
        let [a, b, c] = points.map(|p| self.position_vertex(p));

        let normal = (points[1] - points[0]).cross(points[2] - points[0]);
        if normal.dot(toward_inside) >= 0.0 {
          self.add_triangle(a, b, c);
        } else {
          self.add_triangle(a, c, b);
        }
      }
    }
  }
}
