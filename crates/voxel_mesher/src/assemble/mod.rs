//! Render data assembly.
//!
//! Turns an extracted [`DynamicMesh`] into one [`MeshData`] per requested
//! LOD.
//!
//! # Per-LOD Flow
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────────┐
//! │ mesh ──► simplify(lod) ──► compact ──► ≥ 3 vertices, ≥ 1 triangle? │
//! │                                          │                 │       │
//! │                                          no                yes     │
//! │                                          ▼                 ▼       │
//! │                                    empty MeshData    triangle pass │
//! │                                                      vertex pass   │
//! └────────────────────────────────────────────────────────────────────┘
//!
//! triangle pass:  indices, face normals (NormalMode::Triangle)
//! vertex pass:    local position, gradient normal, tangent, color, UV,
//!                 bounds
//! ```
//!
//! LODs are cumulative: each one simplifies the mesh left behind by the
//! previous one, and the caller's mesh ends up at the last LOD. Clone the
//! mesh first to keep the full-resolution geometry.

pub mod normals;

use glam::DVec3;
use tracing::{debug, debug_span};

use crate::control::RunControl;
use crate::coords::voxel_to_local_location;
use crate::density::{DensityField, DensitySource};
use crate::error::Result;
use crate::mesh::DynamicMesh;
use crate::simplify::simplify;
use crate::types::{AssemblyOptions, MeshData, NormalMode, Settings};

use self::normals::{gradient_normal, outward_face_normal, tangent_for_normal};

/// Assemble every LOD of `mesh` in one call.
pub fn assemble<S: DensitySource + ?Sized>(
  settings: &Settings,
  options: &AssemblyOptions,
  source: &S,
  mesh: &mut DynamicMesh,
  control: &mut RunControl,
) -> Result<Vec<MeshData>> {
  MeshAssembler::new(*settings, options.clone(), source)?.assemble(mesh, control)
}

/// Per-vertex attribute builder with its own density cache.
pub struct MeshAssembler<'s, S: DensitySource + ?Sized> {
  settings: Settings,
  options: AssemblyOptions,
  field: DensityField<'s, S>,
}

impl<'s, S: DensitySource + ?Sized> MeshAssembler<'s, S> {
  /// Validates both configurations before anything is sampled.
  pub fn new(settings: Settings, options: AssemblyOptions, source: &'s S) -> Result<Self> {
    settings.validate()?;
    options.validate()?;
    let field = DensityField::new(&settings, source);
    Ok(Self {
      settings,
      options,
      field,
    })
  }

  pub fn settings(&self) -> &Settings {
    &self.settings
  }

  pub fn options(&self) -> &AssemblyOptions {
    &self.options
  }

  pub fn field(&self) -> &DensityField<'s, S> {
    &self.field
  }

  /// Simplify and assemble each LOD in order.
  ///
  /// Returns one entry per LOD; LODs left with fewer than three vertices or
  /// no triangles yield an empty [`MeshData`].
  pub fn assemble(
    &mut self,
    mesh: &mut DynamicMesh,
    control: &mut RunControl,
  ) -> Result<Vec<MeshData>> {
    let lods = self.options.effective_lods();
    let span = debug_span!("assemble", lods = lods.len(), normal_mode = ?self.options.normal_mode);
    let _enter = span.enter();

    let mut output = Vec::with_capacity(lods.len());
    for (index, lod) in lods.iter().enumerate() {
      control.check()?;
      let collapses = simplify(mesh, lod, control)?;
      if !mesh.is_compact() {
        mesh.compact();
      }

      let data = if mesh.vertex_count() >= 3 && mesh.triangle_count() > 0 {
        self.build(mesh, control)?
      } else {
        MeshData::new()
      };
      debug!(
        lod = index,
        collapses,
        vertices = data.vertex_count(),
        triangles = data.triangle_count(),
        "assembled LOD"
      );
      output.push(data);
    }
    Ok(output)
  }

  /// Attribute passes over a compact mesh.
  fn build(&mut self, mesh: &DynamicMesh, control: &mut RunControl) -> Result<MeshData> {
    let interval = self.options.reset_runaway_iteration_count;
    let mode = self.options.normal_mode;
    let flat = self.options.flat_shading;
    let inverted = self.settings.inverted;
    let resolution = self.settings.resolution;

    let vertex_count = mesh.vertex_count();
    let mut data = MeshData {
      positions: Vec::with_capacity(vertex_count),
      normals: vec![DVec3::ZERO; vertex_count],
      tangents: Vec::with_capacity(vertex_count),
      uvs: Vec::with_capacity(vertex_count),
      colors: Vec::with_capacity(vertex_count),
      indices: Vec::with_capacity(mesh.triangle_count() * 3),
      ..MeshData::default()
    };

    for (index, triangle) in mesh.triangle_ids().enumerate() {
      control.step(index, interval)?;
      let (Some(corners), Some(positions)) =
        (mesh.triangle(triangle), mesh.triangle_positions(triangle))
      else {
        continue;
      };
      data.indices.extend(corners);

      if mode == NormalMode::Triangle {
        // Area weighted; normalized in the vertex pass.
        let normal = outward_face_normal(positions, inverted);
        for corner in corners {
          let slot = &mut data.normals[corner as usize];
          if flat {
            *slot = normal;
          } else {
            *slot += normal;
          }
        }
      }
    }

    // Gradient normals are unit length already, so flat shading only
    // changes the triangle mode.
    for (index, voxel) in mesh.positions().into_iter().enumerate() {
      control.step(index, interval)?;
      let local = voxel_to_local_location(voxel, &self.settings);

      let normal = match mode {
        NormalMode::Triangle => data.normals[index].normalize_or_zero(),
        NormalMode::GradientBasic | NormalMode::GradientAdvanced => {
          gradient_normal(&mut self.field, voxel, mode)
        }
      };
      data.normals[index] = normal;
      data.tangents.push(tangent_for_normal(normal, inverted));
      data.colors.push(self.field.color(voxel.as_ivec3()));
      data.uvs.push(local.truncate() / resolution);
      data.bounds.encapsulate(local);
      data.positions.push(local);
    }

    Ok(data)
  }
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod mod_test;
