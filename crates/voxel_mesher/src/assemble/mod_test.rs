use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use glam::IVec3;

use super::*;
use crate::control::CancellationToken;
use crate::error::{ConfigError, MesherError};
use crate::extract::extract;
use crate::samplers::SingleVoxelDensity;
use crate::test_utils::small_settings;
use crate::types::{
  Algorithm, DensityPoint, ExtractionOptions, LinearColor, QuadricKind, SimplifierSettings,
};

/// Density falling off linearly with distance from the grid center, so the
/// gradient is radial everywhere.
fn radial(units: IVec3, radius: f64) -> impl Fn(IVec3) -> DensityPoint + Send + Sync {
  let center = units.as_dvec3() * 0.5;
  move |c: IVec3| {
    let value = 0.5 + (radius - c.as_dvec3().distance(center)) * 0.25;
    let color = LinearColor::new(c.x as f32, c.y as f32, c.z as f32, 1.0);
    DensityPoint::new(value, color)
  }
}

fn sphere_settings() -> Settings {
  Settings::new()
    .with_units(IVec3::splat(16))
    .with_resolution(100.0)
}

fn extract_with<S: DensitySource>(settings: &Settings, source: &S) -> DynamicMesh {
  let options = ExtractionOptions::new().with_algorithm(Algorithm::Simple);
  extract(settings, &options, source, &mut RunControl::default()).unwrap()
}

fn assemble_with<S: DensitySource>(
  settings: &Settings,
  options: AssemblyOptions,
  source: &S,
  mesh: &mut DynamicMesh,
) -> Vec<MeshData> {
  assemble(settings, &options, source, mesh, &mut RunControl::default()).unwrap()
}

#[test]
fn test_invalid_lod_quality_is_rejected() {
  let settings = small_settings();
  let source = SingleVoxelDensity::around_iso(IVec3::splat(4), settings.iso_level);
  let options = AssemblyOptions::new()
    .with_lod(SimplifierSettings::new())
    .with_lod(SimplifierSettings::new().with_quality(1.5));

  let result = MeshAssembler::new(settings, options, &source);
  assert!(matches!(
    result,
    Err(MesherError::Config(ConfigError::InvalidQuality { lod: 1, .. }))
  ));
}

#[test]
fn test_degenerate_mesh_yields_empty_lod() {
  let settings = small_settings();
  let source = SingleVoxelDensity::around_iso(IVec3::splat(4), settings.iso_level);

  let mut empty = DynamicMesh::new();
  let output = assemble_with(&settings, AssemblyOptions::new(), &source, &mut empty);
  assert_eq!(output.len(), 1);
  assert!(output[0].is_empty());

  // Three vertices but no triangle.
  let mut points = DynamicMesh::from_buffers(&[DVec3::ZERO, DVec3::X, DVec3::Y], &[]);
  let options = AssemblyOptions::new()
    .with_lod(SimplifierSettings::new())
    .with_lod(SimplifierSettings::new().with_quality(0.5));
  let output = assemble_with(&settings, options, &source, &mut points);
  assert_eq!(output.len(), 2);
  assert!(output.iter().all(|lod| lod.is_empty() && lod.indices.is_empty()));
}

#[test]
fn test_attribute_arrays_are_parallel() {
  let settings = sphere_settings();
  let source = radial(settings.units, 4.7);
  let mut mesh = extract_with(&settings, &source);
  let (vertices, triangles) = (mesh.vertex_count(), mesh.triangle_count());

  let output = assemble_with(&settings, AssemblyOptions::new(), &source, &mut mesh);
  assert_eq!(output.len(), 1);
  let lod = &output[0];
  assert_eq!(lod.vertex_count(), vertices);
  assert_eq!(lod.triangle_count(), triangles);
  assert_eq!(lod.normals.len(), vertices);
  assert_eq!(lod.tangents.len(), vertices);
  assert_eq!(lod.uvs.len(), vertices);
  assert_eq!(lod.colors.len(), vertices);
  assert!(lod.indices.iter().all(|&i| (i as usize) < vertices));
  assert_eq!(lod.indices, mesh.indices());
}

#[test]
fn test_positions_colors_uvs_and_bounds() {
  let settings = sphere_settings();
  let source = radial(settings.units, 4.7);
  let mut mesh = extract_with(&settings, &source);
  let voxels = mesh.positions();

  let output = assemble_with(&settings, AssemblyOptions::new(), &source, &mut mesh);
  let lod = &output[0];
  assert!(lod.bounds.is_valid());

  for (index, voxel) in voxels.into_iter().enumerate() {
    let local = lod.positions[index];
    assert_eq!(local, voxel_to_local_location(voxel, &settings));
    assert_eq!(lod.colors[index], source(voxel.as_ivec3()).color);
    assert_eq!(lod.uvs[index], local.truncate() / settings.resolution);
    assert!(local.cmpge(lod.bounds.min).all() && local.cmple(lod.bounds.max).all());
  }

  // Sphere of radius 4.7 voxels around the local origin.
  let extent = lod.bounds.size() / settings.resolution;
  assert!(extent.cmpgt(DVec3::splat(8.0)).all(), "{extent}");
  assert!(extent.cmplt(DVec3::splat(11.0)).all(), "{extent}");
}

#[test]
fn test_normals_point_outward() {
  let modes = [NormalMode::GradientAdvanced, NormalMode::GradientBasic, NormalMode::Triangle];
  for inverted in [false, true] {
    let settings = sphere_settings().with_inverted(inverted);
    let source = radial(settings.units, 4.7);
    let center = voxel_to_local_location(settings.units.as_dvec3() * 0.5, &settings);

    for mode in modes {
      let mut mesh = extract_with(&settings, &source);
      let options = AssemblyOptions::new().with_normal_mode(mode);
      let lod = &assemble_with(&settings, options, &source, &mut mesh)[0];

      for (position, normal) in lod.positions.iter().zip(&lod.normals) {
        let radial = (*position - center).normalize();
        assert!((normal.length() - 1.0).abs() < 1e-9, "{mode:?}: {normal}");
        assert!(
          normal.dot(radial) > 0.5,
          "{mode:?} inverted={inverted}: normal {normal} at {position}"
        );
      }
    }
  }
}

#[test]
fn test_tangents_are_perpendicular() {
  for inverted in [false, true] {
    let settings = sphere_settings().with_inverted(inverted);
    let source = radial(settings.units, 4.7);
    let mut mesh = extract_with(&settings, &source);
    let lod = &assemble_with(&settings, AssemblyOptions::new(), &source, &mut mesh)[0];

    for (tangent, normal) in lod.tangents.iter().zip(&lod.normals) {
      assert!(tangent.x.dot(*normal).abs() < 1e-9);
      assert!((tangent.x.length() - 1.0).abs() < 1e-9);
      assert_eq!(tangent.flip_y, inverted);
    }
  }
}

#[test]
fn test_flat_triangle_normals_pick_one_face() {
  let settings = small_settings();
  let source = SingleVoxelDensity::around_iso(IVec3::splat(4), settings.iso_level);
  let face = 1.0 / 3.0_f64.sqrt();

  let mut mesh = extract_with(&settings, &source);
  let smooth = AssemblyOptions::new().with_normal_mode(NormalMode::Triangle);
  let lod = &assemble_with(&settings, smooth, &source, &mut mesh)[0];
  // Octahedron vertices average their four faces into the axis direction.
  let center = voxel_to_local_location(DVec3::splat(4.0), &settings);
  for (position, normal) in lod.positions.iter().zip(&lod.normals) {
    let axis = (*position - center).normalize();
    assert!(normal.distance(axis) < 1e-9, "{normal} at {position}");
  }

  let mut mesh = extract_with(&settings, &source);
  let flat = AssemblyOptions::new()
    .with_normal_mode(NormalMode::Triangle)
    .with_flat_shading(true);
  let lod = &assemble_with(&settings, flat, &source, &mut mesh)[0];
  for normal in &lod.normals {
    assert!((normal.abs() - DVec3::splat(face)).abs().max_element() < 1e-9, "{normal}");
  }
}

#[test]
fn test_lods_are_cumulative() {
  let settings = sphere_settings();
  let source = radial(settings.units, 4.7);
  let mut mesh = extract_with(&settings, &source);
  let full = mesh.vertex_count();

  let options = AssemblyOptions::new()
    .with_lod(SimplifierSettings::new())
    .with_lod(SimplifierSettings::new().with_quality(0.5))
    .with_lod(
      SimplifierSettings::new()
        .with_quality(0.5)
        .with_quadric(QuadricKind::VolumePreserving),
    );
  let output = assemble_with(&settings, options, &source, &mut mesh);

  assert_eq!(output.len(), 3);
  assert_eq!(output[0].vertex_count(), full);
  assert!(output[1].vertex_count() <= full / 2);
  // The third LOD halves the second, not the full mesh.
  assert!(output[2].vertex_count() <= output[1].vertex_count() / 2);
  assert!(output[2].vertex_count() > 0);
  assert_eq!(mesh.vertex_count(), output[2].vertex_count());
}

#[test]
fn test_checkpoint_per_triangle_and_vertex() {
  let settings = small_settings();
  let source = SingleVoxelDensity::around_iso(IVec3::splat(4), settings.iso_level);
  let mut mesh = extract_with(&settings, &source);

  let hits = Arc::new(AtomicUsize::new(0));
  let sink = Arc::clone(&hits);
  let mut control = RunControl::default().with_checkpoint(move |_| {
    sink.fetch_add(1, Ordering::Relaxed);
  });
  let options = AssemblyOptions::new().with_reset_runaway_iteration_count(1);
  assemble(&settings, &options, &source, &mut mesh, &mut control).unwrap();

  // Octahedron: 8 triangles and 6 vertices.
  assert_eq!(hits.load(Ordering::Relaxed), 14);
}

#[test]
fn test_cancelled_assembly() {
  let settings = small_settings();
  let source = SingleVoxelDensity::around_iso(IVec3::splat(4), settings.iso_level);
  let mut mesh = extract_with(&settings, &source);

  let token = CancellationToken::new();
  token.cancel();
  let result = assemble(
    &settings,
    &AssemblyOptions::new(),
    &source,
    &mut mesh,
    &mut RunControl::new(token),
  );
  assert!(matches!(result, Err(MesherError::Cancelled)));
}
