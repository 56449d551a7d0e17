use glam::{DVec3, IVec3};
use voxel_mesher::{Algorithm, NormalMode, QuadricKind, TargetKind};

use super::*;

#[test]
fn test_empty_job_uses_defaults() {
  let config = JobConfig::parse("").unwrap();
  assert_eq!(config.settings, Settings::default());
  assert_eq!(config.extraction, ExtractionOptions::default());
  assert_eq!(config.assembly, AssemblyOptions::default());
  assert!(matches!(config.shape, ShapeConfig::Sphere(_)));
}

#[test]
fn test_full_job() {
  let config = JobConfig::parse(
    r#"
[settings]
units = [16, 16, 24]
resolution = 50.0
inverted = true

[extraction]
algorithm = "dual"
force_manifold = false

[assembly]
normal_mode = "triangle"
flat_shading = true

[[lods]]
quality = 1.0

[[lods]]
quality = 0.4
quadric = "volume_preserving"
target = "triangle_count"

[shape]
kind = "sphere"
center = [8.0, 8.0, 12.0]
radius = 5.0
"#,
  )
  .unwrap();

  assert_eq!(config.settings.units, IVec3::new(16, 16, 24));
  assert_eq!(config.settings.resolution, 50.0);
  assert!(config.settings.inverted);
  assert_eq!(config.settings.iso_level, 0.5);
  assert_eq!(config.extraction.algorithm, Algorithm::Dual);
  assert!(!config.extraction.force_manifold);
  assert!(config.extraction.use_shared_points);
  assert_eq!(config.assembly.normal_mode, NormalMode::Triangle);
  assert!(config.assembly.flat_shading);

  assert!(config.lods.is_empty());
  assert_eq!(config.assembly.lods.len(), 2);
  let lod = config.assembly.lods[1];
  assert_eq!(lod.quality, 0.4);
  assert_eq!(lod.quadric, QuadricKind::VolumePreserving);
  assert_eq!(lod.target, TargetKind::TriangleCount);
  assert!(lod.preserve_boundary);

  match config.shape {
    ShapeConfig::Sphere(sphere) => {
      assert_eq!(sphere.center, DVec3::new(8.0, 8.0, 12.0));
      assert_eq!(sphere.radius, 5.0);
      assert_eq!(sphere.inside, 1.0);
    }
    other => panic!("unexpected shape {other:?}"),
  }
}

#[test]
fn test_other_shapes() {
  let plane = JobConfig::parse("[shape]\nkind = \"plane\"\nheight = 3.0\n").unwrap();
  assert!(matches!(plane.shape, ShapeConfig::Plane(p) if p.height == 3.0 && p.falloff == 0.25));

  let voxel = JobConfig::parse("[shape]\nkind = \"single_voxel\"\nvoxel = [2, 3, 4]\n").unwrap();
  assert!(matches!(voxel.shape, ShapeConfig::SingleVoxel(v) if v.voxel == IVec3::new(2, 3, 4)));

  let constant = JobConfig::parse("[shape]\nkind = \"constant\"\nvalue = 0.7\n").unwrap();
  let source = constant.shape.into_source();
  assert_eq!(source.density_at(IVec3::ZERO).value, 0.7);
}

#[test]
fn test_rejects_invalid_jobs() {
  assert!(JobConfig::parse("[settings]\nresolution = 0.0\n").is_err());
  assert!(JobConfig::parse("[settings]\nunits = [2, 32, 32]\n").is_err());
  assert!(JobConfig::parse("[[lods]]\nquality = 1.5\n").is_err());
  assert!(JobConfig::parse("[shape]\nkind = \"torus\"\n").is_err());
  assert!(JobConfig::parse("[extraction]\nalgorithm = \"surface_nets\"\n").is_err());
  assert!(JobConfig::parse("unknown = 1\n").is_err());
}
