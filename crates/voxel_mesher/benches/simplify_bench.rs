//! Simplification of a 32³ marching cubes sphere to 25 %.

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use glam::IVec3;
use voxel_mesher::{
  extract, simplify, DensityPoint, DynamicMesh, ExtractionOptions, QuadricKind, RunControl,
  Settings, SimplifierSettings,
};

fn sphere_mesh() -> Option<DynamicMesh> {
  let settings = Settings::new();
  let center = settings.units.as_dvec3() * 0.5;
  let source =
    move |c: IVec3| DensityPoint::from_value(0.5 + (12.3 - c.as_dvec3().distance(center)) * 0.25);
  extract(&settings, &ExtractionOptions::new(), &source, &mut RunControl::default()).ok()
}

fn bench_simplify(c: &mut Criterion) {
  let Some(mesh) = sphere_mesh() else {
    return;
  };
  let control = RunControl::default();
  let mut group = c.benchmark_group("simplify to 25% (32³ sphere)");

  for quadric in [QuadricKind::Qem, QuadricKind::VolumePreserving] {
    let lod = SimplifierSettings::new().with_quality(0.25).with_quadric(quadric);
    group.bench_function(format!("{quadric:?}"), |b| {
      b.iter_batched(
        || mesh.clone(),
        |mut mesh| {
          let collapses = simplify(&mut mesh, &lod, &control);
          black_box((mesh, collapses))
        },
        BatchSize::LargeInput,
      )
    });
  }
  group.finish();
}

criterion_group!(benches, bench_simplify);
criterion_main!(benches);
