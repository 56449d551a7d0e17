use std::sync::atomic::{AtomicUsize, Ordering};

use super::*;

fn settings() -> Settings {
  Settings::new().with_units(IVec3::splat(6))
}

#[test]
fn test_source_called_once_per_voxel() {
  let calls = AtomicUsize::new(0);
  let source = |coords: IVec3| {
    calls.fetch_add(1, Ordering::Relaxed);
    DensityPoint::from_value(coords.x as f64)
  };
  let settings = settings();
  let mut field = DensityField::new(&settings, &source);

  assert_eq!(field.value(IVec3::new(3, 1, 2)), 3.0);
  assert_eq!(field.value(IVec3::new(3, 1, 2)), 3.0);
  assert_eq!(calls.load(Ordering::Relaxed), 1);

  assert_eq!(field.value(IVec3::new(4, 1, 2)), 4.0);
  assert_eq!(calls.load(Ordering::Relaxed), 2);
  assert_eq!(field.cached_count(), 2);
  assert!(field.is_cached(IVec3::new(3, 1, 2)));
  assert!(!field.is_cached(IVec3::ZERO));
}

#[test]
fn test_out_of_range_uses_stable_sentinels() {
  let source = |coords: IVec3| DensityPoint::from_value(coords.z as f64);
  let settings = settings();
  let mut field = DensityField::new(&settings, &source);

  // Both land on the low sentinel, the first value sticks.
  assert_eq!(field.value(IVec3::new(0, 0, -1)), -1.0);
  assert_eq!(field.value(IVec3::new(0, 0, -7)), -1.0);

  // High sentinel is independent of the low one.
  assert_eq!(field.value(IVec3::new(0, 0, 6)), 6.0);
  assert_eq!(field.value(IVec3::new(0, 0, 60)), 6.0);
  assert_eq!(field.cached_count(), 2);
}

#[test]
fn test_clear_resets_cache() {
  let source = |_: IVec3| DensityPoint::new(1.0, LinearColor::WHITE);
  let settings = settings();
  let mut field = DensityField::new(&settings, &source);

  assert_eq!(field.color(IVec3::ONE), LinearColor::WHITE);
  assert_eq!(field.cached_count(), 1);

  field.clear();
  assert_eq!(field.cached_count(), 0);
  assert!(!field.is_cached(IVec3::ONE));
}

#[test]
fn test_trait_object_source() {
  let boxed: Box<dyn DensitySource> = Box::new(|c: IVec3| DensityPoint::from_value(c.y as f64));
  let settings = settings();
  let mut field = DensityField::new(&settings, boxed.as_ref());
  assert_eq!(field.value(IVec3::new(0, 5, 0)), 5.0);
  assert_eq!(field.units(), IVec3::splat(6));
}
