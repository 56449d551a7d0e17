use super::*;

fn sum<Q: ErrorQuadric>(triangles: &[[DVec3; 3]]) -> Q {
  triangles
    .iter()
    .fold(Q::default(), |acc, [a, b, c]| acc.add(&Q::from_triangle(*a, *b, *c)))
}

/// Planes x = 1, y = 2 and z = 3.
fn corner() -> [[DVec3; 3]; 3] {
  [
    [DVec3::new(0.0, 0.0, 3.0), DVec3::new(1.0, 0.0, 3.0), DVec3::new(0.0, 1.0, 3.0)],
    [DVec3::new(1.0, 0.0, 0.0), DVec3::new(1.0, 1.0, 0.0), DVec3::new(1.0, 0.0, 1.0)],
    [DVec3::new(0.0, 2.0, 0.0), DVec3::new(0.0, 2.0, 1.0), DVec3::new(1.0, 2.0, 0.0)],
  ]
}

/// Three coordinate planes plus the slanted face of the unit corner
/// tetrahedron, all wound the same way so the fan has a volume gradient.
fn open_tetrahedron() -> [[DVec3; 3]; 4] {
  let (o, x, y, z) = (DVec3::ZERO, DVec3::X, DVec3::Y, DVec3::Z);
  [[o, x, y], [o, y, z], [o, z, x], [x, y, z]]
}

#[test]
fn test_plane_error_is_area_weighted_distance() {
  let q = QuadricError::from_triangle(DVec3::ZERO, DVec3::X, DVec3::Y);
  assert_eq!(q.evaluate(DVec3::new(0.3, 0.2, 0.0)), 0.0);
  assert!((q.evaluate(DVec3::new(5.0, -1.0, 2.0)) - 0.5 * 4.0).abs() < 1e-12);
}

#[test]
fn test_degenerate_triangle_is_zero() {
  let q = QuadricError::from_triangle(DVec3::ZERO, DVec3::X, DVec3::X * 2.0);
  assert_eq!(q, QuadricError::default());
}

#[test]
fn test_add_is_linear() {
  let [a, b, _] = corner();
  let qa = QuadricError::from_triangle(a[0], a[1], a[2]);
  let qb = QuadricError::from_triangle(b[0], b[1], b[2]);
  let p = DVec3::new(0.4, -2.0, 7.0);
  assert!((qa.add(&qb).evaluate(p) - qa.evaluate(p) - qb.evaluate(p)).abs() < 1e-9);
}

#[test]
fn test_corner_optimum() {
  let q: QuadricError = sum(&corner());
  let point = q.optimal_point(DVec3::new(1.0, 2.0, 2.5), DVec3::new(1.0, 2.0, 3.5));
  assert!(point.distance(DVec3::new(1.0, 2.0, 3.0)) < 1e-9, "{point}");
  assert!(q.evaluate(point).abs() < 1e-9);
}

#[test]
fn test_flat_quadric_falls_back_to_midpoint() {
  let q = QuadricError::from_triangle(DVec3::ZERO, DVec3::X, DVec3::Y);
  let point = q.optimal_point(DVec3::ZERO, DVec3::new(2.0, 0.0, 0.0));
  assert_eq!(point, DVec3::new(1.0, 0.0, 0.0));
}

#[test]
fn test_far_optimum_is_discarded() {
  let q: QuadricError = sum(&corner());
  let (v1, v2) = (DVec3::new(100.0, 0.0, 0.0), DVec3::new(100.0, 0.1, 0.0));
  let point = q.optimal_point(v1, v2);
  assert!([v1, v2, (v1 + v2) * 0.5].contains(&point), "{point}");
}

#[test]
fn test_volume_constraint_holds_at_optimum() {
  let triangles = open_tetrahedron();
  let (v1, v2) = (DVec3::splat(0.1), DVec3::splat(0.3));

  let plain: QuadricError = sum(&triangles);
  let preserving: VolumePreservingQuadric = sum(&triangles);

  // Least squares over the four planes lands on x = y = z = 0.2113.
  let unconstrained = plain.optimal_point(v1, v2);
  assert!(preserving.volume_change(unconstrained).abs() > 1e-3);

  // The constrained optimum sits on x + y + z = 1/2.
  let constrained = preserving.optimal_point(v1, v2);
  assert!(preserving.volume_change(constrained).abs() < 1e-9);
  assert!(constrained.distance(DVec3::splat(1.0 / 6.0)) < 1e-9, "{constrained}");
}

#[test]
fn test_volume_error_adds_squared_change() {
  let q = VolumePreservingQuadric::from_triangle(DVec3::ZERO, DVec3::X, DVec3::Y);
  let p = DVec3::new(0.0, 0.0, 3.0);
  // |N| = 1, so dV = 3 / 6.
  assert!((q.volume_change(p) - 0.5).abs() < 1e-12);
  let plain = QuadricError::from_triangle(DVec3::ZERO, DVec3::X, DVec3::Y);
  assert!((q.evaluate(p) - plain.evaluate(p) - 0.25).abs() < 1e-12);
}
