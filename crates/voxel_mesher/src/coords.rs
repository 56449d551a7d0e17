//! Conversions between voxel coordinates, linear cache indices, chunk-local
//! space and the chunk-slot grid.
//!
//! ```text
//! world ──chunk_slot_at_location──▶ slot ──location_of_chunk_slot──▶ world
//!
//! voxel ──voxel_to_linear_index──▶ index ──linear_index_to_voxel──▶ voxel
//!
//! voxel ──voxel_to_local_location──▶ chunk-local (centered on the chunk)
//! ```
//!
//! A chunk spans `(Units - MARGIN) * resolution` world units: the margin
//! voxels overlap the neighbouring chunks.

use std::collections::HashSet;

use glam::{DAffine3, DVec3, IVec3};

use crate::constants::MARGIN;
use crate::types::Settings;

// =============================================================================
// Linear index
// =============================================================================

/// Flatten voxel coordinates, clamped to `[-1, total]`.
///
/// The two clamp bounds are sentinels: anything below the grid maps to `-1`
/// and anything past the end maps to `total`.
#[inline]
pub fn voxel_to_linear_index(coords: IVec3, units: IVec3) -> i64 {
  let (ux, uy, uz) = (units.x as i64, units.y as i64, units.z as i64);
  let index = coords.x as i64 + ux * coords.y as i64 + ux * uy * coords.z as i64;
  index.clamp(-1, ux * uy * uz)
}

/// Inverse of [`voxel_to_linear_index`] for in-range indices.
#[inline]
pub fn linear_index_to_voxel(index: i64, units: IVec3) -> IVec3 {
  let (ux, uy) = (units.x as i64, units.y as i64);
  IVec3::new(
    (index % ux) as i32,
    ((index / ux) % uy) as i32,
    (index / (ux * uy)) as i32,
  )
}

/// True when `0 <= coords < units` on every axis.
#[inline]
pub fn is_in_range(coords: IVec3, units: IVec3) -> bool {
  coords.cmpge(IVec3::ZERO).all() && coords.cmplt(units).all()
}

/// Step from `coords` by `direction`, if the result stays inside the grid.
pub fn neighbor(coords: IVec3, direction: IVec3, units: IVec3) -> Option<IVec3> {
  let next = coords + direction;
  is_in_range(next, units).then_some(next)
}

// =============================================================================
// Local space
// =============================================================================

/// Convert (fractional) voxel coordinates to chunk-local space.
///
/// The interior lattice is centered on the origin.
#[inline]
pub fn voxel_to_local_location(voxel: DVec3, settings: &Settings) -> DVec3 {
  let interior = (settings.units - MARGIN).as_dvec3();
  voxel * settings.resolution - interior * (settings.resolution * 0.5)
}

// =============================================================================
// Chunk slots
// =============================================================================

/// Offset that centers the chunk grid of `world_size` chunks on the origin.
pub fn chunk_offset(settings: &Settings) -> DVec3 {
  let world = settings.world_size.max(IVec3::ONE).as_dvec3();
  let interior = (settings.units - MARGIN).as_dvec3();
  world * interior * (settings.resolution * 0.5)
}

/// Chunk slot containing a world location.
pub fn chunk_slot_at_location(location: DVec3, settings: &Settings) -> IVec3 {
  let span = (settings.units - MARGIN).as_dvec3() * settings.resolution;
  ((location + chunk_offset(settings)) / span).floor().as_ivec3()
}

/// World location of a chunk slot's center.
pub fn location_of_chunk_slot(slot: IVec3, settings: &Settings) -> DVec3 {
  let span = (settings.units - MARGIN).as_dvec3() * settings.resolution;
  (slot.as_dvec3() + 0.5) * span - chunk_offset(settings)
}

/// Slots within `radius` (per axis) of `root`.
///
/// Returns `(new_slots, still_relevant)`: slots not in `existing`, and the
/// members of `existing` that remain within range. Both lists are in x, y, z
/// nesting order without duplicates.
pub fn relevant_chunk_slots(
  root: IVec3,
  radius: i32,
  existing: &[IVec3],
) -> (Vec<IVec3>, Vec<IVec3>) {
  let existing: HashSet<IVec3> = existing.iter().copied().collect();
  let mut new_slots = Vec::new();
  let mut still_relevant = Vec::new();

  for x in root.x - radius..=root.x + radius {
    for y in root.y - radius..=root.y + radius {
      for z in root.z - radius..=root.z + radius {
        let slot = IVec3::new(x, y, z);
        if existing.contains(&slot) {
          still_relevant.push(slot);
        } else {
          new_slots.push(slot);
        }
      }
    }
  }

  (new_slots, still_relevant)
}

// =============================================================================
// Geometry transforms
// =============================================================================

/// Voxel coordinates under a world location for a chunk placed by
/// `transform` (its translation is the chunk center).
///
/// Scale in `transform` is ignored.
pub fn voxel_coordinates_at_location(
  transform: &DAffine3,
  location: DVec3,
  settings: &Settings,
) -> IVec3 {
  let (_, rotation, geometry_location) = transform.to_scale_rotation_translation();
  let unrotated = rotation.inverse() * (location - geometry_location) + geometry_location;
  let half_slot = settings.units.as_dvec3() * (settings.resolution * 0.5);
  // Truncates toward zero.
  ((unrotated - (geometry_location - half_slot)) / settings.resolution).as_ivec3()
}

/// All in-grid voxel coordinates inside the box of size `radius` (world
/// units, full extent per axis) centered on `location`.
pub fn voxel_coordinates_in_radius(
  transform: &DAffine3,
  location: DVec3,
  radius: DVec3,
  settings: &Settings,
) -> Vec<IVec3> {
  let half_radius = (radius / settings.resolution) * 0.5;
  let center = voxel_coordinates_at_location(transform, location, settings).as_dvec3();

  let min = (center - half_radius)
    .floor()
    .as_ivec3()
    .clamp(IVec3::ZERO, settings.units);
  let max = (center + half_radius)
    .ceil()
    .as_ivec3()
    .clamp(IVec3::ZERO, settings.units);

  let size = (max - min).max(IVec3::ZERO);
  let mut coords = Vec::with_capacity((size.x * size.y * size.z) as usize);
  for x in min.x..max.x {
    for y in min.y..max.y {
      for z in min.z..max.z {
        coords.push(IVec3::new(x, y, z));
      }
    }
  }
  coords
}

#[cfg(test)]
#[path = "coords_test.rs"]
mod coords_test;
