//! Grid layout constants shared by every extraction algorithm.
//!
//! A chunk of `Units` voxels per axis reserves a margin of `MARGIN / 2`
//! voxels on each side. The margin is never polygonized: it exists so that
//! gradient normals and dual points near the chunk border can read one step
//! outside the cells that produce geometry.
//!
//! # Interior Lattice
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      INTERIOR LATTICE (Units = 8)                       │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Voxel index:   0     1     2     3     4     5     6     7             │
//! │                 │     │     │                 │     │     │             │
//! │                 └─────┘     └──── cells ──────┘     └─────┘             │
//! │                 margin      2..(Units-2)            margin              │
//! │                                                                         │
//! │  cell origin c  = HALF_MARGIN .. Units - MARGIN + HALF_MARGIN           │
//! │  cell corners   = c .. c + 1                                            │
//! │  gradient reads = c - 1 .. c + 2                                        │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Linear Indexing
//!
//! ```text
//! index = x + Units.x * y + Units.x * Units.y * z
//!
//! X is the minor axis (stride 1), Z the major axis.
//! ```
//!
//! # Coordinate System
//!
//! ```text
//!         +Y
//!          │
//!          │
//!          │
//!          └───────── +X
//!         /
//!        /
//!       +Z
//!
//! Dual corner indices (binary: ZYX):
//!   0 = (0,0,0)    4 = (0,0,1)
//!   1 = (1,0,0)    5 = (1,0,1)
//!   2 = (0,1,0)    6 = (0,1,1)
//!   3 = (1,1,0)    7 = (1,1,1)
//!
//! Marching cubes corner indices (counter-clockwise rings):
//!   0 = (0,0,0)    4 = (0,0,1)
//!   1 = (1,0,0)    5 = (1,0,1)
//!   2 = (1,1,0)    6 = (1,1,1)
//!   3 = (0,1,0)    7 = (0,1,1)
//! ```

use glam::IVec3;

/// Voxels reserved around the interior lattice (split evenly per side).
pub const MARGIN: i32 = 4;

/// Margin on one side of an axis.
pub const HALF_MARGIN: i32 = MARGIN / 2;

/// Endpoint snap tolerance used by edge interpolation.
pub const INTERPOLATION_EPSILON: f64 = 1.0e-5;

/// Tolerance below which a resolution counts as zero.
pub const RESOLUTION_EPSILON: f64 = 1.0e-8;

/// Default voxels per axis.
pub const DEFAULT_UNITS: IVec3 = IVec3::splat(32);

/// Default world units per voxel.
pub const DEFAULT_RESOLUTION: f64 = 500.0;

/// Default density threshold.
pub const DEFAULT_ISO_LEVEL: f64 = 0.5;

/// Default interval for the cooperative checkpoint callback.
pub const DEFAULT_RESET_RUNAWAY_ITERATION_COUNT: u32 = 1000;

/// Corner offsets in dual (binary ZYX) order.
pub const DUAL_CORNER_OFFSETS: [IVec3; 8] = [
  IVec3::new(0, 0, 0),
  IVec3::new(1, 0, 0),
  IVec3::new(0, 1, 0),
  IVec3::new(1, 1, 0),
  IVec3::new(0, 0, 1),
  IVec3::new(1, 0, 1),
  IVec3::new(0, 1, 1),
  IVec3::new(1, 1, 1),
];

/// Corner offsets in marching cubes (ring) order.
pub const CUBE_CORNER_OFFSETS: [IVec3; 8] = [
  IVec3::new(0, 0, 0),
  IVec3::new(1, 0, 0),
  IVec3::new(1, 1, 0),
  IVec3::new(0, 1, 0),
  IVec3::new(0, 0, 1),
  IVec3::new(1, 0, 1),
  IVec3::new(1, 1, 1),
  IVec3::new(0, 1, 1),
];

/// Number of cells along each axis that produce geometry.
#[inline]
pub const fn interior_cells(units: IVec3) -> IVec3 {
  IVec3::new(units.x - MARGIN, units.y - MARGIN, units.z - MARGIN)
}

/// Convert a lattice iteration index into the cell origin it visits.
///
/// Inverse of walking `x` fastest, then `y`, then `z` over the interior
/// cells, shifted by [`HALF_MARGIN`].
#[inline]
pub const fn lattice_cell(index: usize, units: IVec3) -> IVec3 {
  let cells = interior_cells(units);
  let vx = cells.x as usize;
  let vy = cells.y as usize;
  IVec3::new(
    (index % vx) as i32 + HALF_MARGIN,
    ((index / vx) % vy) as i32 + HALF_MARGIN,
    (index / (vx * vy)) as i32 + HALF_MARGIN,
  )
}

/// Number of cells visited by one extraction pass.
#[inline]
pub const fn lattice_len(units: IVec3) -> usize {
  let cells = interior_cells(units);
  if cells.x <= 0 || cells.y <= 0 || cells.z <= 0 {
    return 0;
  }
  cells.x as usize * cells.y as usize * cells.z as usize
}

#[cfg(test)]
#[path = "constants_test.rs"]
mod constants_test;
