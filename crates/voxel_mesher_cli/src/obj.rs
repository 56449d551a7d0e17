//! Wavefront OBJ export for assembled LODs.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use voxel_mesher::MeshData;

/// Write one LOD to `path`.
///
/// Faces are emitted counter-clockwise around the outward normal. The
/// extractor winds triangles the other way unless the grid is inverted, so
/// `reverse_winding` should be `!settings.inverted`.
pub fn write_obj(lod: &MeshData, path: &Path, reverse_winding: bool) -> Result<()> {
  let file =
    File::create(path).with_context(|| format!("Failed to create: {}", path.display()))?;
  let name = path.file_stem().and_then(|s| s.to_str()).unwrap_or("mesh");
  let mut w = BufWriter::new(file);
  write_obj_to(&mut w, lod, name, reverse_winding)
    .with_context(|| format!("Failed to write: {}", path.display()))?;
  w.flush()?;
  Ok(())
}

/// Serialize one LOD as an OBJ object named `name`.
pub fn write_obj_to<W: Write>(
  w: &mut W,
  lod: &MeshData,
  name: &str,
  reverse_winding: bool,
) -> std::io::Result<()> {
  writeln!(w, "# voxel_mesher OBJ export")?;
  writeln!(w, "# Vertices: {}", lod.vertex_count())?;
  writeln!(w, "# Triangles: {}", lod.triangle_count())?;
  writeln!(w, "o {name}")?;

  for p in &lod.positions {
    writeln!(w, "v {} {} {}", p.x, p.y, p.z)?;
  }
  for uv in &lod.uvs {
    writeln!(w, "vt {} {}", uv.x, uv.y)?;
  }
  for n in &lod.normals {
    writeln!(w, "vn {} {} {}", n.x, n.y, n.z)?;
  }

  // OBJ indices are 1-based; position, UV and normal share an index.
  for triangle in lod.indices.chunks_exact(3) {
    let [a, b, c] = [triangle[0] + 1, triangle[1] + 1, triangle[2] + 1];
    let (b, c) = if reverse_winding { (c, b) } else { (b, c) };
    writeln!(w, "f {a}/{a}/{a} {b}/{b}/{b} {c}/{c}/{c}")?;
  }
  Ok(())
}
