//! OBJ mesh conversion (.obj -> .bmf)

use anyhow::{Context, Result, bail};
use bakge_bmf::{FsStorage, MeshData, encode};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Normal used for corners whose face has no `vn` reference
const MISSING_NORMAL: [f32; 3] = [0.0, 0.0, 0.0];

/// Tex coord used for corners whose face has no `vt` reference
const MISSING_TEX_COORD: [f32; 2] = [0.0, 0.0];

/// Parse an OBJ file into flat mesh arrays
pub fn convert_obj_to_memory(input: &Path) -> Result<MeshData> {
    let file = File::open(input).with_context(|| format!("Failed to open OBJ: {:?}", input))?;
    parse_obj(BufReader::new(file)).with_context(|| format!("Failed to parse OBJ: {:?}", input))
}

/// Convert an OBJ file to a Bakge Mesh File
pub fn convert_obj(input: &Path, output: &Path) -> Result<MeshData> {
    let mesh = convert_obj_to_memory(input)?;

    encode(&FsStorage::new(), output, &mesh.as_view())
        .with_context(|| format!("Failed to write mesh: {:?}", output))?;

    tracing::info!(
        "Converted OBJ mesh: {} vertices, {} indices ({} triangles)",
        mesh.vertex_count(),
        mesh.index_count(),
        mesh.triangle_count()
    );

    Ok(mesh)
}

/// Parse OBJ text
///
/// Every face corner becomes its own vertex; faces with more than three
/// corners are fan-triangulated. Corners without `vt`/`vn` get zeros; a
/// reference to an undeclared position, tex coord or normal is an error.
pub fn parse_obj<R: BufRead>(reader: R) -> Result<MeshData> {
    let mut positions: Vec<[f32; 3]> = Vec::new();
    let mut tex_coords: Vec<[f32; 2]> = Vec::new();
    let mut normals_raw: Vec<[f32; 3]> = Vec::new();

    // Final vertex data (expanded from faces)
    let mut final_positions: Vec<[f32; 3]> = Vec::new();
    let mut final_uvs: Vec<[f32; 2]> = Vec::new();
    let mut final_normals: Vec<[f32; 3]> = Vec::new();
    let mut indices: Vec<u32> = Vec::new();

    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let parts: Vec<&str> = line.split_whitespace().collect();

        match parts[0] {
            "v" if parts.len() >= 4 => {
                positions.push([
                    parse_float(parts[1], line_no)?,
                    parse_float(parts[2], line_no)?,
                    parse_float(parts[3], line_no)?,
                ]);
            }
            "vt" if parts.len() >= 3 => {
                tex_coords.push([
                    parse_float(parts[1], line_no)?,
                    parse_float(parts[2], line_no)?,
                ]);
            }
            "vn" if parts.len() >= 4 => {
                normals_raw.push([
                    parse_float(parts[1], line_no)?,
                    parse_float(parts[2], line_no)?,
                    parse_float(parts[3], line_no)?,
                ]);
            }
            "f" if parts.len() >= 4 => {
                let face_verts = parts[1..]
                    .iter()
                    .map(|v| {
                        parse_obj_vertex(v).with_context(|| {
                            format!("line {}: invalid face vertex {:?}", line_no + 1, v)
                        })
                    })
                    .collect::<Result<Vec<_>>>()?;

                // Fan triangulation (convex polygons)
                for i in 1..face_verts.len() - 1 {
                    for &corner in &[0, i, i + 1] {
                        let (vi, vti, vni) = face_verts[corner];

                        let Some(&position) = positions.get(vi) else {
                            bail!("line {}: position index {} out of range", line_no + 1, vi + 1);
                        };
                        let tex_coord = lookup(&tex_coords, vti, "tex coord", line_no)?
                            .unwrap_or(MISSING_TEX_COORD);
                        let normal = lookup(&normals_raw, vni, "normal", line_no)?
                            .unwrap_or(MISSING_NORMAL);

                        indices.push(next_index(final_positions.len())?);
                        final_positions.push(position);
                        final_uvs.push(tex_coord);
                        final_normals.push(normal);
                    }
                }
            }
            _ => {}
        }
    }

    if final_positions.is_empty() {
        bail!("No faces found in OBJ file");
    }

    Ok(MeshData {
        positions: bytemuck::cast_slice::<[f32; 3], f32>(&final_positions).to_vec(),
        normals: bytemuck::cast_slice::<[f32; 3], f32>(&final_normals).to_vec(),
        tex_coords: bytemuck::cast_slice::<[f32; 2], f32>(&final_uvs).to_vec(),
        indices,
    })
}

/// Resolve an optional `vt`/`vn` reference; a dangling one is an error
fn lookup<T: Copy>(
    values: &[T],
    index: Option<usize>,
    kind: &str,
    line_no: usize,
) -> Result<Option<T>> {
    let Some(i) = index else {
        return Ok(None);
    };
    match values.get(i) {
        Some(&value) => Ok(Some(value)),
        None => bail!("line {}: {} index {} out of range", line_no + 1, kind, i + 1),
    }
}

/// Index of the next expanded vertex, if it still fits in a u32
fn next_index(vertex_count: usize) -> Result<u32> {
    u32::try_from(vertex_count)
        .with_context(|| format!("OBJ mesh exceeds the u32 index range ({} verts)", vertex_count))
}

fn parse_float(s: &str, line_no: usize) -> Result<f32> {
    s.parse()
        .with_context(|| format!("line {}: invalid number {:?}", line_no + 1, s))
}

/// Parse OBJ vertex reference: "v", "v/vt", "v/vt/vn", or "v//vn"
fn parse_obj_vertex(s: &str) -> Option<(usize, Option<usize>, Option<usize>)> {
    let parts: Vec<&str> = s.split('/').collect();

    let vi = parts.first()?.parse::<usize>().ok()?.checked_sub(1)?; // OBJ indices are 1-based

    let vti = parts
        .get(1)
        .filter(|s| !s.is_empty())
        .and_then(|s| s.parse::<usize>().ok())
        .and_then(|i| i.checked_sub(1));

    let vni = parts
        .get(2)
        .filter(|s| !s.is_empty())
        .and_then(|s| s.parse::<usize>().ok())
        .and_then(|i| i.checked_sub(1));

    Some((vi, vti, vni))
}
