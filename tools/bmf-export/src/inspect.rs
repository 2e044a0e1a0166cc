//! Mesh file inspection (`info` and `dump` commands)

use anyhow::{Context, Result};
use bakge_bmf::{FsStorage, Header, MeshData, MeshFile, SegmentOffsets};
use std::fmt;
use std::io::Write;
use std::path::Path;

/// Summary of a mesh file, gathered without reading any segment
#[derive(Debug, Clone)]
pub struct MeshInfo {
    pub header: Header,
    pub vertex_count: u32,
    pub index_count: u32,
    pub offsets: SegmentOffsets,
    pub expected_size: u64,
    pub actual_size: u64,
}

impl MeshInfo {
    /// Stream is at least as long as the counts require
    pub fn is_complete(&self) -> bool {
        self.actual_size >= self.expected_size
    }

    /// Bytes past the end of the index segment
    pub fn trailing_bytes(&self) -> u64 {
        self.actual_size.saturating_sub(self.expected_size)
    }
}

impl fmt::Display for MeshInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (major, minor, revision) = self.header.version();
        writeln!(
            f,
            "Bakge Mesh File v{}.{}.{} (kind {})",
            major, minor, revision, self.header.kind
        )?;
        writeln!(f, "  vertices:   {}", self.vertex_count)?;
        writeln!(
            f,
            "  indices:    {} ({} triangles{})",
            self.index_count,
            self.index_count / 3,
            if self.index_count % 3 != 0 { ", partial" } else { "" }
        )?;
        writeln!(f, "  positions   @ {:#010x}", self.offsets.positions)?;
        writeln!(f, "  normals     @ {:#010x}", self.offsets.normals)?;
        writeln!(f, "  tex coords  @ {:#010x}", self.offsets.tex_coords)?;
        writeln!(f, "  index count @ {:#010x}", self.offsets.index_count)?;
        writeln!(f, "  indices     @ {:#010x}", self.offsets.indices)?;
        write!(
            f,
            "  size:       {} bytes (expected {})",
            self.actual_size, self.expected_size
        )
    }
}

pub fn mesh_info(path: &Path) -> Result<MeshInfo> {
    let mut file = MeshFile::open(&FsStorage::new(), path)
        .with_context(|| format!("Failed to open mesh: {:?}", path))?;

    let info = MeshInfo {
        header: *file.header(),
        vertex_count: file.vertex_count(),
        index_count: file.index_count(),
        offsets: file.offsets(),
        expected_size: file.expected_size(),
        actual_size: file.stream_length()?,
    };
    file.close()?;

    if !info.is_complete() {
        tracing::warn!(
            "{:?} is {} bytes short of its declared size",
            path,
            info.expected_size - info.actual_size
        );
    }
    Ok(info)
}

/// Print up to `limit` vertices and triangles
pub fn dump<W: Write>(out: &mut W, mesh: &MeshData, limit: Option<usize>) -> Result<()> {
    let limit = limit.unwrap_or(usize::MAX);

    writeln!(out, "vertices ({}):", mesh.vertex_count())?;
    for (i, v) in mesh.vertices().take(limit).enumerate() {
        writeln!(
            out,
            "  {:>6}  p={:?}  n={:?}  uv={:?}",
            i, v.position, v.normal, v.tex_coord
        )?;
    }
    if mesh.vertex_count() as usize > limit {
        writeln!(out, "  ...")?;
    }

    writeln!(out, "triangles ({}):", mesh.triangle_count())?;
    for (i, t) in mesh.triangles().take(limit).enumerate() {
        writeln!(out, "  {:>6}  {:?}", i, t.indices)?;
    }
    if mesh.triangle_count() as usize > limit {
        writeln!(out, "  ...")?;
    }
    Ok(())
}
