//! BMF encoder
//!
//! Always writes a complete file from scratch: header, vertex count, the three
//! attribute segments, index count, indices. Each segment goes out as one
//! contiguous write.

use std::io::{self, Write};
use std::path::Path;

use byteorder::{ByteOrder, LittleEndian, WriteBytesExt};

use crate::error::{ContractError, EncodeError, Segment, WriteStage};
use crate::format::{
    Header, INDEX_SIZE, NORMAL_COMPONENTS, POSITION_COMPONENTS, SCALAR_SIZE,
    TEX_COORD_COMPONENTS,
};
use crate::stream::{Storage, Stream};

/// Borrowed mesh arrays with their declared counts
#[derive(Debug, Clone, Copy)]
pub struct MeshView<'a> {
    pub vertex_count: u32,
    /// `3 * vertex_count` floats
    pub positions: &'a [f32],
    /// `3 * vertex_count` floats
    pub normals: &'a [f32],
    /// `2 * vertex_count` floats
    pub tex_coords: &'a [f32],
    pub index_count: u32,
    /// `index_count` values
    pub indices: &'a [u32],
}

impl MeshView<'_> {
    /// Check every array length against the declared counts
    pub fn validate(&self) -> Result<(), ContractError> {
        let v = self.vertex_count as usize;
        check_len(Segment::Positions, v * POSITION_COMPONENTS, self.positions.len())?;
        check_len(Segment::Normals, v * NORMAL_COMPONENTS, self.normals.len())?;
        check_len(Segment::TexCoords, v * TEX_COORD_COMPONENTS, self.tex_coords.len())?;
        check_len(Segment::Indices, self.index_count as usize, self.indices.len())?;
        Ok(())
    }
}

fn check_len(segment: Segment, expected: usize, actual: usize) -> Result<(), ContractError> {
    if expected != actual {
        return Err(ContractError::LengthMismatch {
            segment,
            expected,
            actual,
        });
    }
    Ok(())
}

/// Write `mesh` to `path`
///
/// Array lengths are validated before the output is opened. Once writing has
/// started, a failure leaves a partial file behind; deleting it is the
/// caller's job.
pub fn encode<St>(
    storage: &St,
    path: impl AsRef<Path>,
    mesh: &MeshView<'_>,
) -> Result<(), EncodeError>
where
    St: Storage + ?Sized,
{
    let path = path.as_ref();
    mesh.validate()?;

    let mut stream = storage
        .open_write(path)
        .map_err(|source| EncodeError::OpenForWrite {
            path: path.to_path_buf(),
            source,
        })?;

    if let Err(e) = write_mesh(&mut stream, mesh) {
        if let Err(close_err) = stream.close() {
            tracing::warn!("Failed to close partial mesh file {:?}: {}", path, close_err);
        }
        return Err(e);
    }

    stream.close().map_err(EncodeError::Close)?;

    tracing::debug!(
        "Wrote mesh file {:?}: {} vertices, {} indices",
        path,
        mesh.vertex_count,
        mesh.index_count
    );
    Ok(())
}

/// Write `mesh` to any writer, e.g. a `Vec<u8>`
pub fn encode_to_writer<W: Write>(
    writer: &mut W,
    mesh: &MeshView<'_>,
) -> Result<(), EncodeError> {
    mesh.validate()?;
    write_mesh(writer, mesh)?;
    writer.flush().map_err(|source| EncodeError::Write {
        stage: WriteStage::Indices,
        source,
    })
}

fn write_mesh<W: Write>(w: &mut W, mesh: &MeshView<'_>) -> Result<(), EncodeError> {
    stage(WriteStage::Header, w.write_all(&Header::new().to_bytes()))?;
    stage(
        WriteStage::VertexCount,
        w.write_u32::<LittleEndian>(mesh.vertex_count),
    )?;
    stage(WriteStage::Positions, write_scalars(w, mesh.positions))?;
    stage(WriteStage::Normals, write_scalars(w, mesh.normals))?;
    stage(WriteStage::TexCoords, write_scalars(w, mesh.tex_coords))?;
    stage(
        WriteStage::IndexCount,
        w.write_u32::<LittleEndian>(mesh.index_count),
    )?;
    stage(WriteStage::Indices, write_indices(w, mesh.indices))?;
    Ok(())
}

#[inline]
fn stage(stage: WriteStage, result: io::Result<()>) -> Result<(), EncodeError> {
    result.map_err(|source| EncodeError::Write { stage, source })
}

fn write_scalars<W: Write>(w: &mut W, values: &[f32]) -> io::Result<()> {
    let mut bytes = vec![0u8; values.len() * SCALAR_SIZE];
    LittleEndian::write_f32_into(values, &mut bytes);
    w.write_all(&bytes)
}

fn write_indices<W: Write>(w: &mut W, values: &[u32]) -> io::Result<()> {
    let mut bytes = vec![0u8; values.len() * INDEX_SIZE];
    LittleEndian::write_u32_into(values, &mut bytes);
    w.write_all(&bytes)
}
