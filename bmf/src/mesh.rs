//! Owned mesh arrays and whole-file load/save

use std::path::Path;

use crate::decoder::MeshFile;
use crate::encoder::{MeshView, encode};
use crate::error::{ContractError, Error, ReadError, Segment};
use crate::format::{
    INDEX_SIZE, NORMAL_COMPONENTS, POSITION_COMPONENTS, SCALAR_SIZE, TEX_COORD_COMPONENTS,
    TRIANGLE_INDICES, Triangle, Vertex,
};
use crate::stream::{Storage, Stream};

/// Mesh geometry as four flat arrays, laid out exactly as in a BMF file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData {
    /// xyz per vertex
    pub positions: Vec<f32>,
    /// xyz per vertex
    pub normals: Vec<f32>,
    /// uv per vertex
    pub tex_coords: Vec<f32>,
    pub indices: Vec<u32>,
}

impl MeshData {
    /// Load a whole mesh file into memory
    pub fn load<St>(storage: &St, path: impl AsRef<Path>) -> Result<Self, Error>
    where
        St: Storage + ?Sized,
    {
        let mut file = MeshFile::open(storage, path)?;
        match Self::read_from(&mut file) {
            Ok(mesh) => {
                file.close()?;
                Ok(mesh)
            }
            Err(e) => {
                if let Err(close_err) = file.close() {
                    tracing::warn!("Failed to close mesh file after read error: {}", close_err);
                }
                Err(e.into())
            }
        }
    }

    /// Extract every segment from an open handle
    ///
    /// Counts are checked against the stream length first, so a corrupt
    /// header cannot trigger an allocation the file could never fill.
    pub fn read_from<S: Stream>(file: &mut MeshFile<S>) -> Result<Self, ReadError> {
        check_stream_length(file)?;

        let v = file.vertex_count() as usize;
        let mut mesh = Self {
            positions: vec![0.0; v * POSITION_COMPONENTS],
            normals: vec![0.0; v * NORMAL_COMPONENTS],
            tex_coords: vec![0.0; v * TEX_COORD_COMPONENTS],
            indices: vec![0; file.index_count() as usize],
        };
        file.read_positions(&mut mesh.positions)?;
        file.read_normals(&mut mesh.normals)?;
        file.read_tex_coords(&mut mesh.tex_coords)?;
        file.read_indices(&mut mesh.indices)?;
        Ok(mesh)
    }

    /// Write the mesh to `path`, replacing any existing file
    pub fn save<St>(&self, storage: &St, path: impl AsRef<Path>) -> Result<(), Error>
    where
        St: Storage + ?Sized,
    {
        encode(storage, path, &self.as_view())?;
        Ok(())
    }

    /// Build flat arrays from interleaved vertices
    pub fn from_vertices(vertices: &[Vertex], indices: &[u32]) -> Self {
        let mut mesh = Self {
            positions: Vec::with_capacity(vertices.len() * POSITION_COMPONENTS),
            normals: Vec::with_capacity(vertices.len() * NORMAL_COMPONENTS),
            tex_coords: Vec::with_capacity(vertices.len() * TEX_COORD_COMPONENTS),
            indices: indices.to_vec(),
        };
        for vertex in vertices {
            mesh.positions.extend_from_slice(&vertex.position);
            mesh.normals.extend_from_slice(&vertex.normal);
            mesh.tex_coords.extend_from_slice(&vertex.tex_coord);
        }
        mesh
    }

    pub fn vertex_count(&self) -> u32 {
        (self.positions.len() / POSITION_COMPONENTS) as u32
    }

    pub fn index_count(&self) -> u32 {
        self.indices.len() as u32
    }

    /// Whole triangles described by the index array
    pub fn triangle_count(&self) -> u32 {
        self.index_count() / TRIANGLE_INDICES as u32
    }

    /// Borrow the arrays for encoding
    ///
    /// The vertex count comes from the positions array; the other arrays
    /// are checked against it by [`MeshView::validate`].
    pub fn as_view(&self) -> MeshView<'_> {
        MeshView {
            vertex_count: self.vertex_count(),
            positions: &self.positions,
            normals: &self.normals,
            tex_coords: &self.tex_coords,
            index_count: self.index_count(),
            indices: &self.indices,
        }
    }

    pub fn validate(&self) -> Result<(), ContractError> {
        if self.positions.len() % POSITION_COMPONENTS != 0 {
            return Err(ContractError::LengthMismatch {
                segment: Segment::Positions,
                expected: self.positions.len() / POSITION_COMPONENTS * POSITION_COMPONENTS,
                actual: self.positions.len(),
            });
        }
        self.as_view().validate()
    }

    /// Interleaved view of each vertex
    pub fn vertices(&self) -> impl Iterator<Item = Vertex> + '_ {
        self.positions
            .chunks_exact(POSITION_COMPONENTS)
            .zip(self.normals.chunks_exact(NORMAL_COMPONENTS))
            .zip(self.tex_coords.chunks_exact(TEX_COORD_COMPONENTS))
            .map(|((p, n), t)| Vertex {
                position: [p[0], p[1], p[2]],
                normal: [n[0], n[1], n[2]],
                tex_coord: [t[0], t[1]],
            })
    }

    /// Each complete triangle; a trailing partial triangle is skipped
    pub fn triangles(&self) -> impl Iterator<Item = Triangle> + '_ {
        self.indices
            .chunks_exact(TRIANGLE_INDICES)
            .map(|t| Triangle {
                indices: [t[0], t[1], t[2]],
            })
    }
}

/// Fail with the first segment that extends past the end of the stream
fn check_stream_length<S: Stream>(file: &mut MeshFile<S>) -> Result<(), ReadError> {
    let length = file.stream_length().map_err(|source| ReadError::Io {
        segment: Segment::Positions,
        source,
    })?;
    if length >= file.expected_size() {
        return Ok(());
    }

    let v = file.vertex_count() as u64;
    let offsets = file.offsets();
    let scalar = SCALAR_SIZE as u64;
    let segments = [
        (Segment::Positions, offsets.positions, v * POSITION_COMPONENTS as u64 * scalar),
        (Segment::Normals, offsets.normals, v * NORMAL_COMPONENTS as u64 * scalar),
        (Segment::TexCoords, offsets.tex_coords, v * TEX_COORD_COMPONENTS as u64 * scalar),
        (Segment::Indices, offsets.indices, file.index_count() as u64 * INDEX_SIZE as u64),
    ];
    for (segment, offset, size) in segments {
        if offset + size > length {
            return Err(ReadError::IncompleteRead {
                segment,
                expected: size as usize,
                actual: length.saturating_sub(offset) as usize,
            });
        }
    }
    Ok(())
}
