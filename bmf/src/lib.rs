//! Bakge Mesh File (BMF) codec
//!
//! Reads and writes the v1.0.0 binary mesh format: a fixed header, three
//! parallel vertex attribute segments (positions, normals, tex coords) and a
//! flat u32 index segment.
//!
//! # Modules
//!
//! - [`format`] - header layout, constants, derived segment offsets
//! - [`decoder`] - [`MeshFile`], an open handle with random-access extraction
//! - [`encoder`] - [`encode`] a [`MeshView`] to storage or any writer
//! - [`mesh`] - [`MeshData`], owned arrays with whole-file load/save
//! - [`stream`] - the [`Storage`]/[`Stream`] capability and its backends
//! - [`error`] - typed errors for every failure
//!
//! # Example
//!
//! ```
//! use bakge_bmf::{MemoryStorage, MeshData, MeshFile};
//!
//! let storage = MemoryStorage::new();
//! let mesh = MeshData {
//!     positions: vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0],
//!     normals: vec![0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0],
//!     tex_coords: vec![0.0, 0.0, 1.0, 0.0, 0.0, 1.0],
//!     indices: vec![0, 1, 2],
//! };
//! mesh.save(&storage, "triangle.bmf").unwrap();
//!
//! let mut file = MeshFile::open(&storage, "triangle.bmf").unwrap();
//! let mut positions = vec![0.0; file.vertex_count() as usize * 3];
//! file.read_positions(&mut positions).unwrap();
//! assert_eq!(positions, mesh.positions);
//! file.close().unwrap();
//! ```

pub mod decoder;
pub mod encoder;
pub mod error;
pub mod format;
pub mod mesh;
pub mod stream;

pub use decoder::MeshFile;
pub use encoder::{MeshView, encode, encode_to_writer};
pub use error::{
    CloseError, ContractError, EncodeError, Error, MetadataField, OpenError, ReadError, Segment,
    WriteStage,
};
pub use format::{
    BMF_EXT, FORMAT_VERSION, HEADER_SIZE, Header, MAGIC, SegmentOffsets, Triangle, Vertex,
    file_size,
};
pub use mesh::MeshData;
pub use stream::{FileStream, FsStorage, MemoryStorage, MemoryStream, Storage, Stream};
