//! Bakge Mesh File binary format (.bmf), version 1.0.0
//!
//! Fixed header followed by three parallel vertex attribute segments and a
//! flat index segment. Only the two count fields are stored; every segment
//! offset is derived from the vertex count.
//!
//! # Layout
//! ```text
//! 0x00:        magic [u8; 32]     "BAKGEMESHFILE" + zero padding
//! 0x20:        kind u8
//! 0x21:        major u8
//! 0x22:        minor u8
//! 0x23:        revision u8
//! 0x24:        vertex_count u32
//! 0x28:        positions  (vertex_count * 3 * f32)
//! 40 + 12V:    normals    (vertex_count * 3 * f32)
//! 40 + 24V:    tex_coords (vertex_count * 2 * f32)
//! 40 + 32V:    index_count u32
//! 44 + 32V:    indices    (index_count * u32)
//! ```
//!
//! All multi-byte fields are little-endian.

use bytemuck::{Pod, Zeroable};

// =============================================================================
// Constants
// =============================================================================

/// BMF file extension without dot
pub const BMF_EXT: &str = "bmf";

/// Magic string at the start of every BMF file, zero-padded to 32 bytes
pub const MAGIC: [u8; MAGIC_SIZE] = *b"BAKGEMESHFILE\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0";

/// Size of the magic field in bytes
pub const MAGIC_SIZE: usize = 32;

/// The only version this codec reads and writes: (major, minor, revision)
pub const FORMAT_VERSION: (u8, u8, u8) = (1, 0, 0);

/// Header `kind` byte written for mesh files
pub const MESH_KIND: u8 = 0;

/// Size of the fixed header in bytes
pub const HEADER_SIZE: usize = 36;

/// Size of each count field (vertex_count, index_count) in bytes
pub const COUNT_SIZE: usize = 4;

/// Size of one scalar component in bytes
pub const SCALAR_SIZE: usize = 4;

/// Size of one index in bytes
pub const INDEX_SIZE: usize = 4;

/// Components per position
pub const POSITION_COMPONENTS: usize = 3;

/// Components per normal
pub const NORMAL_COMPONENTS: usize = 3;

/// Components per texture coordinate
pub const TEX_COORD_COMPONENTS: usize = 2;

/// Indices per triangle
pub const TRIANGLE_INDICES: usize = 3;

// =============================================================================
// Header
// =============================================================================

/// BMF header (36 bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct Header {
    pub magic: [u8; MAGIC_SIZE],
    pub kind: u8,
    pub major: u8,
    pub minor: u8,
    pub revision: u8,
}

impl Header {
    pub const SIZE: usize = HEADER_SIZE;

    /// Header for a mesh file at the supported version
    pub fn new() -> Self {
        let (major, minor, revision) = FORMAT_VERSION;
        Self {
            magic: MAGIC,
            kind: MESH_KIND,
            major,
            minor,
            revision,
        }
    }

    /// Write header to bytes
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut bytes = [0u8; Self::SIZE];
        bytes[..MAGIC_SIZE].copy_from_slice(&self.magic);
        bytes[32] = self.kind;
        bytes[33] = self.major;
        bytes[34] = self.minor;
        bytes[35] = self.revision;
        bytes
    }

    /// Read header from bytes
    ///
    /// Only checks the length; magic and version are checked separately so
    /// callers can tell the two failures apart.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < Self::SIZE {
            return None;
        }
        let mut magic = [0u8; MAGIC_SIZE];
        magic.copy_from_slice(&bytes[..MAGIC_SIZE]);
        Some(Self {
            magic,
            kind: bytes[32],
            major: bytes[33],
            minor: bytes[34],
            revision: bytes[35],
        })
    }

    /// All 32 magic bytes match, padding included
    pub fn has_valid_magic(&self) -> bool {
        self.magic == MAGIC
    }

    pub fn version(&self) -> (u8, u8, u8) {
        (self.major, self.minor, self.revision)
    }

    pub fn is_supported_version(&self) -> bool {
        self.version() == FORMAT_VERSION
    }
}

impl Default for Header {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Segment Offsets
// =============================================================================

/// Byte offsets of every segment, derived from the vertex count
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentOffsets {
    /// Start of the positions segment
    pub positions: u64,
    /// Start of the normals segment
    pub normals: u64,
    /// Start of the tex coords segment
    pub tex_coords: u64,
    /// Location of the index_count field
    pub index_count: u64,
    /// Start of the indices segment
    pub indices: u64,
}

impl SegmentOffsets {
    pub fn for_vertex_count(vertex_count: u32) -> Self {
        let v = u64::from(vertex_count);
        let positions = (HEADER_SIZE + COUNT_SIZE) as u64;
        let normals = positions + positions_len(v);
        let tex_coords = normals + normals_len(v);
        let index_count = tex_coords + tex_coords_len(v);
        Self {
            positions,
            normals,
            tex_coords,
            index_count,
            indices: index_count + COUNT_SIZE as u64,
        }
    }
}

#[inline]
fn positions_len(vertex_count: u64) -> u64 {
    vertex_count * (POSITION_COMPONENTS * SCALAR_SIZE) as u64
}

#[inline]
fn normals_len(vertex_count: u64) -> u64 {
    vertex_count * (NORMAL_COMPONENTS * SCALAR_SIZE) as u64
}

#[inline]
fn tex_coords_len(vertex_count: u64) -> u64 {
    vertex_count * (TEX_COORD_COMPONENTS * SCALAR_SIZE) as u64
}

/// Total size in bytes of a file with the given counts
pub fn file_size(vertex_count: u32, index_count: u32) -> u64 {
    SegmentOffsets::for_vertex_count(vertex_count).indices
        + u64::from(index_count) * INDEX_SIZE as u64
}

// =============================================================================
// In-memory records
// =============================================================================

/// One interleaved vertex (32 bytes)
///
/// In-memory convenience only; files store each attribute in its own segment.
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
#[repr(C)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub tex_coord: [f32; 2],
}

/// Three indices forming one triangle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Pod, Zeroable)]
#[repr(C)]
pub struct Triangle {
    pub indices: [u32; 3],
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_size() {
        assert_eq!(Header::SIZE, 36);
        assert_eq!(std::mem::size_of::<Header>(), Header::SIZE);
        assert_eq!(std::mem::size_of::<Vertex>(), 32);
        assert_eq!(std::mem::size_of::<Triangle>(), 12);
    }

    #[test]
    fn test_magic_is_zero_padded() {
        assert_eq!(&MAGIC[..13], b"BAKGEMESHFILE");
        assert!(MAGIC[13..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_header_bytes() {
        let header = Header::new();
        let bytes = header.to_bytes();
        assert_eq!(&bytes[..32], &MAGIC);
        assert_eq!(bytes[32], MESH_KIND);
        assert_eq!(&bytes[33..36], &[1, 0, 0]);

        let parsed = Header::from_bytes(&bytes).unwrap();
        assert_eq!(parsed, header);
        assert!(parsed.has_valid_magic());
        assert!(parsed.is_supported_version());
    }

    #[test]
    fn test_header_from_short_bytes() {
        assert!(Header::from_bytes(&[0u8; 35]).is_none());
    }

    #[test]
    fn test_magic_with_ascii_padding_is_rejected() {
        let mut header = Header::new();
        header.magic[13..].fill(b'0');
        assert!(!header.has_valid_magic());
    }

    #[test]
    fn test_other_versions_unsupported() {
        let mut header = Header::new();
        header.major = 2;
        assert!(header.has_valid_magic());
        assert!(!header.is_supported_version());

        header.major = 1;
        header.revision = 1;
        assert!(!header.is_supported_version());
    }

    #[test]
    fn test_offsets_empty_mesh() {
        let offsets = SegmentOffsets::for_vertex_count(0);
        assert_eq!(offsets.positions, 40);
        assert_eq!(offsets.normals, 40);
        assert_eq!(offsets.tex_coords, 40);
        assert_eq!(offsets.index_count, 40);
        assert_eq!(offsets.indices, 44);
    }

    #[test]
    fn test_offsets_ten_vertices() {
        let offsets = SegmentOffsets::for_vertex_count(10);
        assert_eq!(offsets.positions, 40);
        assert_eq!(offsets.normals, 160);
        assert_eq!(offsets.tex_coords, 280);
        assert_eq!(offsets.index_count, 360);
        assert_eq!(offsets.indices, 364);
    }

    #[test]
    fn test_offsets_do_not_overflow() {
        let offsets = SegmentOffsets::for_vertex_count(u32::MAX);
        assert_eq!(offsets.index_count, 40 + 32 * u64::from(u32::MAX));
    }

    #[test]
    fn test_file_size() {
        // Single triangle: 44 + 32*3 + 4*3
        assert_eq!(file_size(3, 3), 152);
        assert_eq!(file_size(0, 0), 44);
    }
}
