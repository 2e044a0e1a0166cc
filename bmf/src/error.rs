//! Error types for the BMF codec.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// One on-disk data segment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment {
    Positions,
    Normals,
    TexCoords,
    Indices,
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Segment::Positions => "positions",
            Segment::Normals => "normals",
            Segment::TexCoords => "tex coords",
            Segment::Indices => "indices",
        })
    }
}

/// A count field stored between segments
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataField {
    VertexCount,
    IndexCount,
}

impl fmt::Display for MetadataField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MetadataField::VertexCount => "vertex count",
            MetadataField::IndexCount => "index count",
        })
    }
}

/// Encoder stage, in write order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteStage {
    Header,
    VertexCount,
    Positions,
    Normals,
    TexCoords,
    IndexCount,
    Indices,
}

impl fmt::Display for WriteStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            WriteStage::Header => "header",
            WriteStage::VertexCount => "vertex count",
            WriteStage::Positions => "positions",
            WriteStage::Normals => "normals",
            WriteStage::TexCoords => "tex coords",
            WriteStage::IndexCount => "index count",
            WriteStage::Indices => "indices",
        })
    }
}

/// Failure to open and validate a mesh file.
#[derive(Debug, thiserror::Error)]
pub enum OpenError {
    #[error("File not found: {0}")]
    NotFound(PathBuf),

    #[error("Path is a directory: {0}")]
    IsDirectory(PathBuf),

    #[error("Stream error: {0}")]
    Stream(#[from] io::Error),

    #[error("Truncated header: expected {expected} bytes, found {actual}")]
    TruncatedHeader { expected: usize, actual: usize },

    #[error("Not a Bakge Mesh File (bad magic)")]
    BadMagic,

    #[error("Unsupported Bakge Mesh File version {major}.{minor}.{revision}")]
    UnsupportedVersion { major: u8, minor: u8, revision: u8 },

    #[error("Truncated {0} field")]
    TruncatedMetadata(MetadataField),

    #[error("Failed to seek to {field} at offset {offset:#x}: {source}")]
    Seek {
        field: MetadataField,
        offset: u64,
        source: io::Error,
    },
}

/// Failure to release a stream.
#[derive(Debug, thiserror::Error)]
#[error("Failed to close mesh file stream: {0}")]
pub struct CloseError(#[from] pub io::Error);

/// Failure to extract a segment from an open mesh file.
#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    #[error("Buffer for {segment} holds {actual} elements, expected {expected}")]
    BufferSize {
        segment: Segment,
        expected: usize,
        actual: usize,
    },

    #[error("Failed to seek to {segment} at offset {offset:#x}: {source}")]
    Seek {
        segment: Segment,
        offset: u64,
        source: io::Error,
    },

    #[error("Incomplete read of {segment}: expected {expected} bytes, got {actual}")]
    IncompleteRead {
        segment: Segment,
        expected: usize,
        actual: usize,
    },

    #[error("I/O error reading {segment}: {source}")]
    Io { segment: Segment, source: io::Error },
}

impl ReadError {
    /// Bytes missing from an incomplete read
    pub fn shortfall(&self) -> Option<usize> {
        match self {
            ReadError::IncompleteRead {
                expected, actual, ..
            } => Some(expected - actual),
            _ => None,
        }
    }
}

/// Caller-supplied arrays disagree with the declared counts.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContractError {
    #[error("{segment} holds {actual} elements, expected {expected}")]
    LengthMismatch {
        segment: Segment,
        expected: usize,
        actual: usize,
    },
}

/// Failure to write a mesh file.
///
/// A failed write leaves whatever was already written in place. Removing the
/// partial output is up to the caller.
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    #[error(transparent)]
    Contract(#[from] ContractError),

    #[error("Failed to open {path} for writing: {source}")]
    OpenForWrite { path: PathBuf, source: io::Error },

    #[error("Failed to write {stage}: {source}")]
    Write { stage: WriteStage, source: io::Error },

    #[error("Failed to close output stream: {0}")]
    Close(io::Error),
}

/// Any codec failure, for callers that load or save whole meshes.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Open(#[from] OpenError),

    #[error(transparent)]
    Read(#[from] ReadError),

    #[error(transparent)]
    Close(#[from] CloseError),

    #[error(transparent)]
    Encode(#[from] EncodeError),
}
