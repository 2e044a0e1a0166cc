//! BMF decoder
//!
//! [`MeshFile`] is an open, validated decode session. Opening reads only the
//! header and the two count fields; every segment is extracted on demand by
//! seeking to its cached offset.

use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

use byteorder::{ByteOrder, LittleEndian, ReadBytesExt};

use crate::error::{CloseError, MetadataField, OpenError, ReadError, Segment};
use crate::format::{
    Header, INDEX_SIZE, NORMAL_COMPONENTS, POSITION_COMPONENTS, SCALAR_SIZE, SegmentOffsets,
    TEX_COORD_COMPONENTS, file_size,
};
use crate::stream::{Storage, Stream};

/// An open Bakge Mesh File, v1.0.0
///
/// Extraction methods take `&mut self` because they move the stream cursor.
/// Use one handle per thread.
#[derive(Debug)]
pub struct MeshFile<S: Stream> {
    stream: S,
    header: Header,
    vertex_count: u32,
    index_count: u32,
    offsets: SegmentOffsets,
}

impl<S: Stream> MeshFile<S> {
    /// Open and validate the mesh file at `path`
    pub fn open<St>(storage: &St, path: impl AsRef<Path>) -> Result<Self, OpenError>
    where
        St: Storage<Stream = S> + ?Sized,
    {
        let path = path.as_ref();
        tracing::debug!("Verifying mesh file {:?}", path);

        if !storage.exists(path) {
            return Err(OpenError::NotFound(path.to_path_buf()));
        }
        if storage.is_directory(path) {
            return Err(OpenError::IsDirectory(path.to_path_buf()));
        }

        let stream = storage.open_read(path)?;
        Self::from_stream(stream)
    }

    /// Validate an already opened stream
    ///
    /// The stream is closed before any error is returned.
    pub fn from_stream(mut stream: S) -> Result<Self, OpenError> {
        match scan(&mut stream) {
            Ok((header, vertex_count, index_count, offsets)) => Ok(Self {
                stream,
                header,
                vertex_count,
                index_count,
                offsets,
            }),
            Err(e) => {
                if let Err(close_err) = stream.close() {
                    tracing::warn!("Failed to close rejected mesh stream: {}", close_err);
                }
                Err(e)
            }
        }
    }

    /// Release the underlying stream
    pub fn close(self) -> Result<(), CloseError> {
        tracing::trace!("Closing mesh file ({} vertices)", self.vertex_count);
        self.stream.close()?;
        Ok(())
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    pub fn offsets(&self) -> SegmentOffsets {
        self.offsets
    }

    /// Size the file should have according to its counts
    pub fn expected_size(&self) -> u64 {
        file_size(self.vertex_count, self.index_count)
    }

    /// Actual length of the underlying stream
    pub fn stream_length(&mut self) -> io::Result<u64> {
        self.stream.length()
    }

    /// Fill `buf` (exactly `3 * vertex_count` floats) with vertex positions
    pub fn read_positions(&mut self, buf: &mut [f32]) -> Result<(), ReadError> {
        let expected = self.vertex_count as usize * POSITION_COMPONENTS;
        let offset = self.offsets.positions;
        self.read_scalars(Segment::Positions, offset, expected, buf)
    }

    /// Fill `buf` (exactly `3 * vertex_count` floats) with vertex normals
    pub fn read_normals(&mut self, buf: &mut [f32]) -> Result<(), ReadError> {
        let expected = self.vertex_count as usize * NORMAL_COMPONENTS;
        let offset = self.offsets.normals;
        self.read_scalars(Segment::Normals, offset, expected, buf)
    }

    /// Fill `buf` (exactly `2 * vertex_count` floats) with texture coordinates
    pub fn read_tex_coords(&mut self, buf: &mut [f32]) -> Result<(), ReadError> {
        let expected = self.vertex_count as usize * TEX_COORD_COMPONENTS;
        let offset = self.offsets.tex_coords;
        self.read_scalars(Segment::TexCoords, offset, expected, buf)
    }

    /// Fill `buf` (exactly `index_count` values) with triangle indices
    pub fn read_indices(&mut self, buf: &mut [u32]) -> Result<(), ReadError> {
        let segment = Segment::Indices;
        let expected = self.index_count as usize;
        check_len(segment, expected, buf.len())?;

        let bytes = self.read_segment(segment, self.offsets.indices, expected * INDEX_SIZE)?;
        LittleEndian::read_u32_into(&bytes, buf);
        Ok(())
    }

    fn read_scalars(
        &mut self,
        segment: Segment,
        offset: u64,
        expected: usize,
        buf: &mut [f32],
    ) -> Result<(), ReadError> {
        check_len(segment, expected, buf.len())?;

        let bytes = self.read_segment(segment, offset, expected * SCALAR_SIZE)?;
        LittleEndian::read_f32_into(&bytes, buf);
        Ok(())
    }

    fn read_segment(
        &mut self,
        segment: Segment,
        offset: u64,
        len: usize,
    ) -> Result<Vec<u8>, ReadError> {
        self.stream
            .seek(SeekFrom::Start(offset))
            .map_err(|source| ReadError::Seek {
                segment,
                offset,
                source,
            })?;

        let mut bytes = vec![0u8; len];
        let actual = read_up_to(&mut self.stream, &mut bytes)
            .map_err(|source| ReadError::Io { segment, source })?;
        if actual < len {
            return Err(ReadError::IncompleteRead {
                segment,
                expected: len,
                actual,
            });
        }

        tracing::trace!("Read {} bytes of {} at offset {:#x}", len, segment, offset);
        Ok(bytes)
    }
}

fn check_len(segment: Segment, expected: usize, actual: usize) -> Result<(), ReadError> {
    if expected != actual {
        return Err(ReadError::BufferSize {
            segment,
            expected,
            actual,
        });
    }
    Ok(())
}

/// Read until `buf` is full or the stream ends, returning the bytes read
fn read_up_to<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Read a count field, mapping end-of-stream to a truncation error
fn read_count<R: Read>(reader: &mut R, field: MetadataField) -> Result<u32, OpenError> {
    reader.read_u32::<LittleEndian>().map_err(|e| {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            OpenError::TruncatedMetadata(field)
        } else {
            OpenError::Stream(e)
        }
    })
}

/// Validate the header and locate every segment
fn scan<S: Stream>(stream: &mut S) -> Result<(Header, u32, u32, SegmentOffsets), OpenError> {
    // The header is always at the start, whatever the cursor says
    stream.seek(SeekFrom::Start(0))?;

    let mut header_bytes = [0u8; Header::SIZE];
    let actual = read_up_to(stream, &mut header_bytes)?;
    let header = Header::from_bytes(&header_bytes[..actual]).ok_or(
        OpenError::TruncatedHeader {
            expected: Header::SIZE,
            actual,
        },
    )?;

    if !header.has_valid_magic() {
        return Err(OpenError::BadMagic);
    }
    if !header.is_supported_version() {
        return Err(OpenError::UnsupportedVersion {
            major: header.major,
            minor: header.minor,
            revision: header.revision,
        });
    }

    tracing::debug!(
        "Verified Bakge Mesh File v{}.{}.{}",
        header.major,
        header.minor,
        header.revision
    );

    // Stream sits right after the header
    let vertex_count = read_count(stream, MetadataField::VertexCount)?;
    let offsets = SegmentOffsets::for_vertex_count(vertex_count);

    stream
        .seek(SeekFrom::Start(offsets.index_count))
        .map_err(|source| OpenError::Seek {
            field: MetadataField::IndexCount,
            offset: offsets.index_count,
            source,
        })?;
    let index_count = read_count(stream, MetadataField::IndexCount)?;

    tracing::debug!(
        vertex_count,
        index_count,
        positions = offsets.positions,
        normals = offsets.normals,
        tex_coords = offsets.tex_coords,
        indices = offsets.indices,
        "Located mesh segments"
    );

    Ok((header, vertex_count, index_count, offsets))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::{MeshView, encode_to_writer};
    use std::io::Cursor;

    fn triangle_bytes() -> Vec<u8> {
        let positions = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
        let normals = [0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0];
        let tex_coords = [0.0, 0.0, 1.0, 0.0, 0.0, 1.0];
        let indices = [0, 1, 2];
        let mesh = MeshView {
            vertex_count: 3,
            positions: &positions,
            normals: &normals,
            tex_coords: &tex_coords,
            index_count: 3,
            indices: &indices,
        };
        let mut bytes = Vec::new();
        encode_to_writer(&mut bytes, &mesh).unwrap();
        bytes
    }

    fn unchecked_handle(
        bytes: Vec<u8>,
        vertex_count: u32,
        index_count: u32,
    ) -> MeshFile<Cursor<Vec<u8>>> {
        MeshFile {
            stream: Cursor::new(bytes),
            header: Header::new(),
            vertex_count,
            index_count,
            offsets: SegmentOffsets::for_vertex_count(vertex_count),
        }
    }

    fn open_bytes(bytes: Vec<u8>) -> Result<MeshFile<Cursor<Vec<u8>>>, OpenError> {
        MeshFile::from_stream(Cursor::new(bytes))
    }

    #[test]
    fn test_open_triangle() {
        let mut file = open_bytes(triangle_bytes()).unwrap();
        assert_eq!(file.vertex_count(), 3);
        assert_eq!(file.index_count(), 3);
        assert_eq!(file.header().kind, 0);
        assert_eq!(file.expected_size(), 152);
        assert_eq!(file.stream_length().unwrap(), 152);

        let offsets = file.offsets();
        assert_eq!(offsets.positions, 40);
        assert_eq!(offsets.normals, 76);
        assert_eq!(offsets.tex_coords, 112);
        assert_eq!(offsets.index_count, 136);
        assert_eq!(offsets.indices, 140);

        let mut positions = vec![0.0; 9];
        file.read_positions(&mut positions).unwrap();
        assert_eq!(positions, [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0]);

        let mut indices = vec![0; 3];
        file.read_indices(&mut indices).unwrap();
        assert_eq!(indices, [0, 1, 2]);

        file.close().unwrap();
    }

    #[test]
    fn test_open_rewinds_written_cursor() {
        let positions = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
        let normals = [0.0; 9];
        let tex_coords = [0.0; 6];
        let mesh = MeshView {
            vertex_count: 3,
            positions: &positions,
            normals: &normals,
            tex_coords: &tex_coords,
            index_count: 3,
            indices: &[2, 1, 0],
        };

        let mut cursor = Cursor::new(Vec::new());
        encode_to_writer(&mut cursor, &mesh).unwrap();
        assert_eq!(cursor.position(), 152);

        let mut file = MeshFile::from_stream(cursor).unwrap();
        assert_eq!(file.vertex_count(), 3);
        assert_eq!(file.index_count(), 3);

        let mut decoded = [0.0f32; 9];
        file.read_positions(&mut decoded).unwrap();
        assert_eq!(decoded, positions);
        let mut indices = [0u32; 3];
        file.read_indices(&mut indices).unwrap();
        assert_eq!(indices, [2, 1, 0]);
    }

    #[test]
    fn test_segments_in_any_order() {
        let mut file = open_bytes(triangle_bytes()).unwrap();

        let mut indices = vec![0; 3];
        file.read_indices(&mut indices).unwrap();
        let mut tex_coords = vec![0.0; 6];
        file.read_tex_coords(&mut tex_coords).unwrap();
        let mut normals = vec![0.0; 9];
        file.read_normals(&mut normals).unwrap();

        assert_eq!(indices, [0, 1, 2]);
        assert_eq!(tex_coords, [0.0, 0.0, 1.0, 0.0, 0.0, 1.0]);
        assert_eq!(normals, [0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_repeated_reads_are_identical() {
        let mut file = open_bytes(triangle_bytes()).unwrap();

        let mut first = vec![0.0; 9];
        let mut second = vec![0.0; 9];
        file.read_positions(&mut first).unwrap();
        file.read_normals(&mut second).unwrap();
        file.read_positions(&mut second).unwrap();

        assert_eq!(first, second);
        assert_eq!(file.vertex_count(), 3);
        assert_eq!(file.vertex_count(), 3);
        assert_eq!(file.index_count(), 3);
    }

    #[test]
    fn test_bad_magic() {
        let mut bytes = triangle_bytes();
        bytes[0] = b'X';
        assert!(matches!(open_bytes(bytes), Err(OpenError::BadMagic)));
    }

    #[test]
    fn test_bad_magic_in_padding() {
        let mut bytes = triangle_bytes();
        bytes[31] = b'0';
        assert!(matches!(open_bytes(bytes), Err(OpenError::BadMagic)));
    }

    #[test]
    fn test_unsupported_version() {
        let mut bytes = triangle_bytes();
        bytes[33] = 2;
        match open_bytes(bytes) {
            Err(OpenError::UnsupportedVersion {
                major,
                minor,
                revision,
            }) => assert_eq!((major, minor, revision), (2, 0, 0)),
            other => panic!("expected UnsupportedVersion, got {:?}", other),
        }
    }

    #[test]
    fn test_truncated_header() {
        let mut bytes = triangle_bytes();
        bytes.truncate(20);
        match open_bytes(bytes) {
            Err(OpenError::TruncatedHeader { expected, actual }) => {
                assert_eq!(expected, 36);
                assert_eq!(actual, 20);
            }
            other => panic!("expected TruncatedHeader, got {:?}", other),
        }
        assert!(matches!(
            open_bytes(Vec::new()),
            Err(OpenError::TruncatedHeader { actual: 0, .. })
        ));
    }

    #[test]
    fn test_truncated_vertex_count() {
        let mut bytes = triangle_bytes();
        bytes.truncate(38);
        assert!(matches!(
            open_bytes(bytes),
            Err(OpenError::TruncatedMetadata(MetadataField::VertexCount))
        ));
    }

    #[test]
    fn test_truncated_index_count() {
        let mut bytes = triangle_bytes();
        // Cut inside the index_count field at 136..140
        bytes.truncate(138);
        assert!(matches!(
            open_bytes(bytes),
            Err(OpenError::TruncatedMetadata(MetadataField::IndexCount))
        ));
    }

    #[test]
    fn test_truncated_positions_reports_shortfall() {
        // Positions run 40..76; stop 10 bytes short
        let mut bytes = triangle_bytes();
        bytes.truncate(66);

        // open() would already reject this file, so skip validation
        let mut file = unchecked_handle(bytes, 3, 3);
        let mut positions = vec![0.0; 9];
        let err = file.read_positions(&mut positions).unwrap_err();
        assert_eq!(err.shortfall(), Some(10));
        match err {
            ReadError::IncompleteRead {
                segment,
                expected,
                actual,
            } => {
                assert_eq!(segment, Segment::Positions);
                assert_eq!(expected, 36);
                assert_eq!(actual, 26);
            }
            other => panic!("expected IncompleteRead, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_indices_segment() {
        let mut bytes = triangle_bytes();
        bytes.truncate(140);

        // Counts are intact, so open succeeds
        let mut file = open_bytes(bytes).unwrap();
        let mut indices = vec![0; 3];
        assert!(matches!(
            file.read_indices(&mut indices),
            Err(ReadError::IncompleteRead {
                segment: Segment::Indices,
                expected: 12,
                actual: 0,
            })
        ));
    }

    #[test]
    fn test_buffer_size_mismatch() {
        let mut file = open_bytes(triangle_bytes()).unwrap();

        let mut short = vec![0.0; 8];
        assert!(matches!(
            file.read_positions(&mut short),
            Err(ReadError::BufferSize {
                segment: Segment::Positions,
                expected: 9,
                actual: 8,
            })
        ));

        let mut long = vec![0.0; 7];
        assert!(matches!(
            file.read_tex_coords(&mut long),
            Err(ReadError::BufferSize {
                expected: 6,
                actual: 7,
                ..
            })
        ));

        let mut indices = vec![0; 4];
        assert!(file.read_indices(&mut indices).is_err());
    }

    #[test]
    fn test_empty_mesh() {
        let mesh = MeshView {
            vertex_count: 0,
            positions: &[],
            normals: &[],
            tex_coords: &[],
            index_count: 0,
            indices: &[],
        };
        let mut bytes = Vec::new();
        encode_to_writer(&mut bytes, &mesh).unwrap();
        assert_eq!(bytes.len(), 44);

        let mut file = open_bytes(bytes).unwrap();
        assert_eq!(file.vertex_count(), 0);
        assert_eq!(file.index_count(), 0);
        assert_eq!(file.offsets().normals, file.offsets().positions);

        let mut positions: Vec<f32> = Vec::new();
        file.read_positions(&mut positions).unwrap();
        let mut indices: Vec<u32> = Vec::new();
        file.read_indices(&mut indices).unwrap();
    }
}
