//! Seekable byte stream capability used by the codec.
//!
//! The decoder and encoder never touch a concrete filesystem. They go through
//! a [`Storage`] that resolves paths to [`Stream`]s. Two backends ship here:
//!
//! - [`FsStorage`] - the host filesystem, optionally rooted at a directory
//! - [`MemoryStorage`] - a shared in-memory file table (tests, tooling)
//!
//! `io::Cursor<Vec<u8>>` is also a [`Stream`], for decoding a buffer directly.

use std::fs::{File, OpenOptions};
use std::io::{self, Cursor, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use hashbrown::{HashMap, HashSet};

/// An open, seekable byte stream.
pub trait Stream: Read + Write + Seek {
    /// Total length of the stream in bytes
    fn length(&mut self) -> io::Result<u64>;

    /// Release the stream, reporting any error the backend surfaces on close
    fn close(self) -> io::Result<()>;
}

/// Resolves paths to streams.
pub trait Storage {
    type Stream: Stream;

    fn exists(&self, path: &Path) -> bool;

    fn is_directory(&self, path: &Path) -> bool;

    /// Open an existing resource for reading
    fn open_read(&self, path: &Path) -> io::Result<Self::Stream>;

    /// Create or truncate a resource for writing
    fn open_write(&self, path: &Path) -> io::Result<Self::Stream>;
}

impl<T: Storage + ?Sized> Storage for &T {
    type Stream = T::Stream;

    fn exists(&self, path: &Path) -> bool {
        (**self).exists(path)
    }

    fn is_directory(&self, path: &Path) -> bool {
        (**self).is_directory(path)
    }

    fn open_read(&self, path: &Path) -> io::Result<Self::Stream> {
        (**self).open_read(path)
    }

    fn open_write(&self, path: &Path) -> io::Result<Self::Stream> {
        (**self).open_write(path)
    }
}

fn stream_length<S: Seek>(stream: &mut S) -> io::Result<u64> {
    let position = stream.stream_position()?;
    let len = stream.seek(SeekFrom::End(0))?;
    if position != len {
        stream.seek(SeekFrom::Start(position))?;
    }
    Ok(len)
}

impl Stream for Cursor<Vec<u8>> {
    fn length(&mut self) -> io::Result<u64> {
        Ok(self.get_ref().len() as u64)
    }

    fn close(self) -> io::Result<()> {
        Ok(())
    }
}

// =============================================================================
// Filesystem backend
// =============================================================================

/// Host filesystem storage.
///
/// With a root, relative paths resolve against it; absolute paths are used as
/// given either way.
#[derive(Debug, Clone, Default)]
pub struct FsStorage {
    root: Option<PathBuf>,
}

impl FsStorage {
    pub fn new() -> Self {
        Self { root: None }
    }

    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }

    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    /// Host path a storage path maps to
    pub fn resolve(&self, path: &Path) -> PathBuf {
        match &self.root {
            Some(root) => root.join(path),
            None => path.to_path_buf(),
        }
    }
}

impl Storage for FsStorage {
    type Stream = FileStream;

    fn exists(&self, path: &Path) -> bool {
        self.resolve(path).exists()
    }

    fn is_directory(&self, path: &Path) -> bool {
        self.resolve(path).is_dir()
    }

    fn open_read(&self, path: &Path) -> io::Result<FileStream> {
        let file = File::open(self.resolve(path))?;
        Ok(FileStream {
            file,
            writable: false,
        })
    }

    fn open_write(&self, path: &Path) -> io::Result<FileStream> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(self.resolve(path))?;
        Ok(FileStream {
            file,
            writable: true,
        })
    }
}

/// Stream over a host file
#[derive(Debug)]
pub struct FileStream {
    file: File,
    writable: bool,
}

impl Read for FileStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }
}

impl Write for FileStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

impl Seek for FileStream {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.file.seek(pos)
    }
}

impl Stream for FileStream {
    fn length(&mut self) -> io::Result<u64> {
        Ok(self.file.metadata()?.len())
    }

    fn close(mut self) -> io::Result<()> {
        if self.writable {
            self.file.flush()?;
            self.file.sync_all()?;
        }
        Ok(())
    }
}

// =============================================================================
// In-memory backend
// =============================================================================

#[derive(Debug, Default)]
struct MemoryTable {
    files: HashMap<PathBuf, Vec<u8>>,
    directories: HashSet<PathBuf>,
}

/// In-memory storage. Clones share the same file table.
///
/// Written streams become visible to readers when they are closed.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    table: Arc<Mutex<MemoryTable>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn table(&self) -> MutexGuard<'_, MemoryTable> {
        // A poisoned table still holds consistent bytes; every mutation is a
        // single insert.
        self.table.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Store a file's contents directly
    pub fn insert(&self, path: impl Into<PathBuf>, bytes: impl Into<Vec<u8>>) {
        self.table().files.insert(path.into(), bytes.into());
    }

    /// Register a directory entry
    pub fn create_dir(&self, path: impl Into<PathBuf>) {
        self.table().directories.insert(path.into());
    }

    /// Copy of a file's contents
    pub fn get(&self, path: impl AsRef<Path>) -> Option<Vec<u8>> {
        self.table().files.get(path.as_ref()).cloned()
    }

    pub fn remove(&self, path: impl AsRef<Path>) -> Option<Vec<u8>> {
        self.table().files.remove(path.as_ref())
    }

    pub fn len(&self) -> usize {
        self.table().files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Storage for MemoryStorage {
    type Stream = MemoryStream;

    fn exists(&self, path: &Path) -> bool {
        let table = self.table();
        table.files.contains_key(path) || table.directories.contains(path)
    }

    fn is_directory(&self, path: &Path) -> bool {
        self.table().directories.contains(path)
    }

    fn open_read(&self, path: &Path) -> io::Result<MemoryStream> {
        let table = self.table();
        if table.directories.contains(path) {
            return Err(io::Error::new(
                io::ErrorKind::IsADirectory,
                format!("{} is a directory", path.display()),
            ));
        }
        let bytes = table.files.get(path).cloned().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} does not exist", path.display()),
            )
        })?;
        Ok(MemoryStream {
            cursor: Cursor::new(bytes),
            commit: None,
        })
    }

    fn open_write(&self, path: &Path) -> io::Result<MemoryStream> {
        if self.is_directory(path) {
            return Err(io::Error::new(
                io::ErrorKind::IsADirectory,
                format!("{} is a directory", path.display()),
            ));
        }
        Ok(MemoryStream {
            cursor: Cursor::new(Vec::new()),
            commit: Some((Arc::clone(&self.table), path.to_path_buf())),
        })
    }
}

/// Stream over an in-memory file
#[derive(Debug)]
pub struct MemoryStream {
    cursor: Cursor<Vec<u8>>,
    commit: Option<(Arc<Mutex<MemoryTable>>, PathBuf)>,
}

impl Read for MemoryStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.cursor.read(buf)
    }
}

impl Write for MemoryStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.commit.is_none() {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "stream was opened for reading",
            ));
        }
        self.cursor.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Seek for MemoryStream {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.cursor.seek(pos)
    }
}

impl Stream for MemoryStream {
    fn length(&mut self) -> io::Result<u64> {
        stream_length(&mut self.cursor)
    }

    fn close(self) -> io::Result<()> {
        if let Some((table, path)) = self.commit {
            let mut table = table.lock().unwrap_or_else(|e| e.into_inner());
            table.files.insert(path, self.cursor.into_inner());
        }
        Ok(())
    }
}
