use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use memmap2::{Mmap, MmapOptions};
use tempfile::NamedTempFile;
use crate::core::error::{Error, ErrorKind, Result};

/// Append-only sink a term file is written into
pub trait StoreWrite {
    /// Append bytes, returning how many were accepted
    fn write(&mut self, buf: &[u8]) -> Result<usize>;

    /// Number of bytes appended so far
    fn offset(&self) -> u64;

    /// Make the appended bytes durable; no writes are accepted afterwards
    fn commit(&mut self) -> Result<()>;
}

/// Positional read access over a finished term file
pub trait StoreRead: Send + Sync {
    /// Read up to `buf.len()` bytes at `offset`, returning how many were read
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize>;

    fn len(&self) -> u64;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Backing file, if the store lives on disk
    fn path(&self) -> Option<&Path> {
        None
    }
}

/// Writes into a temporary file next to `target` and renames it into
/// place on commit, so a half-written term file is never visible.
pub struct FileStoreWriter {
    target: PathBuf,
    inner: Option<BufWriter<NamedTempFile>>,
    written: u64,
}

impl FileStoreWriter {
    pub fn create<P: AsRef<Path>>(target: P) -> Result<Self> {
        let target = target.as_ref().to_path_buf();
        let dir = target.parent().ok_or_else(|| {
            Error::new(ErrorKind::InvalidArgument, format!("no parent directory for {}", target.display()))
        })?;
        let tmp = NamedTempFile::new_in(dir)?;

        Ok(FileStoreWriter {
            target,
            inner: Some(BufWriter::with_capacity(64 * 1024, tmp)),
            written: 0,
        })
    }

    pub fn target(&self) -> &Path {
        &self.target
    }
}

impl StoreWrite for FileStoreWriter {
    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        let inner = self.inner.as_mut().ok_or_else(|| {
            Error::new(ErrorKind::InvalidArgument, "write after commit".to_string())
        })?;
        inner.write_all(buf)?;
        self.written += buf.len() as u64;
        Ok(buf.len())
    }

    fn offset(&self) -> u64 {
        self.written
    }

    fn commit(&mut self) -> Result<()> {
        let inner = self.inner.take().ok_or_else(|| {
            Error::new(ErrorKind::InvalidArgument, "store already committed".to_string())
        })?;
        let tmp = inner.into_inner().map_err(|e| e.into_error())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.target).map_err(|e| e.error)?;
        Ok(())
    }
}

/// Read-only memory-mapped term file
pub struct MmapStore {
    path: PathBuf,
    // Zero-length files cannot be mapped
    mmap: Option<Mmap>,
}

impl MmapStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(&path)?;
        let len = file.metadata()?.len() as usize;

        let mmap = if len == 0 {
            None
        } else {
            Some(unsafe { MmapOptions::new().len(len).map(&file)? })
        };

        Ok(MmapStore { path: path.as_ref().to_path_buf(), mmap })
    }

    pub fn data(&self) -> &[u8] {
        match &self.mmap {
            Some(mmap) => &mmap[..],
            None => &[],
        }
    }
}

impl StoreRead for MmapStore {
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize> {
        Ok(copy_at(self.data(), offset, buf))
    }

    fn len(&self) -> u64 {
        self.data().len() as u64
    }

    fn path(&self) -> Option<&Path> {
        Some(&self.path)
    }
}

/// In-memory store, writable then readable
#[derive(Debug, Clone, Default)]
pub struct MemStore {
    data: Vec<u8>,
    committed: bool,
}

impl MemStore {
    pub fn new() -> Self {
        MemStore::default()
    }

    pub fn from_bytes(data: Vec<u8>) -> Self {
        MemStore { data, committed: true }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }
}

impl StoreWrite for MemStore {
    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        if self.committed {
            return Err(Error::new(ErrorKind::InvalidArgument, "write after commit".to_string()));
        }
        self.data.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn offset(&self) -> u64 {
        self.data.len() as u64
    }

    fn commit(&mut self) -> Result<()> {
        self.committed = true;
        Ok(())
    }
}

impl StoreRead for MemStore {
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize> {
        Ok(copy_at(&self.data, offset, buf))
    }

    fn len(&self) -> u64 {
        self.data.len() as u64
    }
}

fn copy_at(data: &[u8], offset: u64, buf: &mut [u8]) -> usize {
    let Ok(start) = usize::try_from(offset) else {
        return 0;
    };
    if start >= data.len() {
        return 0;
    }
    let n = buf.len().min(data.len() - start);
    buf[..n].copy_from_slice(&data[start..start + n]);
    n
}
