use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use bytes::Buf;
use chrono::{DateTime, Utc};
use fst::Map;
use tracing::{debug, error, info, warn};
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::TableId;
use crate::index::header::{TermFileHeader, PREAMBLE_SIZE};
use crate::index::key_codec;
use crate::index::term::{data_block_size, TermQuery};
use crate::index::tfile_iter::TFileIter;
use crate::storage::byte_store::{MmapStore, StoreRead};

/// Default bound on the ordered index held in memory
pub const MAX_INDEX_SIZE: usize = 64 * 1024 * 1024;

/// Read side of a term file: header and ordered index live in memory,
/// table-id blocks are read from the store on demand.
///
/// Readers are shared as `Arc<TFileReader>`; the store and index are
/// released when the last handle drops.
pub struct TFileReader {
    header: TermFileHeader,
    fst: Map<Vec<u8>>,
    store: Box<dyn StoreRead>,
    opened_at: DateTime<Utc>,
    retired: AtomicBool,
    remove_on_drop: AtomicBool,
}

impl TFileReader {
    pub fn open(store: Box<dyn StoreRead>, max_index_size: usize) -> Result<Self> {
        let header = load_header(store.as_ref())?;
        let fst = load_index(store.as_ref(), &header, max_index_size)?;

        Ok(TFileReader {
            header,
            fst,
            store,
            opened_at: Utc::now(),
            retired: AtomicBool::new(false),
            remove_on_drop: AtomicBool::new(false),
        })
    }

    /// Open a term file on disk through a read-only mapping
    pub fn open_file<P: AsRef<Path>>(path: P, max_index_size: usize) -> Result<Self> {
        let path = path.as_ref();
        let store = MmapStore::open(path)?;

        match Self::open(Box::new(store), max_index_size) {
            Ok(reader) => {
                info!(
                    path = %path.display(),
                    table_set_id = reader.header.table_set_id,
                    column = %reader.header.column_name,
                    version = reader.header.version,
                    terms = reader.num_terms(),
                    "opened term file"
                );
                Ok(reader)
            }
            Err(e) => {
                error!(path = %path.display(), error = %e, "failed to open term file");
                Err(e)
            }
        }
    }

    pub fn header(&self) -> &TermFileHeader {
        &self.header
    }

    pub fn num_terms(&self) -> usize {
        self.fst.len()
    }

    pub fn opened_at(&self) -> DateTime<Utc> {
        self.opened_at
    }

    pub fn path(&self) -> Option<&Path> {
        self.store.path()
    }

    /// Answer a query. Only exact-term lookups are implemented; an absent
    /// value yields an empty list.
    pub fn search(&self, query: &TermQuery) -> Result<Vec<TableId>> {
        query.ensure_supported()?;
        let ids = self.get(&query.term.value)?;
        debug!(
            table_set_id = self.header.table_set_id,
            column = %self.header.column_name,
            found = !ids.is_empty(),
            "term lookup"
        );
        Ok(ids)
    }

    /// Table ids stored for `value`, empty when absent
    pub fn get(&self, value: &[u8]) -> Result<Vec<TableId>> {
        let key = key_codec::encode_key(self.header.column_type, value)?;
        match self.fst.get(&key) {
            Some(offset) => self.load_table_ids(offset),
            None => Ok(Vec::new()),
        }
    }

    pub fn contains(&self, value: &[u8]) -> bool {
        key_codec::encode_key(self.header.column_type, value)
            .map(|key| self.fst.contains_key(key))
            .unwrap_or(false)
    }

    /// Stream every (value, table ids) pair in ascending value order
    pub fn iter(&self) -> TFileIter<'_> {
        TFileIter::new(self, self.fst.stream())
    }

    /// Mark this reader as superseded; with `remove_file` the backing
    /// file is deleted once the last handle is released.
    pub fn retire(&self, remove_file: bool) {
        self.retired.store(true, Ordering::Release);
        self.remove_on_drop.store(remove_file, Ordering::Release);
    }

    pub fn is_retired(&self) -> bool {
        self.retired.load(Ordering::Acquire)
    }

    pub(crate) fn load_table_ids(&self, offset: u64) -> Result<Vec<TableId>> {
        if offset < PREAMBLE_SIZE as u64 {
            return Err(Error::new(
                ErrorKind::CorruptIndex,
                format!("data block offset {} points into the header", offset),
            ));
        }
        let mut count_buf = [0u8; 4];
        let n = self.store.read_at(offset, &mut count_buf)?;
        if n != count_buf.len() {
            return Err(truncated_block(offset));
        }
        let count = u32::from_le_bytes(count_buf) as usize;

        // blocks never extend into the ordered index
        if offset + data_block_size(count) > self.header.index_offset as u64 {
            return Err(Error::new(
                ErrorKind::CorruptIndex,
                format!("data block at {} with {} ids overruns the data region", offset, count),
            ));
        }

        let mut buf = vec![0u8; count * 8];
        let n = self.store.read_at(offset + 4, &mut buf)?;
        if n != buf.len() {
            return Err(truncated_block(offset));
        }

        let mut src = &buf[..];
        let mut ids = Vec::with_capacity(count);
        while src.has_remaining() {
            ids.push(src.get_u64_le());
        }
        Ok(ids)
    }
}

impl Drop for TFileReader {
    fn drop(&mut self) {
        debug!(
            table_set_id = self.header.table_set_id,
            column = %self.header.column_name,
            version = self.header.version,
            "release term file reader"
        );

        if !(self.retired.load(Ordering::Acquire) && self.remove_on_drop.load(Ordering::Acquire)) {
            return;
        }
        if let Some(path) = self.store.path() {
            match fs::remove_file(path) {
                Ok(()) => info!(path = %path.display(), "removed retired term file"),
                Err(e) => warn!(path = %path.display(), error = %e, "failed to remove retired term file"),
            }
        }
    }
}

fn load_header(store: &dyn StoreRead) -> Result<TermFileHeader> {
    let mut preamble = [0u8; PREAMBLE_SIZE];
    let n = store.read_at(0, &mut preamble)?;
    if n < PREAMBLE_SIZE {
        return Err(Error::new(
            ErrorKind::CorruptHeader,
            format!("read {} of {} header bytes", n, PREAMBLE_SIZE),
        ));
    }

    let header = TermFileHeader::decode(&preamble)?;
    if header.index_offset as u64 > store.len() {
        return Err(Error::new(
            ErrorKind::CorruptHeader,
            format!("index offset {} beyond end of file ({})", header.index_offset, store.len()),
        ));
    }
    Ok(header)
}

fn load_index(store: &dyn StoreRead, header: &TermFileHeader, max_index_size: usize) -> Result<Map<Vec<u8>>> {
    let index_len = store.len() - header.index_offset as u64;
    if index_len > max_index_size as u64 {
        return Err(Error::new(
            ErrorKind::IndexTooLarge,
            format!("ordered index is {} bytes, limit is {}", index_len, max_index_size),
        ));
    }

    let mut buf = vec![0u8; index_len as usize];
    let n = store.read_at(header.index_offset as u64, &mut buf)?;
    if n != buf.len() {
        return Err(Error::new(
            ErrorKind::CorruptIndex,
            format!("read {} of {} index bytes", n, buf.len()),
        ));
    }

    Map::new(buf).map_err(|e| Error::new(ErrorKind::CorruptIndex, format!("FST error: {}", e)))
}

fn truncated_block(offset: u64) -> Error {
    Error::new(ErrorKind::CorruptIndex, format!("truncated data block at {}", offset))
}
