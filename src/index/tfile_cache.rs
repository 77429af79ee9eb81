use std::collections::HashMap;
use std::sync::Arc;
use bytes::BufMut;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use rayon::prelude::*;
use tracing::{debug, error, info, warn};
use crate::core::config::Config;
use crate::core::error::Result;
use crate::core::types::{ColumnType, TableSetId};
use crate::index::header::{TermFileHeader, COLUMN_NAME_LEN};
use crate::index::tfile_reader::TFileReader;
use crate::storage::layout::{IndexLayout, TermFileName};

/// Shared handle to an open term file; dropping it releases the reference
pub type ReaderHandle = Arc<TFileReader>;

/// tableSetId(8) + columnType(1) + columnName(64)
pub const CACHE_KEY_SIZE: usize = 8 + 1 + COLUMN_NAME_LEN;

/// Logical column index identity, independent of version
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub table_set_id: TableSetId,
    pub column_name: String,
    pub column_type: ColumnType,
}

impl CacheKey {
    pub fn new(table_set_id: TableSetId, column_name: &str, column_type: ColumnType) -> Self {
        CacheKey {
            table_set_id,
            column_name: column_name.to_string(),
            column_type,
        }
    }

    pub fn from_header(header: &TermFileHeader) -> Self {
        CacheKey::new(header.table_set_id, &header.column_name, header.column_type)
    }

    /// Fixed-size map key. Names longer than a header can hold are cut,
    /// which cannot collide with a registered key since registered names
    /// always leave the last byte zero.
    pub fn serialize(&self) -> [u8; CACHE_KEY_SIZE] {
        let mut buf = [0u8; CACHE_KEY_SIZE];
        let mut dst = &mut buf[..];
        dst.put_u64_le(self.table_set_id);
        dst.put_u8(self.column_type.tag());

        let name = self.column_name.as_bytes();
        let n = name.len().min(COLUMN_NAME_LEN);
        dst.put_slice(&name[..n]);
        buf
    }
}

/// Live reader registered for a key
struct CacheEntry {
    key: CacheKey,
    reader: ReaderHandle,
    registered_at: DateTime<Utc>,
}

/// Registry keeping at most one current reader per column index.
///
/// Replacing a reader unregisters the old one; queries already holding
/// the old handle keep it alive until they drop it.
pub struct TFileCache {
    readers: RwLock<HashMap<[u8; CACHE_KEY_SIZE], CacheEntry>>,
    remove_retired_files: bool,
}

impl TFileCache {
    pub fn new(remove_retired_files: bool) -> Self {
        TFileCache {
            readers: RwLock::new(HashMap::new()),
            remove_retired_files,
        }
    }

    /// Current reader for `key`, with a new reference taken on it
    pub fn get(&self, key: &CacheKey) -> Option<ReaderHandle> {
        let readers = self.readers.read();
        let reader = readers.get(&key.serialize()).map(|entry| Arc::clone(&entry.reader));
        debug!(
            table_set_id = key.table_set_id,
            column = %key.column_name,
            hit = reader.is_some(),
            "term file cache lookup"
        );
        reader
    }

    /// Register `reader` as current for `key`, retiring any previous one
    pub fn put(&self, key: CacheKey, reader: ReaderHandle) {
        let serialized = key.serialize();
        let version = reader.header().version;
        let new_path = reader.path().map(|p| p.to_path_buf());
        let entry = CacheEntry {
            key,
            reader,
            registered_at: Utc::now(),
        };

        let old = {
            let mut readers = self.readers.write();
            let old = readers.insert(serialized, entry);
            if let Some(old) = &old {
                // a rewrite of the same file must not delete its replacement
                let same_file = new_path.is_some() && old.reader.path() == new_path.as_deref();
                old.reader.retire(self.remove_retired_files && !same_file);
            }
            old
        };

        if let Some(old) = old {
            info!(
                table_set_id = old.key.table_set_id,
                column = %old.key.column_name,
                old_version = old.reader.header().version,
                new_version = version,
                in_flight = Arc::strong_count(&old.reader) - 1,
                "replaced term file reader"
            );
        }
    }

    /// Unregister the reader for `key`; true when one was registered
    pub fn remove(&self, key: &CacheKey) -> bool {
        let old = self.readers.write().remove(&key.serialize());
        match old {
            Some(entry) => {
                entry.reader.retire(self.remove_retired_files);
                true
            }
            None => false,
        }
    }

    /// Open and register every term file under `layout`. Files whose names
    /// do not parse, or that fail to open, are logged and skipped.
    pub fn populate(&self, layout: &IndexLayout, config: &Config) -> Result<usize> {
        let files: Vec<(String, TermFileName)> = layout
            .list_files(config.file_order)?
            .into_iter()
            .filter_map(|file| match TermFileName::parse(&file) {
                Ok(name) => Some((file, name)),
                Err(e) => {
                    warn!(file = %file, error = %e, "skip invalid term file");
                    None
                }
            })
            .collect();

        let open = |(file, name): &(String, TermFileName)| {
            let path = layout.base_dir.join(file);
            (name.clone(), TFileReader::open_file(&path, config.max_index_size))
        };
        let opened: Vec<_> = if config.parallel_open {
            files.par_iter().map(open).collect()
        } else {
            files.iter().map(open).collect()
        };

        // registration stays sequential so the later file wins
        let mut registered = 0;
        for (name, result) in opened {
            let reader = match result {
                Ok(reader) => reader,
                Err(e) => {
                    error!(file = %name.file_name(), error = %e, "failed to load term file, skip it");
                    continue;
                }
            };

            let key = CacheKey::from_header(reader.header());
            if key.table_set_id != name.table_set_id || key.column_name != name.column_name {
                warn!(
                    file = %name.file_name(),
                    table_set_id = key.table_set_id,
                    column = %key.column_name,
                    "term file header disagrees with its name, using header"
                );
            }
            self.put(key, Arc::new(reader));
            registered += 1;
        }

        info!(path = %layout.base_dir.display(), registered, "term file cache populated");
        Ok(registered)
    }

    /// Release the cache's reference on every reader and clear the map
    pub fn teardown(&self) {
        let drained: Vec<CacheEntry> = {
            let mut readers = self.readers.write();
            readers.drain().map(|(_, entry)| entry).collect()
        };

        for entry in drained {
            info!(
                table_set_id = entry.key.table_set_id,
                column = %entry.key.column_name,
                column_type = ?entry.key.column_type,
                "drop term file cache entry"
            );
        }
    }

    pub fn len(&self) -> usize {
        self.readers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.readers.read().is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        let readers = self.readers.read();
        let mut entries: Vec<EntryStats> = readers
            .values()
            .map(|entry| EntryStats {
                key: entry.key.clone(),
                version: entry.reader.header().version,
                terms: entry.reader.num_terms(),
                // the cache's own reference is not counted
                handles: Arc::strong_count(&entry.reader) - 1,
                opened_at: entry.reader.opened_at(),
                registered_at: entry.registered_at,
            })
            .collect();
        entries.sort_by(|a, b| {
            (a.key.table_set_id, &a.key.column_name).cmp(&(b.key.table_set_id, &b.key.column_name))
        });

        CacheStats { entries }
    }
}

impl Drop for TFileCache {
    fn drop(&mut self) {
        self.teardown();
    }
}

pub struct CacheStats {
    pub entries: Vec<EntryStats>,
}

pub struct EntryStats {
    pub key: CacheKey,
    pub version: u32,
    pub terms: usize,
    pub handles: usize,
    pub opened_at: DateTime<Utc>,
    pub registered_at: DateTime<Utc>,
}
