use std::sync::Arc;
use tracing::info;
use crate::core::config::Config;
use crate::core::error::Result;
use crate::core::types::{ColumnType, TableId, TableSetId};
use crate::index::header::TermFileHeader;
use crate::index::term::{TermEntry, TermQuery};
use crate::index::tfile_cache::{CacheKey, ReaderHandle, TFileCache};
use crate::index::tfile_reader::TFileReader;
use crate::index::tfile_writer::TFileWriter;
use crate::storage::file_lock::FileLock;
use crate::storage::layout::IndexLayout;

/// Entry point used by the query engine: owns the reader cache for one
/// index directory and resolves searches against it.
pub struct TFileIndex {
    config: Config,
    layout: IndexLayout,
    cache: TFileCache,
    _lock: FileLock,
}

impl TFileIndex {
    /// Lock the index directory and load every term file found in it
    pub fn open(config: Config) -> Result<Self> {
        let layout = IndexLayout::new(config.index_path.clone())?;
        let lock = FileLock::acquire(&layout)?;

        let cache = TFileCache::new(config.remove_retired_files);
        cache.populate(&layout, &config)?;

        info!(path = %layout.base_dir.display(), columns = cache.len(), "term file index opened");
        Ok(TFileIndex {
            config,
            layout,
            cache,
            _lock: lock,
        })
    }

    /// Table ids matching `query`. A column without an index yet reports
    /// no matches rather than an error; unsupported query kinds fail
    /// whether or not the column is indexed.
    pub fn search(&self, query: &TermQuery) -> Result<Vec<TableId>> {
        query.ensure_supported()?;
        let Some(reader) = self.cache.get(&query.term.cache_key()) else {
            return Ok(Vec::new());
        };
        reader.search(query)
    }

    pub fn get_reader(&self, key: &CacheKey) -> Option<ReaderHandle> {
        self.cache.get(key)
    }

    /// Reader for a column of the configured default type
    pub fn get_reader_for_column(&self, table_set_id: TableSetId, column_name: &str) -> Option<ReaderHandle> {
        let key = CacheKey::new(table_set_id, column_name, self.config.default_column_type);
        self.cache.get(&key)
    }

    /// Build a term file for one column version and make it the current
    /// reader for that column. Queries running against the previous
    /// version finish on it.
    pub fn write_index(
        &self,
        table_set_id: TableSetId,
        column_name: &str,
        column_type: ColumnType,
        version: u32,
        entries: &mut [TermEntry],
        sorted: bool,
    ) -> Result<ReaderHandle> {
        let header = TermFileHeader::new(table_set_id, version, column_name, column_type)?;
        let mut writer = TFileWriter::open(&self.layout, header)?;
        writer.put(entries, sorted)?;
        let store = writer.finish()?;

        let reader = Arc::new(TFileReader::open_file(store.target(), self.config.max_index_size)?);
        self.cache.put(CacheKey::from_header(reader.header()), Arc::clone(&reader));
        Ok(reader)
    }

    pub fn cache(&self) -> &TFileCache {
        &self.cache
    }

    pub fn layout(&self) -> &IndexLayout {
        &self.layout
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Tear the cache down and release the directory lock
    pub fn close(self) {
        self.cache.teardown();
        info!(path = %self.layout.base_dir.display(), "term file index closed");
    }
}
