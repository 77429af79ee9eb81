use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::{ColumnType, TableId, TableSetId};
use crate::index::tfile_cache::CacheKey;

/// One column value and the tables containing it, as handed to the writer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermEntry {
    pub value: Vec<u8>,
    /// Duplicates are kept as given
    pub table_ids: Vec<TableId>,
    /// Absolute position of the data block, assigned while writing
    pub offset: u64,
}

impl TermEntry {
    pub fn new(value: impl Into<Vec<u8>>, table_ids: Vec<TableId>) -> Self {
        TermEntry {
            value: value.into(),
            table_ids,
            offset: 0,
        }
    }

    pub fn push(&mut self, table_id: TableId) {
        self.table_ids.push(table_id);
    }

    /// Serialized size of this entry's data block
    pub fn block_size(&self) -> u64 {
        data_block_size(self.table_ids.len())
    }
}

/// count(4) + tableId(8) * count
pub fn data_block_size(count: usize) -> u64 {
    4 + 8 * count as u64
}

/// A column value of one column index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Term {
    pub table_set_id: TableSetId,
    pub column_name: String,
    pub column_type: ColumnType,
    pub value: Vec<u8>,
}

impl Term {
    pub fn new(
        table_set_id: TableSetId,
        column_name: &str,
        column_type: ColumnType,
        value: impl Into<Vec<u8>>,
    ) -> Self {
        Term {
            table_set_id,
            column_name: column_name.to_string(),
            column_type,
            value: value.into(),
        }
    }

    pub fn cache_key(&self) -> CacheKey {
        CacheKey::new(self.table_set_id, &self.column_name, self.column_type)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    Term,
    Prefix,
    Suffix,
    Regex,
    Range,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermQuery {
    pub term: Term,
    pub kind: QueryKind,
}

impl TermQuery {
    pub fn new(term: Term, kind: QueryKind) -> Self {
        TermQuery { term, kind }
    }

    pub fn exact(term: Term) -> Self {
        TermQuery { term, kind: QueryKind::Term }
    }

    /// Term files answer exact lookups only
    pub fn ensure_supported(&self) -> Result<()> {
        match self.kind {
            QueryKind::Term => Ok(()),
            other => Err(Error::new(
                ErrorKind::UnsupportedQuery,
                format!("{:?} queries are not supported by term files", other),
            )),
        }
    }
}
