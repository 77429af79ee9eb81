use std::io;
use bytes::BufMut;
use fst::MapBuilder;
use tracing::{debug, info, warn};
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::TableId;
use crate::index::header::{validate_column_name, TermFileHeader, TRAILER_SIZE};
use crate::index::key_codec;
use crate::index::term::TermEntry;
use crate::storage::byte_store::{FileStoreWriter, StoreWrite};
use crate::storage::layout::{IndexLayout, TermFileName};

/// Builds one immutable term file.
///
/// The file is laid out as header, index-offset trailer, data blocks and
/// finally the ordered index. Since the trailer precedes the data, `put`
/// sizes every data block before writing any of them.
pub struct TFileWriter<S: StoreWrite> {
    store: S,
    header: TermFileHeader,
    header_end: u64,
    put_done: bool,
    poisoned: bool,
}

impl TFileWriter<FileStoreWriter> {
    /// Create `<tableSetId>-<columnName>-<version>.tindex` under `layout`
    pub fn open(layout: &IndexLayout, header: TermFileHeader) -> Result<Self> {
        let name = TermFileName::new(header.table_set_id, &header.column_name, header.version);
        let path = layout.term_file_path(&name);
        info!(path = %path.display(), "open term file writer");

        let store = FileStoreWriter::create(&path)?;
        Self::create(store, header)
    }
}

impl<S: StoreWrite> TFileWriter<S> {
    /// Write the header region and bind a writer to `store`
    pub fn create(mut store: S, header: TermFileHeader) -> Result<Self> {
        validate_column_name(&header.column_name)?;
        let start = store.offset();
        let header_end = write_exact(&mut store, start, &header.encode())?;

        Ok(TFileWriter {
            store,
            header,
            header_end,
            put_done: false,
            poisoned: false,
        })
    }

    pub fn header(&self) -> &TermFileHeader {
        &self.header
    }

    /// Write all entries of the term file. Entries are sorted with the
    /// column type's comparator unless `sorted` says they already are;
    /// each entry's `offset` is set to its data block position.
    ///
    /// A failed `put` leaves the writer unusable: `finish` refuses to
    /// commit the partial file.
    pub fn put(&mut self, entries: &mut [TermEntry], sorted: bool) -> Result<()> {
        if self.poisoned {
            return Err(Error::new(
                ErrorKind::InvalidArgument,
                "term file writer failed earlier".to_string(),
            ));
        }
        if self.put_done {
            return Err(Error::new(
                ErrorKind::InvalidArgument,
                "term file already holds its entries".to_string(),
            ));
        }

        let result = self.write_entries(entries, sorted);
        if let Err(err) = &result {
            self.poisoned = true;
            warn!(
                table_set_id = self.header.table_set_id,
                column = %self.header.column_name,
                error = %err,
                "term file write failed"
            );
        }
        result
    }

    fn write_entries(&mut self, entries: &mut [TermEntry], sorted: bool) -> Result<()> {
        let column_type = self.header.column_type;
        for entry in entries.iter() {
            key_codec::validate(column_type, &entry.value)?;
        }
        if !sorted {
            let cmp = key_codec::comparator(column_type);
            entries.sort_by(|a, b| cmp(&a.value, &b.value));
        }

        // Pass 1: size the data blocks and record where the index will start
        let data_size: u64 = entries.iter().map(TermEntry::block_size).sum();
        let index_offset = self.header_end + TRAILER_SIZE as u64 + data_size;
        let index_offset = u32::try_from(index_offset).map_err(|_| {
            Error::new(
                ErrorKind::InvalidArgument,
                format!("term file data of {} bytes exceeds the offset range", index_offset),
            )
        })?;
        let mut cursor = write_exact(&mut self.store, self.header_end, &index_offset.to_le_bytes())?;
        self.header.index_offset = index_offset;

        // Pass 2: data blocks in sorted order
        let mut block = Vec::new();
        for entry in entries.iter_mut() {
            block.clear();
            encode_table_ids(&entry.table_ids, &mut block);
            entry.offset = cursor;
            cursor = write_exact(&mut self.store, cursor, &block)?;
        }
        debug_assert_eq!(cursor, index_offset as u64);

        // Pass 3: ordered index, keys must arrive ascending
        let mut builder = MapBuilder::new(StoreSink { store: &mut self.store })?;
        for entry in entries.iter() {
            let key = key_codec::encode_key(column_type, &entry.value)?;
            builder.insert(&key, entry.offset)?;
        }
        builder.finish()?;

        self.put_done = true;
        debug!(
            table_set_id = self.header.table_set_id,
            column = %self.header.column_name,
            terms = entries.len(),
            index_offset,
            "term file entries written"
        );
        Ok(())
    }

    /// Commit the file; it is immutable from here on. A writer that never
    /// saw `put` produces a valid empty term file.
    pub fn finish(mut self) -> Result<S> {
        if self.poisoned {
            return Err(Error::new(
                ErrorKind::InvalidArgument,
                format!(
                    "term file {}-{}-{} has a failed write and cannot be committed",
                    self.header.table_set_id, self.header.column_name, self.header.version
                ),
            ));
        }
        if !self.put_done {
            self.put(&mut [], true)?;
        }
        self.store.commit()?;

        info!(
            table_set_id = self.header.table_set_id,
            column = %self.header.column_name,
            version = self.header.version,
            size = self.store.offset(),
            "term file finished"
        );
        Ok(self.store)
    }
}

/// count:u32 followed by each table id as u64, little-endian
pub fn encode_table_ids(table_ids: &[TableId], buf: &mut Vec<u8>) {
    buf.reserve(4 + 8 * table_ids.len());
    buf.put_u32_le(table_ids.len() as u32);
    for id in table_ids {
        buf.put_u64_le(*id);
    }
}

/// Write `buf` at `cursor`, returning the cursor past it
fn write_exact<S: StoreWrite>(store: &mut S, cursor: u64, buf: &[u8]) -> Result<u64> {
    let n = store.write(buf)?;
    if n != buf.len() {
        return Err(Error::new(
            ErrorKind::ShortWrite,
            format!("wrote {} of {} bytes at offset {}", n, buf.len(), cursor),
        ));
    }
    Ok(cursor + n as u64)
}

/// Lets the ordered-index builder append to the same store
struct StoreSink<'a, S: StoreWrite> {
    store: &'a mut S,
}

impl<S: StoreWrite> io::Write for StoreSink<'_, S> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.store.write(buf).map_err(io::Error::other)?;
        if n != buf.len() {
            let short = Error::new(
                ErrorKind::ShortWrite,
                format!("wrote {} of {} index bytes", n, buf.len()),
            );
            return Err(io::Error::new(io::ErrorKind::WriteZero, short));
        }
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
