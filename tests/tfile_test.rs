//! Writer/reader tests for single term files

use std::collections::BTreeMap;
use rand::distributions::Alphanumeric;
use rand::{Rng, SeedableRng};
use rand::rngs::StdRng;
use tindex::core::error::{ErrorKind, Result};
use tindex::core::types::ColumnType;
use tindex::index::header::{TermFileHeader, PREAMBLE_SIZE};
use tindex::index::term::{QueryKind, Term, TermEntry, TermQuery};
use tindex::index::tfile_reader::{TFileReader, MAX_INDEX_SIZE};
use tindex::index::tfile_writer::{encode_table_ids, TFileWriter};
use tindex::storage::byte_store::{MemStore, StoreWrite};
use tindex::storage::layout::{IndexLayout, TermFileName};

fn write_mem(column_type: ColumnType, entries: &mut [TermEntry], sorted: bool) -> MemStore {
    let header = TermFileHeader::new(100, 1, "tag1", column_type).unwrap();
    let mut writer = TFileWriter::create(MemStore::new(), header).unwrap();
    writer.put(entries, sorted).unwrap();
    writer.finish().unwrap()
}

fn open_mem(store: MemStore) -> Result<TFileReader> {
    TFileReader::open(Box::new(store), MAX_INDEX_SIZE)
}

fn exact(value: &[u8]) -> TermQuery {
    TermQuery::exact(Term::new(100, "tag1", ColumnType::Binary, value))
}

fn fruit_entries() -> Vec<TermEntry> {
    vec![
        TermEntry::new("banana", vec![3]),
        TermEntry::new("apple", vec![1, 2]),
    ]
}

#[test]
fn test_unsorted_put_then_search_and_iterate() {
    let mut entries = fruit_entries();
    let reader = open_mem(write_mem(ColumnType::Binary, &mut entries, false)).unwrap();

    assert_eq!(reader.search(&exact(b"apple")).unwrap(), vec![1, 2]);
    assert_eq!(reader.search(&exact(b"banana")).unwrap(), vec![3]);
    assert_eq!(reader.search(&exact(b"cherry")).unwrap(), Vec::<u64>::new());

    let all: Vec<(Vec<u8>, Vec<u64>)> = reader.iter().collect::<Result<_>>().unwrap();
    assert_eq!(
        all,
        vec![(b"apple".to_vec(), vec![1, 2]), (b"banana".to_vec(), vec![3])]
    );
}

#[test]
fn test_put_assigns_block_offsets_in_sorted_order() {
    let mut entries = fruit_entries();
    write_mem(ColumnType::Binary, &mut entries, false);

    assert_eq!(entries[0].value, b"apple".to_vec());
    assert_eq!(entries[0].offset, PREAMBLE_SIZE as u64);
    assert_eq!(entries[1].offset, PREAMBLE_SIZE as u64 + 4 + 2 * 8);
}

#[test]
fn test_header_round_trip() {
    let mut entries = fruit_entries();
    let reader = open_mem(write_mem(ColumnType::Binary, &mut entries, false)).unwrap();

    let header = reader.header();
    assert_eq!(header.table_set_id, 100);
    assert_eq!(header.version, 1);
    assert_eq!(header.column_name, "tag1");
    assert_eq!(header.column_type, ColumnType::Binary);
    assert_eq!(header.index_offset as usize, PREAMBLE_SIZE + 20 + 12);
    assert_eq!(reader.num_terms(), 2);
}

#[test]
fn test_random_entries_round_trip() {
    let mut rng = StdRng::seed_from_u64(7);
    let mut expected: BTreeMap<Vec<u8>, Vec<u64>> = BTreeMap::new();
    while expected.len() < 500 {
        let len = rng.gen_range(1..24);
        let value: Vec<u8> = (&mut rng).sample_iter(&Alphanumeric).take(len).collect();
        let count = rng.gen_range(0..8);
        // duplicates are written as given
        let ids: Vec<u64> = (0..count).map(|_| rng.gen_range(0..16)).collect();
        expected.insert(value, ids);
    }

    let mut entries: Vec<TermEntry> = expected
        .iter()
        .rev()
        .map(|(value, ids)| TermEntry::new(value.clone(), ids.clone()))
        .collect();
    let reader = open_mem(write_mem(ColumnType::Binary, &mut entries, false)).unwrap();

    for (value, ids) in &expected {
        assert_eq!(&reader.search(&exact(value)).unwrap(), ids);
    }
    let iterated: Vec<Vec<u8>> = reader.iter().map(|item| item.unwrap().0).collect();
    let keys: Vec<Vec<u8>> = expected.keys().cloned().collect();
    assert_eq!(iterated, keys);
}

#[test]
fn test_numeric_column_iterates_in_numeric_order() {
    let values = [42i64, -7, 0, i64::MIN, 1_000_000, -1_000_000];
    let mut entries: Vec<TermEntry> = values
        .iter()
        .enumerate()
        .map(|(i, v)| TermEntry::new(v.to_le_bytes().to_vec(), vec![i as u64]))
        .collect();
    let reader = open_mem(write_mem(ColumnType::BigInt, &mut entries, false)).unwrap();

    let iterated: Vec<i64> = reader
        .iter()
        .map(|item| {
            let (value, _) = item.unwrap();
            i64::from_le_bytes(value.try_into().unwrap())
        })
        .collect();
    let mut sorted = values.to_vec();
    sorted.sort();
    assert_eq!(iterated, sorted);

    assert_eq!(reader.get(&(-7i64).to_le_bytes()).unwrap(), vec![1]);
    assert!(reader.get(&5i64.to_le_bytes()).unwrap().is_empty());
}

#[test]
fn test_double_column_search() {
    let mut entries = vec![
        TermEntry::new(2.5f64.to_le_bytes().to_vec(), vec![10]),
        TermEntry::new((-2.5f64).to_le_bytes().to_vec(), vec![11]),
    ];
    let reader = open_mem(write_mem(ColumnType::Double, &mut entries, false)).unwrap();

    assert_eq!(reader.get(&(-2.5f64).to_le_bytes()).unwrap(), vec![11]);
    let first = reader.iter().next().unwrap().unwrap();
    assert_eq!(first.0, (-2.5f64).to_le_bytes().to_vec());
}

#[test]
fn test_prefix_query_is_unsupported() {
    let mut entries = fruit_entries();
    let reader = open_mem(write_mem(ColumnType::Binary, &mut entries, false)).unwrap();

    let query = TermQuery::new(Term::new(100, "tag1", ColumnType::Binary, "app"), QueryKind::Prefix);
    let err = reader.search(&query).unwrap_err();
    assert_eq!(err.kind, ErrorKind::UnsupportedQuery);
}

#[test]
fn test_out_of_order_sorted_input_is_rejected() {
    let header = TermFileHeader::new(100, 1, "tag1", ColumnType::Binary).unwrap();
    let mut writer = TFileWriter::create(MemStore::new(), header).unwrap();

    let mut entries = fruit_entries();
    let err = writer.put(&mut entries, true).unwrap_err();
    assert_eq!(err.kind, ErrorKind::OutOfOrderInsert);
}

#[test]
fn test_duplicate_values_are_rejected() {
    let header = TermFileHeader::new(100, 1, "tag1", ColumnType::Binary).unwrap();
    let mut writer = TFileWriter::create(MemStore::new(), header).unwrap();

    let mut entries = vec![TermEntry::new("a", vec![1]), TermEntry::new("a", vec![2])];
    let err = writer.put(&mut entries, false).unwrap_err();
    assert_eq!(err.kind, ErrorKind::OutOfOrderInsert);
}

#[test]
fn test_second_put_is_rejected() {
    let header = TermFileHeader::new(100, 1, "tag1", ColumnType::Binary).unwrap();
    let mut writer = TFileWriter::create(MemStore::new(), header).unwrap();
    writer.put(&mut fruit_entries(), false).unwrap();

    let err = writer.put(&mut fruit_entries(), false).unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidArgument);
}

#[test]
fn test_finish_without_put_is_empty_file() {
    let header = TermFileHeader::new(100, 1, "tag1", ColumnType::Binary).unwrap();
    let writer = TFileWriter::create(MemStore::new(), header).unwrap();
    let reader = open_mem(writer.finish().unwrap()).unwrap();

    assert_eq!(reader.num_terms(), 0);
    assert!(reader.iter().next().is_none());
    assert!(reader.search(&exact(b"apple")).unwrap().is_empty());
}

#[test]
fn test_finish_after_failed_put_is_rejected() {
    let header = TermFileHeader::new(100, 1, "tag1", ColumnType::Binary).unwrap();
    let mut writer = TFileWriter::create(MemStore::new(), header).unwrap();

    let mut entries = vec![TermEntry::new("b", vec![1]), TermEntry::new("a", vec![2])];
    let err = writer.put(&mut entries, true).unwrap_err();
    assert_eq!(err.kind, ErrorKind::OutOfOrderInsert);

    // retrying on the same writer is refused too
    let err = writer.put(&mut fruit_entries(), false).unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidArgument);

    let err = writer.finish().err().unwrap();
    assert_eq!(err.kind, ErrorKind::InvalidArgument);
}

#[test]
fn test_failed_put_leaves_no_file() {
    let dir = tempfile::tempdir().unwrap();
    let layout = IndexLayout::new(dir.path().to_path_buf()).unwrap();
    let path = layout.term_file_path(&TermFileName::new(100, "tag1", 3));

    let header = TermFileHeader::new(100, 3, "tag1", ColumnType::Binary).unwrap();
    let mut writer = TFileWriter::open(&layout, header).unwrap();
    let mut entries = vec![TermEntry::new("b", vec![1]), TermEntry::new("a", vec![2])];
    assert!(writer.put(&mut entries, true).is_err());
    assert!(writer.finish().is_err());

    assert!(!path.exists());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn test_block_offset_inside_header_is_corrupt() {
    let header = TermFileHeader::new(1, 1, "tag1", ColumnType::Binary).unwrap();
    let mut block = Vec::new();
    encode_table_ids(&[5], &mut block);
    let index_offset = (PREAMBLE_SIZE + block.len()) as u32;

    // "apple" points at the version field, which reads as a one-id block
    let mut builder = fst::MapBuilder::memory();
    builder.insert(b"apple", 8).unwrap();
    let index = builder.into_inner().unwrap();

    let mut bytes = header.encode().to_vec();
    bytes.extend_from_slice(&index_offset.to_le_bytes());
    bytes.extend_from_slice(&block);
    bytes.extend_from_slice(&index);

    let reader = open_mem(MemStore::from_bytes(bytes)).unwrap();
    let err = reader.get(b"apple").unwrap_err();
    assert_eq!(err.kind, ErrorKind::CorruptIndex);

    let item = reader.iter().next().unwrap();
    assert_eq!(item.unwrap_err().kind, ErrorKind::CorruptIndex);
}

/// Accepts writes until `limit` bytes, then only part of each write
struct ShortStore {
    inner: MemStore,
    limit: usize,
}

impl StoreWrite for ShortStore {
    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        let room = self.limit.saturating_sub(self.inner.as_bytes().len());
        let n = buf.len().min(room);
        self.inner.write(&buf[..n])
    }

    fn offset(&self) -> u64 {
        self.inner.offset()
    }

    fn commit(&mut self) -> Result<()> {
        self.inner.commit()
    }
}

#[test]
fn test_short_write_fails_put() {
    let header = TermFileHeader::new(100, 1, "tag1", ColumnType::Binary).unwrap();
    let store = ShortStore { inner: MemStore::new(), limit: PREAMBLE_SIZE + 10 };
    let mut writer = TFileWriter::create(store, header).unwrap();

    let err = writer.put(&mut fruit_entries(), false).unwrap_err();
    assert_eq!(err.kind, ErrorKind::ShortWrite);
}

#[test]
fn test_short_write_inside_index_fails_put() {
    let header = TermFileHeader::new(100, 1, "tag1", ColumnType::Binary).unwrap();
    // room for header, trailer and both data blocks but not the index
    let store = ShortStore { inner: MemStore::new(), limit: PREAMBLE_SIZE + 32 + 4 };
    let mut writer = TFileWriter::create(store, header).unwrap();

    let err = writer.put(&mut fruit_entries(), false).unwrap_err();
    assert_eq!(err.kind, ErrorKind::ShortWrite);
}

#[test]
fn test_truncated_header_is_corrupt() {
    let err = open_mem(MemStore::from_bytes(vec![0u8; 10])).err().unwrap();
    assert_eq!(err.kind, ErrorKind::CorruptHeader);
}

#[test]
fn test_truncated_file_is_rejected() {
    let mut entries = fruit_entries();
    let bytes = write_mem(ColumnType::Binary, &mut entries, false).into_bytes();
    let index_offset = PREAMBLE_SIZE + 32;

    // index offset now points past the end
    let err = open_mem(MemStore::from_bytes(bytes[..index_offset - 1].to_vec())).err().unwrap();
    assert_eq!(err.kind, ErrorKind::CorruptHeader);

    let err = open_mem(MemStore::from_bytes(bytes[..index_offset + 3].to_vec())).err().unwrap();
    assert_eq!(err.kind, ErrorKind::CorruptIndex);
}

#[test]
fn test_index_over_limit_is_rejected() {
    let mut entries = fruit_entries();
    let store = write_mem(ColumnType::Binary, &mut entries, false);

    let err = TFileReader::open(Box::new(store), 8).err().unwrap();
    assert_eq!(err.kind, ErrorKind::IndexTooLarge);
}

#[test]
fn test_file_writer_commits_on_finish() {
    let dir = tempfile::tempdir().unwrap();
    let layout = IndexLayout::new(dir.path().to_path_buf()).unwrap();
    let path = layout.term_file_path(&TermFileName::new(100, "tag1", 3));

    let header = TermFileHeader::new(100, 3, "tag1", ColumnType::Binary).unwrap();
    let mut writer = TFileWriter::open(&layout, header).unwrap();
    writer.put(&mut fruit_entries(), false).unwrap();
    assert!(!path.exists());

    let store = writer.finish().unwrap();
    assert_eq!(store.target(), path.as_path());

    let reader = TFileReader::open_file(&path, MAX_INDEX_SIZE).unwrap();
    assert_eq!(reader.search(&exact(b"apple")).unwrap(), vec![1, 2]);
    assert_eq!(reader.path(), Some(path.as_path()));
}

#[test]
fn test_abandoned_writer_leaves_no_file() {
    let dir = tempfile::tempdir().unwrap();
    let layout = IndexLayout::new(dir.path().to_path_buf()).unwrap();

    let header = TermFileHeader::new(100, 3, "tag1", ColumnType::Binary).unwrap();
    let mut writer = TFileWriter::open(&layout, header).unwrap();
    writer.put(&mut fruit_entries(), false).unwrap();
    drop(writer);

    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}
