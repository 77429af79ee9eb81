use fst::map::Stream;
use fst::Streamer;
use crate::core::error::Result;
use crate::core::types::TableId;
use crate::index::key_codec;
use crate::index::tfile_reader::TFileReader;

/// Forward-only cursor over a term file, loading each data block as it
/// is reached. Call [`TFileReader::iter`] again to start over.
pub struct TFileIter<'a> {
    reader: &'a TFileReader,
    stream: Stream<'a>,
    done: bool,
}

impl<'a> TFileIter<'a> {
    pub(crate) fn new(reader: &'a TFileReader, stream: Stream<'a>) -> Self {
        TFileIter {
            reader,
            stream,
            done: false,
        }
    }
}

impl<'a> Iterator for TFileIter<'a> {
    type Item = Result<(Vec<u8>, Vec<TableId>)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let reader = self.reader;
        let Some((key, offset)) = self.stream.next() else {
            self.done = true;
            return None;
        };

        let item = key_codec::decode_key(reader.header().column_type, key)
            .and_then(|value| Ok((value, reader.load_table_ids(offset)?)));

        // a broken block ends the scan
        if item.is_err() {
            self.done = true;
        }
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.done {
            (0, Some(0))
        } else {
            (0, Some(self.reader.num_terms()))
        }
    }
}
