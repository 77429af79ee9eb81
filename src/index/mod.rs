pub mod header;
pub mod term;
pub mod key_codec;
pub mod tfile_writer;
pub mod tfile_reader;
pub mod tfile_iter;
pub mod tfile_cache;
pub mod tfile_index;
