use std::fs;
use std::path::PathBuf;
use std::sync::LazyLock;
use regex::Regex;
use crate::core::config::FileOrder;
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::TableSetId;

pub const TERM_FILE_EXT: &str = "tindex";

static TERM_FILE_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+)-([^-]+)-(\d+)\.tindex$").expect("valid term file pattern")
});

/// Fields encoded in a term file name: `<tableSetId>-<columnName>-<version>.tindex`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TermFileName {
    pub table_set_id: TableSetId,
    pub column_name: String,
    pub version: u32,
}

impl TermFileName {
    pub fn new(table_set_id: TableSetId, column_name: &str, version: u32) -> Self {
        TermFileName {
            table_set_id,
            column_name: column_name.to_string(),
            version,
        }
    }

    pub fn parse(file_name: &str) -> Result<Self> {
        let unparsable = || {
            Error::new(ErrorKind::UnparsableFilename, format!("not a term file name: {}", file_name))
        };
        let caps = TERM_FILE_NAME.captures(file_name).ok_or_else(unparsable)?;

        let table_set_id = caps[1].parse::<u64>().map_err(|_| unparsable())?;
        let version = caps[3].parse::<u32>().map_err(|_| unparsable())?;

        Ok(TermFileName {
            table_set_id,
            column_name: caps[2].to_string(),
            version,
        })
    }

    pub fn file_name(&self) -> String {
        format!("{}-{}-{}.{}", self.table_set_id, self.column_name, self.version, TERM_FILE_EXT)
    }
}

/// Directory holding the term files of one index
#[derive(Debug, Clone)]
pub struct IndexLayout {
    pub base_dir: PathBuf,
}

impl IndexLayout {
    pub fn new(base_dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&base_dir)?;
        Ok(IndexLayout { base_dir })
    }

    pub fn term_file_path(&self, name: &TermFileName) -> PathBuf {
        self.base_dir.join(name.file_name())
    }

    pub fn lock_path(&self) -> PathBuf {
        self.base_dir.join(".lock")
    }

    /// Regular, non-hidden files in the index directory, ordered per `order`
    pub fn list_files(&self, order: FileOrder) -> Result<Vec<String>> {
        let mut files = Vec::new();
        for entry in fs::read_dir(&self.base_dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            // lock file and in-flight temp files
            if name.starts_with('.') {
                continue;
            }
            files.push(name);
        }

        sort_file_names(&mut files, order);
        Ok(files)
    }
}

pub fn sort_file_names(files: &mut [String], order: FileOrder) {
    match order {
        FileOrder::Lexical => files.sort(),
        FileOrder::Numeric => {
            files.sort_by_cached_key(|name| (TermFileName::parse(name).ok(), name.clone()))
        }
    }
}
