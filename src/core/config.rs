use std::fs;
use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};
use crate::core::error::Result;
use crate::core::types::ColumnType;

/// Order in which term files found on disk are registered at startup.
/// Later files win, so this decides which version of a column survives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileOrder {
    /// Plain filename string order ("9" sorts after "10")
    Lexical,
    /// Parsed (table-set id, column name, version) order
    Numeric,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub index_path: PathBuf,
    pub max_index_size: usize,

    // Column type assumed by iteration-oriented lookups
    pub default_column_type: ColumnType,

    pub file_order: FileOrder,
    pub remove_retired_files: bool,
    pub parallel_open: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            index_path: PathBuf::from("./data/tindex"),
            max_index_size: 64 * 1024 * 1024,           // 64MB ordered index
            default_column_type: ColumnType::Binary,
            file_order: FileOrder::Numeric,
            remove_retired_files: false,
            parallel_open: true,
        }
    }
}

impl Config {
    pub fn with_path<P: AsRef<Path>>(path: P) -> Self {
        Config {
            index_path: path.as_ref().to_path_buf(),
            ..Config::default()
        }
    }

    /// Load a config from a JSON file; missing fields take their defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }
}
