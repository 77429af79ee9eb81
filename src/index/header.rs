use bytes::{Buf, BufMut};
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::{ColumnType, TableSetId};

pub const COLUMN_NAME_LEN: usize = 64;

/// tableSetId(8) + version(4) + columnName(64) + columnType(1)
pub const HEADER_SIZE: usize = 8 + 4 + COLUMN_NAME_LEN + 1;

/// Trailer holding the absolute offset of the ordered index
pub const TRAILER_SIZE: usize = 4;

/// Header and trailer, read back in one call
pub const PREAMBLE_SIZE: usize = HEADER_SIZE + TRAILER_SIZE;

/// Fixed-size preamble of a term file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermFileHeader {
    pub table_set_id: TableSetId,
    pub version: u32,
    pub column_name: String,
    pub column_type: ColumnType,
    /// Only meaningful once the writer has written the trailer
    pub index_offset: u32,
}

impl TermFileHeader {
    pub fn new(table_set_id: TableSetId, version: u32, column_name: &str, column_type: ColumnType) -> Result<Self> {
        validate_column_name(column_name)?;
        Ok(TermFileHeader {
            table_set_id,
            version,
            column_name: column_name.to_string(),
            column_type,
            index_offset: 0,
        })
    }

    /// Header region without the trailer
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        let mut dst = &mut buf[..];
        dst.put_u64_le(self.table_set_id);
        dst.put_u32_le(self.version);

        let mut name = [0u8; COLUMN_NAME_LEN];
        let bytes = self.column_name.as_bytes();
        name[..bytes.len()].copy_from_slice(bytes);
        dst.put_slice(&name);

        dst.put_u8(self.column_type.tag());
        buf
    }

    /// Decode header plus trailer
    pub fn decode(preamble: &[u8]) -> Result<Self> {
        if preamble.len() < PREAMBLE_SIZE {
            return Err(corrupt(format!(
                "preamble is {} bytes, expected {}",
                preamble.len(),
                PREAMBLE_SIZE
            )));
        }

        let mut src = preamble;
        let table_set_id = src.get_u64_le();
        let version = src.get_u32_le();

        let name = &src[..COLUMN_NAME_LEN];
        let name_len = name.iter().position(|&b| b == 0).unwrap_or(COLUMN_NAME_LEN);
        let column_name = std::str::from_utf8(&name[..name_len])
            .map_err(|_| corrupt("column name is not utf-8".to_string()))?
            .to_string();
        src.advance(COLUMN_NAME_LEN);

        let tag = src.get_u8();
        let column_type = ColumnType::from_tag(tag)
            .ok_or_else(|| corrupt(format!("unknown column type tag {}", tag)))?;
        let index_offset = src.get_u32_le();

        if column_name.is_empty() {
            return Err(corrupt("empty column name".to_string()));
        }
        if (index_offset as usize) < PREAMBLE_SIZE {
            return Err(corrupt(format!("index offset {} inside preamble", index_offset)));
        }

        Ok(TermFileHeader {
            table_set_id,
            version,
            column_name,
            column_type,
            index_offset,
        })
    }
}

/// Column names land in file names, so `-` is reserved
pub fn validate_column_name(name: &str) -> Result<()> {
    if name.is_empty() || name.len() >= COLUMN_NAME_LEN {
        return Err(Error::new(
            ErrorKind::InvalidArgument,
            format!("column name must be 1..{} bytes: {:?}", COLUMN_NAME_LEN, name),
        ));
    }
    if name.contains('-') || name.contains('\0') || name.contains('/') {
        return Err(Error::new(
            ErrorKind::InvalidArgument,
            format!("column name contains a reserved character: {:?}", name),
        ));
    }
    Ok(())
}

fn corrupt(context: String) -> Error {
    Error::new(ErrorKind::CorruptHeader, context)
}
