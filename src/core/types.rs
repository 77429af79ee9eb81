use serde::{Serialize, Deserialize};

/// Identifier of a table inside a table-set
pub type TableId = u64;

/// Identifier grouping tables that share a schema and its indexes
pub type TableSetId = u64;

/// Column type tag as stored in a term file header
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ColumnType {
    Bool = 1,
    TinyInt = 2,
    SmallInt = 3,
    Int = 4,
    BigInt = 5,
    Float = 6,
    Double = 7,
    Binary = 8,
    Timestamp = 9,
    NChar = 10,
    UTinyInt = 11,
    USmallInt = 12,
    UInt = 13,
    UBigInt = 14,
}

impl ColumnType {
    pub fn from_tag(tag: u8) -> Option<Self> {
        let ty = match tag {
            1 => ColumnType::Bool,
            2 => ColumnType::TinyInt,
            3 => ColumnType::SmallInt,
            4 => ColumnType::Int,
            5 => ColumnType::BigInt,
            6 => ColumnType::Float,
            7 => ColumnType::Double,
            8 => ColumnType::Binary,
            9 => ColumnType::Timestamp,
            10 => ColumnType::NChar,
            11 => ColumnType::UTinyInt,
            12 => ColumnType::USmallInt,
            13 => ColumnType::UInt,
            14 => ColumnType::UBigInt,
            _ => return None,
        };
        Some(ty)
    }

    pub fn tag(self) -> u8 {
        self as u8
    }

    /// String-like columns compare lexicographically
    pub fn is_string(self) -> bool {
        matches!(self, ColumnType::Binary | ColumnType::NChar)
    }

    /// Byte width of a value, `None` for variable-length types
    pub fn fixed_width(self) -> Option<usize> {
        match self {
            ColumnType::Bool | ColumnType::TinyInt | ColumnType::UTinyInt => Some(1),
            ColumnType::SmallInt | ColumnType::USmallInt => Some(2),
            ColumnType::Int | ColumnType::UInt | ColumnType::Float => Some(4),
            ColumnType::BigInt
            | ColumnType::UBigInt
            | ColumnType::Double
            | ColumnType::Timestamp => Some(8),
            ColumnType::Binary | ColumnType::NChar => None,
        }
    }
}
