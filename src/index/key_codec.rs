//! Column value comparison and the ordered-index key encoding.
//!
//! Values arrive as raw bytes: UTF-8/binary for string columns and the
//! little-endian native encoding for numeric columns. The ordered index
//! sorts keys bytewise, so numeric values are re-encoded big-endian with
//! the sign folded in, which makes byte order equal numeric order.

use std::cmp::Ordering;
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::ColumnType;

pub type Comparator = fn(&[u8], &[u8]) -> Ordering;

/// Comparator used to sort entries of a column of type `ty`
pub fn comparator(ty: ColumnType) -> Comparator {
    match ty {
        ColumnType::Binary | ColumnType::NChar => bytes_cmp,
        ColumnType::TinyInt | ColumnType::SmallInt | ColumnType::Int | ColumnType::BigInt | ColumnType::Timestamp => {
            signed_cmp
        }
        ColumnType::Float => f32_cmp,
        ColumnType::Double => f64_cmp,
        ColumnType::Bool
        | ColumnType::UTinyInt
        | ColumnType::USmallInt
        | ColumnType::UInt
        | ColumnType::UBigInt => unsigned_cmp,
    }
}

/// Check that `value` is a well-formed value of type `ty`
pub fn validate(ty: ColumnType, value: &[u8]) -> Result<()> {
    match ty.fixed_width() {
        Some(width) if value.len() != width => Err(Error::new(
            ErrorKind::InvalidArgument,
            format!("{:?} value must be {} bytes, got {}", ty, width, value.len()),
        )),
        _ => Ok(()),
    }
}

/// Ordered-index key for a column value
pub fn encode_key(ty: ColumnType, value: &[u8]) -> Result<Vec<u8>> {
    validate(ty, value)?;
    let width = value.len();

    let key = match kind(ty) {
        Kind::Bytes => return Ok(value.to_vec()),
        Kind::Unsigned => read_le(value),
        Kind::Signed => read_le(value) ^ sign_bit(width),
        Kind::Float => {
            let bits = read_le(value);
            if bits & sign_bit(width) != 0 {
                !bits & mask(width)
            } else {
                bits | sign_bit(width)
            }
        }
    };
    Ok(write_be(key, width))
}

/// Inverse of [`encode_key`]
pub fn decode_key(ty: ColumnType, key: &[u8]) -> Result<Vec<u8>> {
    match ty.fixed_width() {
        Some(width) if key.len() != width => {
            return Err(Error::new(
                ErrorKind::CorruptIndex,
                format!("{:?} key must be {} bytes, got {}", ty, width, key.len()),
            ));
        }
        _ => {}
    }
    let width = key.len();

    let bits = match kind(ty) {
        Kind::Bytes => return Ok(key.to_vec()),
        Kind::Unsigned => read_be(key),
        Kind::Signed => read_be(key) ^ sign_bit(width),
        Kind::Float => {
            let bits = read_be(key);
            if bits & sign_bit(width) != 0 {
                bits ^ sign_bit(width)
            } else {
                !bits & mask(width)
            }
        }
    };
    Ok(write_le(bits, width))
}

enum Kind {
    Bytes,
    Unsigned,
    Signed,
    Float,
}

fn kind(ty: ColumnType) -> Kind {
    match ty {
        ColumnType::Binary | ColumnType::NChar => Kind::Bytes,
        ColumnType::TinyInt | ColumnType::SmallInt | ColumnType::Int | ColumnType::BigInt | ColumnType::Timestamp => {
            Kind::Signed
        }
        ColumnType::Float | ColumnType::Double => Kind::Float,
        _ => Kind::Unsigned,
    }
}

fn sign_bit(width: usize) -> u64 {
    1u64 << (width * 8 - 1)
}

fn mask(width: usize) -> u64 {
    if width >= 8 { u64::MAX } else { (1u64 << (width * 8)) - 1 }
}

fn read_le(bytes: &[u8]) -> u64 {
    bytes.iter().rev().fold(0u64, |acc, &b| (acc << 8) | b as u64)
}

fn read_be(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0u64, |acc, &b| (acc << 8) | b as u64)
}

fn write_le(bits: u64, width: usize) -> Vec<u8> {
    bits.to_le_bytes()[..width].to_vec()
}

fn write_be(bits: u64, width: usize) -> Vec<u8> {
    bits.to_be_bytes()[8 - width..].to_vec()
}

fn bytes_cmp(a: &[u8], b: &[u8]) -> Ordering {
    a.cmp(b)
}

fn unsigned_cmp(a: &[u8], b: &[u8]) -> Ordering {
    read_le(a).cmp(&read_le(b))
}

fn signed_cmp(a: &[u8], b: &[u8]) -> Ordering {
    sign_extend(a).cmp(&sign_extend(b))
}

fn sign_extend(bytes: &[u8]) -> i64 {
    if bytes.is_empty() {
        return 0;
    }
    let shift = 64 - bytes.len() * 8;
    ((read_le(bytes) << shift) as i64) >> shift
}

fn f32_cmp(a: &[u8], b: &[u8]) -> Ordering {
    let a = f32::from_bits(read_le(a) as u32);
    let b = f32::from_bits(read_le(b) as u32);
    a.total_cmp(&b)
}

fn f64_cmp(a: &[u8], b: &[u8]) -> Ordering {
    f64::from_bits(read_le(a)).total_cmp(&f64::from_bits(read_le(b)))
}
