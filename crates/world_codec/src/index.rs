//! Index (`.idx`): one fixed-size record per entity.
//!
//! ```text
//! i32          count
//! count times: i32 type_index, u32 serial, i64 offset, i32 length
//! ```
//!
//! `offset` and `length` address the entity's body in the blob file.

use std::fs;
use std::path::Path;

use world_entity::Serial;

use crate::error::CodecError;

/// Size in bytes of one encoded [`IndexRecord`].
pub const INDEX_RECORD_SIZE: usize = 20;

/// Location and type of one entity inside a category's files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexRecord {
    /// Position of the entity's type in the catalogue.
    pub type_index: i32,
    /// The entity's serial.
    pub serial: Serial,
    /// Byte offset of the body in the blob file.
    pub offset: i64,
    /// Byte length of the body.
    pub length: i32,
}

impl IndexRecord {
    /// Encode the record into its fixed 20-byte form.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; INDEX_RECORD_SIZE] {
        let mut out = [0u8; INDEX_RECORD_SIZE];
        out[0..4].copy_from_slice(&self.type_index.to_le_bytes());
        out[4..8].copy_from_slice(&self.serial.0.to_le_bytes());
        out[8..16].copy_from_slice(&self.offset.to_le_bytes());
        out[16..20].copy_from_slice(&self.length.to_le_bytes());
        out
    }

    /// Decode a record from its fixed 20-byte form.
    #[must_use]
    pub fn from_bytes(bytes: &[u8; INDEX_RECORD_SIZE]) -> Self {
        let i32_at = |at: usize| i32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]]);
        let mut offset = [0u8; 8];
        offset.copy_from_slice(&bytes[8..16]);
        Self {
            type_index: i32_at(0),
            serial: Serial(u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]])),
            offset: i64::from_le_bytes(offset),
            length: i32_at(16),
        }
    }
}

/// Decode the contents of an index file.
///
/// Records are checked for negative fields and for type indices outside
/// `0..type_count`.
///
/// # Errors
///
/// Returns [`CodecError::Malformed`] on a bad count, a short file, or an
/// invalid record.
pub fn decode_index(
    path: &Path,
    bytes: &[u8],
    type_count: usize,
) -> Result<Vec<IndexRecord>, CodecError> {
    let Some(count_bytes) = bytes.get(0..4) else {
        return Err(CodecError::malformed(path, "missing record count"));
    };
    let count = i32::from_le_bytes([count_bytes[0], count_bytes[1], count_bytes[2], count_bytes[3]]);
    if count < 0 {
        return Err(CodecError::malformed(path, format!("negative record count {count}")));
    }

    let count = count as usize;
    let body = &bytes[4..];
    if body.len() < count * INDEX_RECORD_SIZE {
        return Err(CodecError::malformed(
            path,
            format!(
                "{count} records declared but only {} bytes present",
                body.len()
            ),
        ));
    }

    let mut records = Vec::with_capacity(count);
    for (i, chunk) in body
        .chunks_exact(INDEX_RECORD_SIZE)
        .take(count)
        .enumerate()
    {
        let mut raw = [0u8; INDEX_RECORD_SIZE];
        raw.copy_from_slice(chunk);
        let record = IndexRecord::from_bytes(&raw);

        if record.type_index < 0 || record.type_index as usize >= type_count {
            return Err(CodecError::malformed(
                path,
                format!(
                    "record {i} ({}) refers to type {} of {type_count}",
                    record.serial, record.type_index
                ),
            ));
        }
        if record.offset < 0 || record.length < 0 {
            return Err(CodecError::malformed(
                path,
                format!(
                    "record {i} ({}) has offset {} length {}",
                    record.serial, record.offset, record.length
                ),
            ));
        }
        records.push(record);
    }
    Ok(records)
}

/// Read the index file at `path`.
///
/// # Errors
///
/// Returns [`CodecError`] if the file cannot be read or is malformed.
pub fn read_index(path: &Path, type_count: usize) -> Result<Vec<IndexRecord>, CodecError> {
    let bytes = fs::read(path).map_err(CodecError::io(path))?;
    decode_index(path, &bytes, type_count)
}
