//! Type catalogue (`.tdb`): the dictionary of type names for one category.
//!
//! ```text
//! i32          count
//! count times: encoded-int byte length, UTF-8 bytes
//! ```
//!
//! Index records refer to types by their position in this list.

use std::fs;
use std::path::Path;

use world_entity::{BufferReader, SaveBuffer};

use crate::error::CodecError;

/// Encode a catalogue into its on-disk bytes.
///
/// # Errors
///
/// Returns [`CodecError::TooLarge`] if there are more names than an `i32`
/// count can describe.
pub fn encode_catalogue(names: &[String]) -> Result<Vec<u8>, CodecError> {
    let count = i32::try_from(names.len()).map_err(|_| CodecError::TooLarge {
        what: "type catalogue",
        value: names.len() as u64,
    })?;
    let mut buf = SaveBuffer::new();
    buf.write_i32(count);
    for name in names {
        buf.write_string(name);
    }
    Ok(buf.into_inner())
}

/// Decode catalogue bytes read from `path` (the path is only used in errors).
///
/// # Errors
///
/// Returns [`CodecError::Malformed`] if the count is negative or a name is
/// truncated or not UTF-8.
pub fn decode_catalogue(path: &Path, bytes: &[u8]) -> Result<Vec<String>, CodecError> {
    let mut reader = BufferReader::new(bytes);
    let count = reader
        .read_i32()
        .map_err(|e| CodecError::malformed(path, e.to_string()))?;
    if count < 0 {
        return Err(CodecError::malformed(path, format!("negative type count {count}")));
    }

    // Every name takes at least one byte, so the count cannot exceed the
    // remaining input of a well-formed file.
    let mut names = Vec::with_capacity((count as usize).min(reader.remaining()));
    for i in 0..count {
        let name = reader
            .read_string()
            .map_err(|e| CodecError::malformed(path, format!("type {i}: {e}")))?;
        names.push(name);
    }
    Ok(names)
}

/// Read the catalogue file at `path`.
///
/// # Errors
///
/// Returns [`CodecError`] if the file cannot be read or is malformed.
pub fn read_catalogue(path: &Path) -> Result<Vec<String>, CodecError> {
    let bytes = fs::read(path).map_err(CodecError::io(path))?;
    decode_catalogue(path, &bytes)
}

/// Write `names` as the catalogue file at `path`, replacing any existing file.
///
/// # Errors
///
/// Returns [`CodecError`] if encoding or the write fails.
pub fn write_catalogue(path: &Path, names: &[String]) -> Result<(), CodecError> {
    let bytes = encode_catalogue(names)?;
    fs::write(path, bytes).map_err(CodecError::io(path))
}
