//! Blob stream (`.bin`): concatenated entity bodies with no delimiters.
//!
//! Bodies are read sequentially in index order. The reader tracks its own
//! position so skipped records still advance it, and seeks only when an
//! index offset disagrees with where the previous body ended.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::CodecError;

/// Sequential reader over a blob file.
#[derive(Debug)]
pub struct BlobReader {
    path: PathBuf,
    reader: BufReader<File>,
    position: u64,
    len: u64,
}

impl BlobReader {
    /// Open the blob file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Io`] if the file cannot be opened.
    pub fn open(path: &Path) -> Result<Self, CodecError> {
        let file = File::open(path).map_err(CodecError::io(path))?;
        let len = file.metadata().map_err(CodecError::io(path))?.len();
        Ok(Self {
            path: path.to_path_buf(),
            reader: BufReader::new(file),
            position: 0,
            len,
        })
    }

    /// Current byte offset in the file.
    #[must_use]
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Total file length in bytes.
    #[must_use]
    pub fn len(&self) -> u64 {
        self.len
    }

    /// Returns `true` if the file holds no bodies.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Move to `offset` if the reader is not already there.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError`] if the offset lies past the end of the file or
    /// the seek fails.
    pub fn seek_to(&mut self, offset: u64) -> Result<(), CodecError> {
        if offset == self.position {
            return Ok(());
        }
        if offset > self.len {
            return Err(CodecError::malformed(
                &self.path,
                format!("offset {offset} beyond end of file ({} bytes)", self.len),
            ));
        }
        debug!(
            path = %self.path.display(),
            from = self.position,
            to = offset,
            "blob offset out of sequence, seeking"
        );
        let delta = offset as i64 - self.position as i64;
        self.reader
            .seek_relative(delta)
            .map_err(CodecError::io(&self.path))?;
        self.position = offset;
        Ok(())
    }

    fn check_available(&self, len: u64) -> Result<(), CodecError> {
        if self.position + len > self.len {
            return Err(CodecError::malformed(
                &self.path,
                format!(
                    "body of {len} bytes at offset {} runs past end of file ({} bytes)",
                    self.position, self.len
                ),
            ));
        }
        Ok(())
    }

    /// Read the next `len` bytes.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError`] if the file is shorter than the declared body.
    pub fn read_body(&mut self, len: usize) -> Result<Vec<u8>, CodecError> {
        self.check_available(len as u64)?;
        let mut body = vec![0u8; len];
        self.reader
            .read_exact(&mut body)
            .map_err(CodecError::io(&self.path))?;
        self.position += len as u64;
        Ok(body)
    }

    /// Step over the next `len` bytes.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError`] if the file is shorter than the declared body.
    pub fn skip(&mut self, len: usize) -> Result<(), CodecError> {
        self.check_available(len as u64)?;
        self.reader
            .seek_relative(len as i64)
            .map_err(CodecError::io(&self.path))?;
        self.position += len as u64;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blob_file(contents: &[u8]) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Items.bin");
        std::fs::write(&path, contents).unwrap();
        (dir, path)
    }

    #[test]
    fn test_sequential_reads_and_skips() {
        let (_dir, path) = blob_file(b"aaabbbbcc");
        let mut reader = BlobReader::open(&path).unwrap();
        assert_eq!(reader.read_body(3).unwrap(), b"aaa");
        reader.skip(4).unwrap();
        assert_eq!(reader.position(), 7);
        assert_eq!(reader.read_body(2).unwrap(), b"cc");
    }

    #[test]
    fn test_seek_out_of_sequence() {
        let (_dir, path) = blob_file(b"0123456789");
        let mut reader = BlobReader::open(&path).unwrap();
        reader.seek_to(6).unwrap();
        assert_eq!(reader.read_body(2).unwrap(), b"67");
        reader.seek_to(1).unwrap();
        assert_eq!(reader.read_body(1).unwrap(), b"1");
    }

    #[test]
    fn test_body_past_end_is_malformed() {
        let (_dir, path) = blob_file(b"abc");
        let mut reader = BlobReader::open(&path).unwrap();
        let err = reader.read_body(4).unwrap_err();
        assert!(matches!(err, CodecError::Malformed { .. }));
        assert!(reader.skip(4).is_err());
        assert!(reader.seek_to(10).is_err());
    }

    #[test]
    fn test_zero_length_body() {
        let (_dir, path) = blob_file(b"");
        let mut reader = BlobReader::open(&path).unwrap();
        assert!(reader.is_empty());
        assert!(reader.read_body(0).unwrap().is_empty());
    }
}
