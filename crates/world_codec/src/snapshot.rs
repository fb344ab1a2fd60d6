//! Writing a whole category of a snapshot to disk.
//!
//! The index and blob files are written record by record so that every
//! index offset equals the blob file's write position at the moment the body
//! was appended. The catalogue is written last.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::debug;
use world_entity::{EntityKind, Serial};

use crate::catalogue::write_catalogue;
use crate::error::CodecError;
use crate::index::IndexRecord;

/// The three file paths of one category under a save root.
#[derive(Debug, Clone)]
pub struct CategoryPaths {
    /// `<root>/<Category>`
    pub dir: PathBuf,
    /// `<root>/<Category>/<Category>.tdb`
    pub catalogue: PathBuf,
    /// `<root>/<Category>/<Category>.idx`
    pub index: PathBuf,
    /// `<root>/<Category>/<Category>.bin`
    pub blobs: PathBuf,
}

impl CategoryPaths {
    /// Paths for `kind` under `root`.
    #[must_use]
    pub fn new(root: &Path, kind: EntityKind) -> Self {
        let name = kind.dir_name();
        let dir = root.join(name);
        Self {
            catalogue: dir.join(format!("{name}.tdb")),
            index: dir.join(format!("{name}.idx")),
            blobs: dir.join(format!("{name}.bin")),
            dir,
        }
    }

    /// A category is present only if both its index and catalogue exist.
    #[must_use]
    pub fn exists(&self) -> bool {
        self.index.is_file() && self.catalogue.is_file()
    }
}

/// One serialised entity waiting to be written.
#[derive(Debug, Clone)]
pub struct SnapshotRecord {
    /// Position of the entity's type in [`CategorySnapshot::types`].
    pub type_index: u32,
    /// The entity's serial.
    pub serial: Serial,
    /// The serialised body.
    pub body: Vec<u8>,
}

/// Everything needed to write one category.
#[derive(Debug, Clone)]
pub struct CategorySnapshot {
    /// The category.
    pub kind: EntityKind,
    /// The type catalogue.
    pub types: Vec<String>,
    /// Entities in the order they are written.
    pub records: Vec<SnapshotRecord>,
}

impl CategorySnapshot {
    /// Total body bytes held by this snapshot.
    #[must_use]
    pub fn body_bytes(&self) -> u64 {
        self.records.iter().map(|r| r.body.len() as u64).sum()
    }
}

/// What was written for a category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryStats {
    /// The category.
    pub kind: EntityKind,
    /// Number of index records written.
    pub entities: usize,
    /// Size of the blob file.
    pub bytes: u64,
    /// Entity count per type name.
    pub per_type: BTreeMap<String, usize>,
}

/// Write `snapshot` into `<root>/<Category>/`, creating the directory.
///
/// Each file is flushed and synced before returning.
///
/// # Errors
///
/// Returns [`CodecError`] on any I/O failure, or if a count, type index, or
/// body length does not fit the fixed-width fields.
pub fn write_category(root: &Path, snapshot: &CategorySnapshot) -> Result<CategoryStats, CodecError> {
    let paths = CategoryPaths::new(root, snapshot.kind);
    fs::create_dir_all(&paths.dir).map_err(CodecError::io(&paths.dir))?;

    let count = i32::try_from(snapshot.records.len()).map_err(|_| CodecError::TooLarge {
        what: "index record count",
        value: snapshot.records.len() as u64,
    })?;

    let mut idx = create(&paths.index)?;
    let mut bin = create(&paths.blobs)?;

    idx.write_all(&count.to_le_bytes())
        .map_err(CodecError::io(&paths.index))?;

    let mut position: u64 = 0;
    let mut per_type: BTreeMap<String, usize> = BTreeMap::new();

    for record in &snapshot.records {
        let type_name = snapshot
            .types
            .get(record.type_index as usize)
            .ok_or(CodecError::TooLarge {
                what: "type index",
                value: u64::from(record.type_index),
            })?;
        let length = i32::try_from(record.body.len()).map_err(|_| CodecError::TooLarge {
            what: "entity body",
            value: record.body.len() as u64,
        })?;

        let entry = IndexRecord {
            type_index: record.type_index as i32,
            serial: record.serial,
            offset: position as i64,
            length,
        };
        idx.write_all(&entry.to_bytes())
            .map_err(CodecError::io(&paths.index))?;
        bin.write_all(&record.body)
            .map_err(CodecError::io(&paths.blobs))?;
        position += record.body.len() as u64;

        *per_type.entry(type_name.clone()).or_insert(0) += 1;
    }

    finish(idx, &paths.index)?;
    finish(bin, &paths.blobs)?;

    write_catalogue(&paths.catalogue, &snapshot.types)?;
    File::open(&paths.catalogue)
        .and_then(|f| f.sync_all())
        .map_err(CodecError::io(&paths.catalogue))?;

    debug!(
        category = %snapshot.kind,
        entities = snapshot.records.len(),
        types = snapshot.types.len(),
        bytes = position,
        "category written"
    );

    Ok(CategoryStats {
        kind: snapshot.kind,
        entities: snapshot.records.len(),
        bytes: position,
        per_type,
    })
}

fn create(path: &Path) -> Result<BufWriter<File>, CodecError> {
    File::create(path)
        .map(BufWriter::new)
        .map_err(CodecError::io(path))
}

fn finish(writer: BufWriter<File>, path: &Path) -> Result<(), CodecError> {
    let file = writer
        .into_inner()
        .map_err(|e| CodecError::io(path)(e.into_error()))?;
    file.sync_all().map_err(CodecError::io(path))
}
