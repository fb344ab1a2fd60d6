//! # world_codec
//!
//! On-disk layout of a world save. Each entity category lives in its own
//! subdirectory of the save root and is split across three files:
//!
//! - [`catalogue`]: `<Category>.tdb`, the ordered list of type names.
//! - [`index`]: `<Category>.idx`, one fixed-size record per entity.
//! - [`blob`]: `<Category>.bin`, the concatenated entity bodies.
//!
//! [`snapshot`] ties the three together for writing a whole category, and
//! [`error`] holds the codec error type.

pub mod blob;
pub mod catalogue;
pub mod error;
pub mod index;
pub mod snapshot;

pub use blob::BlobReader;
pub use catalogue::{read_catalogue, write_catalogue};
pub use error::CodecError;
pub use index::{INDEX_RECORD_SIZE, IndexRecord, read_index};
pub use snapshot::{CategoryPaths, CategorySnapshot, CategoryStats, SnapshotRecord, write_category};
