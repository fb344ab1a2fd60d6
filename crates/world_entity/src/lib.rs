//! # world_entity
//!
//! The entity side of the persistent world: what an entity is, how it is
//! identified, and how its state is turned into bytes.
//!
//! This crate provides:
//!
//! - [`Serial`]: 32-bit entity identifiers partitioned by [`EntityKind`].
//! - [`Entity`] / [`EntityType`]: the contract every persisted entity satisfies.
//! - [`SaveBuffer`] / [`BufferReader`]: the body codec entities serialise with.
//! - [`TypeRegistry`]: maps stored type names back to constructors on load.

pub mod buffer;
pub mod entity;
pub mod error;
pub mod registry;
pub mod serial;

pub use buffer::{BufferReader, SaveBuffer};
pub use entity::{describe, Entity, EntityType};
pub use error::{DecodeError, EncodeError};
pub use registry::{TypeEntry, TypeIssue, TypeRegistry};
pub use serial::{EntityKind, Serial, SerialRange};
