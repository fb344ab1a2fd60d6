//! Core [`Entity`] trait and its constructible companion [`EntityType`].
//!
//! The persistence layer treats every entity as an opaque blob: it only asks
//! the entity to write itself into a [`SaveBuffer`] and later to read itself
//! back from a [`BufferReader`]. What the bytes mean is up to the entity.
//!
//! ## Stored Type Identity
//!
//! Each concrete type carries a stable string name ([`EntityType::TYPE_NAME`])
//! that is written into the type catalogue of a save. On load the name is
//! looked up in a [`crate::TypeRegistry`] to find the constructor, so renaming
//! a type breaks old saves unless the old name stays registered.

use std::any::Any;
use std::time::SystemTime;

use crate::buffer::{BufferReader, SaveBuffer};
use crate::error::{DecodeError, EncodeError};
use crate::serial::{EntityKind, Serial};

/// The contract every persisted entity must satisfy.
///
/// Entities are owned by the world store as `Box<dyn Entity>`. Serialisation
/// runs on a worker pool, so implementations must be `Send`.
pub trait Entity: Any + Send {
    /// The entity's identifier. Fixed for its lifetime.
    fn serial(&self) -> Serial;

    /// The category this entity is stored under.
    fn kind(&self) -> EntityKind;

    /// The stable name written to the type catalogue.
    fn type_name(&self) -> &'static str;

    /// Write the entity's full state.
    ///
    /// # Errors
    ///
    /// Returns [`EncodeError`] if part of the state cannot be encoded. The
    /// save pass that called this is abandoned.
    fn serialize(&self, writer: &mut SaveBuffer) -> Result<(), EncodeError>;

    /// Read the state written by [`Entity::serialize`] into a freshly
    /// constructed placeholder.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError`] if the body is truncated or malformed.
    fn deserialize(&mut self, reader: &mut BufferReader<'_>) -> Result<(), DecodeError>;

    /// The moment this entity becomes eligible for automatic removal, if it
    /// decays at all.
    fn decay_deadline(&self) -> Option<SystemTime> {
        None
    }

    /// Called when a queued decay is processed. Returning `false` vetoes the
    /// removal.
    fn on_decay(&mut self) -> bool {
        true
    }
}

/// A concrete entity type that can be rebuilt from a save.
///
/// The registry stores `T::new` as the factory for `T::TYPE_NAME`. The
/// constructor only sets the serial; the rest of the state arrives through
/// [`Entity::deserialize`].
pub trait EntityType: Entity + Sized {
    /// The category every instance belongs to.
    const KIND: EntityKind;

    /// The name stored in the type catalogue.
    const TYPE_NAME: &'static str;

    /// Construct a placeholder carrying only its serial.
    fn new(serial: Serial) -> Self;
}

/// Describe an entity for log lines, e.g. `Items.Gold 0x40000001`.
#[must_use]
pub fn describe(entity: &dyn Entity) -> String {
    format!("{} {}", entity.type_name(), entity.serial())
}
