//! Error types for the world store.

use std::path::PathBuf;

use world_codec::CodecError;
use world_entity::{EncodeError, EntityKind, Serial, TypeIssue};

use crate::state::WorldState;

/// Errors returned by [`crate::World`] operations.
#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    /// An entity was added or removed before the world was loaded.
    #[error("cannot {action} {kind} {serial} before world load")]
    NotLoaded {
        action: &'static str,
        kind: EntityKind,
        serial: Serial,
    },

    /// The operation is not permitted in the current lifecycle state.
    #[error("cannot {operation} while the world is {state}")]
    InvalidState {
        operation: &'static str,
        state: WorldState,
    },

    /// No free serial was found in a full pass over the category's range.
    /// The category cannot mint further entities.
    #[error("no serials left to allocate for {0}")]
    SerialsExhausted(EntityKind),

    /// Loading the save failed and the world cannot start.
    #[error("world load failed: {0}")]
    Load(#[from] LoadError),

    /// The configuration could not be read or is inconsistent.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The serialisation worker pool could not be created.
    #[error("failed to build save worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
}

/// Errors that abort a load.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// A catalogue type could not be rebuilt and the operator chose not to
    /// discard its entities.
    #[error("bad type '{name}' in {kind}: {issue}")]
    TypeRejected {
        kind: EntityKind,
        name: String,
        issue: TypeIssue,
    },

    /// An entity body failed to deserialise and the operator chose not to
    /// discard it.
    #[error("bad deserialize of {type_name} {serial} in {kind}: {reason}")]
    Corrupt {
        kind: EntityKind,
        serial: Serial,
        type_name: String,
        reason: String,
    },

    /// The save files themselves are unreadable or malformed.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// Restoring the save directory from a backup failed.
    #[error("failed to restore {} from {}: {source}", to.display(), from.display())]
    Restore {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors that lose a single save attempt. The previous save directory is
/// never touched when one of these occurs.
#[derive(Debug, thiserror::Error)]
pub enum SaveError {
    /// An entity failed to serialise during the snapshot pass.
    #[error("failed to serialize {type_name} {serial}: {source}")]
    Serialize {
        type_name: &'static str,
        serial: Serial,
        #[source]
        source: EncodeError,
    },

    /// Writing the snapshot files failed.
    #[error("snapshot write failed: {0}")]
    Codec(#[from] CodecError),

    /// Swapping the written snapshot in as the save directory failed.
    #[error("failed to move {} to {}: {source}", from.display(), to.display())]
    Promote {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The background writer could not be started.
    #[error("failed to start save writer: {0}")]
    Spawn(#[source] std::io::Error),

    /// The background writer exited without reporting a result.
    #[error("save writer exited without reporting")]
    WriterLost,
}
