//! # world_store
//!
//! The world store is the single owner of live entity state. It hands out
//! serials, gates every add/remove/find through the world lifecycle, loads a
//! save at startup, and writes point-in-time snapshots without stopping the
//! simulation.
//!
//! ## Lifecycle
//!
//! ```text
//! Initial -> Loading -> Running -> Saving -> WritingSave -> Running -> ...
//! ```
//!
//! While the world is `Loading`, `Saving`, or `WritingSave` the live maps are
//! frozen: adds and removes land in per-category pending sets and are
//! replayed (adds first, then deletes) once the world is `Running` again.
//!
//! ## Saving
//!
//! 1. Every live entity serialises into its scratch buffer on a worker pool.
//! 2. The buffers move to a background writer that fills a fresh temporary
//!    directory and, only on success, swaps it in as the save directory.
//! 3. The control thread keeps running; [`World::poll_write`] settles the
//!    save once the writer reports back, then drains the decay queue and
//!    replays the pending sets.

mod allocator;
mod category;
mod decay;
mod diagnostics;
mod load;
mod promote;
mod save;
mod writer;

pub mod broadcast;
pub mod config;
pub mod error;
pub mod prompt;
pub mod state;
pub mod world;

pub use broadcast::{Audience, Broadcaster, LogBroadcaster, RecordingBroadcaster};
pub use config::{SerialRanges, WorldConfig};
pub use error::{LoadError, SaveError, WorldError};
pub use load::LoadSummary;
pub use prompt::{FixedDecision, LoadDecision, LoadPrompt};
pub use save::{SaveOutcome, SaveStatus};
pub use state::WorldState;
pub use world::{ReplayCounts, World, WorldHook};
pub use writer::WriteSummary;
