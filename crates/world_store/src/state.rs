//! World lifecycle state.

/// The process-wide lifecycle of a [`crate::World`].
///
/// `Initial` and `Loading` happen once at startup. Every save then cycles
/// `Running -> Saving -> WritingSave -> Running`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorldState {
    /// Constructed, only configuration may change.
    Initial,
    /// Reading the save. Live maps are being populated.
    Loading,
    /// Normal operation. Adds and removes hit the live maps directly.
    Running,
    /// Serialising live entities into their buffers.
    Saving,
    /// Buffers handed to the background writer; waiting for it to settle.
    WritingSave,
}

impl WorldState {
    /// Returns `true` if moving from `self` to `next` is a legal edge.
    #[must_use]
    pub const fn can_transition_to(self, next: WorldState) -> bool {
        matches!(
            (self, next),
            (WorldState::Initial, WorldState::Loading)
                | (WorldState::Loading, WorldState::Running)
                | (WorldState::Running, WorldState::Saving)
                | (WorldState::Saving, WorldState::WritingSave)
                | (WorldState::WritingSave, WorldState::Running)
        )
    }

    /// Returns `true` while the live maps must not be mutated and adds and
    /// removes are routed to the pending sets.
    #[must_use]
    pub const fn is_frozen(self) -> bool {
        matches!(
            self,
            WorldState::Loading | WorldState::Saving | WorldState::WritingSave
        )
    }

    /// Returns `true` once startup has completed.
    #[must_use]
    pub const fn has_started(self) -> bool {
        !matches!(self, WorldState::Initial | WorldState::Loading)
    }
}

impl std::fmt::Display for WorldState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            WorldState::Initial => "initial",
            WorldState::Loading => "loading",
            WorldState::Running => "running",
            WorldState::Saving => "saving",
            WorldState::WritingSave => "writing save",
        })
    }
}
