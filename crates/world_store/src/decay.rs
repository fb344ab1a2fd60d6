//! Items found decayed during a save, waiting to be removed.

use std::collections::VecDeque;

use tracing::warn;
use world_entity::{EntityKind, Serial};

use crate::state::WorldState;

/// FIFO of entities whose decay deadline had passed at save time.
///
/// Entries are only accepted while the world is [`WorldState::Saving`], so
/// every decay decision is taken against the same save timestamp.
#[derive(Debug, Default)]
pub(crate) struct DecayQueue {
    entries: VecDeque<(EntityKind, Serial)>,
}

impl DecayQueue {
    /// Queue an entity. Rejected (and logged) unless `state` is `Saving`.
    pub(crate) fn enqueue(&mut self, state: WorldState, kind: EntityKind, serial: Serial) -> bool {
        if state != WorldState::Saving {
            warn!(%kind, %serial, %state, "decay enqueued outside of a save, ignoring");
            return false;
        }
        self.entries.push_back((kind, serial));
        true
    }

    pub(crate) fn pop(&mut self) -> Option<(EntityKind, Serial)> {
        self.entries.pop_front()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}
