//! The world: live entity maps gated by the lifecycle state machine.
//!
//! A `World` is an owned context object. It is driven by a single control
//! thread which is the only mutator of the live maps. Loading lives in
//! `load.rs` and saving in `save.rs`; this module holds the state, lookups,
//! adds and removes, serial allocation, and the replay of pending sets.

use std::any::Any;
use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, error, warn};
use world_entity::{Entity, EntityKind, EntityType, Serial, TypeRegistry, describe};

use crate::allocator::SerialAllocator;
use crate::broadcast::{Broadcaster, LogBroadcaster};
use crate::category::CategoryStore;
use crate::config::WorldConfig;
use crate::decay::DecayQueue;
use crate::diagnostics::Diagnostics;
use crate::error::WorldError;
use crate::state::WorldState;
use crate::writer::PendingWrite;

/// A callback run at a fixed point of the load or save sequence.
pub type WorldHook = Box<dyn FnMut(&mut World) + Send>;

/// How many pending operations a replay applied.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReplayCounts {
    pub added: usize,
    pub deleted: usize,
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum HookPoint {
    Load,
    Save,
}

/// The single owner of live entity state.
pub struct World {
    pub(crate) state: WorldState,
    pub(crate) config: WorldConfig,
    pub(crate) registry: TypeRegistry,
    pub(crate) categories: [CategoryStore; 3],
    pub(crate) allocator: SerialAllocator,
    pub(crate) decay: DecayQueue,
    pub(crate) broadcaster: Arc<dyn Broadcaster>,
    pub(crate) diagnostics: Diagnostics,
    pub(crate) pool: rayon::ThreadPool,
    pub(crate) pending_write: Option<PendingWrite>,
    load_hooks: Vec<WorldHook>,
    save_hooks: Vec<WorldHook>,
}

impl World {
    /// Create an empty world in [`WorldState::Initial`].
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::Config`] if the configuration is invalid, or
    /// [`WorldError::WorkerPool`] if the serialisation pool cannot start.
    pub fn new(config: WorldConfig, registry: TypeRegistry) -> Result<Self, WorldError> {
        config.validate()?;
        Ok(Self {
            state: WorldState::Initial,
            allocator: SerialAllocator::new(config.serial_ranges),
            diagnostics: Diagnostics::new(config.safety_log_path.clone(), config.error_log_path.clone()),
            pool: build_pool(config.save_threads)?,
            config,
            registry,
            categories: EntityKind::ALL.map(CategoryStore::new),
            decay: DecayQueue::default(),
            broadcaster: Arc::new(LogBroadcaster),
            pending_write: None,
            load_hooks: Vec::new(),
            save_hooks: Vec::new(),
        })
    }

    /// Replace the notice sink.
    #[must_use]
    pub fn with_broadcaster(mut self, broadcaster: Arc<dyn Broadcaster>) -> Self {
        self.broadcaster = broadcaster;
        self
    }

    /// Replace the configuration. Only allowed before load.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::InvalidState`] once loading has begun, or the
    /// same errors as [`World::new`].
    pub fn configure(&mut self, config: WorldConfig) -> Result<(), WorldError> {
        if self.state != WorldState::Initial {
            return Err(WorldError::InvalidState {
                operation: "configure",
                state: self.state,
            });
        }
        config.validate()?;
        self.pool = build_pool(config.save_threads)?;
        self.allocator = SerialAllocator::new(config.serial_ranges);
        self.diagnostics =
            Diagnostics::new(config.safety_log_path.clone(), config.error_log_path.clone());
        self.config = config;
        Ok(())
    }

    #[must_use]
    pub fn state(&self) -> WorldState {
        self.state
    }

    #[must_use]
    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    #[must_use]
    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// Register a callback run after all save data is read, before pending
    /// operations are replayed.
    pub fn on_load(&mut self, hook: impl FnMut(&mut World) + Send + 'static) {
        self.load_hooks.push(Box::new(hook));
    }

    /// Register a callback run after the serialisation pass of every save,
    /// while the world is still [`WorldState::Saving`].
    pub fn on_save(&mut self, hook: impl FnMut(&mut World) + Send + 'static) {
        self.save_hooks.push(Box::new(hook));
    }

    pub(crate) fn run_hooks(&mut self, point: HookPoint) {
        let slot = match point {
            HookPoint::Load => &mut self.load_hooks,
            HookPoint::Save => &mut self.save_hooks,
        };
        let mut hooks = std::mem::take(slot);
        for hook in &mut hooks {
            hook(self);
        }
        let slot = match point {
            HookPoint::Load => &mut self.load_hooks,
            HookPoint::Save => &mut self.save_hooks,
        };
        // Hooks registered by a hook run from the next time on.
        hooks.append(slot);
        *slot = hooks;
    }

    pub(crate) fn transition(&mut self, next: WorldState) {
        if !self.state.can_transition_to(next) {
            error!(from = %self.state, to = %next, "illegal world state transition");
            debug_assert!(false, "illegal world state transition {} -> {}", self.state, next);
        }
        debug!(from = %self.state, to = %next, "world state");
        self.state = next;
    }

    fn store(&self, kind: EntityKind) -> &CategoryStore {
        &self.categories[kind.index()]
    }

    fn store_mut(&mut self, kind: EntityKind) -> &mut CategoryStore {
        &mut self.categories[kind.index()]
    }

    // -- Lookups --

    /// Find an entity. While the world is frozen, pending adds are visible
    /// and pending deletes are not.
    #[must_use]
    pub fn find(&self, kind: EntityKind, serial: Serial) -> Option<&dyn Entity> {
        self.store(kind).find(serial, self.state.is_frozen(), false)
    }

    /// Like [`World::find`], but also returns entities pending deletion.
    #[must_use]
    pub fn find_deleted(&self, kind: EntityKind, serial: Serial) -> Option<&dyn Entity> {
        self.store(kind).find(serial, self.state.is_frozen(), true)
    }

    pub fn find_mut(&mut self, kind: EntityKind, serial: Serial) -> Option<&mut dyn Entity> {
        let frozen = self.state.is_frozen();
        self.store_mut(kind).find_mut(serial, frozen)
    }

    /// Find an entity of a concrete type.
    #[must_use]
    pub fn find_entity<T: EntityType>(&self, serial: Serial) -> Option<&T> {
        let any: &dyn Any = self.find(T::KIND, serial)?;
        any.downcast_ref::<T>()
    }

    pub fn find_entity_mut<T: EntityType>(&mut self, serial: Serial) -> Option<&mut T> {
        let any: &mut dyn Any = self.find_mut(T::KIND, serial)?;
        any.downcast_mut::<T>()
    }

    /// Iterate the live map of a category, in no particular order. Pending
    /// entries are not included.
    pub fn entities(&self, kind: EntityKind) -> impl Iterator<Item = &dyn Entity> {
        self.store(kind).live.values().map(|slot| slot.entity.as_ref())
    }

    /// Number of live entities in a category.
    #[must_use]
    pub fn entity_count(&self, kind: EntityKind) -> usize {
        self.store(kind).live.len()
    }

    /// Number of queued adds and deletes in a category.
    #[must_use]
    pub fn pending_counts(&self, kind: EntityKind) -> (usize, usize) {
        let store = self.store(kind);
        (store.pending_add.len(), store.pending_delete.len())
    }

    /// Entities detected as decayed and not yet processed.
    #[must_use]
    pub fn decay_backlog(&self) -> usize {
        self.decay.len()
    }

    /// The scratch buffer contents of a live entity: what it last saved as,
    /// or the bytes it was loaded from.
    #[must_use]
    pub fn saved_bytes(&self, kind: EntityKind, serial: Serial) -> Option<&[u8]> {
        self.store(kind)
            .live
            .get(&serial)
            .map(|slot| slot.buffer.as_slice())
    }

    // -- Mutation --

    /// Allocate a serial no live or pending entity of `kind` holds.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::SerialsExhausted`] when the range is full. The
    /// category cannot mint more entities after that.
    pub fn new_serial(&mut self, kind: EntityKind) -> Result<Serial, WorldError> {
        let store = &self.categories[kind.index()];
        let result = self.allocator.allocate(kind, |serial| store.holds(serial));
        if let Err(error) = &result {
            error!(%kind, %error, "serial allocation failed");
        }
        result
    }

    /// Add an entity under its own serial and kind.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::NotLoaded`] before [`World::load`] has been
    /// called.
    pub fn add_entity(&mut self, entity: Box<dyn Entity>) -> Result<(), WorldError> {
        let kind = entity.kind();
        let serial = entity.serial();
        match self.state {
            WorldState::Initial => Err(WorldError::NotLoaded {
                action: "add",
                kind,
                serial,
            }),
            WorldState::Loading | WorldState::Saving | WorldState::WritingSave => {
                if self.state == WorldState::Saving {
                    self.diagnostics.safety("add", kind, serial);
                }
                if self.store_mut(kind).queue_add(entity) {
                    warn!(%kind, %serial, "entity deleted then added while the world is frozen");
                }
                Ok(())
            }
            WorldState::Running => {
                if let Some(previous) = self.store_mut(kind).insert_live(entity) {
                    warn!(entity = %describe(previous.as_ref()), "replaced live entity with the same serial");
                }
                Ok(())
            }
        }
    }

    /// Remove an entity.
    ///
    /// While running, the removed entity is returned. While frozen the
    /// removal is queued and only a cancelled pending add is returned.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::NotLoaded`] before [`World::load`] has been
    /// called.
    pub fn remove_entity(
        &mut self,
        kind: EntityKind,
        serial: Serial,
    ) -> Result<Option<Box<dyn Entity>>, WorldError> {
        match self.state {
            WorldState::Initial => Err(WorldError::NotLoaded {
                action: "remove",
                kind,
                serial,
            }),
            WorldState::Loading | WorldState::Saving | WorldState::WritingSave => {
                if self.state == WorldState::Saving {
                    self.diagnostics.safety("remove", kind, serial);
                }
                let cancelled = self.store_mut(kind).queue_delete(serial);
                if cancelled.is_some() {
                    warn!(%kind, %serial, "entity added then deleted while the world is frozen");
                }
                Ok(cancelled)
            }
            WorldState::Running => Ok(self.store_mut(kind).remove_live(serial)),
        }
    }

    // -- Replay --

    /// Apply queued adds, then queued deletes, each in admission order.
    pub(crate) fn process_safety_queues(&mut self) -> ReplayCounts {
        let mut counts = ReplayCounts::default();
        for store in &mut self.categories {
            let (adds, deletes) = store.take_pending();
            let mut added = HashSet::with_capacity(adds.len());
            for entity in adds {
                added.insert(entity.serial());
                store.insert_live(entity);
                counts.added += 1;
            }
            for serial in deletes {
                if added.contains(&serial) {
                    error!(kind = %store.kind, %serial, "entity was both pending add and pending delete");
                }
                if store.remove_live(serial).is_some() {
                    counts.deleted += 1;
                }
            }
        }
        if counts != ReplayCounts::default() {
            debug!(added = counts.added, deleted = counts.deleted, "replayed pending operations");
        }
        counts
    }

    /// Remove every entity queued for decay during the last save, unless it
    /// vetoes. Only runs while [`WorldState::Running`]; returns the number
    /// removed.
    pub fn process_decay(&mut self) -> usize {
        if self.state != WorldState::Running {
            warn!(state = %self.state, backlog = self.decay.len(), "decay processing refused outside running");
            return 0;
        }
        let mut removed = 0;
        while let Some((kind, serial)) = self.decay.pop() {
            let store = &mut self.categories[kind.index()];
            let Some(slot) = store.live.get_mut(&serial) else {
                continue;
            };
            if slot.entity.on_decay() {
                store.remove_live(serial);
                removed += 1;
            } else {
                debug!(%kind, %serial, "decay vetoed");
            }
        }
        if removed > 0 {
            debug!(removed, "decayed entities removed");
        }
        removed
    }
}

fn build_pool(threads: usize) -> Result<rayon::ThreadPool, WorldError> {
    Ok(rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(|i| format!("world-save-{i}"))
        .build()?)
}
