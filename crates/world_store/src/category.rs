//! Per-category storage: the live map, the two pending side tables, and the
//! type catalogue.

use std::collections::HashMap;

use indexmap::{IndexMap, IndexSet};
use world_codec::SnapshotRecord;
use world_entity::{Entity, EntityKind, SaveBuffer, Serial};

/// A live entity and the scratch buffer it serialises into.
pub(crate) struct Slot {
    pub(crate) entity: Box<dyn Entity>,
    /// Index of the entity's type in [`CategoryStore::types`].
    pub(crate) type_ref: u32,
    pub(crate) buffer: SaveBuffer,
}

/// Storage for one [`EntityKind`].
pub(crate) struct CategoryStore {
    pub(crate) kind: EntityKind,
    pub(crate) live: HashMap<Serial, Slot>,
    pub(crate) pending_add: IndexMap<Serial, Box<dyn Entity>>,
    pub(crate) pending_delete: IndexSet<Serial>,
    types: IndexSet<&'static str>,
}

impl CategoryStore {
    pub(crate) fn new(kind: EntityKind) -> Self {
        Self {
            kind,
            live: HashMap::new(),
            pending_add: IndexMap::new(),
            pending_delete: IndexSet::new(),
            types: IndexSet::new(),
        }
    }

    /// Insert into the live map, replacing any entity with the same serial.
    pub(crate) fn insert_live(&mut self, entity: Box<dyn Entity>) -> Option<Box<dyn Entity>> {
        self.insert_live_with_buffer(entity, SaveBuffer::new())
    }

    /// Insert into the live map with a pre-filled scratch buffer.
    pub(crate) fn insert_live_with_buffer(
        &mut self,
        entity: Box<dyn Entity>,
        buffer: SaveBuffer,
    ) -> Option<Box<dyn Entity>> {
        let (type_ref, _) = self.types.insert_full(entity.type_name());
        let serial = entity.serial();
        self.live
            .insert(
                serial,
                Slot {
                    entity,
                    type_ref: type_ref as u32,
                    buffer,
                },
            )
            .map(|slot| slot.entity)
    }

    pub(crate) fn remove_live(&mut self, serial: Serial) -> Option<Box<dyn Entity>> {
        self.live.remove(&serial).map(|slot| slot.entity)
    }

    /// Queue an add. Returns `true` if the serial was pending deletion, which
    /// the add cancels.
    pub(crate) fn queue_add(&mut self, entity: Box<dyn Entity>) -> bool {
        let serial = entity.serial();
        let cancelled = self.pending_delete.shift_remove(&serial);
        self.pending_add.insert(serial, entity);
        cancelled
    }

    /// Queue a delete. Returns the pending add it cancels, if any.
    pub(crate) fn queue_delete(&mut self, serial: Serial) -> Option<Box<dyn Entity>> {
        let cancelled = self.pending_add.shift_remove(&serial);
        self.pending_delete.insert(serial);
        cancelled
    }

    /// Look up `serial`. When `frozen`, a pending delete hides the entity
    /// unless `return_deleted` is set, and a pending add shadows the live
    /// map.
    pub(crate) fn find(&self, serial: Serial, frozen: bool, return_deleted: bool) -> Option<&dyn Entity> {
        if frozen {
            if self.pending_delete.contains(&serial) && !return_deleted {
                return None;
            }
            if let Some(entity) = self.pending_add.get(&serial) {
                return Some(entity.as_ref());
            }
        }
        self.live.get(&serial).map(|slot| slot.entity.as_ref())
    }

    pub(crate) fn find_mut(&mut self, serial: Serial, frozen: bool) -> Option<&mut dyn Entity> {
        if frozen {
            if self.pending_delete.contains(&serial) {
                return None;
            }
            if let Some(entity) = self.pending_add.get_mut(&serial) {
                return Some(entity.as_mut());
            }
        }
        self.live.get_mut(&serial).map(|slot| slot.entity.as_mut())
    }

    /// Returns `true` if the serial is held anywhere in this category,
    /// including pending deletes.
    pub(crate) fn holds(&self, serial: Serial) -> bool {
        self.live.contains_key(&serial)
            || self.pending_add.contains_key(&serial)
            || self.pending_delete.contains(&serial)
    }

    /// Drain both pending tables in admission order.
    pub(crate) fn take_pending(&mut self) -> (Vec<Box<dyn Entity>>, Vec<Serial>) {
        let adds = std::mem::take(&mut self.pending_add).into_values().collect();
        let deletes = std::mem::take(&mut self.pending_delete).into_iter().collect();
        (adds, deletes)
    }

    /// The catalogue for one save: only the types `records` use, in order of
    /// first use. Each record's `type_index` is rewritten from the slot's
    /// interned type ref to its position in the returned list.
    pub(crate) fn catalogue_for(&self, records: &mut [SnapshotRecord]) -> Vec<String> {
        let mut used: IndexSet<u32> = IndexSet::new();
        for record in records.iter_mut() {
            let (position, _) = used.insert_full(record.type_index);
            record.type_index = position as u32;
        }
        used.iter()
            .filter_map(|type_ref| self.types.get_index(*type_ref as usize))
            .map(|name| (*name).to_owned())
            .collect()
    }
}
