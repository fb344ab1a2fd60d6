//! Snapshot saves.
//!
//! [`World::save`] serialises every live entity on the worker pool, hands the
//! bytes to a background writer, and returns while the files are still being
//! written. The world stays frozen in [`WorldState::WritingSave`] until
//! [`World::poll_write`] or [`World::wait_for_write_completion`] settles the
//! write.

use std::time::{Duration, Instant, SystemTime};

use rayon::prelude::*;
use tracing::{error, info, warn};
use world_codec::{CategorySnapshot, SnapshotRecord};
use world_entity::{EntityKind, SaveBuffer, Serial};

use crate::broadcast::Audience;
use crate::category::Slot;
use crate::diagnostics::log_save_stats;
use crate::error::SaveError;
use crate::state::WorldState;
use crate::world::{HookPoint, ReplayCounts, World};
use crate::writer::{self, WriteJob, WriteReport, WriteSummary};

const SAVING_NOTICE: &str = "The world is saving, please wait.";
const SAVE_FAILED_NOTICE: &str = "World save failed.";
const WRITE_FAILED_NOTICE: &str = "Writing world save snapshot failed.";

/// What [`World::save`] did.
#[derive(Debug)]
pub enum SaveStatus {
    /// The world was not running; nothing happened.
    Skipped { state: WorldState },
    /// The snapshot was taken and is being written in the background.
    Dispatched { entities: usize, elapsed: Duration },
    /// The snapshot could not be taken or handed off. Nothing on disk
    /// changed and the world is running again.
    Abandoned(SaveError),
}

/// A settled background write.
#[derive(Debug)]
pub struct SaveOutcome {
    pub result: Result<WriteSummary, SaveError>,
    /// Entities removed by decay processing after the write.
    pub decayed: usize,
    /// Pending operations applied after the write.
    pub replayed: ReplayCounts,
}

impl World {
    /// Take a snapshot and start writing it.
    ///
    /// If the previous save is still being written this blocks until it
    /// settles. In any state other than running the call does nothing.
    pub fn save(&mut self) -> SaveStatus {
        if self.state == WorldState::WritingSave {
            info!("previous save still writing, waiting for it to finish");
            self.wait_for_write_completion();
        }
        if self.state != WorldState::Running {
            warn!(state = %self.state, "save ignored");
            return SaveStatus::Skipped { state: self.state };
        }

        let start = Instant::now();
        self.transition(WorldState::Saving);
        self.broadcaster.broadcast(Audience::Everyone, SAVING_NOTICE);

        let decayed = match self.serialize_all(SystemTime::now()) {
            Ok(decayed) => decayed,
            Err(error) => return self.abandon(error),
        };
        for (kind, serial) in decayed {
            self.decay.enqueue(self.state, kind, serial);
        }
        self.run_hooks(HookPoint::Save);

        let snapshots = self.take_snapshots();
        let entities: usize = snapshots.iter().map(|s| s.records.len()).sum();
        self.transition(WorldState::WritingSave);

        let job = WriteJob {
            snapshots,
            temp_root: self.config.temp_save_path.clone(),
            save_dir: self.config.save_path.clone(),
            backup_root: self.config.backup_path.clone(),
            backups_to_keep: self.config.backups_to_keep,
        };
        let pending = match writer::dispatch(job) {
            Ok(pending) => pending,
            Err(error) => return self.abandon(error),
        };
        self.pending_write = Some(pending);

        let elapsed = start.elapsed();
        info!(
            entities,
            decay_queued = self.decay.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "world snapshot taken"
        );
        if elapsed >= self.config.broadcast_threshold() {
            self.broadcaster.broadcast(
                Audience::Everyone,
                &format!("World Save completed in {:.2} seconds.", elapsed.as_secs_f64()),
            );
        }
        SaveStatus::Dispatched { entities, elapsed }
    }

    /// Settle the background write if it has finished. Call once per tick.
    pub fn poll_write(&mut self) -> Option<SaveOutcome> {
        if self.state != WorldState::WritingSave {
            return None;
        }
        let report = self.pending_write.as_mut()?.try_finish()?;
        self.pending_write = None;
        Some(self.settle(report))
    }

    /// Block until the background write finishes, then settle it. Returns
    /// `None` if no write is in flight.
    pub fn wait_for_write_completion(&mut self) -> Option<SaveOutcome> {
        if self.state != WorldState::WritingSave {
            return None;
        }
        let report = self.pending_write.take()?.wait();
        Some(self.settle(report))
    }

    /// Serialise every live entity into its buffer. Returns the entities
    /// whose decay deadline is at or before `now`, in serial order.
    fn serialize_all(&mut self, now: SystemTime) -> Result<Vec<(EntityKind, Serial)>, SaveError> {
        let pool = &self.pool;
        let categories = &mut self.categories;
        pool.install(|| {
            let mut decayed = Vec::new();
            for store in categories.iter_mut() {
                let kind = store.kind;
                let found: Vec<Option<Serial>> = store
                    .live
                    .par_iter_mut()
                    .map(|(serial, slot)| serialize_slot(*serial, slot, now))
                    .collect::<Result<_, _>>()?;
                let mut found: Vec<Serial> = found.into_iter().flatten().collect();
                found.sort_unstable();
                decayed.extend(found.into_iter().map(|serial| (kind, serial)));
            }
            Ok(decayed)
        })
    }

    /// Move every buffer into a per-category snapshot, records ordered by
    /// serial.
    fn take_snapshots(&mut self) -> Vec<CategorySnapshot> {
        self.categories
            .iter_mut()
            .map(|store| {
                let mut records: Vec<SnapshotRecord> = store
                    .live
                    .iter_mut()
                    .map(|(serial, slot)| SnapshotRecord {
                        type_index: slot.type_ref,
                        serial: *serial,
                        body: slot.buffer.take(),
                    })
                    .collect();
                records.sort_unstable_by_key(|record| record.serial);
                let types = store.catalogue_for(&mut records);
                CategorySnapshot {
                    kind: store.kind,
                    types,
                    records,
                }
            })
            .collect()
    }

    /// Hand the written bytes back to their entities.
    fn restore_buffers(&mut self, snapshots: Vec<CategorySnapshot>) {
        for snapshot in snapshots {
            let store = &mut self.categories[snapshot.kind.index()];
            for record in snapshot.records {
                if let Some(slot) = store.live.get_mut(&record.serial) {
                    slot.buffer = SaveBuffer::from_vec(record.body);
                    slot.buffer.shrink_to_len();
                }
            }
        }
    }

    /// Give up on a save before anything was written.
    fn abandon(&mut self, error: SaveError) -> SaveStatus {
        error!(%error, "world save failed");
        self.diagnostics.save_error(&error);
        self.broadcaster.broadcast(Audience::Staff, SAVE_FAILED_NOTICE);
        for store in &mut self.categories {
            for slot in store.live.values_mut() {
                slot.buffer = SaveBuffer::new();
            }
        }
        if self.state == WorldState::Saving {
            self.transition(WorldState::WritingSave);
        }
        self.finish_save();
        SaveStatus::Abandoned(error)
    }

    fn settle(&mut self, report: WriteReport) -> SaveOutcome {
        self.restore_buffers(report.snapshots);
        match &report.result {
            Ok(summary) => {
                log_save_stats(&summary.stats);
                info!(
                    path = %summary.save_dir.display(),
                    elapsed_ms = summary.elapsed.as_millis() as u64,
                    "world save written"
                );
            }
            Err(error) => {
                error!(%error, "writing world save snapshot failed");
                self.diagnostics.save_error(error);
                self.broadcaster.broadcast(Audience::Staff, WRITE_FAILED_NOTICE);
            }
        }
        let (decayed, replayed) = self.finish_save();
        SaveOutcome {
            result: report.result,
            decayed,
            replayed,
        }
    }

    fn finish_save(&mut self) -> (usize, ReplayCounts) {
        self.transition(WorldState::Running);
        let decayed = self.process_decay();
        let replayed = self.process_safety_queues();
        (decayed, replayed)
    }
}

fn serialize_slot(serial: Serial, slot: &mut Slot, now: SystemTime) -> Result<Option<Serial>, SaveError> {
    let Slot { entity, buffer, .. } = slot;
    buffer.clear();
    entity
        .serialize(buffer)
        .map_err(|source| SaveError::Serialize {
            type_name: entity.type_name(),
            serial,
            source,
        })?;
    let decayed = entity.decay_deadline().is_some_and(|deadline| deadline <= now);
    Ok(decayed.then_some(serial))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use world_content::{Gold, register_all};
    use world_entity::TypeRegistry;

    use super::*;
    use crate::broadcast::RecordingBroadcaster;
    use crate::config::WorldConfig;
    use crate::prompt::{FixedDecision, LoadDecision};

    fn world(root: &std::path::Path, threshold: Duration) -> (World, Arc<RecordingBroadcaster>) {
        let mut registry = TypeRegistry::new();
        register_all(&mut registry);
        let config = WorldConfig::rooted_at(root)
            .with_save_threads(2)
            .with_broadcast_threshold(threshold);
        let recorder = Arc::new(RecordingBroadcaster::new());
        let mut world = World::new(config, registry)
            .unwrap()
            .with_broadcaster(recorder.clone());
        world.load(&mut FixedDecision(LoadDecision::Abort)).unwrap();
        (world, recorder)
    }

    #[test]
    fn test_save_outside_running_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = TypeRegistry::new();
        register_all(&mut registry);
        let mut world = World::new(WorldConfig::rooted_at(dir.path()), registry).unwrap();
        assert!(matches!(
            world.save(),
            SaveStatus::Skipped { state: WorldState::Initial }
        ));
        assert!(world.poll_write().is_none());
        assert!(world.wait_for_write_completion().is_none());
    }

    #[test]
    fn test_save_broadcasts_and_settles() {
        let dir = tempfile::tempdir().unwrap();
        let (mut world, recorder) = world(dir.path(), Duration::ZERO);
        let serial = world.new_serial(EntityKind::Item).unwrap();
        world.add_entity(Box::new(Gold::with_amount(serial, 12))).unwrap();

        let status = world.save();
        assert!(matches!(status, SaveStatus::Dispatched { entities: 1, .. }));
        assert_eq!(world.state(), WorldState::WritingSave);

        let outcome = world.wait_for_write_completion().unwrap();
        assert!(outcome.result.is_ok());
        assert_eq!(world.state(), WorldState::Running);
        assert!(recorder.contains(Audience::Everyone, SAVING_NOTICE));
        assert!(recorder.contains(Audience::Everyone, "World Save completed in"));
        assert!(!world.saved_bytes(EntityKind::Item, serial).unwrap().is_empty());
    }

    #[test]
    fn test_fast_save_is_silent() {
        let dir = tempfile::tempdir().unwrap();
        let (mut world, recorder) = world(dir.path(), Duration::from_secs(3600));
        world.save();
        world.wait_for_write_completion();
        assert!(recorder.contains(Audience::Everyone, SAVING_NOTICE));
        assert!(!recorder.contains(Audience::Everyone, "World Save completed in"));
    }

    struct Jinxed(Serial);

    impl world_entity::Entity for Jinxed {
        fn serial(&self) -> Serial {
            self.0
        }
        fn kind(&self) -> EntityKind {
            EntityKind::Item
        }
        fn type_name(&self) -> &'static str {
            "Items.Jinxed"
        }
        fn serialize(&self, _writer: &mut SaveBuffer) -> Result<(), world_entity::EncodeError> {
            Err(world_entity::EncodeError::Custom("jinxed".into()))
        }
        fn deserialize(
            &mut self,
            _reader: &mut world_entity::BufferReader<'_>,
        ) -> Result<(), world_entity::DecodeError> {
            Ok(())
        }
    }

    #[test]
    fn test_abandoned_save_releases_buffers() {
        let dir = tempfile::tempdir().unwrap();
        let (mut world, _) = world(dir.path(), Duration::from_secs(3600));
        let mut healthy = Vec::new();
        for amount in 0..64 {
            let serial = world.new_serial(EntityKind::Item).unwrap();
            world.add_entity(Box::new(Gold::with_amount(serial, amount))).unwrap();
            healthy.push(serial);
        }
        let jinxed = world.new_serial(EntityKind::Item).unwrap();
        world.add_entity(Box::new(Jinxed(jinxed))).unwrap();

        assert!(matches!(world.save(), SaveStatus::Abandoned(_)));
        assert_eq!(world.state(), WorldState::Running);
        let store = &world.categories[EntityKind::Item.index()];
        for serial in healthy {
            let buffer = &store.live[&serial].buffer;
            assert!(buffer.is_empty());
            assert_eq!(buffer.capacity(), 0);
        }
    }

    #[test]
    fn test_second_save_waits_for_first() {
        let dir = tempfile::tempdir().unwrap();
        let (mut world, _) = world(dir.path(), Duration::from_secs(3600));
        let serial = world.new_serial(EntityKind::Item).unwrap();
        world.add_entity(Box::new(Gold::with_amount(serial, 1))).unwrap();

        assert!(matches!(world.save(), SaveStatus::Dispatched { .. }));
        assert!(matches!(world.save(), SaveStatus::Dispatched { .. }));
        assert!(world.wait_for_write_completion().unwrap().result.is_ok());
        assert!(world.wait_for_write_completion().is_none());
    }
}
