//! Restoring the world from the save directory.
//!
//! Loading runs in two passes. The index pass reads every category's type
//! catalogue and index and builds one placeholder per record. The data pass
//! then streams each blob file in index order and lets every placeholder
//! read its own body. Cross-references between entities can therefore be
//! resolved during the data pass, since every placeholder already exists.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};
use world_codec::{BlobReader, CategoryPaths, IndexRecord, read_catalogue, read_index};
use world_entity::{BufferReader, EntityKind, SaveBuffer, TypeEntry};

use crate::error::{LoadError, WorldError};
use crate::promote::{recover_missing_save, stale_temp_dirs};
use crate::prompt::{LoadDecision, LoadPrompt};
use crate::state::WorldState;
use crate::world::{HookPoint, World};

/// What a load restored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadSummary {
    pub mobiles: usize,
    pub items: usize,
    pub guilds: usize,
    /// Catalogue types whose entities were all discarded.
    pub skipped_types: usize,
    /// Individual entities discarded after failing to deserialise.
    pub discarded: usize,
    /// Set when the save directory was missing and a backup was restored.
    pub restored_backup: Option<PathBuf>,
    /// Incomplete temporary saves found and ignored.
    pub stale_temp_dirs: usize,
    pub elapsed: Duration,
}

impl LoadSummary {
    /// Entities live after the load.
    #[must_use]
    pub fn total(&self) -> usize {
        self.mobiles + self.items + self.guilds
    }
}

/// One category after the index pass.
struct IndexPass {
    kind: EntityKind,
    paths: CategoryPaths,
    /// Each record and whether a placeholder was built for it.
    records: Vec<(IndexRecord, bool)>,
    skipped_types: usize,
}

impl World {
    /// Load the save directory. Only valid from [`WorldState::Initial`];
    /// otherwise nothing happens and `Ok(None)` is returned.
    ///
    /// Unresolvable types and undecodable entities are put to `prompt`.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::Load`] if the save is malformed or the prompt
    /// chooses to abort. The world then stays in [`WorldState::Loading`] and
    /// cannot be used.
    pub fn load(&mut self, prompt: &mut dyn LoadPrompt) -> Result<Option<LoadSummary>, WorldError> {
        if self.state != WorldState::Initial {
            warn!(state = %self.state, "load ignored, world already loaded");
            return Ok(None);
        }
        let start = Instant::now();
        self.transition(WorldState::Loading);
        info!(path = %self.config.save_path.display(), "loading world");

        let restored_backup = recover_missing_save(&self.config.save_path, &self.config.backup_path)?;
        let stale = stale_temp_dirs(&self.config.temp_save_path).len();

        let mut passes = Vec::with_capacity(EntityKind::ALL.len());
        for kind in EntityKind::ALL {
            if let Some(pass) = self.load_index(kind, prompt)? {
                passes.push(pass);
            }
        }

        let mut skipped_types = 0;
        let mut discarded = 0;
        for pass in passes {
            skipped_types += pass.skipped_types;
            discarded += self.load_data(pass, prompt)?;
        }

        self.run_hooks(HookPoint::Load);
        self.transition(WorldState::Running);
        let replayed = self.process_safety_queues();

        let summary = LoadSummary {
            mobiles: self.entity_count(EntityKind::Mobile),
            items: self.entity_count(EntityKind::Item),
            guilds: self.entity_count(EntityKind::Guild),
            skipped_types,
            discarded,
            restored_backup,
            stale_temp_dirs: stale,
            elapsed: start.elapsed(),
        };
        info!(
            mobiles = summary.mobiles,
            items = summary.items,
            guilds = summary.guilds,
            skipped_types,
            discarded,
            replayed_adds = replayed.added,
            replayed_deletes = replayed.deleted,
            elapsed_ms = summary.elapsed.as_millis() as u64,
            "world loaded"
        );
        Ok(Some(summary))
    }

    fn load_index(
        &mut self,
        kind: EntityKind,
        prompt: &mut dyn LoadPrompt,
    ) -> Result<Option<IndexPass>, WorldError> {
        let paths = CategoryPaths::new(&self.config.save_path, kind);
        if !paths.exists() {
            debug!(category = %kind, "no saved data");
            return Ok(None);
        }

        let names = read_catalogue(&paths.catalogue).map_err(LoadError::from)?;
        let mut types: Vec<Option<TypeEntry>> = Vec::with_capacity(names.len());
        let mut skipped_types = 0;
        for name in &names {
            match self.registry.resolve(kind, name) {
                Ok(entry) => types.push(Some(entry.clone())),
                Err(issue) => {
                    error!(category = %kind, type_name = %name, %issue, "saved type cannot be restored");
                    match prompt.unresolved_type(kind, name, &issue) {
                        LoadDecision::Discard => {
                            warn!(category = %kind, type_name = %name, "discarding all entities of type");
                            skipped_types += 1;
                            types.push(None);
                        }
                        LoadDecision::Abort => {
                            return Err(LoadError::TypeRejected {
                                kind,
                                name: name.clone(),
                                issue,
                            }
                            .into());
                        }
                    }
                }
            }
        }

        let index = read_index(&paths.index, names.len()).map_err(LoadError::from)?;
        let store = &mut self.categories[kind.index()];
        let mut records = Vec::with_capacity(index.len());
        for record in index {
            let placeholder = types
                .get(record.type_index as usize)
                .and_then(Option::as_ref)
                .and_then(|entry| entry.construct(record.serial));
            let built = match placeholder {
                Some(entity) => {
                    if store.insert_live(entity).is_some() {
                        warn!(category = %kind, serial = %record.serial, "duplicate serial in index, keeping the later record");
                    }
                    self.allocator.observe(kind, record.serial);
                    true
                }
                None => false,
            };
            records.push((record, built));
        }
        debug!(category = %kind, types = names.len(), records = records.len(), "index loaded");

        Ok(Some(IndexPass {
            kind,
            paths,
            records,
            skipped_types,
        }))
    }

    fn load_data(&mut self, pass: IndexPass, prompt: &mut dyn LoadPrompt) -> Result<usize, WorldError> {
        let kind = pass.kind;
        let mut blobs = BlobReader::open(&pass.paths.blobs).map_err(LoadError::from)?;
        let mut discarded = 0;

        for (record, built) in pass.records {
            blobs.seek_to(record.offset as u64).map_err(LoadError::from)?;
            let length = record.length as usize;
            if !built {
                blobs.skip(length).map_err(LoadError::from)?;
                continue;
            }
            let body = blobs.read_body(length).map_err(LoadError::from)?;

            let Some(slot) = self.categories[kind.index()].live.get_mut(&record.serial) else {
                continue;
            };
            let mut reader = BufferReader::new(&body);
            let failure = match slot.entity.deserialize(&mut reader) {
                Ok(()) if reader.position() == body.len() => None,
                Ok(()) => Some(format!(
                    "serialized object was {} bytes, but {} bytes deserialized",
                    body.len(),
                    reader.position()
                )),
                Err(error) => Some(error.to_string()),
            };
            let Some(reason) = failure else {
                slot.buffer = SaveBuffer::from_vec(body);
                continue;
            };

            let type_name = slot.entity.type_name();
            error!(category = %kind, serial = %record.serial, type_name, %reason, "bad deserialize");
            match prompt.corrupt_entity(kind, record.serial, type_name, &reason) {
                LoadDecision::Discard => {
                    self.remove_entity(kind, record.serial)?;
                    discarded += 1;
                }
                LoadDecision::Abort => {
                    return Err(LoadError::Corrupt {
                        kind,
                        serial: record.serial,
                        type_name: type_name.to_owned(),
                        reason,
                    }
                    .into());
                }
            }
        }
        debug!(category = %kind, discarded, "data loaded");
        Ok(discarded)
    }
}
