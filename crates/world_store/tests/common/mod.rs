#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use world_content::register_all;
use world_entity::TypeRegistry;
use world_store::{FixedDecision, LoadDecision, RecordingBroadcaster, World, WorldConfig};

pub fn registry() -> TypeRegistry {
    let mut registry = TypeRegistry::new();
    register_all(&mut registry);
    registry
}

pub fn config(root: &Path) -> WorldConfig {
    WorldConfig::rooted_at(root).with_save_threads(2)
}

/// A world built from `config`, not yet loaded.
pub fn unloaded(config: WorldConfig) -> (World, Arc<RecordingBroadcaster>) {
    let recorder = Arc::new(RecordingBroadcaster::new());
    let world = World::new(config, registry())
        .unwrap()
        .with_broadcaster(recorder.clone());
    (world, recorder)
}

/// A running world loaded from `config`'s save directory.
pub fn loaded(config: WorldConfig) -> (World, Arc<RecordingBroadcaster>) {
    let (mut world, recorder) = unloaded(config);
    world.load(&mut FixedDecision(LoadDecision::Abort)).unwrap();
    (world, recorder)
}

/// Save and wait for the write to settle, panicking on failure.
pub fn save_and_wait(world: &mut World) {
    let status = world.save();
    assert!(matches!(status, world_store::SaveStatus::Dispatched { .. }), "{status:?}");
    let outcome = world.wait_for_write_completion().unwrap();
    outcome.result.unwrap();
}

/// Every file under `dir` with its contents.
pub fn tree(dir: &Path) -> BTreeMap<PathBuf, Vec<u8>> {
    let mut files = BTreeMap::new();
    collect(dir, dir, &mut files);
    files
}

fn collect(root: &Path, dir: &Path, files: &mut BTreeMap<PathBuf, Vec<u8>>) {
    for entry in std::fs::read_dir(dir).unwrap() {
        let path = entry.unwrap().path();
        if path.is_dir() {
            collect(root, &path, files);
        } else {
            let contents = std::fs::read(&path).unwrap();
            files.insert(path.strip_prefix(root).unwrap().to_path_buf(), contents);
        }
    }
}
