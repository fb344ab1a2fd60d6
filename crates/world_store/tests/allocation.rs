mod common;

use std::collections::HashSet;

use world_content::Gold;
use world_entity::{EntityKind, SerialRange};
use world_store::{WorldError, WorldState};

use common::{config, loaded, save_and_wait};

const SMALL: SerialRange = SerialRange::new(0x4000_0001, 0x4000_0008);

fn fill(world: &mut world_store::World) -> HashSet<u32> {
    let mut seen = HashSet::new();
    for _ in 0..SMALL.capacity() {
        let serial = world.new_serial(EntityKind::Item).unwrap();
        assert!(SMALL.contains(serial));
        assert!(seen.insert(serial.value()), "{serial} handed out twice");
        world.add_entity(Box::new(Gold::with_amount(serial, 1))).unwrap();
    }
    seen
}

#[test]
fn test_full_range_is_exhausted() {
    let dir = tempfile::tempdir().unwrap();
    let (mut world, _) = loaded(config(dir.path()).with_serial_range(EntityKind::Item, SMALL));

    let seen = fill(&mut world);
    assert_eq!(seen.len() as u64, SMALL.capacity());
    assert!(matches!(
        world.new_serial(EntityKind::Item),
        Err(WorldError::SerialsExhausted(EntityKind::Item))
    ));

    // Other categories are unaffected.
    assert!(world.new_serial(EntityKind::Mobile).is_ok());
}

#[test]
fn test_freed_serial_is_reused() {
    let dir = tempfile::tempdir().unwrap();
    let (mut world, _) = loaded(config(dir.path()).with_serial_range(EntityKind::Item, SMALL));
    fill(&mut world);

    let victim = world_entity::Serial(0x4000_0003);
    world.remove_entity(EntityKind::Item, victim).unwrap();
    assert_eq!(world.new_serial(EntityKind::Item).unwrap(), victim);
}

#[test]
fn test_pending_delete_still_holds_its_serial() {
    let dir = tempfile::tempdir().unwrap();
    let (mut world, _) = loaded(config(dir.path()).with_serial_range(EntityKind::Item, SMALL));
    fill(&mut world);

    world.save();
    assert_eq!(world.state(), WorldState::WritingSave);
    let victim = world_entity::Serial(0x4000_0005);
    world.remove_entity(EntityKind::Item, victim).unwrap();
    assert!(matches!(
        world.new_serial(EntityKind::Item),
        Err(WorldError::SerialsExhausted(_))
    ));

    world.wait_for_write_completion().unwrap();
    assert_eq!(world.new_serial(EntityKind::Item).unwrap(), victim);
}

#[test]
fn test_reload_does_not_reissue_saved_serials() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = || config(dir.path()).with_serial_range(EntityKind::Item, SMALL);
    let (mut world, _) = loaded(cfg());
    let mut kept = HashSet::new();
    for _ in 0..5 {
        let serial = world.new_serial(EntityKind::Item).unwrap();
        world.add_entity(Box::new(Gold::with_amount(serial, 1))).unwrap();
        kept.insert(serial.value());
    }
    save_and_wait(&mut world);
    drop(world);

    let (mut world, _) = loaded(cfg());
    for _ in 0..3 {
        let serial = world.new_serial(EntityKind::Item).unwrap();
        assert!(kept.insert(serial.value()), "{serial} reissued after reload");
        world.add_entity(Box::new(Gold::with_amount(serial, 1))).unwrap();
    }
    assert!(world.new_serial(EntityKind::Item).is_err());
}
