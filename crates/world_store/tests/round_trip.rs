mod common;

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use world_content::{Container, Gold, Guild, Location, PlayerMobile};
use world_entity::{EntityKind, Serial};
use world_store::{WorldConfig, WorldState};

use common::{config, loaded, save_and_wait};

#[test]
fn test_save_then_load_restores_every_byte() {
    let dir = tempfile::tempdir().unwrap();
    let (mut world, _) = loaded(config(dir.path()));

    let mut serials = Vec::new();
    for n in 0..50u32 {
        let player_serial = world.new_serial(EntityKind::Mobile).unwrap();
        let pack_serial = world.new_serial(EntityKind::Item).unwrap();
        let coin_serial = world.new_serial(EntityKind::Item).unwrap();

        let mut player = PlayerMobile::named(player_serial, format!("player {n}"));
        player.hits = 40 + n as u16;
        player.backpack = Some(pack_serial);
        let mut pack = Container::named(pack_serial, "backpack");
        pack.add_item(coin_serial);
        let gold = Gold::with_amount(coin_serial, n * 7 + 1);

        world.add_entity(Box::new(player)).unwrap();
        world.add_entity(Box::new(pack)).unwrap();
        world.add_entity(Box::new(gold)).unwrap();
        serials.push((EntityKind::Mobile, player_serial));
        serials.push((EntityKind::Item, pack_serial));
        serials.push((EntityKind::Item, coin_serial));
    }
    let guild_serial = world.new_serial(EntityKind::Guild).unwrap();
    world
        .add_entity(Box::new(Guild::founded(guild_serial, "Fellowship", "FEL", Serial(1))))
        .unwrap();
    serials.push((EntityKind::Guild, guild_serial));

    save_and_wait(&mut world);

    let (reloaded, _) = loaded(config(dir.path()));
    assert_eq!(reloaded.state(), WorldState::Running);
    assert_eq!(reloaded.entity_count(EntityKind::Mobile), 50);
    assert_eq!(reloaded.entity_count(EntityKind::Item), 100);
    assert_eq!(reloaded.entity_count(EntityKind::Guild), 1);

    for (kind, serial) in serials {
        let before = world.saved_bytes(kind, serial).unwrap();
        let after = reloaded.saved_bytes(kind, serial).unwrap();
        assert!(!before.is_empty());
        assert_eq!(before, after, "{kind} {serial}");
    }

    let guild = reloaded.find_entity::<Guild>(guild_serial).unwrap();
    assert_eq!(guild.abbreviation, "FEL");
    assert_eq!(guild.members, vec![Serial(1)]);
    let player = reloaded.find_entity::<PlayerMobile>(Serial(1)).unwrap();
    assert_eq!(player.name, "player 0");
}

#[test]
fn test_loaded_world_saves_identical_bodies() {
    let dir = tempfile::tempdir().unwrap();
    let (mut world, _) = loaded(config(dir.path()));
    for amount in [5, 10, 15] {
        let serial = world.new_serial(EntityKind::Item).unwrap();
        world
            .add_entity(Box::new(Gold::with_amount(serial, amount)))
            .unwrap();
    }
    save_and_wait(&mut world);
    let first = std::fs::read(dir.path().join("Saves/Items/Items.bin")).unwrap();

    let (mut reloaded, _) = loaded(config(dir.path()));
    save_and_wait(&mut reloaded);
    let second = std::fs::read(dir.path().join("Saves/Items/Items.bin")).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_new_serials_continue_after_load() {
    let dir = tempfile::tempdir().unwrap();
    let (mut world, _) = loaded(config(dir.path()));
    let first = world.new_serial(EntityKind::Item).unwrap();
    world.add_entity(Box::new(Gold::with_amount(first, 1))).unwrap();
    save_and_wait(&mut world);

    let (mut reloaded, _) = loaded(config(dir.path()));
    let next = reloaded.new_serial(EntityKind::Item).unwrap();
    assert_ne!(next, first);
    assert!(reloaded.find(EntityKind::Item, next).is_none());
}

#[test]
fn test_decayed_items_removed_after_save() {
    let dir = tempfile::tempdir().unwrap();
    let (mut world, _) = loaded(config(dir.path()));
    let long_ago = UNIX_EPOCH + Duration::from_secs(1_000_000);

    let stale = world.new_serial(EntityKind::Item).unwrap();
    let mut coins = Gold::with_amount(stale, 3);
    coins.move_to(Location::new(10, 10, 0, 0), long_ago);
    world.add_entity(Box::new(coins)).unwrap();

    let fresh = world.new_serial(EntityKind::Item).unwrap();
    let mut coins = Gold::with_amount(fresh, 4);
    coins.move_to(Location::new(11, 10, 0, 0), SystemTime::now());
    world.add_entity(Box::new(coins)).unwrap();

    let full_bag = world.new_serial(EntityKind::Item).unwrap();
    let mut bag = Container::named(full_bag, "bag");
    bag.drop_at(Location::new(12, 10, 0, 0), long_ago);
    bag.add_item(fresh);
    world.add_entity(Box::new(bag)).unwrap();

    world.save();
    assert_eq!(world.decay_backlog(), 2);
    let outcome = world.wait_for_write_completion().unwrap();
    assert_eq!(outcome.decayed, 1);
    assert_eq!(world.decay_backlog(), 0);

    assert!(world.find(EntityKind::Item, stale).is_none());
    assert!(world.find(EntityKind::Item, fresh).is_some());
    assert!(world.find(EntityKind::Item, full_bag).is_some(), "full containers veto decay");

    // The snapshot was taken before decay ran, so the stale pile is on disk.
    let (reloaded, _) = loaded(config(dir.path()));
    assert!(reloaded.find(EntityKind::Item, stale).is_some());
}

#[test]
fn test_load_twice_is_ignored() {
    let dir = tempfile::tempdir().unwrap();
    let (mut world, _) = loaded(WorldConfig::rooted_at(dir.path()));
    let again = world
        .load(&mut world_store::FixedDecision(world_store::LoadDecision::Abort))
        .unwrap();
    assert!(again.is_none());
    assert_eq!(world.state(), WorldState::Running);
}

#[test]
fn test_catalogue_lists_only_types_still_saved() {
    let dir = tempfile::tempdir().unwrap();
    let (mut world, _) = loaded(config(dir.path()));
    let bag = world.new_serial(EntityKind::Item).unwrap();
    world.add_entity(Box::new(Container::named(bag, "bag"))).unwrap();
    let coins = world.new_serial(EntityKind::Item).unwrap();
    world.add_entity(Box::new(Gold::with_amount(coins, 8))).unwrap();
    save_and_wait(&mut world);

    let catalogue = dir.path().join("Saves/Items/Items.tdb");
    assert_eq!(
        world_codec::read_catalogue(&catalogue).unwrap(),
        vec!["Items.Container".to_owned(), "Items.Gold".to_owned()]
    );

    world.remove_entity(EntityKind::Item, bag).unwrap();
    save_and_wait(&mut world);
    assert_eq!(world_codec::read_catalogue(&catalogue).unwrap(), vec!["Items.Gold".to_owned()]);

    let (reloaded, _) = loaded(config(dir.path()));
    assert_eq!(reloaded.find_entity::<Gold>(coins).unwrap().amount(), 8);
}
