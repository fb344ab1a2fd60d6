//! Item types.

use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};
use world_entity::{
    BufferReader, DecodeError, EncodeError, Entity, EntityKind, EntityType, SaveBuffer, Serial,
};

use crate::location::Location;
use crate::{check_version, time};

/// Registered as abstract: the common base of every item. Old saves that
/// stored it directly cannot be rebuilt.
pub const BASE_ITEM_TYPE: &str = "Items.Item";

/// A pile of coins. Coins left lying on a map decay an hour after they were
/// last moved.
#[derive(Debug, Clone, PartialEq)]
pub struct Gold {
    serial: Serial,
    amount: u32,
    location: Location,
    last_moved: SystemTime,
}

impl Gold {
    pub const VERSION: u32 = 1;

    /// How long coins may lie on a map before they decay.
    pub const DECAY_TIME: Duration = Duration::from_secs(60 * 60);

    /// A pile held internally (never decays) with `amount` coins.
    #[must_use]
    pub fn with_amount(serial: Serial, amount: u32) -> Self {
        Self {
            amount,
            ..Self::new(serial)
        }
    }

    #[must_use]
    pub fn amount(&self) -> u32 {
        self.amount
    }

    pub fn set_amount(&mut self, amount: u32) {
        self.amount = amount;
    }

    #[must_use]
    pub fn location(&self) -> Location {
        self.location
    }

    #[must_use]
    pub fn last_moved(&self) -> SystemTime {
        self.last_moved
    }

    /// Move the pile, resetting its decay timer to `at`.
    pub fn move_to(&mut self, location: Location, at: SystemTime) {
        self.location = location;
        self.last_moved = at;
    }
}

impl Entity for Gold {
    fn serial(&self) -> Serial {
        self.serial
    }

    fn kind(&self) -> EntityKind {
        EntityKind::Item
    }

    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn serialize(&self, writer: &mut SaveBuffer) -> Result<(), EncodeError> {
        writer.write_encoded_int(Self::VERSION);
        writer.write_u32(self.amount);
        self.location.write(writer);
        writer.write_i64(time::to_millis(self.last_moved));
        Ok(())
    }

    fn deserialize(&mut self, reader: &mut BufferReader<'_>) -> Result<(), DecodeError> {
        let version = reader.read_encoded_int()?;
        check_version(version, Self::VERSION)?;
        self.amount = reader.read_u32()?;
        self.location = Location::read(reader)?;
        // Version 0 piles did not record when they were moved.
        self.last_moved = if version >= 1 {
            time::from_millis(reader.read_i64()?)
        } else {
            SystemTime::now()
        };
        Ok(())
    }

    fn decay_deadline(&self) -> Option<SystemTime> {
        self.location
            .is_on_map()
            .then(|| self.last_moved + Self::DECAY_TIME)
    }
}

impl EntityType for Gold {
    const KIND: EntityKind = EntityKind::Item;
    const TYPE_NAME: &'static str = "Items.Gold";

    fn new(serial: Serial) -> Self {
        Self {
            serial,
            amount: 1,
            location: Location::INTERNAL,
            last_moved: SystemTime::now(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct ContainerState {
    name: String,
    items: Vec<Serial>,
    location: Location,
    last_moved: i64,
}

/// A container holding other items by serial. A container on a map decays
/// like any item, but vetoes the removal while it still holds something.
#[derive(Debug, Clone, PartialEq)]
pub struct Container {
    serial: Serial,
    state: ContainerState,
}

impl Container {
    pub const VERSION: u32 = 0;

    #[must_use]
    pub fn named(serial: Serial, name: impl Into<String>) -> Self {
        let mut container = Self::new(serial);
        container.state.name = name.into();
        container
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.state.name
    }

    #[must_use]
    pub fn items(&self) -> &[Serial] {
        &self.state.items
    }

    pub fn add_item(&mut self, item: Serial) {
        if !self.state.items.contains(&item) {
            self.state.items.push(item);
        }
    }

    pub fn remove_item(&mut self, item: Serial) -> bool {
        let before = self.state.items.len();
        self.state.items.retain(|s| *s != item);
        self.state.items.len() != before
    }

    /// Drop the container at `location`, starting its decay timer at `at`.
    pub fn drop_at(&mut self, location: Location, at: SystemTime) {
        self.state.location = location;
        self.state.last_moved = time::to_millis(at);
    }
}

impl Entity for Container {
    fn serial(&self) -> Serial {
        self.serial
    }

    fn kind(&self) -> EntityKind {
        EntityKind::Item
    }

    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn serialize(&self, writer: &mut SaveBuffer) -> Result<(), EncodeError> {
        writer.write_encoded_int(Self::VERSION);
        writer.write_value(&self.state)
    }

    fn deserialize(&mut self, reader: &mut BufferReader<'_>) -> Result<(), DecodeError> {
        check_version(reader.read_encoded_int()?, Self::VERSION)?;
        self.state = reader.read_value()?;
        Ok(())
    }

    fn decay_deadline(&self) -> Option<SystemTime> {
        self.state
            .location
            .is_on_map()
            .then(|| time::from_millis(self.state.last_moved) + Gold::DECAY_TIME)
    }

    fn on_decay(&mut self) -> bool {
        self.state.items.is_empty()
    }
}

impl EntityType for Container {
    const KIND: EntityKind = EntityKind::Item;
    const TYPE_NAME: &'static str = "Items.Container";

    fn new(serial: Serial) -> Self {
        Self {
            serial,
            state: ContainerState {
                location: Location::INTERNAL,
                ..ContainerState::default()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::UNIX_EPOCH;

    use super::*;

    fn reload<T: EntityType>(entity: &T) -> (T, usize, usize) {
        let mut buffer = SaveBuffer::new();
        entity.serialize(&mut buffer).unwrap();
        let mut copy = T::new(entity.serial());
        let mut reader = BufferReader::new(buffer.as_slice());
        copy.deserialize(&mut reader).unwrap();
        (copy, reader.position(), buffer.len())
    }

    #[test]
    fn test_gold_reads_back_every_byte() {
        let moved = UNIX_EPOCH + Duration::from_millis(1_700_000_000_123);
        let mut gold = Gold::with_amount(Serial(0x4000_0010), 750);
        gold.move_to(Location::new(1400, 1600, 10, 0), moved);

        let (copy, consumed, written) = reload(&gold);
        assert_eq!(copy, gold);
        assert_eq!(consumed, written);
    }

    #[test]
    fn test_gold_decays_only_on_map() {
        let gold = Gold::with_amount(Serial(0x4000_0001), 5);
        assert!(gold.decay_deadline().is_none());

        let mut dropped = gold.clone();
        let at = UNIX_EPOCH + Duration::from_secs(1000);
        dropped.move_to(Location::new(1, 2, 0, 1), at);
        assert_eq!(dropped.decay_deadline(), Some(at + Gold::DECAY_TIME));
    }

    #[test]
    fn test_version_zero_gold_loads() {
        let mut buffer = SaveBuffer::new();
        buffer.write_encoded_int(0);
        buffer.write_u32(42);
        Location::INTERNAL.write(&mut buffer);

        let mut gold = Gold::new(Serial(0x4000_0002));
        let mut reader = BufferReader::new(buffer.as_slice());
        gold.deserialize(&mut reader).unwrap();
        assert_eq!(gold.amount(), 42);
        assert!(reader.is_exhausted());
    }

    #[test]
    fn test_future_version_is_rejected() {
        let mut buffer = SaveBuffer::new();
        buffer.write_encoded_int(Gold::VERSION + 1);
        let mut gold = Gold::new(Serial(0x4000_0002));
        assert!(matches!(
            gold.deserialize(&mut BufferReader::new(buffer.as_slice())),
            Err(DecodeError::Invalid(_))
        ));
    }

    #[test]
    fn test_container_state_is_messagepack() {
        let mut bag = Container::named(Serial(0x4000_0020), "backpack");
        bag.add_item(Serial(0x4000_0021));
        bag.add_item(Serial(0x4000_0022));
        bag.add_item(Serial(0x4000_0021));

        let (copy, consumed, written) = reload(&bag);
        assert_eq!(copy, bag);
        assert_eq!(consumed, written);
        assert_eq!(copy.items().len(), 2);

        let mut buffer = SaveBuffer::new();
        bag.serialize(&mut buffer).unwrap();
        let state: ContainerState = rmp_serde::from_slice(&buffer.as_slice()[1..]).unwrap();
        assert_eq!(state.name, "backpack");
    }

    #[test]
    fn test_container_vetoes_decay_while_full() {
        let mut bag = Container::named(Serial(0x4000_0030), "crate");
        bag.add_item(Serial(0x4000_0031));
        assert!(!bag.on_decay());
        assert!(bag.remove_item(Serial(0x4000_0031)));
        assert!(bag.on_decay());
    }
}
