//! Mobile types.

use world_entity::{
    BufferReader, DecodeError, EncodeError, Entity, EntityKind, EntityType, SaveBuffer, Serial,
};

use crate::check_version;
use crate::location::Location;

/// A player character.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerMobile {
    serial: Serial,
    pub name: String,
    pub hits: u16,
    pub location: Location,
    /// The backpack item, if the character has one.
    pub backpack: Option<Serial>,
}

impl PlayerMobile {
    pub const VERSION: u32 = 0;

    #[must_use]
    pub fn named(serial: Serial, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::new(serial)
        }
    }
}

impl Entity for PlayerMobile {
    fn serial(&self) -> Serial {
        self.serial
    }

    fn kind(&self) -> EntityKind {
        EntityKind::Mobile
    }

    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn serialize(&self, writer: &mut SaveBuffer) -> Result<(), EncodeError> {
        writer.write_encoded_int(Self::VERSION);
        writer.write_string(&self.name);
        writer.write_u16(self.hits);
        self.location.write(writer);
        writer.write_serial(self.backpack.unwrap_or(Serial::ZERO));
        Ok(())
    }

    fn deserialize(&mut self, reader: &mut BufferReader<'_>) -> Result<(), DecodeError> {
        check_version(reader.read_encoded_int()?, Self::VERSION)?;
        self.name = reader.read_string()?;
        self.hits = reader.read_u16()?;
        self.location = Location::read(reader)?;
        let backpack = reader.read_serial()?;
        self.backpack = (backpack != Serial::ZERO).then_some(backpack);
        Ok(())
    }
}

impl EntityType for PlayerMobile {
    const KIND: EntityKind = EntityKind::Mobile;
    const TYPE_NAME: &'static str = "Mobiles.PlayerMobile";

    fn new(serial: Serial) -> Self {
        Self {
            serial,
            name: String::new(),
            hits: 100,
            location: Location::INTERNAL,
            backpack: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_player_reads_back() {
        let mut player = PlayerMobile::named(Serial(7), "Iolo");
        player.hits = 63;
        player.location = Location::new(2500, 500, 0, 1);
        player.backpack = Some(Serial(0x4000_0100));

        let mut buffer = SaveBuffer::new();
        player.serialize(&mut buffer).unwrap();
        let mut copy = PlayerMobile::new(Serial(7));
        let mut reader = BufferReader::new(buffer.as_slice());
        copy.deserialize(&mut reader).unwrap();
        assert_eq!(copy, player);
        assert!(reader.is_exhausted());
    }

    #[test]
    fn test_truncated_body_fails() {
        let mut buffer = SaveBuffer::new();
        PlayerMobile::named(Serial(7), "Shamino").serialize(&mut buffer).unwrap();
        let bytes = &buffer.as_slice()[..buffer.len() - 2];
        let mut copy = PlayerMobile::new(Serial(7));
        assert!(matches!(
            copy.deserialize(&mut BufferReader::new(bytes)),
            Err(DecodeError::UnexpectedEof { .. })
        ));
    }
}
