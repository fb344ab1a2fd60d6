//! Guilds.

use world_entity::{
    BufferReader, DecodeError, EncodeError, Entity, EntityKind, EntityType, SaveBuffer, Serial,
};

use crate::check_version;

/// A player guild. Members are stored as mobile serials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Guild {
    serial: Serial,
    pub name: String,
    pub abbreviation: String,
    pub leader: Option<Serial>,
    pub members: Vec<Serial>,
}

impl Guild {
    pub const VERSION: u32 = 0;

    #[must_use]
    pub fn founded(serial: Serial, name: impl Into<String>, abbreviation: impl Into<String>, leader: Serial) -> Self {
        Self {
            name: name.into(),
            abbreviation: abbreviation.into(),
            leader: Some(leader),
            members: vec![leader],
            ..Self::new(serial)
        }
    }
}

impl Entity for Guild {
    fn serial(&self) -> Serial {
        self.serial
    }

    fn kind(&self) -> EntityKind {
        EntityKind::Guild
    }

    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn serialize(&self, writer: &mut SaveBuffer) -> Result<(), EncodeError> {
        writer.write_encoded_int(Self::VERSION);
        writer.write_string(&self.name);
        writer.write_string(&self.abbreviation);
        writer.write_serial(self.leader.unwrap_or(Serial::ZERO));
        writer.write_value(&self.members)
    }

    fn deserialize(&mut self, reader: &mut BufferReader<'_>) -> Result<(), DecodeError> {
        check_version(reader.read_encoded_int()?, Self::VERSION)?;
        self.name = reader.read_string()?;
        self.abbreviation = reader.read_string()?;
        let leader = reader.read_serial()?;
        self.leader = (leader != Serial::ZERO).then_some(leader);
        self.members = reader.read_value()?;
        Ok(())
    }
}

impl EntityType for Guild {
    const KIND: EntityKind = EntityKind::Guild;
    const TYPE_NAME: &'static str = "Guilds.Guild";

    fn new(serial: Serial) -> Self {
        Self {
            serial,
            name: String::new(),
            abbreviation: String::new(),
            leader: None,
            members: Vec::new(),
        }
    }
}
