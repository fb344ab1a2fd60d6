//! World positions.

use serde::{Deserialize, Serialize};
use world_entity::{BufferReader, DecodeError, SaveBuffer};

/// A point on one of the world's maps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Location {
    pub x: i16,
    pub y: i16,
    pub z: i16,
    /// Map (facet) index.
    pub map: u8,
}

impl Location {
    /// The "nowhere" location used for entities held inside something else.
    pub const INTERNAL: Location = Location {
        x: 0,
        y: 0,
        z: 0,
        map: u8::MAX,
    };

    #[must_use]
    pub const fn new(x: i16, y: i16, z: i16, map: u8) -> Self {
        Self { x, y, z, map }
    }

    /// Returns `true` if the location is on a real map.
    #[must_use]
    pub const fn is_on_map(self) -> bool {
        self.map != u8::MAX
    }

    pub(crate) fn write(self, buffer: &mut SaveBuffer) {
        buffer.write_i16(self.x);
        buffer.write_i16(self.y);
        buffer.write_i16(self.z);
        buffer.write_u8(self.map);
    }

    pub(crate) fn read(reader: &mut BufferReader<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            x: reader.read_i16()?,
            y: reader.read_i16()?,
            z: reader.read_i16()?,
            map: reader.read_u8()?,
        })
    }
}
