//! Concrete entity types for the persistent world.
//!
//! Each type implements [`world_entity::EntityType`] so it can be registered
//! with a [`TypeRegistry`] and rebuilt from a save. Bodies start with a
//! 7-bit encoded version number so fields can be appended later without
//! breaking old saves.

mod guilds;
mod items;
mod location;
mod mobiles;

pub use guilds::Guild;
pub use items::{BASE_ITEM_TYPE, Container, Gold};
pub use location::Location;
pub use mobiles::PlayerMobile;

use world_entity::{EntityKind, TypeRegistry};

/// Register every type in this crate.
pub fn register_all(registry: &mut TypeRegistry) {
    registry.register::<Gold>();
    registry.register::<Container>();
    registry.register::<PlayerMobile>();
    registry.register::<Guild>();
    registry.register_abstract(EntityKind::Item, BASE_ITEM_TYPE);
}

pub(crate) mod time {
    use std::time::{Duration, SystemTime, UNIX_EPOCH};

    /// Milliseconds since the Unix epoch. Times before the epoch clamp to 0.
    pub(crate) fn to_millis(time: SystemTime) -> i64 {
        time.duration_since(UNIX_EPOCH)
            .map(|d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
            .unwrap_or(0)
    }

    pub(crate) fn from_millis(millis: i64) -> SystemTime {
        UNIX_EPOCH + Duration::from_millis(millis.max(0) as u64)
    }
}

pub(crate) fn check_version(found: u32, supported: u32) -> Result<(), world_entity::DecodeError> {
    if found > supported {
        return Err(world_entity::DecodeError::Invalid(format!(
            "unsupported version {found} (newest known is {supported})"
        )));
    }
    Ok(())
}
