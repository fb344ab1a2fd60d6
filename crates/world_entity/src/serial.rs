//! Entity identifiers and the categories that partition them.
//!
//! A [`Serial`] is a 32-bit identifier. Mobiles and items share one numeric
//! space split into disjoint ranges, so the category of a mobile or item
//! serial can be read off the number itself. Guilds count independently and
//! overlap the mobile range numerically; callers always name the
//! [`EntityKind`] explicitly when looking one up.

use serde::{Deserialize, Serialize};

/// A unique entity identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Serial(pub u32);

impl Serial {
    /// The null serial. Never issued.
    pub const ZERO: Serial = Serial(0);

    /// Sentinel used for "no entity" in broadcasts and failed allocations.
    pub const MINUS_ONE: Serial = Serial(u32::MAX);

    /// First item serial. Everything below it (and above zero) is a mobile.
    pub const ITEM_OFFSET: u32 = 0x4000_0000;

    /// Last valid item serial.
    pub const MAX_ITEM: u32 = 0x7FFF_FFFF;

    /// Last valid mobile serial.
    pub const MAX_MOBILE: u32 = Self::ITEM_OFFSET - 1;

    /// Create a serial from a raw `u32`.
    #[must_use]
    pub const fn from_raw(value: u32) -> Self {
        Self(value)
    }

    /// Returns the raw `u32` value.
    #[must_use]
    pub const fn value(self) -> u32 {
        self.0
    }

    /// Returns `true` if the serial lies in the mobile range.
    #[must_use]
    pub const fn is_mobile(self) -> bool {
        self.0 > 0 && self.0 <= Self::MAX_MOBILE
    }

    /// Returns `true` if the serial lies in the item range.
    #[must_use]
    pub const fn is_item(self) -> bool {
        self.0 >= Self::ITEM_OFFSET && self.0 <= Self::MAX_ITEM
    }

    /// Returns `true` for any serial that could have been issued.
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 > 0 && self.0 <= Self::MAX_ITEM
    }
}

impl std::fmt::Display for Serial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{:08X}", self.0)
    }
}

/// The persisted entity categories. Each has its own live map, pending sets,
/// type catalogue, and subdirectory in a save.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntityKind {
    Mobile,
    Item,
    Guild,
}

impl EntityKind {
    /// All categories in load and save order.
    pub const ALL: [EntityKind; 3] = [EntityKind::Mobile, EntityKind::Item, EntityKind::Guild];

    /// Directory and file stem used for this category on disk.
    #[must_use]
    pub const fn dir_name(self) -> &'static str {
        match self {
            EntityKind::Mobile => "Mobiles",
            EntityKind::Item => "Items",
            EntityKind::Guild => "Guilds",
        }
    }

    /// Dense index, handy for per-category arrays.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            EntityKind::Mobile => 0,
            EntityKind::Item => 1,
            EntityKind::Guild => 2,
        }
    }

    /// The category a mobile or item serial belongs to. Guild serials are
    /// indistinguishable from mobiles and resolve as [`EntityKind::Mobile`].
    #[must_use]
    pub const fn of_serial(serial: Serial) -> Option<EntityKind> {
        if serial.is_item() {
            Some(EntityKind::Item)
        } else if serial.is_mobile() {
            Some(EntityKind::Mobile)
        } else {
            None
        }
    }

    /// The default identifier range for this category.
    #[must_use]
    pub const fn default_range(self) -> SerialRange {
        match self {
            EntityKind::Mobile => SerialRange::new(1, Serial::MAX_MOBILE),
            EntityKind::Item => SerialRange::new(Serial::ITEM_OFFSET, Serial::MAX_ITEM),
            EntityKind::Guild => SerialRange::new(1, Serial::MAX_MOBILE),
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// An inclusive range of serials a category may allocate from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerialRange {
    pub min: u32,
    pub max: u32,
}

impl SerialRange {
    /// Create a range covering `min..=max`.
    #[must_use]
    pub const fn new(min: u32, max: u32) -> Self {
        Self { min, max }
    }

    /// Number of serials in the range.
    #[must_use]
    pub const fn capacity(self) -> u64 {
        if self.max < self.min {
            0
        } else {
            (self.max - self.min) as u64 + 1
        }
    }

    /// Returns `true` if `serial` lies within the range.
    #[must_use]
    pub const fn contains(self, serial: Serial) -> bool {
        serial.0 >= self.min && serial.0 <= self.max
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serial_ranges_are_disjoint() {
        assert!(Serial(1).is_mobile());
        assert!(!Serial(1).is_item());
        assert!(Serial(Serial::MAX_MOBILE).is_mobile());
        assert!(Serial(Serial::ITEM_OFFSET).is_item());
        assert!(!Serial(Serial::ITEM_OFFSET).is_mobile());
        assert!(Serial(Serial::MAX_ITEM).is_item());
        assert!(!Serial(Serial::MAX_ITEM + 1).is_valid());
        assert!(!Serial::ZERO.is_valid());
    }

    #[test]
    fn test_kind_of_serial() {
        assert_eq!(EntityKind::of_serial(Serial(42)), Some(EntityKind::Mobile));
        assert_eq!(
            EntityKind::of_serial(Serial(Serial::ITEM_OFFSET + 7)),
            Some(EntityKind::Item)
        );
        assert_eq!(EntityKind::of_serial(Serial::ZERO), None);
        assert_eq!(EntityKind::of_serial(Serial::MINUS_ONE), None);
    }

    #[test]
    fn test_display_is_hex() {
        assert_eq!(Serial(0x4000_0001).to_string(), "0x40000001");
        assert_eq!(EntityKind::Item.to_string(), "Items");
    }

    #[test]
    fn test_range_capacity() {
        assert_eq!(SerialRange::new(1, 1).capacity(), 1);
        assert_eq!(SerialRange::new(10, 19).capacity(), 10);
        assert_eq!(SerialRange::new(5, 4).capacity(), 0);
        assert_eq!(
            EntityKind::Item.default_range().capacity(),
            u64::from(Serial::MAX_ITEM - Serial::ITEM_OFFSET) + 1
        );
        assert!(SerialRange::new(10, 19).contains(Serial(19)));
        assert!(!SerialRange::new(10, 19).contains(Serial(20)));
    }
}
