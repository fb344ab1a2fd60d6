//! Serial allocation.

use world_entity::{EntityKind, Serial, SerialRange};

use crate::config::SerialRanges;
use crate::error::WorldError;

/// Hands out serials per category by probing forward from the last one
/// issued.
#[derive(Debug, Clone)]
pub(crate) struct SerialAllocator {
    ranges: SerialRanges,
    last: [u32; 3],
}

impl SerialAllocator {
    pub(crate) fn new(ranges: SerialRanges) -> Self {
        Self {
            ranges,
            last: EntityKind::ALL.map(|kind| ranges.get(kind).min.saturating_sub(1)),
        }
    }

    /// Record a serial that already exists so that probing resumes after it.
    /// Serials outside the category's range are ignored.
    pub(crate) fn observe(&mut self, kind: EntityKind, serial: Serial) {
        let range = self.ranges.get(kind);
        let slot = &mut self.last[kind.index()];
        if range.contains(serial) && serial.value() > *slot {
            *slot = serial.value();
        }
    }

    /// Allocate the next free serial for `kind`. `is_taken` must report every
    /// serial that is live or pending in either direction.
    ///
    /// Mobiles and items probe cyclically over their whole range. Guilds
    /// only probe forward and fail once the end of the range is passed.
    pub(crate) fn allocate(
        &mut self,
        kind: EntityKind,
        mut is_taken: impl FnMut(Serial) -> bool,
    ) -> Result<Serial, WorldError> {
        let range = self.ranges.get(kind);
        let slot = &mut self.last[kind.index()];
        let found = match kind {
            EntityKind::Guild => probe_forward(range, *slot, &mut is_taken),
            EntityKind::Mobile | EntityKind::Item => probe_cyclic(range, *slot, &mut is_taken),
        };
        match found {
            Some(value) => {
                *slot = value;
                Ok(Serial(value))
            }
            None => Err(WorldError::SerialsExhausted(kind)),
        }
    }
}

fn probe_cyclic(
    range: SerialRange,
    last: u32,
    is_taken: &mut impl FnMut(Serial) -> bool,
) -> Option<u32> {
    let mut candidate = last;
    for _ in 0..range.capacity() {
        candidate = if candidate < range.min || candidate >= range.max {
            range.min
        } else {
            candidate + 1
        };
        if !is_taken(Serial(candidate)) {
            return Some(candidate);
        }
    }
    None
}

fn probe_forward(
    range: SerialRange,
    last: u32,
    is_taken: &mut impl FnMut(Serial) -> bool,
) -> Option<u32> {
    let mut candidate = last.max(range.min.saturating_sub(1));
    loop {
        candidate = candidate.checked_add(1).filter(|c| *c <= range.max)?;
        if !is_taken(Serial(candidate)) {
            return Some(candidate);
        }
    }
}
