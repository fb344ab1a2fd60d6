//! Operator decisions during load.

use world_entity::{EntityKind, Serial, TypeIssue};

/// What to do with entities that cannot be restored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadDecision {
    /// Drop the affected entities and keep loading.
    Discard,
    /// Fail the load.
    Abort,
}

/// Asked whenever load hits something it cannot restore on its own.
pub trait LoadPrompt {
    /// A catalogue entry names a type that is missing, abstract, or belongs
    /// to another category. `Discard` skips every entity of that type.
    fn unresolved_type(&mut self, kind: EntityKind, name: &str, issue: &TypeIssue) -> LoadDecision;

    /// One entity's body failed to deserialise. `Discard` deletes just that
    /// entity.
    fn corrupt_entity(
        &mut self,
        kind: EntityKind,
        serial: Serial,
        type_name: &str,
        reason: &str,
    ) -> LoadDecision;
}

/// Answers every question the same way. Used for unattended starts and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedDecision(pub LoadDecision);

impl LoadPrompt for FixedDecision {
    fn unresolved_type(&mut self, _kind: EntityKind, _name: &str, _issue: &TypeIssue) -> LoadDecision {
        self.0
    }

    fn corrupt_entity(
        &mut self,
        _kind: EntityKind,
        _serial: Serial,
        _type_name: &str,
        _reason: &str,
    ) -> LoadDecision {
        self.0
    }
}
