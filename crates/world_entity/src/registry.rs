//! Type registry: resolves stored type names to constructors.
//!
//! Every concrete entity type that may appear in a save is registered once at
//! startup. On load, each name in a category's type catalogue is resolved
//! here; a name that is missing, abstract, or registered under a different
//! category cannot be rebuilt and is reported as a [`TypeIssue`].

use std::collections::HashMap;

use crate::entity::{Entity, EntityType};
use crate::serial::{EntityKind, Serial};

/// Constructor taking the entity's serial.
pub type Factory = fn(Serial) -> Box<dyn Entity>;

fn construct<T: EntityType>(serial: Serial) -> Box<dyn Entity> {
    Box::new(T::new(serial))
}

/// A registered type name.
#[derive(Debug, Clone)]
pub struct TypeEntry {
    /// The stored type name.
    pub name: String,
    /// The category instances of this type belong to.
    pub kind: EntityKind,
    /// `None` for abstract types, which exist in the hierarchy but cannot be
    /// instantiated.
    factory: Option<Factory>,
}

impl TypeEntry {
    /// Returns `true` if the type cannot be instantiated.
    #[must_use]
    pub fn is_abstract(&self) -> bool {
        self.factory.is_none()
    }

    /// Build a placeholder instance for `serial`.
    #[must_use]
    pub fn construct(&self, serial: Serial) -> Option<Box<dyn Entity>> {
        self.factory.map(|factory| factory(serial))
    }
}

/// Why a stored type name could not be resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeIssue {
    /// No type is registered under the name.
    NotFound,
    /// The name is registered but abstract.
    Abstract,
    /// The name belongs to a different category than the save it came from.
    WrongKind { registered: EntityKind },
}

impl std::fmt::Display for TypeIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TypeIssue::NotFound => f.write_str("not found"),
            TypeIssue::Abstract => f.write_str("marked abstract"),
            TypeIssue::WrongKind { registered } => write!(f, "registered under {registered}"),
        }
    }
}

/// Registry of all entity types the world knows how to rebuild.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    /// Entries keyed by stored name.
    types: HashMap<String, TypeEntry>,
}

impl TypeRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            types: HashMap::new(),
        }
    }

    /// Register a concrete type under [`EntityType::TYPE_NAME`].
    ///
    /// Returns `false` if the name was already registered; the new entry
    /// replaces it.
    pub fn register<T: EntityType>(&mut self) -> bool {
        self.insert(TypeEntry {
            name: T::TYPE_NAME.to_string(),
            kind: T::KIND,
            factory: Some(construct::<T>),
        })
    }

    /// Register a name that exists but cannot be instantiated. Saves that
    /// reference it are treated like saves referencing an unknown type.
    pub fn register_abstract(&mut self, kind: EntityKind, name: impl Into<String>) -> bool {
        self.insert(TypeEntry {
            name: name.into(),
            kind,
            factory: None,
        })
    }

    fn insert(&mut self, entry: TypeEntry) -> bool {
        self.types.insert(entry.name.clone(), entry).is_none()
    }

    /// Resolve a stored type name for a category being loaded.
    ///
    /// # Errors
    ///
    /// Returns the [`TypeIssue`] that prevents the name from being
    /// instantiated.
    pub fn resolve(&self, kind: EntityKind, name: &str) -> Result<&TypeEntry, TypeIssue> {
        let entry = self.types.get(name).ok_or(TypeIssue::NotFound)?;
        if entry.kind != kind {
            return Err(TypeIssue::WrongKind {
                registered: entry.kind,
            });
        }
        if entry.is_abstract() {
            return Err(TypeIssue::Abstract);
        }
        Ok(entry)
    }

    /// Returns `true` if `name` is registered (abstract or not).
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    /// Returns the number of registered names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Returns `true` if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}
