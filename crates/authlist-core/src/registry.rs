//! The fixed set of components that can be authorized or unauthorized.
//!
//! Built once at startup from configuration and immutable afterwards. An entry
//! is either unindexed (`ATDome`) or indexed over an inclusive range
//! (`MTHexapod` with indices `1..=2`), in which case every name must carry an
//! index inside that range.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use thiserror::Error;

use crate::component::{ComponentName, is_valid_subsystem};

/// Largest number of indices a single indexed entry may span.
pub const MAX_INDEX_SPAN: u32 = 10_000;

/// Inclusive index range for an indexed subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexRange {
    /// Smallest valid index (at least 1).
    pub min: u32,
    /// Largest valid index.
    pub max: u32,
}

impl IndexRange {
    /// Whether `index` lies inside the range.
    #[must_use]
    pub fn contains(&self, index: u32) -> bool {
        (self.min..=self.max).contains(&index)
    }
}

impl fmt::Display for IndexRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..={}", self.min, self.max)
    }
}

/// A single registry entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryEntry {
    /// Subsystem name.
    pub subsystem: String,
    /// Valid index range; `None` for unindexed components.
    pub indices: Option<IndexRange>,
    /// Command endpoint, used by transports that address components directly.
    pub endpoint: Option<String>,
}

impl RegistryEntry {
    /// Create an unindexed entry.
    #[must_use]
    pub fn new(subsystem: impl Into<String>) -> Self {
        Self {
            subsystem: subsystem.into(),
            indices: None,
            endpoint: None,
        }
    }

    /// Create an indexed entry covering `min..=max`.
    #[must_use]
    pub fn indexed(subsystem: impl Into<String>, min: u32, max: u32) -> Self {
        Self {
            subsystem: subsystem.into(),
            indices: Some(IndexRange { min, max }),
            endpoint: None,
        }
    }

    /// Set the command endpoint.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }
}

/// Errors building a registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// No entries were supplied.
    #[error("component registry is empty")]
    Empty,
    /// A subsystem name does not match the grammar.
    #[error("invalid subsystem name {0:?}")]
    InvalidSubsystem(String),
    /// A subsystem appears more than once.
    #[error("subsystem {0:?} is registered more than once")]
    Duplicate(String),
    /// An index range is empty, starts at zero, or is too wide.
    #[error("invalid index range {range} for {subsystem}")]
    InvalidRange {
        /// The subsystem with the bad range.
        subsystem: String,
        /// The offending range.
        range: IndexRange,
    },
}

/// Immutable set of known, controllable components.
#[derive(Debug, Clone)]
pub struct ComponentRegistry {
    entries: BTreeMap<String, RegistryEntry>,
}

impl ComponentRegistry {
    /// Build a registry from its entries.
    ///
    /// # Errors
    ///
    /// Returns a [`RegistryError`] if the list is empty, a subsystem name is
    /// malformed or repeated, or an index range is invalid.
    pub fn new(entries: impl IntoIterator<Item = RegistryEntry>) -> Result<Self, RegistryError> {
        let mut map = BTreeMap::new();
        for entry in entries {
            if !is_valid_subsystem(&entry.subsystem) {
                return Err(RegistryError::InvalidSubsystem(entry.subsystem));
            }
            if let Some(range) = entry.indices
                && (range.min == 0
                    || range.min > range.max
                    || range.max.saturating_sub(range.min) >= MAX_INDEX_SPAN)
            {
                return Err(RegistryError::InvalidRange {
                    subsystem: entry.subsystem,
                    range,
                });
            }
            if map.contains_key(&entry.subsystem) {
                return Err(RegistryError::Duplicate(entry.subsystem));
            }
            map.insert(entry.subsystem.clone(), entry);
        }
        if map.is_empty() {
            return Err(RegistryError::Empty);
        }
        Ok(Self { entries: map })
    }

    /// Check a name against the registry, returning the reason it is unknown.
    ///
    /// # Errors
    ///
    /// Returns a human-readable reason when the subsystem is not registered,
    /// an index is missing or unexpected, or the index is out of range.
    pub fn check(&self, name: &ComponentName) -> Result<&RegistryEntry, String> {
        let entry = self
            .entries
            .get(name.subsystem())
            .ok_or_else(|| "not a registered component".to_string())?;

        match (entry.indices, name.index()) {
            (None, None) => Ok(entry),
            (None, Some(_)) => Err(format!("{} is not an indexed component", entry.subsystem)),
            (Some(range), None) => Err(format!(
                "{} requires an index in {range}",
                entry.subsystem
            )),
            (Some(range), Some(index)) if range.contains(index) => Ok(entry),
            (Some(range), Some(index)) => Err(format!("index {index} is outside {range}")),
        }
    }

    /// Whether `name` is a known component.
    #[must_use]
    pub fn is_known(&self, name: &ComponentName) -> bool {
        self.check(name).is_ok()
    }

    /// Every known component name.
    #[must_use]
    pub fn all_names(&self) -> BTreeSet<ComponentName> {
        let mut names = BTreeSet::new();
        for entry in self.entries.values() {
            match entry.indices {
                None => {
                    names.insert(ComponentName::unindexed(entry.subsystem.clone()));
                },
                Some(range) => {
                    for index in range.min..=range.max {
                        names.insert(ComponentName::with_index(entry.subsystem.clone(), index));
                    }
                },
            }
        }
        names
    }

    /// Look up the entry for a subsystem.
    #[must_use]
    pub fn entry(&self, subsystem: &str) -> Option<&RegistryEntry> {
        self.entries.get(subsystem)
    }

    /// Command endpoint for a component, with `{index}` substituted.
    #[must_use]
    pub fn endpoint_for(&self, name: &ComponentName) -> Option<String> {
        let entry = self.check(name).ok()?;
        let endpoint = entry.endpoint.as_ref()?;
        Some(match name.index() {
            Some(index) => endpoint.replace("{index}", &index.to_string()),
            None => endpoint.clone(),
        })
    }

    /// Number of registered subsystems.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always false for a constructed registry; present for API symmetry.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
