//! Component and principal names.
//!
//! A component is addressed as `Name` or `Name:index`. A principal is either a
//! bare user (`userA`) or `user@host`. Both grammars are checked here;
//! membership in the registry is checked by
//! [`ComponentRegistry`](crate::ComponentRegistry).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

#[allow(clippy::expect_used)]
static COMPONENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z][_A-Za-z0-9]*)(?::([0-9]+))?$").expect("invalid regex")
});

#[allow(clippy::expect_used)]
static SUBSYSTEM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][_A-Za-z0-9]*$").expect("invalid regex"));

#[allow(clippy::expect_used)]
static PRINCIPAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z][-._A-Za-z0-9]*(@[A-Za-z0-9][-._A-Za-z0-9]*)?$").expect("invalid regex")
});

/// Errors from parsing a component or principal name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NameError {
    /// The text does not match `Name[:index]`.
    #[error("invalid component name {0:?}: expected Name or Name:index")]
    InvalidComponent(String),
    /// The index is zero or does not fit in a `u32`.
    #[error("invalid component index in {0:?}: must be a positive integer")]
    InvalidIndex(String),
    /// The text does not match `user` or `user@host`.
    #[error("invalid principal {0:?}: expected user or user@host")]
    InvalidPrincipal(String),
}

/// Check a bare subsystem name (no index).
#[must_use]
pub fn is_valid_subsystem(name: &str) -> bool {
    SUBSYSTEM_RE.is_match(name)
}

/// A syntactically valid component name.
///
/// Ordering is by subsystem, then index (unindexed first), which gives
/// outcomes a stable, readable iteration order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ComponentName {
    subsystem: String,
    index: Option<u32>,
}

impl ComponentName {
    /// Parse `Name` or `Name:index`. Surrounding whitespace is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`NameError`] if the grammar does not match or the index is
    /// zero or out of range for `u32`.
    pub fn parse(text: &str) -> Result<Self, NameError> {
        let text = text.trim();
        let caps = COMPONENT_RE
            .captures(text)
            .ok_or_else(|| NameError::InvalidComponent(text.to_string()))?;

        let subsystem = caps
            .get(1)
            .map(|m| m.as_str().to_string())
            .ok_or_else(|| NameError::InvalidComponent(text.to_string()))?;

        let index = match caps.get(2) {
            None => None,
            Some(m) => {
                let index: u32 = m
                    .as_str()
                    .parse()
                    .map_err(|_| NameError::InvalidIndex(text.to_string()))?;
                if index == 0 {
                    return Err(NameError::InvalidIndex(text.to_string()));
                }
                Some(index)
            },
        };

        Ok(Self { subsystem, index })
    }

    /// Build a name without an index.
    ///
    /// The caller is responsible for the subsystem grammar; registry entries
    /// are checked when the registry is built.
    #[must_use]
    pub fn unindexed(subsystem: impl Into<String>) -> Self {
        Self {
            subsystem: subsystem.into(),
            index: None,
        }
    }

    /// Build an indexed name.
    #[must_use]
    pub fn with_index(subsystem: impl Into<String>, index: u32) -> Self {
        Self {
            subsystem: subsystem.into(),
            index: Some(index),
        }
    }

    /// The subsystem part.
    #[must_use]
    pub fn subsystem(&self) -> &str {
        &self.subsystem
    }

    /// The index part, if any.
    #[must_use]
    pub fn index(&self) -> Option<u32> {
        self.index
    }
}

impl fmt::Display for ComponentName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.index {
            Some(index) => write!(f, "{}:{index}", self.subsystem),
            None => write!(f, "{}", self.subsystem),
        }
    }
}

impl FromStr for ComponentName {
    type Err = NameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ComponentName {
    type Error = NameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ComponentName> for String {
    fn from(value: ComponentName) -> Self {
        value.to_string()
    }
}

/// The identity asking for control authority (`user` or `user@host`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Principal(String);

impl Principal {
    /// Parse a principal. Surrounding whitespace is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`NameError::InvalidPrincipal`] if the grammar does not match.
    pub fn parse(text: &str) -> Result<Self, NameError> {
        let text = text.trim();
        if PRINCIPAL_RE.is_match(text) {
            Ok(Self(text.to_string()))
        } else {
            Err(NameError::InvalidPrincipal(text.to_string()))
        }
    }

    /// The principal as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The user part (everything before `@`).
    #[must_use]
    pub fn user(&self) -> &str {
        self.0.split('@').next().unwrap_or(&self.0)
    }

    /// The host part, if the principal is `user@host`.
    #[must_use]
    pub fn host(&self) -> Option<&str> {
        self.0.split_once('@').map(|(_, host)| host)
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Principal {
    type Error = NameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Principal> for String {
    fn from(value: Principal) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_unindexed_and_indexed() {
        let dome = ComponentName::parse("ATDome").unwrap();
        assert_eq!(dome.subsystem(), "ATDome");
        assert_eq!(dome.index(), None);

        let hexapod = ComponentName::parse(" MTHexapod:2 ").unwrap();
        assert_eq!(hexapod.subsystem(), "MTHexapod");
        assert_eq!(hexapod.index(), Some(2));
        assert_eq!(hexapod.to_string(), "MTHexapod:2");
    }

    #[test]
    fn rejects_bad_component_grammar() {
        for bad in ["", "1Dome", "AT Dome", "ATDome:", "ATDome:x", ":3", "AT-Dome"] {
            assert!(
                matches!(ComponentName::parse(bad), Err(NameError::InvalidComponent(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn rejects_zero_and_overflowing_index() {
        assert!(matches!(
            ComponentName::parse("Test:0"),
            Err(NameError::InvalidIndex(_))
        ));
        assert!(matches!(
            ComponentName::parse("Test:99999999999"),
            Err(NameError::InvalidIndex(_))
        ));
    }

    #[test]
    fn orders_by_subsystem_then_index() {
        let mut names = vec![
            ComponentName::parse("Test:52").unwrap(),
            ComponentName::parse("ATDome").unwrap(),
            ComponentName::parse("Test:5").unwrap(),
        ];
        names.sort();
        let rendered: Vec<String> = names.iter().map(ToString::to_string).collect();
        assert_eq!(rendered, ["ATDome", "Test:5", "Test:52"]);
    }

    #[test]
    fn serde_uses_display_form() {
        let name = ComponentName::with_index("Test", 5);
        let json = serde_json::to_string(&name).unwrap();
        assert_eq!(json, "\"Test:5\"");
        let back: ComponentName = serde_json::from_str(&json).unwrap();
        assert_eq!(back, name);
        assert!(serde_json::from_str::<ComponentName>("\"Test:0\"").is_err());
    }

    #[test]
    fn principal_accepts_user_and_user_at_host() {
        let bare = Principal::parse("userA").unwrap();
        assert_eq!(bare.user(), "userA");
        assert_eq!(bare.host(), None);

        let full = Principal::parse("test0@localhost").unwrap();
        assert_eq!(full.user(), "test0");
        assert_eq!(full.host(), Some("localhost"));
    }

    #[test]
    fn principal_rejects_bad_grammar() {
        for bad in ["", "@host", "user@", "user@@host", "9user", "us er"] {
            assert!(Principal::parse(bad).is_err(), "{bad:?} should be rejected");
        }
    }
}
