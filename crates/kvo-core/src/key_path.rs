//! Validated property key paths.
//!
//! A key path names an observable property, optionally through a chain of
//! components separated by `.` (for example `"frame.origin"`). Key paths are
//! compared as whole strings; the registry never walks the components.

use std::fmt;
use std::rc::Rc;

use crate::error::KvoError;

/// A non-empty dotted property path.
///
/// Cloning is cheap (shared string).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KeyPath(Rc<str>);

impl KeyPath {
    /// Parse and validate a key path.
    ///
    /// # Errors
    ///
    /// Returns [`KvoError::InvalidKeyPath`] when the path is empty, contains
    /// whitespace, or has an empty component (`"a..b"`, `".a"`, `"a."`).
    pub fn parse(raw: &str) -> Result<Self, KvoError> {
        if raw.is_empty() {
            return Err(KvoError::invalid_key_path(raw, "key path is empty"));
        }
        if raw.chars().any(char::is_whitespace) {
            return Err(KvoError::invalid_key_path(raw, "key path contains whitespace"));
        }
        if raw.split('.').any(str::is_empty) {
            return Err(KvoError::invalid_key_path(raw, "key path has an empty component"));
        }
        Ok(Self(Rc::from(raw)))
    }

    /// The full path as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Iterate over the `.`-separated components.
    pub fn components(&self) -> impl Iterator<Item = &str> {
        self.0.split('.')
    }

    /// The first component (the property on the observed object itself).
    #[must_use]
    pub fn first(&self) -> &str {
        self.components().next().unwrap_or_default()
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<&str> for KeyPath {
    type Error = KvoError;

    fn try_from(raw: &str) -> Result<Self, Self::Error> {
        Self::parse(raw)
    }
}

impl AsRef<str> for KeyPath {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn simple_key() {
        let kp = KeyPath::parse("value").unwrap();
        assert_eq!(kp.as_str(), "value");
        assert_eq!(kp.first(), "value");
        assert_eq!(kp.components().count(), 1);
    }

    #[test]
    fn dotted_components() {
        let kp = KeyPath::parse("frame.origin.x").unwrap();
        assert_eq!(kp.components().collect::<Vec<_>>(), vec!["frame", "origin", "x"]);
        assert_eq!(kp.first(), "frame");
        assert_eq!(kp.to_string(), "frame.origin.x");
    }

    #[test]
    fn rejects_empty() {
        let err = KeyPath::parse("").unwrap_err();
        assert!(matches!(err, KvoError::InvalidKeyPath { .. }));
    }

    #[test]
    fn rejects_empty_components() {
        for raw in [".a", "a.", "a..b", "."] {
            assert!(KeyPath::parse(raw).is_err(), "{raw:?} should be rejected");
        }
    }

    #[test]
    fn rejects_whitespace() {
        assert!(KeyPath::parse("a b").is_err());
        assert!(KeyPath::parse("value\n").is_err());
    }

    #[test]
    fn try_from_matches_parse() {
        let kp: KeyPath = "count".try_into().unwrap();
        assert_eq!(kp, KeyPath::parse("count").unwrap());
    }

    proptest! {
        #[test]
        fn identifier_paths_always_parse(parts in proptest::collection::vec("[a-zA-Z_][a-zA-Z0-9_]{0,8}", 1..5)) {
            let raw = parts.join(".");
            let kp = KeyPath::parse(&raw).unwrap();
            prop_assert_eq!(kp.as_str(), raw.as_str());
            prop_assert_eq!(kp.components().count(), parts.len());
        }
    }
}
