//! Errors from observation operations.

use std::fmt;

/// Errors from controller operations.
///
/// Attaching, looking up, and replacing controllers never fail; only
/// registering an observation validates its input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KvoError {
    /// A key path failed validation.
    InvalidKeyPath { key_path: String, reason: &'static str },
    /// The controller already holds its configured maximum of observations.
    ObservationLimit { limit: usize },
}

impl KvoError {
    pub(crate) fn invalid_key_path(key_path: &str, reason: &'static str) -> Self {
        Self::InvalidKeyPath {
            key_path: key_path.to_owned(),
            reason,
        }
    }
}

impl fmt::Display for KvoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidKeyPath { key_path, reason } => {
                write!(f, "invalid key path {key_path:?}: {reason}")
            }
            Self::ObservationLimit { limit } => {
                write!(f, "observation limit reached ({limit})")
            }
        }
    }
}

impl std::error::Error for KvoError {}
