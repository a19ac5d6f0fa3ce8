//! Change notification payload.

use crate::key_path::KeyPath;
use crate::options::ObservingOptions;
use crate::value::Value;

/// One change notification as handed to an observation handler.
///
/// `old` and `new` are only populated when the corresponding
/// [`ObservingOptions`] flag was requested at registration.
#[derive(Debug, Clone, PartialEq)]
pub struct Change {
    pub key_path: KeyPath,
    pub old: Option<Value>,
    pub new: Option<Value>,
    /// Sent before the value changes (requires `PRIOR`). Never carries `new`.
    pub is_prior: bool,
    /// Sent once at registration time (requires `INITIAL`). Never carries `old`.
    pub is_initial: bool,
}

impl Change {
    /// Post-change notification, filtered by `options`.
    #[must_use]
    pub fn setting(key_path: KeyPath, old: &Value, new: &Value, options: ObservingOptions) -> Self {
        Self {
            key_path,
            old: options.wants_old().then(|| old.clone()),
            new: options.wants_new().then(|| new.clone()),
            is_prior: false,
            is_initial: false,
        }
    }

    /// Pre-change notification, filtered by `options`.
    #[must_use]
    pub fn prior(key_path: KeyPath, old: &Value, options: ObservingOptions) -> Self {
        Self {
            key_path,
            old: options.wants_old().then(|| old.clone()),
            new: None,
            is_prior: true,
            is_initial: false,
        }
    }

    /// Registration-time notification, filtered by `options`.
    #[must_use]
    pub fn initial(key_path: KeyPath, current: &Value, options: ObservingOptions) -> Self {
        Self {
            key_path,
            old: None,
            new: options.wants_new().then(|| current.clone()),
            is_prior: false,
            is_initial: true,
        }
    }
}
