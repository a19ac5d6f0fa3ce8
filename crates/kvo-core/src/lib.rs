#![forbid(unsafe_code)]

//! Core: key paths, observing options, change payloads, and configuration.
//!
//! # Role in the workspace
//! `kvo-core` is the vocabulary layer. It owns the plain data types that
//! describe *what* is being observed and *what changed*, plus the error and
//! configuration types shared by the runtime.
//!
//! # Primary responsibilities
//! - **KeyPath**: validated dotted property paths.
//! - **ObservingOptions**: which values a change notification carries.
//! - **Change / Value**: the payload handed to observation handlers.
//! - **ObjectId**: address identity for reference-counted objects.
//! - **KvoConfig**: environment-driven controller configuration.
//!
//! # How it fits in the system
//! The runtime (`kvo-runtime`) builds the observation registry, the
//! controller, and the lazy attachment point on top of these types. Nothing
//! here holds references to live objects.

pub mod change;
pub mod config;
pub mod error;
pub mod identity;
pub mod key_path;
pub mod options;
pub mod value;

#[cfg(feature = "tracing")]
pub mod logging;

// Re-export tracing macros at crate root for ergonomic use.
#[cfg(feature = "tracing")]
pub use logging::{debug, debug_span, error, info, trace, warn};

pub use change::Change;
pub use config::{ConfigError, ConfigParse, KvoConfig};
pub use error::KvoError;
pub use identity::ObjectId;
pub use key_path::KeyPath;
pub use options::ObservingOptions;
pub use value::Value;
