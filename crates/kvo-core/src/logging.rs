//! Structured logging helpers.
//!
//! Re-exports the `tracing` macros used across the workspace and, with the
//! `tracing-json` feature, installs a JSON subscriber filtered by `RUST_LOG`.

pub use tracing::{debug, debug_span, error, info, trace, warn};

/// Install a global JSON `tracing` subscriber honoring `RUST_LOG`
/// (default filter: `info`).
///
/// # Errors
///
/// Fails if a global subscriber is already installed.
#[cfg(feature = "tracing-json")]
pub fn init_json_logging() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter)
        .try_init()
}
