//! Controller configuration from the environment.
//!
//! Environment variables:
//! - `KVO_DETECT_DEAD_TARGETS` (bool, default `true`)
//! - `KVO_TRACE_DELIVERY` (bool, default `false`)
//! - `KVO_MAX_OBSERVATIONS` (usize, `0` = unlimited, default `0`)
//!
//! Unparseable values leave the default in place and are reported through
//! [`KvoConfig::from_env_with_diagnostics`].

use std::env;
use std::fmt;
use std::sync::OnceLock;

const ENV_DETECT_DEAD_TARGETS: &str = "KVO_DETECT_DEAD_TARGETS";
const ENV_TRACE_DELIVERY: &str = "KVO_TRACE_DELIVERY";
const ENV_MAX_OBSERVATIONS: &str = "KVO_MAX_OBSERVATIONS";

/// Runtime configuration shared by controllers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KvoConfig {
    /// Warn when a non-retaining controller finds an observed target that
    /// was dropped before its observation was removed.
    pub detect_dead_targets: bool,
    /// Emit a `trace` event for every delivered change.
    pub trace_delivery: bool,
    /// Maximum live observations per controller (0 = unlimited).
    pub max_observations: usize,
}

impl Default for KvoConfig {
    fn default() -> Self {
        Self {
            detect_dead_targets: true,
            trace_delivery: false,
            max_observations: 0,
        }
    }
}

/// Configuration parse diagnostics.
#[derive(Debug, Clone)]
pub struct ConfigParse {
    pub config: KvoConfig,
    pub errors: Vec<ConfigError>,
}

/// Configuration error with field context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    pub field: &'static str,
    pub value: String,
    pub message: &'static str,
}

impl ConfigError {
    fn new(field: &'static str, value: impl Into<String>, message: &'static str) -> Self {
        Self {
            field,
            value: value.into(),
            message,
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={} ({})", self.field, self.value, self.message)
    }
}

impl std::error::Error for ConfigError {}

impl KvoConfig {
    /// Parse config from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_env_with_diagnostics().config
    }

    /// Parse config from environment variables and return diagnostics.
    #[must_use]
    pub fn from_env_with_diagnostics() -> ConfigParse {
        Self::from_env_with(|key| env::var(key).ok())
    }

    /// Parse config using a custom environment lookup.
    pub fn from_env_with<F>(mut get: F) -> ConfigParse
    where
        F: FnMut(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let mut errors = Vec::new();

        if let Some(value) = get(ENV_DETECT_DEAD_TARGETS) {
            match parse_bool(&value) {
                Some(parsed) => config.detect_dead_targets = parsed,
                None => errors.push(ConfigError::new(
                    "detect_dead_targets",
                    value,
                    "expected bool (1/0/true/false)",
                )),
            }
        }

        if let Some(value) = get(ENV_TRACE_DELIVERY) {
            match parse_bool(&value) {
                Some(parsed) => config.trace_delivery = parsed,
                None => errors.push(ConfigError::new(
                    "trace_delivery",
                    value,
                    "expected bool (1/0/true/false)",
                )),
            }
        }

        if let Some(value) = get(ENV_MAX_OBSERVATIONS) {
            match value.trim().parse::<usize>() {
                Ok(parsed) => config.max_observations = parsed,
                Err(_) => errors.push(ConfigError::new(
                    "max_observations",
                    value,
                    "expected non-negative integer",
                )),
            }
        }

        ConfigParse { config, errors }
    }

    /// Process-wide configuration, read from the environment once.
    #[must_use]
    pub fn global() -> &'static KvoConfig {
        static GLOBAL: OnceLock<KvoConfig> = OnceLock::new();
        GLOBAL.get_or_init(Self::from_env)
    }

    /// Builder: set `detect_dead_targets`.
    #[must_use]
    pub fn with_detect_dead_targets(mut self, on: bool) -> Self {
        self.detect_dead_targets = on;
        self
    }

    /// Builder: set `trace_delivery`.
    #[must_use]
    pub fn with_trace_delivery(mut self, on: bool) -> Self {
        self.trace_delivery = on;
        self
    }

    /// Builder: set `max_observations` (0 = unlimited).
    #[must_use]
    pub fn with_max_observations(mut self, max: usize) -> Self {
        self.max_observations = max;
        self
    }

    /// The observation limit, if any.
    #[must_use]
    pub fn observation_limit(&self) -> Option<usize> {
        (self.max_observations > 0).then_some(self.max_observations)
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
