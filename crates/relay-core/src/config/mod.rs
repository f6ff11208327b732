//! Validated client configuration.
//!
//! # Construction
//!
//! A [`Configuration`] is immutable once built. Every tunable is supplied through
//! [`ConfigurationOptions`], whose fields are all `Option`s: an absent field takes
//! its documented default, a present field is range-checked as given. Values are
//! never clamped; an out-of-range value fails construction with a
//! [`ConfigError`] naming the field, the value, and the bound it violated.
//!
//! # Loading
//!
//! [`Configuration::from_file`] is a convenience for callers. It layers:
//!
//! 1. **Compiled defaults**: the `DEFAULT_*` constants below
//! 2. **Config file**: TOML file at the given path (optional)
//! 3. **Environment variables**: `RELAY__*` overrides (e.g. `RELAY__MAX_SESSIONS=20`)
//!
//! The coordination core never reads the environment itself; it only accepts a
//! `Configuration` value.
//!
//! # Example
//!
//! ```toml
//! max_dispatchers = 20
//! max_sessions = 10
//! request_timeout_ms = 60000
//! session_block_frequency = 4
//! consensus_node_count = 5
//! accept_disputed_responses = false
//! ```

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::{path::Path, time::Duration};
use thiserror::Error;

pub const MIN_DISPATCHERS: usize = 1;
pub const MAX_DISPATCHERS: usize = 1000;
pub const DEFAULT_MAX_DISPATCHERS: usize = 50;

pub const MIN_SESSIONS: usize = 1;
pub const MAX_SESSIONS: usize = 1000;
pub const DEFAULT_MAX_SESSIONS: usize = 10;

pub const MIN_REQUEST_TIMEOUT_MS: u64 = 10_000;
pub const MAX_REQUEST_TIMEOUT_MS: u64 = 200_000;
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 100_000;

pub const MIN_SESSION_BLOCK_FREQUENCY: u64 = 1;
pub const MAX_SESSION_BLOCK_FREQUENCY: u64 = 50;
pub const DEFAULT_SESSION_BLOCK_FREQUENCY: u64 = 4;

pub const MIN_SESSION_REFRESH_RETRIES: u32 = 1;
pub const MAX_SESSION_REFRESH_RETRIES: u32 = 10;
pub const DEFAULT_SESSION_REFRESH_RETRIES: u32 = 3;

pub const MAX_CONSENSUS_NODE_COUNT: usize = 100;

/// Errors raised while building or loading a [`Configuration`].
///
/// Field names are reported with their canonical relay-network spelling
/// (`maxDispatchers`, `consensusNodeCount`, ...).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// A numeric field fell outside its allowed range.
    #[error("{field} must be at least {min} and at most {max}, got {value}")]
    OutOfRange { field: &'static str, value: u64, min: u64, max: u64 },

    /// A field that must be odd (or zero) was even.
    #[error("{field} is not an odd number: {value}")]
    NotOdd { field: &'static str, value: u64 },

    /// The configuration source could not be read or deserialized.
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
}

impl ConfigError {
    /// Returns the offending field name, if the error concerns a single field.
    #[must_use]
    pub fn field(&self) -> Option<&'static str> {
        match self {
            Self::OutOfRange { field, .. } | Self::NotOdd { field, .. } => Some(field),
            Self::Load(_) => None,
        }
    }
}

/// Raw, unvalidated configuration input.
///
/// `None` means "use the default". `Some(false)` and `Some(0)` are honoured as given
/// and validated like any other value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigurationOptions {
    pub max_dispatchers: Option<usize>,
    pub max_sessions: Option<usize>,
    pub request_timeout_ms: Option<u64>,
    pub session_block_frequency: Option<u64>,
    pub max_session_refresh_retries: Option<u32>,
    pub consensus_node_count: Option<usize>,
    pub accept_disputed_responses: Option<bool>,
    pub validate_relay_responses: Option<bool>,
    pub reject_self_signed_certificates: Option<bool>,
}

/// Immutable, validated set of tunables for the dispatcher pool, session cache, and
/// relay coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Configuration {
    max_dispatchers: usize,
    max_sessions: usize,
    request_timeout_ms: u64,
    session_block_frequency: u64,
    max_session_refresh_retries: u32,
    consensus_node_count: usize,
    accept_disputed_responses: bool,
    validate_relay_responses: bool,
    reject_self_signed_certificates: bool,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            max_dispatchers: DEFAULT_MAX_DISPATCHERS,
            max_sessions: DEFAULT_MAX_SESSIONS,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            session_block_frequency: DEFAULT_SESSION_BLOCK_FREQUENCY,
            max_session_refresh_retries: DEFAULT_SESSION_REFRESH_RETRIES,
            consensus_node_count: 0,
            accept_disputed_responses: false,
            validate_relay_responses: true,
            reject_self_signed_certificates: true,
        }
    }
}

fn check_range(field: &'static str, value: u64, min: u64, max: u64) -> Result<(), ConfigError> {
    if value < min || value > max {
        return Err(ConfigError::OutOfRange { field, value, min, max });
    }
    Ok(())
}

#[allow(clippy::cast_possible_truncation)]
fn as_u64(value: usize) -> u64 {
    value as u64
}

impl Configuration {
    /// Validates `options` and builds a configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::OutOfRange`] or [`ConfigError::NotOdd`] for the first
    /// field that violates its constraint.
    pub fn new(options: ConfigurationOptions) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let max_dispatchers = options.max_dispatchers.unwrap_or(defaults.max_dispatchers);
        check_range(
            "maxDispatchers",
            as_u64(max_dispatchers),
            as_u64(MIN_DISPATCHERS),
            as_u64(MAX_DISPATCHERS),
        )?;

        let max_sessions = options.max_sessions.unwrap_or(defaults.max_sessions);
        check_range(
            "maxSessions",
            as_u64(max_sessions),
            as_u64(MIN_SESSIONS),
            as_u64(MAX_SESSIONS),
        )?;

        let request_timeout_ms = options.request_timeout_ms.unwrap_or(defaults.request_timeout_ms);
        check_range(
            "requestTimeout",
            request_timeout_ms,
            MIN_REQUEST_TIMEOUT_MS,
            MAX_REQUEST_TIMEOUT_MS,
        )?;

        let session_block_frequency =
            options.session_block_frequency.unwrap_or(defaults.session_block_frequency);
        check_range(
            "sessionBlockFrequency",
            session_block_frequency,
            MIN_SESSION_BLOCK_FREQUENCY,
            MAX_SESSION_BLOCK_FREQUENCY,
        )?;

        let max_session_refresh_retries =
            options.max_session_refresh_retries.unwrap_or(defaults.max_session_refresh_retries);
        check_range(
            "maxSessionRefreshRetries",
            u64::from(max_session_refresh_retries),
            u64::from(MIN_SESSION_REFRESH_RETRIES),
            u64::from(MAX_SESSION_REFRESH_RETRIES),
        )?;

        let consensus_node_count =
            options.consensus_node_count.unwrap_or(defaults.consensus_node_count);
        check_range(
            "consensusNodeCount",
            as_u64(consensus_node_count),
            0,
            as_u64(MAX_CONSENSUS_NODE_COUNT),
        )?;
        if consensus_node_count != 0 && consensus_node_count % 2 == 0 {
            return Err(ConfigError::NotOdd {
                field: "consensusNodeCount",
                value: as_u64(consensus_node_count),
            });
        }

        Ok(Self {
            max_dispatchers,
            max_sessions,
            request_timeout_ms,
            session_block_frequency,
            max_session_refresh_retries,
            consensus_node_count,
            accept_disputed_responses: options
                .accept_disputed_responses
                .unwrap_or(defaults.accept_disputed_responses),
            validate_relay_responses: options
                .validate_relay_responses
                .unwrap_or(defaults.validate_relay_responses),
            reject_self_signed_certificates: options
                .reject_self_signed_certificates
                .unwrap_or(defaults.reject_self_signed_certificates),
        })
    }

    /// Loads options from a TOML file with `RELAY__`-prefixed environment overrides,
    /// then validates them.
    ///
    /// A missing file is not an error; defaults and environment overrides still apply.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Load`] if the sources cannot be read or deserialized, or a
    /// validation error if any value is out of range.
    pub fn from_file<P: AsRef<Path>>(config_path: P) -> Result<Self, ConfigError> {
        let options: ConfigurationOptions = Config::builder()
            .add_source(File::with_name(&config_path.as_ref().to_string_lossy()).required(false))
            .add_source(Environment::with_prefix("RELAY").separator("__").try_parsing(true))
            .build()?
            .try_deserialize()?;

        Self::new(options)
    }

    /// Returns the dispatcher pool capacity.
    #[must_use]
    pub fn max_dispatchers(&self) -> usize {
        self.max_dispatchers
    }

    /// Returns the session cache capacity.
    #[must_use]
    pub fn max_sessions(&self) -> usize {
        self.max_sessions
    }

    /// Returns the deadline applied to every outbound call.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    #[must_use]
    pub fn request_timeout_ms(&self) -> u64 {
        self.request_timeout_ms
    }

    /// Returns the number of blocks in one session epoch.
    #[must_use]
    pub fn session_block_frequency(&self) -> u64 {
        self.session_block_frequency
    }

    #[must_use]
    pub fn max_session_refresh_retries(&self) -> u32 {
        self.max_session_refresh_retries
    }

    /// Returns the number of providers queried per consensus relay. Zero means consensus
    /// relays are unavailable.
    #[must_use]
    pub fn consensus_node_count(&self) -> usize {
        self.consensus_node_count
    }

    #[must_use]
    pub fn consensus_available(&self) -> bool {
        self.consensus_node_count > 0
    }

    #[must_use]
    pub fn accept_disputed_responses(&self) -> bool {
        self.accept_disputed_responses
    }

    #[must_use]
    pub fn validate_relay_responses(&self) -> bool {
        self.validate_relay_responses
    }

    /// Transport TLS policy. The core only carries this flag for the transport layer.
    #[must_use]
    pub fn reject_self_signed_certificates(&self) -> bool {
        self.reject_self_signed_certificates
    }
}

impl TryFrom<ConfigurationOptions> for Configuration {
    type Error = ConfigError;

    fn try_from(options: ConfigurationOptions) -> Result<Self, Self::Error> {
        Self::new(options)
    }
}
