// crates/variant-gate-config/src/config.rs
// ============================================================================
// Module: Variant Gate Configuration
// Description: Configuration loading and validation for the tracker server.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size limits.
//! Missing or invalid configuration fails closed: validation rejects
//! out-of-range values instead of clamping them, and unknown keys are
//! rejected at parse time.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "variant-gate.toml";
/// Environment variable used to override the config path.
pub(crate) const CONFIG_ENV_VAR: &str = "VARIANT_GATE_CONFIG";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Default server bind address.
const DEFAULT_BIND: &str = "127.0.0.1:8930";
/// Default maximum request body size in bytes.
const DEFAULT_MAX_BODY_BYTES: usize = 64 * 1024;
/// Maximum allowed request body size in bytes.
pub(crate) const MAX_MAX_BODY_BYTES: usize = 4 * 1024 * 1024;
/// Default signature replay window in milliseconds.
const DEFAULT_SIGNATURE_WINDOW_MS: u64 = 300_000;
/// Minimum allowed signature replay window in milliseconds.
pub(crate) const MIN_SIGNATURE_WINDOW_MS: u64 = 1_000;
/// Maximum allowed signature replay window in milliseconds.
pub(crate) const MAX_SIGNATURE_WINDOW_MS: u64 = 3_600_000;
/// Maximum number of global allowed-origin entries.
pub(crate) const MAX_ALLOWED_ORIGINS: usize = 256;
/// Maximum length of a single allowed-origin entry.
pub(crate) const MAX_ORIGIN_LENGTH: usize = 512;
/// Default SQLite busy timeout in milliseconds.
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Maximum allowed SQLite busy timeout in milliseconds.
pub(crate) const MAX_BUSY_TIMEOUT_MS: u64 = 60_000;

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// Top-level Variant Gate configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VariantGateConfig {
    /// HTTP server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Request-authentication configuration.
    #[serde(default)]
    pub auth: AuthConfig,
    /// Experiment store configuration.
    #[serde(default)]
    pub store: StoreConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Bind address for the API listener.
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Maximum accepted request body size in bytes.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

/// Request-authentication configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuthConfig {
    /// Signature replay window in milliseconds.
    #[serde(default = "default_signature_window_ms")]
    pub signature_window_ms: u64,
    /// Global origin allow-list used when a project carries none.
    #[serde(default)]
    pub allowed_origins: Vec<String>,
    /// Production mode: with both origin lists empty, deny cross-origin
    /// requests instead of allowing them.
    #[serde(default)]
    pub production: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            signature_window_ms: default_signature_window_ms(),
            allowed_origins: Vec::new(),
            production: false,
        }
    }
}

/// Experiment store backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    /// In-memory store for local runs and tests.
    #[default]
    Memory,
    /// Durable SQLite store.
    Sqlite,
}

/// Experiment store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    /// Selected backend.
    #[serde(default)]
    pub backend: StoreBackend,
    /// Database path; required for the SQLite backend.
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// SQLite busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Memory,
            path: None,
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

// ============================================================================
// SECTION: Serde Defaults
// ============================================================================

/// Default bind address helper.
fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}

/// Default body-size helper.
const fn default_max_body_bytes() -> usize {
    DEFAULT_MAX_BODY_BYTES
}

/// Default signature window helper.
const fn default_signature_window_ms() -> u64 {
    DEFAULT_SIGNATURE_WINDOW_MS
}

/// Default busy timeout helper.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading and validation failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("config read failed for {path}: {reason}")]
    Read {
        /// Path that failed to load.
        path: PathBuf,
        /// Underlying failure description.
        reason: String,
    },
    /// The configuration file exceeds the size limit.
    #[error("config file {path} exceeds {MAX_CONFIG_FILE_SIZE} bytes")]
    TooLarge {
        /// Path that failed to load.
        path: PathBuf,
    },
    /// The configuration file could not be parsed.
    #[error("config parse failed: {0}")]
    Parse(String),
    /// A configuration value is out of range or inconsistent.
    #[error("config invalid: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Loading
// ============================================================================

impl VariantGateConfig {
    /// Loads configuration from an explicit path, the `VARIANT_GATE_CONFIG`
    /// environment variable, or the default filename, in that order.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file cannot be read, parsed, or
    /// validated.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = path.map_or_else(
            || {
                env::var_os(CONFIG_ENV_VAR)
                    .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_NAME), PathBuf::from)
            },
            Path::to_path_buf,
        );
        let raw = fs::read_to_string(&path).map_err(|err| ConfigError::Read {
            path: path.clone(),
            reason: err.to_string(),
        })?;
        if raw.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::TooLarge {
                path,
            });
        }
        let config: Self = toml::from_str(&raw).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates every configured value against its hard limits.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.bind.parse::<SocketAddr>().is_err() {
            return Err(ConfigError::Invalid(format!(
                "server.bind is not a socket address: {}",
                self.server.bind
            )));
        }
        if self.server.max_body_bytes == 0 || self.server.max_body_bytes > MAX_MAX_BODY_BYTES {
            return Err(ConfigError::Invalid(format!(
                "server.max_body_bytes must be in 1..={MAX_MAX_BODY_BYTES}"
            )));
        }
        if self.auth.signature_window_ms < MIN_SIGNATURE_WINDOW_MS
            || self.auth.signature_window_ms > MAX_SIGNATURE_WINDOW_MS
        {
            return Err(ConfigError::Invalid(format!(
                "auth.signature_window_ms must be in \
                 {MIN_SIGNATURE_WINDOW_MS}..={MAX_SIGNATURE_WINDOW_MS}"
            )));
        }
        if self.auth.allowed_origins.len() > MAX_ALLOWED_ORIGINS {
            return Err(ConfigError::Invalid(format!(
                "auth.allowed_origins exceeds {MAX_ALLOWED_ORIGINS} entries"
            )));
        }
        for origin in &self.auth.allowed_origins {
            if origin.trim().is_empty() {
                return Err(ConfigError::Invalid(
                    "auth.allowed_origins contains a blank entry".to_string(),
                ));
            }
            if origin.len() > MAX_ORIGIN_LENGTH {
                return Err(ConfigError::Invalid(format!(
                    "auth.allowed_origins entry exceeds {MAX_ORIGIN_LENGTH} bytes"
                )));
            }
        }
        if self.store.backend == StoreBackend::Sqlite && self.store.path.is_none() {
            return Err(ConfigError::Invalid(
                "store.backend = \"sqlite\" requires store.path".to_string(),
            ));
        }
        if self.store.busy_timeout_ms > MAX_BUSY_TIMEOUT_MS {
            return Err(ConfigError::Invalid(format!(
                "store.busy_timeout_ms must be at most {MAX_BUSY_TIMEOUT_MS}"
            )));
        }
        Ok(())
    }
}
