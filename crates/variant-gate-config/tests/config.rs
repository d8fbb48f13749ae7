// crates/variant-gate-config/tests/config.rs
// ============================================================================
// Module: Configuration Tests
// Description: Loading, defaults, strict parsing, and fail-closed validation.
// ============================================================================
//! ## Overview
//! Exercises config loading from disk: defaults apply for omitted tables,
//! unknown keys are rejected, and each validation bound fails closed.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only panic-based assertions are permitted."
)]

use std::fs;
use std::path::PathBuf;

use tempfile::TempDir;
use variant_gate_config::ConfigError;
use variant_gate_config::StoreBackend;
use variant_gate_config::VariantGateConfig;

fn write_config(dir: &TempDir, contents: &str) -> std::path::PathBuf {
    let path = dir.path().join("variant-gate.toml");
    fs::write(&path, contents).expect("write config");
    path
}

#[test]
fn empty_file_yields_defaults() {
    let dir = TempDir::new().expect("tempdir");
    let path = write_config(&dir, "");
    let config = VariantGateConfig::load(Some(&path)).expect("load");

    assert_eq!(config.server.bind, "127.0.0.1:8930");
    assert_eq!(config.server.max_body_bytes, 64 * 1024);
    assert_eq!(config.auth.signature_window_ms, 300_000);
    assert!(config.auth.allowed_origins.is_empty());
    assert!(!config.auth.production);
    assert_eq!(config.store.backend, StoreBackend::Memory);
}

#[test]
fn full_config_round_trips() {
    let dir = TempDir::new().expect("tempdir");
    let path = write_config(
        &dir,
        r#"
[server]
bind = "0.0.0.0:9000"
max_body_bytes = 32768

[auth]
signature_window_ms = 120000
allowed_origins = ["https://dashboard.example.com", "https://*.example.com"]
production = true

[store]
backend = "sqlite"
path = "/tmp/variant-gate.db"
busy_timeout_ms = 2500
"#,
    );
    let config = VariantGateConfig::load(Some(&path)).expect("load");

    assert_eq!(config.server.bind, "0.0.0.0:9000");
    assert_eq!(config.auth.signature_window_ms, 120_000);
    assert_eq!(config.auth.allowed_origins.len(), 2);
    assert!(config.auth.production);
    assert_eq!(config.store.backend, StoreBackend::Sqlite);
    assert_eq!(config.store.path, Some(PathBuf::from("/tmp/variant-gate.db")));
    assert_eq!(config.store.busy_timeout_ms, 2_500);
}

#[test]
fn unknown_key_is_rejected() {
    let dir = TempDir::new().expect("tempdir");
    let path = write_config(&dir, "[auth]\nsignature_window = 1000\n");
    let result = VariantGateConfig::load(Some(&path));
    assert!(matches!(result, Err(ConfigError::Parse(_))));
}

#[test]
fn missing_file_is_a_read_error() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("absent.toml");
    let result = VariantGateConfig::load(Some(&path));
    assert!(matches!(result, Err(ConfigError::Read { .. })));
}

#[test]
fn invalid_bind_address_fails_validation() {
    let dir = TempDir::new().expect("tempdir");
    let path = write_config(&dir, "[server]\nbind = \"not-an-address\"\n");
    let result = VariantGateConfig::load(Some(&path));
    assert!(matches!(result, Err(ConfigError::Invalid(_))));
}

#[test]
fn zero_body_limit_fails_validation() {
    let dir = TempDir::new().expect("tempdir");
    let path = write_config(&dir, "[server]\nmax_body_bytes = 0\n");
    let result = VariantGateConfig::load(Some(&path));
    assert!(matches!(result, Err(ConfigError::Invalid(_))));
}

#[test]
fn out_of_range_signature_window_fails_validation() {
    let dir = TempDir::new().expect("tempdir");
    let path = write_config(&dir, "[auth]\nsignature_window_ms = 10\n");
    assert!(matches!(
        VariantGateConfig::load(Some(&path)),
        Err(ConfigError::Invalid(_))
    ));

    let path = write_config(&dir, "[auth]\nsignature_window_ms = 7200000\n");
    assert!(matches!(
        VariantGateConfig::load(Some(&path)),
        Err(ConfigError::Invalid(_))
    ));
}

#[test]
fn blank_origin_entry_fails_validation() {
    let dir = TempDir::new().expect("tempdir");
    let path = write_config(&dir, "[auth]\nallowed_origins = [\"  \"]\n");
    let result = VariantGateConfig::load(Some(&path));
    assert!(matches!(result, Err(ConfigError::Invalid(_))));
}

#[test]
fn sqlite_backend_without_path_fails_validation() {
    let dir = TempDir::new().expect("tempdir");
    let path = write_config(&dir, "[store]\nbackend = \"sqlite\"\n");
    let result = VariantGateConfig::load(Some(&path));
    assert!(matches!(result, Err(ConfigError::Invalid(_))));
}
