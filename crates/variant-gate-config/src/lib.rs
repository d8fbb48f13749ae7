// crates/variant-gate-config/src/lib.rs
// ============================================================================
// Module: Variant Gate Config Library
// Description: Configuration loading and validation for Variant Gate.
// Purpose: Expose the canonical configuration model.
// Dependencies: crate::config
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size limits and
//! fail-closed validation. Unknown keys are rejected so a typo cannot
//! silently disable an auth control.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::AuthConfig;
pub use config::ConfigError;
pub use config::ServerConfig;
pub use config::StoreBackend;
pub use config::StoreConfig;
pub use config::VariantGateConfig;
