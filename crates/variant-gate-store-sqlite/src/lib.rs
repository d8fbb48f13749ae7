// crates/variant-gate-store-sqlite/src/lib.rs
// ============================================================================
// Module: Variant Gate SQLite Store Library
// Description: Durable ExperimentStore backed by SQLite.
// Purpose: Expose the SQLite store implementation and its configuration.
// Dependencies: crate::store
// ============================================================================

//! ## Overview
//! This crate provides the durable [`variant_gate_core::ExperimentStore`]
//! backend. Experiments are stored as JSON documents with their routing
//! columns lifted for indexing; impressions are an append-only log.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use store::SqliteExperimentStore;
pub use store::SqliteStoreConfig;
pub use store::SqliteStoreError;
