// crates/variant-gate-core/src/lib.rs
// ============================================================================
// Module: Variant Gate Core Library
// Description: Public API surface for the Variant Gate core.
// Purpose: Expose model types, store interfaces, and matching runtime helpers.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! Variant Gate core provides the experiment assignment engine for the
//! tracker: condition matching, URL pattern matching, device classification,
//! weighted creative selection, and the assignment orchestrator. It is
//! backend-agnostic and integrates with persistence through explicit store
//! interfaces rather than embedding a database client.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use core::*;

pub use interfaces::ExperimentStore;
pub use interfaces::ImpressionRecord;
pub use interfaces::StoreError;
pub use runtime::AssignmentEngine;
pub use runtime::DeviceClass;
pub use runtime::InMemoryExperimentStore;
pub use runtime::classify_device;
pub use runtime::match_url;
pub use runtime::matches_conditions;
pub use runtime::select_creative;
pub use runtime::select_creative_with_rng;
