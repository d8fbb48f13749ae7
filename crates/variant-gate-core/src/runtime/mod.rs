// crates/variant-gate-core/src/runtime/mod.rs
// ============================================================================
// Module: Variant Gate Runtime
// Description: Matching, selection, and assignment orchestration.
// Purpose: Group runtime submodules and re-export their public surface.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! The runtime evaluates visitor contexts against experiments: URL pattern
//! matching, condition matching, device classification, weighted creative
//! selection, and the assignment orchestrator that ties them together. All
//! computation is synchronous and CPU-bound; the only I/O happens through
//! the [`crate::interfaces::ExperimentStore`] seam.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod assign;
pub mod conditions;
pub mod device;
pub mod selector;
pub mod store;
pub mod url_match;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use assign::AssignmentEngine;
pub use conditions::ConditionContext;
pub use conditions::matches_conditions;
pub use device::DeviceClass;
pub use device::classify_device;
pub use selector::select_creative;
pub use selector::select_creative_with_rng;
pub use store::InMemoryExperimentStore;
pub use url_match::match_url;
