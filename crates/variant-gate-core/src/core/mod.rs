// crates/variant-gate-core/src/core/mod.rs
// ============================================================================
// Module: Variant Gate Core Model
// Description: Canonical data model for projects, experiments, and contexts.
// Purpose: Group model submodules and re-export their public types.
// Dependencies: crate::core::{identifiers, time, experiment, context}
// ============================================================================

//! ## Overview
//! The core model defines the entities the assignment engine operates on:
//! projects, experiments with their condition sets and creatives, visitor
//! contexts, and assignment results. All types carry stable wire forms.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod context;
pub mod experiment;
pub mod identifiers;
pub mod time;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use context::VisitorContext;
pub use experiment::AssignmentResult;
pub use experiment::AxisRule;
pub use experiment::ConditionKind;
pub use experiment::ConditionSet;
pub use experiment::Creative;
pub use experiment::Experiment;
pub use experiment::MatchedAssignment;
pub use experiment::OtherRule;
pub use experiment::Project;
pub use experiment::SelectedCreative;
pub use identifiers::ExperimentId;
pub use identifiers::ProjectId;
pub use identifiers::VisitorId;
pub use time::Timestamp;
