// crates/variant-gate-core/src/core/context.rs
// ============================================================================
// Module: Variant Gate Visitor Context
// Description: Per-request visitor context consumed by the matching engine.
// Purpose: Replace ambient request state with an explicit context struct.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! The visitor context is built once per request from the SDK payload and
//! threaded explicitly through the orchestrator call chain. Missing fields
//! degrade to empty strings or zero rather than erroring; the matcher treats
//! them as ordinary values.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Visitor Context
// ============================================================================

/// Visitor attributes evaluated against an experiment's condition set.
///
/// # Invariants
/// - Values are snapshots of the inbound request; the matcher never mutates
///   them.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitorContext {
    /// Raw user-agent header; classified into a device category by the
    /// runtime.
    #[serde(default)]
    pub user_agent: String,
    /// Browser name reported by the SDK.
    #[serde(default)]
    pub browser: String,
    /// Operating system reported by the SDK.
    #[serde(default)]
    pub os: String,
    /// Visitor language (for example `en` or `ja`).
    #[serde(default)]
    pub language: String,
    /// Number of visits recorded by the SDK for this visitor.
    #[serde(default)]
    pub visit_count: u32,
    /// Referrer URL for the current page view.
    #[serde(default)]
    pub referrer: String,
    /// URL of the page being viewed.
    #[serde(default)]
    pub url: String,
}
