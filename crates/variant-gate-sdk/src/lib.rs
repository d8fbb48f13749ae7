// crates/variant-gate-sdk/src/lib.rs
// ============================================================================
// Module: Variant Gate SDK Library
// Description: Client-side session cache, envelope signing, creative apply.
// Purpose: Implement the client half of the assignment wire contract.
// Dependencies: crate::{apply, envelope, session}
// ============================================================================

//! ## Overview
//! The SDK owns the sticky half of the assignment contract: it caches
//! assignments per experiment so repeat visits reuse the creative and log at
//! most one impression per session window, signs outgoing request envelopes,
//! and turns a selected creative into an apply plan. Operator-authored
//! JavaScript is never executed by this crate; it is surfaced only through
//! the [`CreativeScriptHost`] capability trait.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod apply;
pub mod envelope;
pub mod session;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use apply::ApplyPlan;
pub use apply::CreativeScriptHost;
pub use envelope::signed_envelope;
pub use session::Resolution;
pub use session::SessionEntry;
pub use session::StickySession;
