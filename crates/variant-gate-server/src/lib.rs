// crates/variant-gate-server/src/lib.rs
// ============================================================================
// Module: Variant Gate Server Library
// Description: HTTP API exposing the assignment wire contract.
// Purpose: Tie auth, store, and assignment engine behind axum routes.
// Dependencies: crate::{audit, server}
// ============================================================================

//! ## Overview
//! The server exposes three routes: signed assignment execution, signed
//! impression logging, and unsigned creative preview. Request bodies are
//! untrusted input: size-capped, strictly parsed, and authenticated before
//! any store access. Auth rejections are recorded as JSON audit lines.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod audit;
pub mod server;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::AuthAuditEvent;
pub use audit::AuthAuditSink;
pub use audit::NoopAuditSink;
pub use audit::StderrAuditSink;
pub use server::ServerError;
pub use server::VariantGateServer;
