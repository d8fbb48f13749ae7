// crates/variant-gate-server/src/audit.rs
// ============================================================================
// Module: Auth Audit Logging
// Description: Structured audit events for request authentication outcomes.
// Purpose: Emit redacted JSON audit lines without hard dependencies.
// Dependencies: serde, serde_json, time
// ============================================================================

//! ## Overview
//! Audit events capture why a request was denied (or that a privileged path
//! was taken) as single JSON lines. Events carry identifiers and reasons,
//! never signatures or API keys. Deployments route the lines to their
//! preferred pipeline by swapping the sink.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Serialize;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

// ============================================================================
// SECTION: Event
// ============================================================================

/// One request-authentication audit event.
#[derive(Debug, Clone, Serialize)]
pub struct AuthAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// RFC 3339 timestamp the event was recorded at.
    pub timestamp: String,
    /// Route the request targeted.
    pub path: &'static str,
    /// Allow or deny decision.
    pub decision: &'static str,
    /// Project identifier when the request carried one.
    pub project_id: Option<String>,
    /// Origin header value when present.
    pub origin: Option<String>,
    /// Denial reason; absent on allows.
    pub reason: Option<String>,
}

impl AuthAuditEvent {
    /// Builds a deny event for a rejected request.
    #[must_use]
    pub fn denied(
        path: &'static str,
        project_id: Option<String>,
        origin: Option<String>,
        reason: String,
    ) -> Self {
        Self {
            event: "request_auth",
            timestamp: now_rfc3339(),
            path,
            decision: "deny",
            project_id,
            origin,
            reason: Some(reason),
        }
    }
}

/// Formats the current wall-clock time as RFC 3339.
fn now_rfc3339() -> String {
    OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_else(|_| String::from("unknown"))
}

// ============================================================================
// SECTION: Sinks
// ============================================================================

/// Audit sink for authentication events.
pub trait AuthAuditSink: Send + Sync {
    /// Records an audit event.
    fn record(&self, event: &AuthAuditEvent);
}

/// Audit sink that logs JSON lines to stderr.
pub struct StderrAuditSink;

impl AuthAuditSink for StderrAuditSink {
    #[allow(clippy::print_stderr, reason = "Stderr is the audit transport for this sink.")]
    fn record(&self, event: &AuthAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            eprintln!("{payload}");
        }
    }
}

/// No-op audit sink for tests.
pub struct NoopAuditSink;

impl AuthAuditSink for NoopAuditSink {
    fn record(&self, _event: &AuthAuditEvent) {}
}
