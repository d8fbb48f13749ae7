// crates/variant-gate-auth/src/signature.rs
// ============================================================================
// Module: Variant Gate Request Signatures
// Description: HMAC-SHA256 request signing with replay-window enforcement.
// Purpose: Verify signed SDK envelopes against per-project secrets.
// Dependencies: variant-gate-core, hmac, sha2, hex, subtle
// ============================================================================

//! ## Overview
//! Every SDK payload carries `_ts` and `_sig` where `_sig` is the
//! hex-encoded HMAC-SHA256 of `"<_ts>.<project_id>.<url>"` keyed with the
//! project's API key. Verification enforces a bounded time window against
//! server time and compares signatures in constant time. The secret never
//! leaves the server except as the project's API key, which the SDK already
//! holds as its credential: signing adds integrity and expiry, not
//! confidentiality.

// ============================================================================
// SECTION: Imports
// ============================================================================

use hmac::Hmac;
use hmac::Mac;
use serde::Deserialize;
use serde::Serialize;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;
use variant_gate_core::Project;
use variant_gate_core::ProjectId;
use variant_gate_core::StoreError;
use variant_gate_core::Timestamp;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default replay window in milliseconds (five minutes).
pub const DEFAULT_SIGNATURE_WINDOW_MS: u64 = 300_000;

// ============================================================================
// SECTION: Envelope
// ============================================================================

/// Timestamp field as it appears on the wire.
///
/// The SDK sends a number; older SDK builds sent a decimal string. Both are
/// accepted; anything non-numeric fails the window check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WireTimestamp {
    /// Millisecond timestamp as a JSON number.
    Millis(i64),
    /// Millisecond timestamp as a decimal string.
    Text(String),
}

impl WireTimestamp {
    /// Parses the wire value into unix milliseconds.
    fn as_millis(&self) -> Option<i64> {
        match self {
            Self::Millis(value) => Some(*value),
            Self::Text(value) => value.trim().parse().ok(),
        }
    }
}

/// Signed-request fields extracted from an SDK payload.
///
/// All fields are optional at the deserialization boundary so that a missing
/// field surfaces as [`SignatureError::Missing`] rather than a parse error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestEnvelope {
    /// Claimed project identifier.
    #[serde(default)]
    pub project_id: Option<ProjectId>,
    /// Page URL covered by the signature.
    #[serde(default)]
    pub url: Option<String>,
    /// Client timestamp in unix milliseconds.
    #[serde(default, rename = "_ts")]
    pub ts: Option<WireTimestamp>,
    /// Hex-encoded HMAC-SHA256 signature.
    #[serde(default, rename = "_sig")]
    pub sig: Option<String>,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Signature verification failures.
#[derive(Debug, Error)]
pub enum SignatureError {
    /// A required envelope field was absent.
    #[error("signature envelope missing required field: {0}")]
    Missing(&'static str),
    /// The timestamp was non-numeric or outside the replay window.
    #[error("signature expired or timestamp invalid")]
    Expired,
    /// The claimed project does not exist or carries no secret.
    #[error("unknown project or missing secret")]
    InvalidProject,
    /// The signature did not match the expected value.
    #[error("signature mismatch")]
    Invalid,
    /// The project lookup failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

// ============================================================================
// SECTION: Signing
// ============================================================================

/// Builds the canonical signature payload `"<ts>.<project_id>.<url>"`.
#[must_use]
pub fn signature_payload(ts: i64, project_id: &ProjectId, url: &str) -> String {
    format!("{ts}.{project_id}.{url}")
}

/// Computes the hex-encoded HMAC-SHA256 signature for an envelope.
#[must_use]
pub fn sign_payload(secret: &str, ts: i64, project_id: &ProjectId, url: &str) -> String {
    let payload = signature_payload(ts, project_id, url);
    // HMAC accepts keys of any length, so construction cannot fail.
    let mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .map(|mut mac| {
            mac.update(payload.as_bytes());
            mac.finalize().into_bytes()
        });
    match mac {
        Ok(bytes) => hex::encode(bytes),
        Err(_) => String::new(),
    }
}

// ============================================================================
// SECTION: Verification
// ============================================================================

/// HMAC signature verifier with a configurable replay window.
#[derive(Debug, Clone, Copy)]
pub struct SignatureVerifier {
    /// Maximum accepted distance between `_ts` and server time.
    window_ms: u64,
}

impl Default for SignatureVerifier {
    fn default() -> Self {
        Self {
            window_ms: DEFAULT_SIGNATURE_WINDOW_MS,
        }
    }
}

impl SignatureVerifier {
    /// Creates a verifier with the given replay window in milliseconds.
    #[must_use]
    pub const fn new(window_ms: u64) -> Self {
        Self {
            window_ms,
        }
    }

    /// Verifies a signed envelope and resolves the owning project.
    ///
    /// The resolved project is returned so downstream handlers avoid a
    /// second lookup. Server time is authoritative for the window check.
    ///
    /// # Errors
    ///
    /// Returns [`SignatureError`] describing the first failed check; all
    /// checks are fail-closed.
    pub fn verify(
        &self,
        envelope: &RequestEnvelope,
        now: Timestamp,
        lookup: impl FnOnce(&ProjectId) -> Result<Option<Project>, StoreError>,
    ) -> Result<Project, SignatureError> {
        let project_id =
            envelope.project_id.as_ref().ok_or(SignatureError::Missing("projectId"))?;
        let url = envelope.url.as_deref().ok_or(SignatureError::Missing("url"))?;
        let ts_field = envelope.ts.as_ref().ok_or(SignatureError::Missing("_ts"))?;
        let sig = envelope.sig.as_deref().ok_or(SignatureError::Missing("_sig"))?;

        let ts = ts_field.as_millis().ok_or(SignatureError::Expired)?;
        if Timestamp::from_unix_millis(ts).abs_delta_millis(now) > self.window_ms {
            return Err(SignatureError::Expired);
        }

        let project = lookup(project_id)?.ok_or(SignatureError::InvalidProject)?;
        if project.api_key.is_empty() {
            return Err(SignatureError::InvalidProject);
        }

        let expected = sign_payload(&project.api_key, ts, project_id, url);
        if !constant_time_str_eq(&expected, sig) {
            return Err(SignatureError::Invalid);
        }
        Ok(project)
    }
}

/// Compares two signature strings in constant time.
///
/// Length mismatch is reported as inequality; the comparison itself does not
/// short-circuit on differing bytes.
fn constant_time_str_eq(expected: &str, presented: &str) -> bool {
    let expected = expected.as_bytes();
    let presented = presented.as_bytes();
    if expected.len() != presented.len() {
        return false;
    }
    expected.ct_eq(presented).into()
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::panic,
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test-only panic-based assertions."
    )]

    use super::WireTimestamp;
    use super::constant_time_str_eq;

    #[test]
    fn wire_timestamp_accepts_numbers_and_strings() {
        assert_eq!(WireTimestamp::Millis(1_700_000_000_000).as_millis(), Some(1_700_000_000_000));
        assert_eq!(
            WireTimestamp::Text("1700000000000".to_string()).as_millis(),
            Some(1_700_000_000_000)
        );
        assert_eq!(WireTimestamp::Text("soon".to_string()).as_millis(), None);
    }

    #[test]
    fn comparison_rejects_length_mismatch() {
        assert!(!constant_time_str_eq("abcd", "abc"));
        assert!(constant_time_str_eq("abcd", "abcd"));
    }
}
