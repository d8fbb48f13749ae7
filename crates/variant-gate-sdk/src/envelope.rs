// crates/variant-gate-sdk/src/envelope.rs
// ============================================================================
// Module: Signed Envelope Builder
// Description: Attaches timestamp and HMAC signature to outgoing requests.
// Purpose: Produce envelopes the server's verifier accepts.
// Dependencies: variant-gate-auth, variant-gate-core
// ============================================================================

//! ## Overview
//! The envelope builder is the client counterpart of the server's signature
//! verifier: it stamps the request with the current time and signs the
//! canonical payload with the project's API key.

// ============================================================================
// SECTION: Imports
// ============================================================================

use variant_gate_auth::RequestEnvelope;
use variant_gate_auth::sign_payload;
use variant_gate_auth::signature::WireTimestamp;
use variant_gate_core::ProjectId;
use variant_gate_core::Timestamp;

// ============================================================================
// SECTION: Builder
// ============================================================================

/// Builds a fully signed request envelope for the given project and URL.
#[must_use]
pub fn signed_envelope(
    project_id: &ProjectId,
    api_key: &str,
    url: &str,
    now: Timestamp,
) -> RequestEnvelope {
    let ts = now.as_unix_millis();
    let sig = sign_payload(api_key, ts, project_id, url);
    RequestEnvelope {
        project_id: Some(project_id.clone()),
        url: Some(url.to_string()),
        ts: Some(WireTimestamp::Millis(ts)),
        sig: Some(sig),
    }
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
        reason = "Test-only panic-based assertions are permitted."
    )]

    use variant_gate_auth::SignatureVerifier;
    use variant_gate_core::Project;
    use variant_gate_core::StoreError;

    use super::*;

    #[test]
    fn built_envelope_passes_verification() {
        let project = Project {
            id: ProjectId::new("p1"),
            api_key: "secret".to_string(),
            url: "https://example.com".to_string(),
            allowed_origins: Vec::new(),
        };
        let now = Timestamp::from_unix_millis(1_700_000_000_000);
        let envelope =
            signed_envelope(&project.id, &project.api_key, "https://example.com/pricing", now);

        let verified = SignatureVerifier::default()
            .verify(&envelope, now, |_| Ok::<_, StoreError>(Some(project.clone())))
            .expect("verifies");
        assert_eq!(verified.id, project.id);
    }
}
