// crates/variant-gate-auth/tests/signature.rs
// ============================================================================
// Module: Signature Verification Tests
// Description: Round-trip, tamper, replay, and missing-field behavior.
// ============================================================================
//! ## Overview
//! Exercises the signature verifier end to end: a signed envelope verifies
//! inside the window, any byte mutation fails, stale timestamps are
//! rejected, and each missing field maps to its own error.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only panic-based assertions are permitted."
)]

use variant_gate_auth::RequestEnvelope;
use variant_gate_auth::SignatureError;
use variant_gate_auth::SignatureVerifier;
use variant_gate_auth::sign_payload;
use variant_gate_auth::signature::WireTimestamp;
use variant_gate_core::Project;
use variant_gate_core::ProjectId;
use variant_gate_core::StoreError;
use variant_gate_core::Timestamp;

const NOW_MS: i64 = 1_700_000_000_000;
const SECRET: &str = "project-api-key";

fn project() -> Project {
    Project {
        id: ProjectId::new("p1"),
        api_key: SECRET.to_string(),
        url: "https://example.com".to_string(),
        allowed_origins: Vec::new(),
    }
}

fn lookup(id: &ProjectId) -> Result<Option<Project>, StoreError> {
    if id.as_str() == "p1" { Ok(Some(project())) } else { Ok(None) }
}

fn signed_envelope(ts: i64) -> RequestEnvelope {
    let project_id = ProjectId::new("p1");
    let url = "https://example.com/pricing";
    let sig = sign_payload(SECRET, ts, &project_id, url);
    RequestEnvelope {
        project_id: Some(project_id),
        url: Some(url.to_string()),
        ts: Some(WireTimestamp::Millis(ts)),
        sig: Some(sig),
    }
}

#[test]
fn signed_envelope_verifies_within_window() {
    let verifier = SignatureVerifier::default();
    let envelope = signed_envelope(NOW_MS - 10_000);
    let project = verifier
        .verify(&envelope, Timestamp::from_unix_millis(NOW_MS), lookup)
        .expect("valid signature");
    assert_eq!(project.id, ProjectId::new("p1"));
}

#[test]
fn mutated_signature_fails() {
    let verifier = SignatureVerifier::default();
    let mut envelope = signed_envelope(NOW_MS);
    let sig = envelope.sig.take().expect("signature present");
    let mut bytes = sig.into_bytes();
    // Flip one hex digit.
    bytes[0] = if bytes[0] == b'0' { b'1' } else { b'0' };
    envelope.sig = Some(String::from_utf8(bytes).expect("ascii hex"));

    let result = verifier.verify(&envelope, Timestamp::from_unix_millis(NOW_MS), lookup);
    assert!(matches!(result, Err(SignatureError::Invalid)));
}

#[test]
fn mutated_url_after_signing_fails() {
    let verifier = SignatureVerifier::default();
    let mut envelope = signed_envelope(NOW_MS);
    envelope.url = Some("https://example.com/other".to_string());
    let result = verifier.verify(&envelope, Timestamp::from_unix_millis(NOW_MS), lookup);
    assert!(matches!(result, Err(SignatureError::Invalid)));
}

#[test]
fn mutated_project_id_after_signing_fails() {
    let verifier = SignatureVerifier::default();
    let other = Project {
        id: ProjectId::new("p2"),
        ..project()
    };
    let mut envelope = signed_envelope(NOW_MS);
    envelope.project_id = Some(ProjectId::new("p2"));
    let result = verifier.verify(&envelope, Timestamp::from_unix_millis(NOW_MS), move |_| {
        Ok(Some(other))
    });
    assert!(matches!(result, Err(SignatureError::Invalid)));
}

#[test]
fn stale_timestamp_is_rejected_as_replay() {
    let verifier = SignatureVerifier::new(300_000);
    let envelope = signed_envelope(NOW_MS - 400_000);
    let result = verifier.verify(&envelope, Timestamp::from_unix_millis(NOW_MS), lookup);
    assert!(matches!(result, Err(SignatureError::Expired)));
}

#[test]
fn future_timestamp_outside_window_is_rejected() {
    let verifier = SignatureVerifier::new(300_000);
    let envelope = signed_envelope(NOW_MS + 400_000);
    let result = verifier.verify(&envelope, Timestamp::from_unix_millis(NOW_MS), lookup);
    assert!(matches!(result, Err(SignatureError::Expired)));
}

#[test]
fn non_numeric_timestamp_is_rejected() {
    let verifier = SignatureVerifier::default();
    let mut envelope = signed_envelope(NOW_MS);
    envelope.ts = Some(WireTimestamp::Text("soon".to_string()));
    let result = verifier.verify(&envelope, Timestamp::from_unix_millis(NOW_MS), lookup);
    assert!(matches!(result, Err(SignatureError::Expired)));
}

#[test]
fn each_missing_field_is_reported() {
    let verifier = SignatureVerifier::default();
    let now = Timestamp::from_unix_millis(NOW_MS);

    let mut envelope = signed_envelope(NOW_MS);
    envelope.project_id = None;
    assert!(matches!(
        verifier.verify(&envelope, now, lookup),
        Err(SignatureError::Missing("projectId"))
    ));

    let mut envelope = signed_envelope(NOW_MS);
    envelope.url = None;
    assert!(matches!(
        verifier.verify(&envelope, now, lookup),
        Err(SignatureError::Missing("url"))
    ));

    let mut envelope = signed_envelope(NOW_MS);
    envelope.ts = None;
    assert!(matches!(
        verifier.verify(&envelope, now, lookup),
        Err(SignatureError::Missing("_ts"))
    ));

    let mut envelope = signed_envelope(NOW_MS);
    envelope.sig = None;
    assert!(matches!(
        verifier.verify(&envelope, now, lookup),
        Err(SignatureError::Missing("_sig"))
    ));
}

#[test]
fn unknown_project_is_rejected() {
    let verifier = SignatureVerifier::default();
    let mut envelope = signed_envelope(NOW_MS);
    envelope.project_id = Some(ProjectId::new("ghost"));
    let result = verifier.verify(&envelope, Timestamp::from_unix_millis(NOW_MS), lookup);
    assert!(matches!(result, Err(SignatureError::InvalidProject)));
}

#[test]
fn envelope_deserializes_from_sdk_payload() {
    let payload = serde_json::json!({
        "projectId": "p1",
        "url": "https://example.com/",
        "userAgent": "Mozilla/5.0",
        "_ts": NOW_MS,
        "_sig": "deadbeef"
    });
    let envelope: RequestEnvelope = serde_json::from_value(payload).expect("deserialize");
    assert_eq!(envelope.project_id, Some(ProjectId::new("p1")));
    assert_eq!(envelope.ts, Some(WireTimestamp::Millis(NOW_MS)));
}
