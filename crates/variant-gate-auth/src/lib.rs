// crates/variant-gate-auth/src/lib.rs
// ============================================================================
// Module: Variant Gate Auth Library
// Description: Request-authentication layer for the tracker API.
// Purpose: Expose origin validation and HMAC request-signature verification.
// Dependencies: crate::{origin, signature}
// ============================================================================

//! ## Overview
//! Every assignment decision trusts only input that has passed this layer:
//! per-project origin allow-listing plus HMAC-SHA256 request signing with a
//! bounded replay window. Both checks are fail-closed pure predicates;
//! callers are responsible for logging rejections.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod origin;
pub mod signature;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use origin::OriginPattern;
pub use origin::OriginValidator;
pub use signature::DEFAULT_SIGNATURE_WINDOW_MS;
pub use signature::RequestEnvelope;
pub use signature::SignatureError;
pub use signature::SignatureVerifier;
pub use signature::sign_payload;
pub use signature::signature_payload;
