// crates/variant-gate-core/src/core/time.rs
// ============================================================================
// Module: Variant Gate Time Model
// Description: Canonical timestamp representation for assignments and logs.
// Purpose: Provide explicit time values threaded through the matching engine.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Variant Gate uses explicit unix-millisecond timestamps supplied by
//! callers. The core engine never reads wall-clock time directly; the server
//! resolves `now` once per request and passes it down, which keeps matching
//! deterministic and makes the signature replay window testable.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Time Values
// ============================================================================

/// Unix epoch milliseconds used for date windows, session expiry, and
/// signature replay checks.
///
/// # Invariants
/// - Values are explicitly provided by callers; the core never reads the
///   wall clock.
/// - No validation is performed; monotonicity is a caller responsibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Creates a timestamp from unix epoch milliseconds.
    #[must_use]
    pub const fn from_unix_millis(millis: i64) -> Self {
        Self(millis)
    }

    /// Returns the timestamp as unix epoch milliseconds.
    #[must_use]
    pub const fn as_unix_millis(self) -> i64 {
        self.0
    }

    /// Returns the absolute difference to another timestamp in milliseconds.
    #[must_use]
    pub const fn abs_delta_millis(self, other: Self) -> u64 {
        self.0.abs_diff(other.0)
    }

    /// Returns the timestamp advanced by the given number of minutes,
    /// saturating at the representable bounds.
    #[must_use]
    pub fn saturating_add_minutes(self, minutes: u64) -> Self {
        let millis = i64::try_from(minutes.saturating_mul(60_000)).unwrap_or(i64::MAX);
        Self(self.0.saturating_add(millis))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
