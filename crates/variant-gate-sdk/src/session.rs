// crates/variant-gate-sdk/src/session.rs
// ============================================================================
// Module: Sticky Session Cache
// Description: Per-experiment assignment cache with expiry windows.
// Purpose: Reuse assignments across visits; one impression per window.
// Dependencies: variant-gate-core, serde
// ============================================================================

//! ## Overview
//! [`StickySession`] keeps one cached creative per experiment. Resolving a
//! server result against the cache answers the question the impression
//! logger needs: is this assignment fresh (log it) or a replay of a live
//! session (do not log)? The cache is serializable so a host can persist it
//! between page loads.
//!
//! ## Invariants
//! - A cached entry is honored strictly before `expires_at`; at or after it
//!   the entry is replaced and the assignment counts as fresh again.
//! - Resolving an unmatched result never touches the cache.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;

use serde::Deserialize;
use serde::Serialize;
use variant_gate_core::AssignmentResult;
use variant_gate_core::ExperimentId;
use variant_gate_core::MatchedAssignment;
use variant_gate_core::SelectedCreative;
use variant_gate_core::Timestamp;

// ============================================================================
// SECTION: Session Entry
// ============================================================================

/// One cached assignment for an experiment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionEntry {
    /// Experiment display name at assignment time.
    pub abtest_name: String,
    /// Creative the visitor was assigned.
    pub creative: SelectedCreative,
    /// Instant the entry stops being honored (unix millis).
    pub expires_at: Timestamp,
}

// ============================================================================
// SECTION: Resolution
// ============================================================================

/// Outcome of resolving a server result against the session cache.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// No experiment applied; nothing to show or log.
    None,
    /// A live cached assignment was reused; no impression is due.
    Cached(SessionEntry),
    /// A new assignment was cached; exactly one impression is due.
    Fresh(SessionEntry),
}

impl Resolution {
    /// Returns the entry to apply, if any.
    #[must_use]
    pub const fn entry(&self) -> Option<&SessionEntry> {
        match self {
            Self::None => None,
            Self::Cached(entry) | Self::Fresh(entry) => Some(entry),
        }
    }

    /// Returns true when an impression should be logged for this resolution.
    #[must_use]
    pub const fn impression_due(&self) -> bool {
        matches!(self, Self::Fresh(_))
    }
}

// ============================================================================
// SECTION: Sticky Session
// ============================================================================

/// Client-side sticky session cache keyed by experiment id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StickySession {
    /// Cached entries per experiment.
    #[serde(default)]
    entries: HashMap<ExperimentId, SessionEntry>,
}

impl StickySession {
    /// Creates an empty session cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves a server assignment result against the cache.
    ///
    /// A live cached entry wins over the fresh server result, so a visitor
    /// keeps the creative from their first assignment even if a later draw
    /// would have picked differently.
    pub fn resolve(&mut self, result: &AssignmentResult, now: Timestamp) -> Resolution {
        let Some(assignment) = result.matched() else {
            return Resolution::None;
        };
        if let Some(entry) = self.entries.get(&assignment.abtest_id)
            && now < entry.expires_at
        {
            return Resolution::Cached(entry.clone());
        }
        let entry = Self::fresh_entry(assignment, now);
        self.entries.insert(assignment.abtest_id.clone(), entry.clone());
        Resolution::Fresh(entry)
    }

    /// Returns the live cached entry for an experiment, if any.
    #[must_use]
    pub fn cached(&self, abtest_id: &ExperimentId, now: Timestamp) -> Option<&SessionEntry> {
        self.entries.get(abtest_id).filter(|entry| now < entry.expires_at)
    }

    /// Drops every entry whose window has passed.
    pub fn purge_expired(&mut self, now: Timestamp) {
        self.entries.retain(|_, entry| now < entry.expires_at);
    }

    /// Builds a cache entry expiring one session window from `now`.
    fn fresh_entry(assignment: &MatchedAssignment, now: Timestamp) -> SessionEntry {
        SessionEntry {
            abtest_name: assignment.abtest_name.clone(),
            creative: assignment.creative.clone(),
            expires_at: now.saturating_add_minutes(assignment.session_duration),
        }
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

    use variant_gate_core::ExperimentId;

    use super::*;

    const NOW_MS: i64 = 1_700_000_000_000;

    fn matched(duration_minutes: u64) -> AssignmentResult {
        AssignmentResult::Matched(MatchedAssignment {
            abtest_id: ExperimentId::new("e1"),
            abtest_name: "hero test".to_string(),
            session_duration: duration_minutes,
            creative: SelectedCreative {
                index: 1,
                name: "variant".to_string(),
                css: "h1 { color: red }".to_string(),
                javascript: String::new(),
                is_original: false,
            },
        })
    }

    #[test]
    fn unmatched_result_resolves_to_none() {
        let mut session = StickySession::new();
        let resolution = session.resolve(
            &AssignmentResult::Unmatched,
            Timestamp::from_unix_millis(NOW_MS),
        );
        assert_eq!(resolution, Resolution::None);
        assert!(!resolution.impression_due());
    }

    #[test]
    fn fresh_entry_expires_one_window_from_now() {
        let mut session = StickySession::new();
        let now = Timestamp::from_unix_millis(NOW_MS);
        let resolution = session.resolve(&matched(720), now);

        let entry = resolution.entry().expect("entry");
        assert_eq!(entry.expires_at, Timestamp::from_unix_millis(NOW_MS + 720 * 60_000));
        assert!(resolution.impression_due());
    }

    #[test]
    fn expired_entry_is_replaced_and_counts_as_fresh() {
        let mut session = StickySession::new();
        session.resolve(&matched(10), Timestamp::from_unix_millis(NOW_MS));

        let later = Timestamp::from_unix_millis(NOW_MS + 10 * 60_000);
        let resolution = session.resolve(&matched(10), later);
        assert!(resolution.impression_due());
        let entry = resolution.entry().expect("entry");
        assert_eq!(entry.expires_at, Timestamp::from_unix_millis(NOW_MS + 20 * 60_000));
    }

    #[test]
    fn persisted_cache_keeps_honoring_live_entries() {
        let mut session = StickySession::new();
        let now = Timestamp::from_unix_millis(NOW_MS);
        session.resolve(&matched(720), now);

        let persisted = serde_json::to_string(&session).expect("serialize");
        let mut restored: StickySession = serde_json::from_str(&persisted).expect("deserialize");

        let later = Timestamp::from_unix_millis(NOW_MS + 60_000);
        let resolution = restored.resolve(&matched(720), later);
        assert!(!resolution.impression_due());
        assert_eq!(resolution.entry().expect("entry").creative.name, "variant");
    }

    #[test]
    fn purge_drops_only_expired_entries() {
        let mut session = StickySession::new();
        session.resolve(&matched(10), Timestamp::from_unix_millis(NOW_MS));

        session.purge_expired(Timestamp::from_unix_millis(NOW_MS + 60_000));
        assert!(session.cached(&ExperimentId::new("e1"), Timestamp::from_unix_millis(NOW_MS)).is_some());

        session.purge_expired(Timestamp::from_unix_millis(NOW_MS + 11 * 60_000));
        assert!(session.cached(&ExperimentId::new("e1"), Timestamp::from_unix_millis(NOW_MS)).is_none());
    }
}
