// crates/variant-gate-sdk/src/apply.rs
// ============================================================================
// Module: Creative Apply Plan
// Description: Turns a selected creative into page mutations.
// Purpose: Gate operator-authored JavaScript behind an explicit capability.
// Dependencies: variant-gate-core
// ============================================================================

//! ## Overview
//! An [`ApplyPlan`] describes what a selected creative changes on the page:
//! CSS to inject into the head and JavaScript to run. The plan never runs
//! anything itself. CSS is handed out exactly once, and JavaScript only
//! crosses into execution through a caller-supplied [`CreativeScriptHost`].
//! Security posture: creative payloads are operator-authored code; supplying
//! a script host is the explicit decision to execute it.

// ============================================================================
// SECTION: Imports
// ============================================================================

use variant_gate_core::SelectedCreative;

// ============================================================================
// SECTION: Script Host Capability
// ============================================================================

/// Capability for executing a creative's JavaScript payload.
///
/// Implementations decide where and how the script runs (browser bridge,
/// embedded engine, test recorder). Without an implementation the script is
/// simply never executed.
pub trait CreativeScriptHost {
    /// Executes one JavaScript payload.
    fn execute(&mut self, javascript: &str);
}

// ============================================================================
// SECTION: Apply Plan
// ============================================================================

/// Pending page mutations for a selected creative.
///
/// # Invariants
/// - An original creative produces an empty plan; the page stays untouched.
/// - Each payload is consumed at most once.
#[derive(Debug, Default)]
pub struct ApplyPlan {
    /// CSS pending head injection.
    css: Option<String>,
    /// JavaScript pending execution through a script host.
    javascript: Option<String>,
}

impl ApplyPlan {
    /// Builds the plan for a selected creative.
    #[must_use]
    pub fn for_creative(creative: &SelectedCreative) -> Self {
        if creative.is_original {
            return Self::default();
        }
        Self {
            css: (!creative.css.is_empty()).then(|| creative.css.clone()),
            javascript: (!creative.javascript.is_empty()).then(|| creative.javascript.clone()),
        }
    }

    /// Returns true when the plan mutates nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.css.is_none() && self.javascript.is_none()
    }

    /// Takes the CSS payload for head injection. Subsequent calls return
    /// `None`, so a retry loop cannot inject the style twice.
    pub fn take_css(&mut self) -> Option<String> {
        self.css.take()
    }

    /// Runs the JavaScript payload through the given host, consuming it.
    /// Returns true when a script was executed.
    pub fn run_script(&mut self, host: &mut dyn CreativeScriptHost) -> bool {
        match self.javascript.take() {
            Some(javascript) => {
                host.execute(&javascript);
                true
            }
            None => false,
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

    use super::*;

    /// Records executed scripts instead of running them.
    #[derive(Default)]
    struct RecordingHost {
        /// Scripts passed to the host in order.
        executed: Vec<String>,
    }

    impl CreativeScriptHost for RecordingHost {
        fn execute(&mut self, javascript: &str) {
            self.executed.push(javascript.to_string());
        }
    }

    fn creative(is_original: bool, css: &str, javascript: &str) -> SelectedCreative {
        SelectedCreative {
            index: 1,
            name: "variant".to_string(),
            css: css.to_string(),
            javascript: javascript.to_string(),
            is_original,
        }
    }

    #[test]
    fn original_creative_produces_empty_plan() {
        let mut plan = ApplyPlan::for_creative(&creative(true, "h1 {}", "alert(1)"));
        assert!(plan.is_empty());
        assert!(plan.take_css().is_none());
        let mut host = RecordingHost::default();
        assert!(!plan.run_script(&mut host));
        assert!(host.executed.is_empty());
    }

    #[test]
    fn css_is_handed_out_exactly_once() {
        let mut plan = ApplyPlan::for_creative(&creative(false, "h1 { color: red }", ""));
        assert_eq!(plan.take_css().as_deref(), Some("h1 { color: red }"));
        assert!(plan.take_css().is_none());
    }

    #[test]
    fn script_runs_only_through_the_host() {
        let mut plan = ApplyPlan::for_creative(&creative(false, "", "console.log('v')"));
        let mut host = RecordingHost::default();
        assert!(plan.run_script(&mut host));
        assert_eq!(host.executed, vec!["console.log('v')".to_string()]);
        // Consumed; a second run is a no-op.
        assert!(!plan.run_script(&mut host));
    }

    #[test]
    fn empty_payloads_are_not_planned() {
        let plan = ApplyPlan::for_creative(&creative(false, "", ""));
        assert!(plan.is_empty());
    }
}
