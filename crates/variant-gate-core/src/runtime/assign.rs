// crates/variant-gate-core/src/runtime/assign.rs
// ============================================================================
// Module: Variant Gate Assignment Orchestrator
// Description: End-to-end experiment assignment for a visitor request.
// Purpose: Filter active experiments, match conditions, select a creative.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! The orchestrator ties the runtime pieces together: it loads the active
//! experiments for a project, filters them by date window and target/exclude
//! URL rules, applies the condition matcher, and runs the creative selector
//! on the first surviving experiment (first-match-wins, not best-match).
//!
//! ## Invariants
//! - Experiments are evaluated in stored order; evaluation stops at the
//!   first match.
//! - Malformed visitor input degrades to the `other`/empty categories; only
//!   store failures surface as errors.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::core::AssignmentResult;
use crate::core::Experiment;
use crate::core::MatchedAssignment;
use crate::core::ProjectId;
use crate::core::SelectedCreative;
use crate::core::Timestamp;
use crate::core::VisitorContext;
use crate::interfaces::ExperimentStore;
use crate::interfaces::StoreError;
use crate::runtime::conditions::ConditionContext;
use crate::runtime::conditions::matches_conditions;
use crate::runtime::device::classify_device;
use crate::runtime::selector::select_creative;
use crate::runtime::url_match::match_url;

// ============================================================================
// SECTION: Assignment Engine
// ============================================================================

/// Stateless assignment engine over an experiment store.
///
/// One engine instance serves all requests; there is no per-visitor state on
/// the server side. Sticky sessions live entirely in the client cache, so
/// two concurrent first visits may both receive fresh assignments — an
/// accepted race, not a server-enforced invariant.
#[derive(Debug, Clone, Copy, Default)]
pub struct AssignmentEngine;

impl AssignmentEngine {
    /// Creates an assignment engine.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Executes an assignment request for a visitor context.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] only for store failures; unmatched visitors
    /// yield [`AssignmentResult::Unmatched`].
    pub fn execute(
        &self,
        store: &dyn ExperimentStore,
        project_id: &ProjectId,
        context: &VisitorContext,
        now: Timestamp,
    ) -> Result<AssignmentResult, StoreError> {
        let experiments = store.find_active_experiments(project_id)?;
        if experiments.is_empty() {
            return Ok(AssignmentResult::Unmatched);
        }

        let device = classify_device(&context.user_agent);
        let condition_context = ConditionContext {
            device: device.as_str(),
            browser: &context.browser,
            os: &context.os,
            language: &context.language,
            visit_count: context.visit_count,
            referrer: &context.referrer,
        };

        for experiment in &experiments {
            if !experiment_applies(experiment, &condition_context, &context.url, now) {
                continue;
            }
            return Ok(assign_creative(experiment));
        }
        Ok(AssignmentResult::Unmatched)
    }

    /// Builds a forced assignment for a specific creative position,
    /// bypassing targeting (preview mode).
    ///
    /// Returns `None` when the position is out of range.
    #[must_use]
    pub fn force(experiment: &Experiment, creative_index: u32) -> Option<AssignmentResult> {
        let creative = experiment.creatives.get(creative_index as usize)?;
        Some(AssignmentResult::Matched(MatchedAssignment {
            abtest_id: experiment.id.clone(),
            abtest_name: experiment.name.clone(),
            session_duration: experiment.session_duration,
            creative: SelectedCreative::from_position(creative_index, creative),
        }))
    }
}

/// Applies date-window, URL, and condition filters to one experiment.
fn experiment_applies(
    experiment: &Experiment,
    context: &ConditionContext<'_>,
    url: &str,
    now: Timestamp,
) -> bool {
    if !experiment.window_contains(now) {
        return false;
    }
    if !experiment.target_url.is_empty() && !match_url(url, &experiment.target_url) {
        return false;
    }
    if !experiment.exclude_url.is_empty() && match_url(url, &experiment.exclude_url) {
        return false;
    }
    matches_conditions(&experiment.conditions, context)
}

/// Runs the selector over a matched experiment's creatives.
fn assign_creative(experiment: &Experiment) -> AssignmentResult {
    select_creative(&experiment.creatives).map_or(AssignmentResult::Unmatched, |(index, creative)| {
        AssignmentResult::Matched(MatchedAssignment {
            abtest_id: experiment.id.clone(),
            abtest_name: experiment.name.clone(),
            session_duration: experiment.session_duration,
            creative: SelectedCreative::from_position(index, creative),
        })
    })
}
