// crates/variant-gate-core/src/core/experiment.rs
// ============================================================================
// Module: Variant Gate Experiment Model
// Description: Projects, A/B experiments, condition sets, and creatives.
// Purpose: Define the entities the assignment engine evaluates.
// Dependencies: crate::core::{identifiers, time}, serde
// ============================================================================

//! ## Overview
//! An [`Experiment`] groups a condition set and an ordered creative list
//! under an owning [`Project`]. Condition kinds form a closed enum matched
//! exhaustively by the runtime, so an unknown condition string fails at
//! deserialization instead of silently evaluating to "no match".
//!
//! ## Invariants
//! - An experiment carries at least one creative at creation time.
//! - Creative identity is positional: `creative_index` is the stable key
//!   referenced by impression logs, so reordering or removing creatives
//!   reinterprets historical rows. This is a documented limitation of the
//!   wire contract, preserved as-is.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::ExperimentId;
use crate::core::identifiers::ProjectId;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default sticky-session duration in minutes (12 hours).
pub const DEFAULT_SESSION_DURATION_MINUTES: u64 = 720;

/// Returns the default session duration for serde defaults.
const fn default_session_duration() -> u64 {
    DEFAULT_SESSION_DURATION_MINUTES
}

// ============================================================================
// SECTION: Project
// ============================================================================

/// A registered tracker project.
///
/// # Invariants
/// - `api_key` is unique across projects; it is both the SDK credential and
///   the HMAC signing secret for request envelopes.
/// - `allowed_origins` entries are exact origins or `https://*.<domain>`
///   wildcard patterns, evaluated in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    /// Project identifier.
    pub id: ProjectId,
    /// Shared secret used for request signing and credential checks.
    pub api_key: String,
    /// Canonical site domain for the project.
    pub url: String,
    /// Ordered origin allow-list; empty means "defer to the global list".
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

// ============================================================================
// SECTION: Conditions
// ============================================================================

/// Closed set of single-condition operators for a targeting axis entry.
///
/// Replaces the original string-keyed dispatch: unknown operator names fail
/// deserialization instead of falling through to "no match".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConditionKind {
    /// Exact string equality.
    Exact,
    /// Substring containment.
    Contains,
    /// Prefix test.
    StartsWith,
    /// Suffix test.
    EndsWith,
    /// Regular-expression match. A malformed pattern never matches.
    Regex,
    /// Membership in the entry's `values` list.
    OneOf,
    /// Negated regular-expression match. A malformed pattern evaluates to a
    /// pass: a broken negative rule behaves as "rule not applicable" rather
    /// than excluding all traffic.
    NotRegex,
    /// Negated prefix test.
    NotStartsWith,
    /// Negated suffix test.
    NotEndsWith,
    /// Negated substring containment.
    NotContains,
    /// Negated membership in the entry's `values` list.
    NotOneOf,
}

/// One entry on a typed targeting axis (device, browser, os, language).
///
/// # Invariants
/// - Entries with an empty `value` are skipped by the matcher.
/// - Within one axis, entries are OR'd; axes with valid entries are AND'd.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AxisRule {
    /// Pattern or literal compared against the context value.
    #[serde(default)]
    pub value: String,
    /// Operator applied to `value`.
    pub condition: ConditionKind,
    /// Membership list for `OneOf`/`NotOneOf` operators.
    #[serde(default)]
    pub values: Vec<String>,
}

/// Visit-count and referrer targeting entry.
///
/// # Invariants
/// - Visit-count and referrer checks are AND'd within one entry.
/// - Multiple entries are AND'd together by the matcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OtherRule {
    /// Minimum visit count; `None` means no threshold (treated as 0).
    #[serde(default)]
    pub visit_count: Option<u32>,
    /// Referrer URL pattern; empty or `None` is vacuously true.
    #[serde(default)]
    pub referrer: Option<String>,
}

/// Structured targeting condition set for an experiment.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionSet {
    /// Device-category axis entries.
    #[serde(default)]
    pub device: Vec<AxisRule>,
    /// Browser-name axis entries.
    #[serde(default)]
    pub browser: Vec<AxisRule>,
    /// Operating-system axis entries.
    #[serde(default)]
    pub os: Vec<AxisRule>,
    /// Language axis entries.
    #[serde(default)]
    pub language: Vec<AxisRule>,
    /// Visit-count / referrer entries.
    #[serde(default)]
    pub other: Vec<OtherRule>,
}

impl ConditionSet {
    /// Returns true when no axis carries any entry.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.device.is_empty()
            && self.browser.is_empty()
            && self.os.is_empty()
            && self.language.is_empty()
            && self.other.is_empty()
    }
}

// ============================================================================
// SECTION: Creatives
// ============================================================================

/// One visual/behavioral variant within an experiment.
///
/// The `css` and `javascript` payloads are operator-authored code applied
/// client-side; executing them is an explicit trust decision surfaced through
/// the SDK's script-host capability boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Creative {
    /// Display name for the variant.
    pub name: String,
    /// Non-negative selection weight; missing weights count as zero.
    #[serde(default)]
    pub distribution: f64,
    /// True when this variant is the unmodified original page.
    #[serde(default)]
    pub is_original: bool,
    /// CSS injected into the page head when the variant is applied.
    #[serde(default)]
    pub css: String,
    /// JavaScript executed when the variant is applied.
    #[serde(default)]
    pub javascript: String,
    /// Optional preview image for the dashboard.
    #[serde(default)]
    pub image_url: Option<String>,
}

// ============================================================================
// SECTION: Experiment
// ============================================================================

/// An A/B experiment owned by a project.
///
/// # Invariants
/// - `creatives` is non-empty at creation time.
/// - Date bounds are open-ended when `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Experiment {
    /// Experiment identifier.
    pub id: ExperimentId,
    /// Owning project.
    pub project_id: ProjectId,
    /// Display name.
    pub name: String,
    /// Whether the experiment participates in assignment.
    #[serde(default)]
    pub active: bool,
    /// Event name counted as a conversion for this experiment.
    #[serde(default)]
    pub cv_code: String,
    /// URL pattern the page must match; empty means "all pages".
    #[serde(default)]
    pub target_url: String,
    /// URL pattern that excludes a page when it matches.
    #[serde(default)]
    pub exclude_url: String,
    /// Inclusive start of the run window (unix millis).
    #[serde(default)]
    pub start_date: Option<Timestamp>,
    /// Inclusive end of the run window (unix millis).
    #[serde(default)]
    pub end_date: Option<Timestamp>,
    /// Sticky-session duration in minutes.
    #[serde(default = "default_session_duration")]
    pub session_duration: u64,
    /// Targeting condition set.
    #[serde(default)]
    pub conditions: ConditionSet,
    /// Ordered creative list; position is the stable creative key.
    pub creatives: Vec<Creative>,
}

impl Experiment {
    /// Returns true when `now` falls inside the experiment's date window.
    #[must_use]
    pub fn window_contains(&self, now: Timestamp) -> bool {
        if let Some(start) = self.start_date
            && now < start
        {
            return false;
        }
        if let Some(end) = self.end_date
            && now > end
        {
            return false;
        }
        true
    }
}

// ============================================================================
// SECTION: Assignment Result
// ============================================================================

/// Creative chosen by the selector, addressed by position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectedCreative {
    /// Position of the creative in the experiment's list.
    pub index: u32,
    /// Creative display name.
    pub name: String,
    /// CSS payload to inject.
    pub css: String,
    /// JavaScript payload to execute.
    pub javascript: String,
    /// True when the variant is the unmodified original.
    pub is_original: bool,
}

impl SelectedCreative {
    /// Builds a selected creative from a list position and its creative.
    #[must_use]
    pub fn from_position(index: u32, creative: &Creative) -> Self {
        Self {
            index,
            name: creative.name.clone(),
            css: creative.css.clone(),
            javascript: creative.javascript.clone(),
            is_original: creative.is_original,
        }
    }
}

/// Matched assignment payload returned to the SDK.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchedAssignment {
    /// Matched experiment identifier.
    pub abtest_id: ExperimentId,
    /// Matched experiment name.
    pub abtest_name: String,
    /// Sticky-session duration in minutes.
    pub session_duration: u64,
    /// Selected creative variant.
    pub creative: SelectedCreative,
}

/// Outcome of an assignment request.
///
/// Serializes as `{"matched": false}` or as the matched payload with
/// `"matched": true`, matching the SDK wire contract exactly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "WireAssignment", try_from = "WireAssignment")]
pub enum AssignmentResult {
    /// No active experiment applied to the visitor.
    Unmatched,
    /// An experiment matched and a creative was selected.
    Matched(MatchedAssignment),
}

impl AssignmentResult {
    /// Returns the matched payload when present.
    #[must_use]
    pub const fn matched(&self) -> Option<&MatchedAssignment> {
        match self {
            Self::Unmatched => None,
            Self::Matched(assignment) => Some(assignment),
        }
    }
}

/// Wire form of [`AssignmentResult`] with an explicit `matched` flag.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireAssignment {
    /// Whether an experiment matched.
    matched: bool,
    /// Matched experiment identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    abtest_id: Option<ExperimentId>,
    /// Matched experiment name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    abtest_name: Option<String>,
    /// Sticky-session duration in minutes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    session_duration: Option<u64>,
    /// Selected creative variant.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    creative: Option<SelectedCreative>,
}

impl From<AssignmentResult> for WireAssignment {
    fn from(result: AssignmentResult) -> Self {
        match result {
            AssignmentResult::Unmatched => Self {
                matched: false,
                abtest_id: None,
                abtest_name: None,
                session_duration: None,
                creative: None,
            },
            AssignmentResult::Matched(assignment) => Self {
                matched: true,
                abtest_id: Some(assignment.abtest_id),
                abtest_name: Some(assignment.abtest_name),
                session_duration: Some(assignment.session_duration),
                creative: Some(assignment.creative),
            },
        }
    }
}

impl TryFrom<WireAssignment> for AssignmentResult {
    type Error = String;

    fn try_from(wire: WireAssignment) -> Result<Self, Self::Error> {
        if !wire.matched {
            return Ok(Self::Unmatched);
        }
        let abtest_id = wire.abtest_id.ok_or("matched result missing abtestId")?;
        let abtest_name = wire.abtest_name.ok_or("matched result missing abtestName")?;
        let session_duration = wire.session_duration.ok_or("matched result missing sessionDuration")?;
        let creative = wire.creative.ok_or("matched result missing creative")?;
        Ok(Self::Matched(MatchedAssignment {
            abtest_id,
            abtest_name,
            session_duration,
            creative,
        }))
    }
}
