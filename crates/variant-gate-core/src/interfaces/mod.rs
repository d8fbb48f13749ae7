// crates/variant-gate-core/src/interfaces/mod.rs
// ============================================================================
// Module: Variant Gate Interfaces
// Description: Backend-agnostic store interfaces for experiments and logs.
// Purpose: Define the persistence contract used by the assignment engine.
// Dependencies: crate::core
// ============================================================================

//! ## Overview
//! Interfaces define how Variant Gate integrates with persistence without
//! embedding backend-specific details. Implementations must be deterministic
//! and fail closed on missing or invalid data: a row that cannot be decoded
//! is an error, never a silently skipped experiment.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::Experiment;
use crate::core::ExperimentId;
use crate::core::Project;
use crate::core::ProjectId;
use crate::core::Timestamp;
use crate::core::VisitorId;

// ============================================================================
// SECTION: Impression Record
// ============================================================================

/// Append-only record that a visitor was shown a creative.
///
/// # Invariants
/// - `creative_index` addresses the experiment's creative list positionally
///   at the time the impression was recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImpressionRecord {
    /// Owning project.
    pub project_id: ProjectId,
    /// Experiment the impression belongs to.
    pub abtest_id: ExperimentId,
    /// Visitor the creative was shown to.
    pub user_id: VisitorId,
    /// Position of the creative in the experiment's list.
    pub creative_index: u32,
    /// Creative display name at recording time.
    pub creative_name: String,
    /// True when the shown variant was the unmodified original.
    pub is_original: bool,
    /// Page URL the impression occurred on.
    pub url: String,
    /// Raw user-agent header of the visitor.
    pub user_agent: String,
    /// Visitor language.
    pub language: String,
    /// Server-side time the impression was recorded.
    pub recorded_at: Timestamp,
}

// ============================================================================
// SECTION: Store Errors
// ============================================================================

/// Errors surfaced by experiment store implementations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Backend I/O or connectivity failure.
    #[error("store backend error: {0}")]
    Backend(String),
    /// A stored row could not be decoded into its model type.
    #[error("store corruption: {0}")]
    Corrupt(String),
}

// ============================================================================
// SECTION: Experiment Store
// ============================================================================

/// Persistence contract for projects, experiments, and impression logs.
///
/// # Invariants
/// - `find_active_experiments` preserves stored order; the orchestrator's
///   first-match-wins semantics depend on it.
/// - `record_impression` is append-only; callers treat it as fire-and-forget.
pub trait ExperimentStore: Send + Sync {
    /// Returns the active experiments for a project in stored order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend fails or rows are corrupt.
    fn find_active_experiments(&self, project_id: &ProjectId) -> Result<Vec<Experiment>, StoreError>;

    /// Looks up a project by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend fails or rows are corrupt.
    fn find_project(&self, project_id: &ProjectId) -> Result<Option<Project>, StoreError>;

    /// Looks up a project by identifier and API key credential.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend fails or rows are corrupt.
    fn find_project_by_credentials(
        &self,
        project_id: &ProjectId,
        api_key: &str,
    ) -> Result<Option<Project>, StoreError>;

    /// Looks up a single experiment by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend fails or rows are corrupt.
    fn find_experiment(&self, abtest_id: &ExperimentId) -> Result<Option<Experiment>, StoreError>;

    /// Appends an impression record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the backend fails.
    fn record_impression(&self, record: &ImpressionRecord) -> Result<(), StoreError>;
}
