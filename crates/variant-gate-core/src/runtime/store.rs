// crates/variant-gate-core/src/runtime/store.rs
// ============================================================================
// Module: Variant Gate In-Memory Store
// Description: In-memory ExperimentStore for tests and local runs.
// Purpose: Provide a deterministic store without external dependencies.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! [`InMemoryExperimentStore`] keeps projects, experiments, and impressions
//! behind a mutex. Experiments preserve insertion order so the orchestrator's
//! first-match-wins semantics behave exactly as with a durable backend.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Mutex;
use std::sync::PoisonError;

use crate::core::Experiment;
use crate::core::ExperimentId;
use crate::core::Project;
use crate::core::ProjectId;
use crate::interfaces::ExperimentStore;
use crate::interfaces::ImpressionRecord;
use crate::interfaces::StoreError;

// ============================================================================
// SECTION: In-Memory Store
// ============================================================================

/// Mutable in-memory state behind the store mutex.
#[derive(Debug, Default)]
struct Inner {
    /// Registered projects.
    projects: Vec<Project>,
    /// Experiments in insertion order.
    experiments: Vec<Experiment>,
    /// Append-only impression log.
    impressions: Vec<ImpressionRecord>,
}

/// In-memory [`ExperimentStore`] used by tests and local runs.
#[derive(Debug, Default)]
pub struct InMemoryExperimentStore {
    /// Guarded store state; lock poisoning is recovered because the state
    /// is only ever mutated by appends and replacements.
    inner: Mutex<Inner>,
}

impl InMemoryExperimentStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a project by identifier.
    pub fn upsert_project(&self, project: Project) {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = inner.projects.iter_mut().find(|p| p.id == project.id) {
            *existing = project;
        } else {
            inner.projects.push(project);
        }
    }

    /// Inserts or replaces an experiment by identifier, preserving order.
    pub fn upsert_experiment(&self, experiment: Experiment) {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = inner.experiments.iter_mut().find(|e| e.id == experiment.id) {
            *existing = experiment;
        } else {
            inner.experiments.push(experiment);
        }
    }

    /// Returns a snapshot of the recorded impressions.
    #[must_use]
    pub fn impressions(&self) -> Vec<ImpressionRecord> {
        let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.impressions.clone()
    }
}

impl ExperimentStore for InMemoryExperimentStore {
    fn find_active_experiments(
        &self,
        project_id: &ProjectId,
    ) -> Result<Vec<Experiment>, StoreError> {
        let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(inner
            .experiments
            .iter()
            .filter(|experiment| experiment.active && &experiment.project_id == project_id)
            .cloned()
            .collect())
    }

    fn find_project(&self, project_id: &ProjectId) -> Result<Option<Project>, StoreError> {
        let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(inner.projects.iter().find(|project| &project.id == project_id).cloned())
    }

    fn find_project_by_credentials(
        &self,
        project_id: &ProjectId,
        api_key: &str,
    ) -> Result<Option<Project>, StoreError> {
        let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(inner
            .projects
            .iter()
            .find(|project| &project.id == project_id && project.api_key == api_key)
            .cloned())
    }

    fn find_experiment(&self, abtest_id: &ExperimentId) -> Result<Option<Experiment>, StoreError> {
        let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(inner.experiments.iter().find(|experiment| &experiment.id == abtest_id).cloned())
    }

    fn record_impression(&self, record: &ImpressionRecord) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.impressions.push(record.clone());
        Ok(())
    }
}
