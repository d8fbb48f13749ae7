// crates/variant-gate-store-sqlite/src/store.rs
// ============================================================================
// Module: SQLite Experiment Store
// Description: Durable ExperimentStore backed by SQLite WAL.
// Purpose: Persist projects, experiments, and the impression log.
// Dependencies: variant-gate-core, rusqlite, serde_json, thiserror
// ============================================================================

//! ## Overview
//! This module implements a durable [`ExperimentStore`] using `SQLite`.
//! Experiments are stored as JSON documents; the project id and active flag
//! are lifted into indexed columns so assignment reads stay cheap. Loads fail
//! closed: a row whose JSON cannot be decoded is a corruption error, never a
//! silently skipped experiment. Security posture: database contents are
//! untrusted input and are validated on every read.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use rusqlite::Connection;
use rusqlite::OpenFlags;
use rusqlite::OptionalExtension;
use rusqlite::params;
use serde::Deserialize;
use thiserror::Error;
use variant_gate_core::Experiment;
use variant_gate_core::ExperimentId;
use variant_gate_core::ExperimentStore;
use variant_gate_core::ImpressionRecord;
use variant_gate_core::Project;
use variant_gate_core::ProjectId;
use variant_gate_core::StoreError;
use variant_gate_core::Timestamp;
use variant_gate_core::VisitorId;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// `SQLite` schema version for the store.
const SCHEMA_VERSION: i64 = 1;
/// Default busy timeout (ms).
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum serialized experiment document size accepted by the store.
pub const MAX_EXPERIMENT_BYTES: usize = 1024 * 1024;

// ============================================================================
// SECTION: Config
// ============================================================================

/// Configuration for the `SQLite` experiment store.
///
/// # Invariants
/// - `path` must resolve to a file path (not a directory).
/// - `busy_timeout_ms` is interpreted as milliseconds.
#[derive(Debug, Clone, Deserialize)]
pub struct SqliteStoreConfig {
    /// Path to the `SQLite` database file.
    pub path: PathBuf,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

/// Returns the default busy timeout for `SQLite` connections.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// `SQLite` store errors.
///
/// # Invariants
/// - Error messages avoid embedding raw experiment payloads.
#[derive(Debug, Error, Clone)]
pub enum SqliteStoreError {
    /// Store I/O error.
    #[error("sqlite store io error: {0}")]
    Io(String),
    /// `SQLite` engine error.
    #[error("sqlite store db error: {0}")]
    Db(String),
    /// Stored data could not be decoded.
    #[error("sqlite store corruption: {0}")]
    Corrupt(String),
    /// Store schema version mismatch.
    #[error("sqlite store version mismatch: {0}")]
    VersionMismatch(String),
    /// Invalid store data or configuration.
    #[error("sqlite store invalid data: {0}")]
    Invalid(String),
}

impl From<SqliteStoreError> for StoreError {
    fn from(error: SqliteStoreError) -> Self {
        match error {
            SqliteStoreError::Corrupt(message) => Self::Corrupt(message),
            SqliteStoreError::Io(message)
            | SqliteStoreError::Db(message)
            | SqliteStoreError::VersionMismatch(message)
            | SqliteStoreError::Invalid(message) => Self::Backend(message),
        }
    }
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// `SQLite`-backed experiment store with WAL support.
///
/// # Invariants
/// - Connection access is serialized through a mutex.
/// - `find_active_experiments` returns rows in insertion (rowid) order so the
///   orchestrator's first-match-wins semantics hold.
pub struct SqliteExperimentStore {
    /// Shared connection guarded by a mutex.
    connection: Mutex<Connection>,
}

impl SqliteExperimentStore {
    /// Opens an `SQLite`-backed experiment store.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the database cannot be opened or
    /// initialized.
    pub fn new(config: &SqliteStoreConfig) -> Result<Self, SqliteStoreError> {
        validate_store_path(&config.path)?;
        ensure_parent_dir(&config.path)?;
        let mut connection = open_connection(config)?;
        initialize_schema(&mut connection)?;
        Ok(Self {
            connection: Mutex::new(connection),
        })
    }

    /// Inserts or replaces a project by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the write fails.
    pub fn upsert_project(&self, project: &Project) -> Result<(), SqliteStoreError> {
        let origins_json = serde_json::to_string(&project.allowed_origins)
            .map_err(|err| SqliteStoreError::Invalid(err.to_string()))?;
        let guard = self.lock_connection()?;
        guard
            .execute(
                "INSERT INTO projects (project_id, api_key, url, allowed_origins_json)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT (project_id) DO UPDATE SET
                     api_key = excluded.api_key,
                     url = excluded.url,
                     allowed_origins_json = excluded.allowed_origins_json",
                params![project.id.as_str(), project.api_key, project.url, origins_json],
            )
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        Ok(())
    }

    /// Inserts or replaces an experiment by identifier.
    ///
    /// An existing row keeps its rowid, so replacing an experiment does not
    /// change its position in first-match-wins evaluation.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when serialization or the write fails.
    pub fn upsert_experiment(&self, experiment: &Experiment) -> Result<(), SqliteStoreError> {
        let payload = serde_json::to_string(experiment)
            .map_err(|err| SqliteStoreError::Invalid(err.to_string()))?;
        if payload.len() > MAX_EXPERIMENT_BYTES {
            return Err(SqliteStoreError::Invalid(format!(
                "experiment document exceeds {MAX_EXPERIMENT_BYTES} bytes"
            )));
        }
        let guard = self.lock_connection()?;
        guard
            .execute(
                "INSERT INTO experiments (abtest_id, project_id, active, payload_json)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT (abtest_id) DO UPDATE SET
                     project_id = excluded.project_id,
                     active = excluded.active,
                     payload_json = excluded.payload_json",
                params![
                    experiment.id.as_str(),
                    experiment.project_id.as_str(),
                    i64::from(experiment.active),
                    payload
                ],
            )
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        Ok(())
    }

    /// Returns the recorded impressions in insertion order, optionally
    /// filtered by project.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the query fails or a row is corrupt.
    pub fn list_impressions(
        &self,
        project_id: Option<&ProjectId>,
    ) -> Result<Vec<ImpressionRecord>, SqliteStoreError> {
        let guard = self.lock_connection()?;
        let mut stmt = guard
            .prepare(
                "SELECT project_id, abtest_id, user_id, creative_index, creative_name,
                        is_original, url, user_agent, language, recorded_at
                 FROM impressions
                 WHERE ?1 IS NULL OR project_id = ?1
                 ORDER BY id ASC",
            )
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        let rows = stmt
            .query_map(params![project_id.map(ProjectId::as_str)], decode_impression_row)
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        let mut results = Vec::new();
        for row in rows {
            let raw = row.map_err(|err| SqliteStoreError::Db(err.to_string()))?;
            results.push(build_impression(raw)?);
        }
        Ok(results)
    }

    /// Acquires the connection mutex.
    fn lock_connection(&self) -> Result<std::sync::MutexGuard<'_, Connection>, SqliteStoreError> {
        self.connection
            .lock()
            .map_err(|_| SqliteStoreError::Db("sqlite mutex poisoned".to_string()))
    }

    /// Fetches and decodes a project row by identifier.
    fn fetch_project(
        guard: &Connection,
        project_id: &ProjectId,
    ) -> Result<Option<Project>, SqliteStoreError> {
        let row: Option<(String, String, String, String)> = guard
            .query_row(
                "SELECT project_id, api_key, url, allowed_origins_json
                 FROM projects WHERE project_id = ?1",
                params![project_id.as_str()],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )
            .optional()
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        let Some((id, api_key, url, origins_json)) = row else {
            return Ok(None);
        };
        let allowed_origins: Vec<String> = serde_json::from_str(&origins_json)
            .map_err(|err| SqliteStoreError::Corrupt(format!("project {id}: {err}")))?;
        Ok(Some(Project {
            id: ProjectId::new(id),
            api_key,
            url,
            allowed_origins,
        }))
    }

    /// Decodes an experiment document and checks key consistency.
    fn decode_experiment(
        abtest_id: &str,
        payload_json: &str,
    ) -> Result<Experiment, SqliteStoreError> {
        let experiment: Experiment = serde_json::from_str(payload_json)
            .map_err(|err| SqliteStoreError::Corrupt(format!("experiment {abtest_id}: {err}")))?;
        if experiment.id.as_str() != abtest_id {
            return Err(SqliteStoreError::Corrupt(format!(
                "abtest_id mismatch between key and payload for {abtest_id}"
            )));
        }
        Ok(experiment)
    }
}

impl ExperimentStore for SqliteExperimentStore {
    fn find_active_experiments(
        &self,
        project_id: &ProjectId,
    ) -> Result<Vec<Experiment>, StoreError> {
        let guard = self.lock_connection().map_err(StoreError::from)?;
        let mut stmt = guard
            .prepare(
                "SELECT abtest_id, payload_json FROM experiments
                 WHERE project_id = ?1 AND active = 1
                 ORDER BY rowid ASC",
            )
            .map_err(|err| StoreError::Backend(err.to_string()))?;
        let rows = stmt
            .query_map(params![project_id.as_str()], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })
            .map_err(|err| StoreError::Backend(err.to_string()))?;
        let mut results = Vec::new();
        for row in rows {
            let (abtest_id, payload_json) =
                row.map_err(|err| StoreError::Backend(err.to_string()))?;
            results.push(
                Self::decode_experiment(&abtest_id, &payload_json).map_err(StoreError::from)?,
            );
        }
        Ok(results)
    }

    fn find_project(&self, project_id: &ProjectId) -> Result<Option<Project>, StoreError> {
        let guard = self.lock_connection().map_err(StoreError::from)?;
        Self::fetch_project(&guard, project_id).map_err(StoreError::from)
    }

    fn find_project_by_credentials(
        &self,
        project_id: &ProjectId,
        api_key: &str,
    ) -> Result<Option<Project>, StoreError> {
        let guard = self.lock_connection().map_err(StoreError::from)?;
        let project = Self::fetch_project(&guard, project_id).map_err(StoreError::from)?;
        Ok(project.filter(|project| project.api_key == api_key))
    }

    fn find_experiment(&self, abtest_id: &ExperimentId) -> Result<Option<Experiment>, StoreError> {
        let guard = self.lock_connection().map_err(StoreError::from)?;
        let payload: Option<String> = guard
            .query_row(
                "SELECT payload_json FROM experiments WHERE abtest_id = ?1",
                params![abtest_id.as_str()],
                |row| row.get(0),
            )
            .optional()
            .map_err(|err| StoreError::Backend(err.to_string()))?;
        payload
            .map(|payload_json| Self::decode_experiment(abtest_id.as_str(), &payload_json))
            .transpose()
            .map_err(StoreError::from)
    }

    fn record_impression(&self, record: &ImpressionRecord) -> Result<(), StoreError> {
        let guard = self.lock_connection().map_err(StoreError::from)?;
        guard
            .execute(
                "INSERT INTO impressions (project_id, abtest_id, user_id, creative_index,
                     creative_name, is_original, url, user_agent, language, recorded_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    record.project_id.as_str(),
                    record.abtest_id.as_str(),
                    record.user_id.as_str(),
                    i64::from(record.creative_index),
                    record.creative_name,
                    i64::from(record.is_original),
                    record.url,
                    record.user_agent,
                    record.language,
                    record.recorded_at.as_unix_millis()
                ],
            )
            .map_err(|err| StoreError::Backend(err.to_string()))?;
        Ok(())
    }
}

// ============================================================================
// SECTION: Row Decoding
// ============================================================================

/// Raw impression row before model conversion.
type RawImpressionRow = (String, String, String, i64, String, i64, String, String, String, i64);

/// Maps an impression row into its raw tuple form.
fn decode_impression_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawImpressionRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
        row.get(7)?,
        row.get(8)?,
        row.get(9)?,
    ))
}

/// Converts a raw impression row into an [`ImpressionRecord`].
fn build_impression(raw: RawImpressionRow) -> Result<ImpressionRecord, SqliteStoreError> {
    let (
        project_id,
        abtest_id,
        user_id,
        creative_index,
        creative_name,
        is_original,
        url,
        user_agent,
        language,
        recorded_at,
    ) = raw;
    let creative_index = u32::try_from(creative_index).map_err(|_| {
        SqliteStoreError::Corrupt(format!("negative creative_index for abtest {abtest_id}"))
    })?;
    Ok(ImpressionRecord {
        project_id: ProjectId::new(project_id),
        abtest_id: ExperimentId::new(abtest_id),
        user_id: VisitorId::new(user_id),
        creative_index,
        creative_name,
        is_original: is_original != 0,
        url,
        user_agent,
        language,
        recorded_at: Timestamp::from_unix_millis(recorded_at),
    })
}

// ============================================================================
// SECTION: Connection Setup
// ============================================================================

/// Creates the parent directory for the store path if needed.
fn ensure_parent_dir(path: &Path) -> Result<(), SqliteStoreError> {
    let Some(parent) = path.parent() else {
        return Err(SqliteStoreError::Io("store path missing parent directory".to_string()));
    };
    std::fs::create_dir_all(parent).map_err(|err| SqliteStoreError::Io(err.to_string()))
}

/// Validates store paths for safety limits.
fn validate_store_path(path: &Path) -> Result<(), SqliteStoreError> {
    if path.as_os_str().is_empty() {
        return Err(SqliteStoreError::Invalid("store path must not be empty".to_string()));
    }
    let path_string = path.display().to_string();
    if path_string.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(SqliteStoreError::Invalid("store path exceeds length limit".to_string()));
    }
    for component in path.components() {
        let name = component.as_os_str().to_string_lossy();
        if name.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(SqliteStoreError::Invalid(
                "store path contains an overlong component".to_string(),
            ));
        }
    }
    if path.exists() && path.is_dir() {
        return Err(SqliteStoreError::Invalid(
            "store path must be a file, not a directory".to_string(),
        ));
    }
    Ok(())
}

/// Opens an `SQLite` connection with secure defaults.
fn open_connection(config: &SqliteStoreConfig) -> Result<Connection, SqliteStoreError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
    let connection = Connection::open_with_flags(&config.path, flags)
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    connection
        .execute_batch("PRAGMA foreign_keys = ON; PRAGMA journal_mode = wal;")
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    connection
        .busy_timeout(Duration::from_millis(config.busy_timeout_ms))
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    Ok(connection)
}

/// Initializes the `SQLite` schema or validates the existing version.
fn initialize_schema(connection: &mut Connection) -> Result<(), SqliteStoreError> {
    let tx = connection.transaction().map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    tx.execute_batch("CREATE TABLE IF NOT EXISTS store_meta (version INTEGER NOT NULL);")
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    let version: Option<i64> = tx
        .query_row("SELECT version FROM store_meta LIMIT 1", params![], |row| row.get(0))
        .optional()
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    match version {
        None => {
            tx.execute("INSERT INTO store_meta (version) VALUES (?1)", params![SCHEMA_VERSION])
                .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
            tx.execute_batch(
                "CREATE TABLE IF NOT EXISTS projects (
                    project_id TEXT NOT NULL PRIMARY KEY,
                    api_key TEXT NOT NULL,
                    url TEXT NOT NULL,
                    allowed_origins_json TEXT NOT NULL
                );
                CREATE TABLE IF NOT EXISTS experiments (
                    abtest_id TEXT NOT NULL PRIMARY KEY,
                    project_id TEXT NOT NULL,
                    active INTEGER NOT NULL,
                    payload_json TEXT NOT NULL
                );
                CREATE INDEX IF NOT EXISTS idx_experiments_project_active
                    ON experiments (project_id, active);
                CREATE TABLE IF NOT EXISTS impressions (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    project_id TEXT NOT NULL,
                    abtest_id TEXT NOT NULL,
                    user_id TEXT NOT NULL,
                    creative_index INTEGER NOT NULL,
                    creative_name TEXT NOT NULL,
                    is_original INTEGER NOT NULL,
                    url TEXT NOT NULL,
                    user_agent TEXT NOT NULL,
                    language TEXT NOT NULL,
                    recorded_at INTEGER NOT NULL
                );
                CREATE INDEX IF NOT EXISTS idx_impressions_project
                    ON impressions (project_id, abtest_id);",
            )
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        }
        Some(found) if found == SCHEMA_VERSION => {}
        Some(found) => {
            return Err(SqliteStoreError::VersionMismatch(format!(
                "expected schema version {SCHEMA_VERSION}, found {found}"
            )));
        }
    }
    tx.commit().map_err(|err| SqliteStoreError::Db(err.to_string()))
}
