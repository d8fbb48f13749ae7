// crates/variant-gate-server/src/server.rs
// ============================================================================
// Module: Variant Gate HTTP Server
// Description: axum routes for assignment, impression logging, and preview.
// Purpose: Authenticate SDK requests and run the assignment engine.
// Dependencies: variant-gate-auth, variant-gate-config, variant-gate-core,
//               variant-gate-store-sqlite, axum, tokio
// ============================================================================

//! ## Overview
//! Three routes make up the wire contract: `POST /api/abtests/execute`
//! (signed assignment), `POST /api/abtests/log-impression` (signed, plus an
//! API-key credential check), and `GET
//! /api/abtests/{abtest_id}/creative/{creative_index}` (unsigned preview).
//! Bodies are size-capped and strictly parsed; signature and origin checks
//! run before any experiment evaluation. Matching work is dispatched through
//! `block_in_place` on the multi-thread runtime so the sync store never
//! stalls the reactor.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use axum::Router;
use axum::body::Bytes;
use axum::extract::Path;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::StatusCode;
use axum::http::header::ORIGIN;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::routing::post;
use serde::Deserialize;
use serde_json::Value;
use serde_json::json;
use variant_gate_auth::OriginValidator;
use variant_gate_auth::RequestEnvelope;
use variant_gate_auth::SignatureError;
use variant_gate_auth::SignatureVerifier;
use variant_gate_auth::signature::WireTimestamp;
use variant_gate_config::StoreBackend;
use variant_gate_config::VariantGateConfig;
use variant_gate_core::AssignmentEngine;
use variant_gate_core::ExperimentId;
use variant_gate_core::ExperimentStore;
use variant_gate_core::ImpressionRecord;
use variant_gate_core::InMemoryExperimentStore;
use variant_gate_core::ProjectId;
use variant_gate_core::StoreError;
use variant_gate_core::Timestamp;
use variant_gate_core::VisitorContext;
use variant_gate_core::VisitorId;
use variant_gate_store_sqlite::SqliteExperimentStore;
use variant_gate_store_sqlite::SqliteStoreConfig;

use crate::audit::AuthAuditEvent;
use crate::audit::AuthAuditSink;
use crate::audit::StderrAuditSink;

// ============================================================================
// SECTION: Server
// ============================================================================

/// Variant Gate HTTP server instance.
pub struct VariantGateServer {
    /// Validated server configuration.
    config: VariantGateConfig,
    /// Shared handler state.
    state: Arc<AppState>,
}

/// Shared state for route handlers.
struct AppState {
    /// Stateless assignment engine.
    engine: AssignmentEngine,
    /// Experiment store backend.
    store: Arc<dyn ExperimentStore>,
    /// HMAC signature verifier.
    verifier: SignatureVerifier,
    /// Origin allow-list validator.
    origins: OriginValidator,
    /// Audit sink for auth rejections.
    audit: Arc<dyn AuthAuditSink>,
    /// Maximum accepted request body size.
    max_body_bytes: usize,
}

impl VariantGateServer {
    /// Builds a server from configuration, constructing the configured store
    /// backend and a stderr audit sink.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError`] when the configuration is invalid or the
    /// store cannot be initialized.
    pub fn from_config(config: VariantGateConfig) -> Result<Self, ServerError> {
        config.validate().map_err(|err| ServerError::Config(err.to_string()))?;
        let store = build_store(&config)?;
        Ok(Self::from_parts(config, store, Arc::new(StderrAuditSink)))
    }

    /// Builds a server from pre-constructed parts. Used by tests to inject a
    /// seeded store and a quiet audit sink.
    #[must_use]
    pub fn from_parts(
        config: VariantGateConfig,
        store: Arc<dyn ExperimentStore>,
        audit: Arc<dyn AuthAuditSink>,
    ) -> Self {
        let state = Arc::new(AppState {
            engine: AssignmentEngine::new(),
            store,
            verifier: SignatureVerifier::new(config.auth.signature_window_ms),
            origins: OriginValidator::new(
                config.auth.allowed_origins.iter().map(String::as_str),
                config.auth.production,
            ),
            audit,
            max_body_bytes: config.server.max_body_bytes,
        });
        Self {
            config,
            state,
        }
    }

    /// Serves the API until the listener fails.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError`] when binding or serving fails.
    pub async fn serve(self) -> Result<(), ServerError> {
        let addr: SocketAddr = self
            .config
            .server
            .bind
            .parse()
            .map_err(|_| ServerError::Config("invalid bind address".to_string()))?;
        let app = router(self.state);
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|_| ServerError::Transport("http bind failed".to_string()))?;
        axum::serve(listener, app)
            .await
            .map_err(|_| ServerError::Transport("http server failed".to_string()))
    }
}

/// Builds the axum router over shared state.
fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/abtests/execute", post(handle_execute))
        .route("/api/abtests/log-impression", post(handle_log_impression))
        .route("/api/abtests/{abtest_id}/creative/{creative_index}", get(handle_preview))
        .with_state(state)
}

/// Builds the experiment store from configuration.
fn build_store(config: &VariantGateConfig) -> Result<Arc<dyn ExperimentStore>, ServerError> {
    match config.store.backend {
        StoreBackend::Memory => Ok(Arc::new(InMemoryExperimentStore::new())),
        StoreBackend::Sqlite => {
            let path = config
                .store
                .path
                .clone()
                .ok_or_else(|| ServerError::Config("sqlite store requires path".to_string()))?;
            let store = SqliteExperimentStore::new(&SqliteStoreConfig {
                path,
                busy_timeout_ms: config.store.busy_timeout_ms,
            })
            .map_err(|err| ServerError::Init(err.to_string()))?;
            Ok(Arc::new(store))
        }
    }
}

// ============================================================================
// SECTION: Wire Types
// ============================================================================

/// Signed assignment request payload.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExecuteRequest {
    /// Claimed project identifier.
    #[serde(default)]
    project_id: Option<ProjectId>,
    /// Page URL covered by the signature.
    #[serde(default)]
    url: Option<String>,
    /// Raw user-agent string.
    #[serde(default)]
    user_agent: String,
    /// Browser name reported by the SDK.
    #[serde(default)]
    browser: String,
    /// Operating system reported by the SDK.
    #[serde(default)]
    os: String,
    /// Visitor language.
    #[serde(default)]
    language: String,
    /// Visit count reported by the SDK.
    #[serde(default)]
    visit_count: u32,
    /// Referrer URL.
    #[serde(default)]
    referrer: String,
    /// Client timestamp in unix milliseconds.
    #[serde(default, rename = "_ts")]
    ts: Option<WireTimestamp>,
    /// Hex-encoded request signature.
    #[serde(default, rename = "_sig")]
    sig: Option<String>,
}

impl ExecuteRequest {
    /// Extracts the signature envelope fields.
    fn envelope(&self) -> RequestEnvelope {
        RequestEnvelope {
            project_id: self.project_id.clone(),
            url: self.url.clone(),
            ts: self.ts.clone(),
            sig: self.sig.clone(),
        }
    }

    /// Builds the visitor context the matcher evaluates.
    fn context(&self) -> VisitorContext {
        VisitorContext {
            user_agent: self.user_agent.clone(),
            browser: self.browser.clone(),
            os: self.os.clone(),
            language: self.language.clone(),
            visit_count: self.visit_count,
            referrer: self.referrer.clone(),
            url: self.url.clone().unwrap_or_default(),
        }
    }
}

/// Signed impression-log request payload.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LogImpressionRequest {
    /// Claimed project identifier.
    #[serde(default)]
    project_id: Option<ProjectId>,
    /// Project API key credential.
    #[serde(default)]
    api_key: String,
    /// Experiment the impression belongs to.
    abtest_id: ExperimentId,
    /// Visitor identifier.
    user_id: VisitorId,
    /// Position of the shown creative.
    creative_index: u32,
    /// Creative display name.
    #[serde(default)]
    creative_name: String,
    /// Whether the shown variant was the original.
    #[serde(default)]
    is_original: bool,
    /// Page URL covered by the signature.
    #[serde(default)]
    url: Option<String>,
    /// Raw user-agent string.
    #[serde(default)]
    user_agent: String,
    /// Visitor language.
    #[serde(default)]
    language: String,
    /// Client timestamp in unix milliseconds.
    #[serde(default, rename = "_ts")]
    ts: Option<WireTimestamp>,
    /// Hex-encoded request signature.
    #[serde(default, rename = "_sig")]
    sig: Option<String>,
}

impl LogImpressionRequest {
    /// Extracts the signature envelope fields.
    fn envelope(&self) -> RequestEnvelope {
        RequestEnvelope {
            project_id: self.project_id.clone(),
            url: self.url.clone(),
            ts: self.ts.clone(),
            sig: self.sig.clone(),
        }
    }

    /// Builds the impression record, stamping server time.
    fn record(&self, project_id: ProjectId, now: Timestamp) -> ImpressionRecord {
        ImpressionRecord {
            project_id,
            abtest_id: self.abtest_id.clone(),
            user_id: self.user_id.clone(),
            creative_index: self.creative_index,
            creative_name: self.creative_name.clone(),
            is_original: self.is_original,
            url: self.url.clone().unwrap_or_default(),
            user_agent: self.user_agent.clone(),
            language: self.language.clone(),
            recorded_at: now,
        }
    }
}

// ============================================================================
// SECTION: Error Taxonomy
// ============================================================================

/// Request-level failures mapped onto HTTP statuses.
#[derive(Debug)]
enum ApiError {
    /// Malformed or oversized request payload (400).
    Validation(String),
    /// Signature verification failure (401).
    Unauthenticated(String),
    /// Origin or credential rejection (403).
    Forbidden(String),
    /// Unknown experiment or creative position (404).
    NotFound(String),
    /// Store backend failure (500).
    Store(String),
}

impl ApiError {
    /// Returns the HTTP status for the error class.
    const fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns the stable wire error code.
    const fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::Unauthenticated(_) => "unauthenticated",
            Self::Forbidden(_) => "forbidden",
            Self::NotFound(_) => "not_found",
            Self::Store(_) => "store",
        }
    }

    /// Builds the status and JSON body for the error.
    fn into_response_parts(self) -> (StatusCode, Value) {
        let message = match &self {
            Self::Validation(message)
            | Self::Unauthenticated(message)
            | Self::Forbidden(message)
            | Self::NotFound(message)
            | Self::Store(message) => message.clone(),
        };
        let body = json!({ "error": { "code": self.code(), "message": message } });
        (self.status(), body)
    }
}

impl From<SignatureError> for ApiError {
    fn from(error: SignatureError) -> Self {
        match error {
            SignatureError::Missing(field) => {
                Self::Validation(format!("missing required field: {field}"))
            }
            SignatureError::Expired | SignatureError::InvalidProject | SignatureError::Invalid => {
                Self::Unauthenticated(error.to_string())
            }
            SignatureError::Store(err) => Self::Store(err.to_string()),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(error: StoreError) -> Self {
        Self::Store(error.to_string())
    }
}

// ============================================================================
// SECTION: Handlers
// ============================================================================

/// Handles signed assignment requests.
async fn handle_execute(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    bytes: Bytes,
) -> impl IntoResponse {
    let origin = header_origin(&headers);
    let (status, body) =
        dispatch_blocking(|| execute_request(&state, origin.as_deref(), &bytes, server_now()));
    (status, axum::Json(body))
}

/// Handles signed impression-log requests.
async fn handle_log_impression(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    bytes: Bytes,
) -> impl IntoResponse {
    let origin = header_origin(&headers);
    let (status, body) = dispatch_blocking(|| {
        log_impression_request(&state, origin.as_deref(), &bytes, server_now())
    });
    (status, axum::Json(body))
}

/// Handles unsigned creative preview requests.
async fn handle_preview(
    State(state): State<Arc<AppState>>,
    Path((abtest_id, creative_index)): Path<(String, u32)>,
) -> impl IntoResponse {
    let (status, body) = dispatch_blocking(|| preview_request(&state, &abtest_id, creative_index));
    (status, axum::Json(body))
}

/// Runs sync handler work, shifting to a blocking context when available.
fn dispatch_blocking<T>(work: impl FnOnce() -> T) -> T {
    match tokio::runtime::Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == tokio::runtime::RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(work)
        }
        _ => work(),
    }
}

/// Extracts the Origin header when present and readable.
fn header_origin(headers: &HeaderMap) -> Option<String> {
    headers.get(ORIGIN).and_then(|value| value.to_str().ok()).map(str::to_string)
}

/// Returns current server time as a [`Timestamp`].
fn server_now() -> Timestamp {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX));
    Timestamp::from_unix_millis(millis)
}

// ============================================================================
// SECTION: Request Logic
// ============================================================================

/// Full assignment request pipeline: parse, authenticate, evaluate.
fn execute_request(
    state: &AppState,
    origin: Option<&str>,
    bytes: &[u8],
    now: Timestamp,
) -> (StatusCode, Value) {
    match execute_inner(state, origin, bytes, now) {
        Ok(body) => (StatusCode::OK, body),
        Err(error) => deny(state, "/api/abtests/execute", origin, error),
    }
}

/// Assignment pipeline body; errors map onto the taxonomy.
fn execute_inner(
    state: &AppState,
    origin: Option<&str>,
    bytes: &[u8],
    now: Timestamp,
) -> Result<Value, ApiError> {
    let request = parse_body::<ExecuteRequest>(state, bytes)?;
    let project = state
        .verifier
        .verify(&request.envelope(), now, |id| state.store.find_project(id))?;
    if !state.origins.is_allowed(origin, Some(&project)) {
        return Err(ApiError::Forbidden("origin not allowed".to_string()));
    }
    let result = state.engine.execute(&*state.store, &project.id, &request.context(), now)?;
    serde_json::to_value(&result)
        .map_err(|err| ApiError::Store(format!("response serialization failed: {err}")))
}

/// Full impression-log pipeline: parse, authenticate, append.
fn log_impression_request(
    state: &AppState,
    origin: Option<&str>,
    bytes: &[u8],
    now: Timestamp,
) -> (StatusCode, Value) {
    match log_impression_inner(state, bytes, now) {
        Ok(body) => (StatusCode::OK, body),
        Err(error) => deny(state, "/api/abtests/log-impression", origin, error),
    }
}

/// Impression pipeline body; errors map onto the taxonomy.
fn log_impression_inner(
    state: &AppState,
    bytes: &[u8],
    now: Timestamp,
) -> Result<Value, ApiError> {
    let request = parse_body::<LogImpressionRequest>(state, bytes)?;
    state.verifier.verify(&request.envelope(), now, |id| state.store.find_project(id))?;
    let project_id =
        request.project_id.clone().ok_or(ApiError::Validation("missing projectId".to_string()))?;
    let project = state
        .store
        .find_project_by_credentials(&project_id, &request.api_key)?
        .ok_or_else(|| ApiError::Forbidden("invalid project credentials".to_string()))?;
    state.store.record_impression(&request.record(project.id, now))?;
    Ok(json!({ "status": "ok" }))
}

/// Creative preview pipeline: forced assignment without targeting.
fn preview_request(state: &AppState, abtest_id: &str, creative_index: u32) -> (StatusCode, Value) {
    match preview_inner(state, abtest_id, creative_index) {
        Ok(body) => (StatusCode::OK, body),
        Err(error) => error.into_response_parts(),
    }
}

/// Preview pipeline body; unknown experiment or position is 404.
fn preview_inner(
    state: &AppState,
    abtest_id: &str,
    creative_index: u32,
) -> Result<Value, ApiError> {
    let experiment = state
        .store
        .find_experiment(&ExperimentId::new(abtest_id))?
        .ok_or_else(|| ApiError::NotFound(format!("unknown experiment: {abtest_id}")))?;
    let result = AssignmentEngine::force(&experiment, creative_index).ok_or_else(|| {
        ApiError::NotFound(format!("creative index out of range: {creative_index}"))
    })?;
    serde_json::to_value(&result)
        .map_err(|err| ApiError::Store(format!("response serialization failed: {err}")))
}

/// Parses a size-capped JSON request body.
fn parse_body<T: serde::de::DeserializeOwned>(
    state: &AppState,
    bytes: &[u8],
) -> Result<T, ApiError> {
    if bytes.len() > state.max_body_bytes {
        return Err(ApiError::Validation("request body too large".to_string()));
    }
    serde_json::from_slice(bytes)
        .map_err(|err| ApiError::Validation(format!("invalid request body: {err}")))
}

/// Audits a denial (auth classes only) and builds the error response.
fn deny(
    state: &AppState,
    path: &'static str,
    origin: Option<&str>,
    error: ApiError,
) -> (StatusCode, Value) {
    if matches!(&error, ApiError::Unauthenticated(_) | ApiError::Forbidden(_)) {
        let reason = match &error {
            ApiError::Unauthenticated(message) | ApiError::Forbidden(message) => message.clone(),
            ApiError::Validation(message)
            | ApiError::NotFound(message)
            | ApiError::Store(message) => message.clone(),
        };
        state.audit.record(&AuthAuditEvent::denied(
            path,
            None,
            origin.map(str::to_string),
            reason,
        ));
    }
    error.into_response_parts()
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Server lifecycle errors.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Configuration errors.
    #[error("config error: {0}")]
    Config(String),
    /// Initialization errors.
    #[error("init error: {0}")]
    Init(String),
    /// Transport errors.
    #[error("transport error: {0}")]
    Transport(String),
}

// ============================================================================
// SECTION: Tests
// ============================================================================
