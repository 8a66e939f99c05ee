//! # Management API
//!
//! HTTP adapter over the configuration facade plus a stateless build
//! endpoint. All routes live under `/api/v1`.
//!
//! | method | path                                       | operation          |
//! |--------|--------------------------------------------|--------------------|
//! | GET    | `/health`                                  | liveness           |
//! | GET    | `/configs`                                 | list pids          |
//! | POST   | `/configs/{pid}`                           | create             |
//! | GET    | `/configs/{pid}`                           | list properties    |
//! | PUT    | `/configs/{pid}`                           | replace properties |
//! | DELETE | `/configs/{pid}`                           | delete             |
//! | GET    | `/configs/{pid}/properties/{key}`          | get property       |
//! | PUT    | `/configs/{pid}/properties/{key}`          | set property       |
//! | DELETE | `/configs/{pid}/properties/{key}`          | delete property    |
//! | POST   | `/configs/{pid}/properties/{key}/append`   | append to string   |
//! | POST   | `/factories/{factory_pid}`                 | factory create     |
//! | POST   | `/range`                                   | effective range    |
//! | POST   | `/build`                                   | build repository   |
//!
//! Faults map to status codes: not found 404, invalid state 409, malformed
//! input 400, storage 500.

use crate::cli::{CliError, RepositoryFile, build_repository_file};
use crate::json::{JsonError, properties_from_json, properties_to_json, property_from_json, property_to_json};
use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use featgraph_core::config::{ConfigAdmin, ConfigError, ConfigFacade, ManagementFault};
use featgraph_core::{
    FeatureDescriptor, FeatureError, ModuleManifest, RangePolicy, compute_effective_range,
};
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Facade shared by all handlers.
pub type SharedFacade = Arc<ConfigFacade<Box<dyn ConfigAdmin>>>;

/// Router state.
#[derive(Clone)]
pub struct AppState {
    pub facade: SharedFacade,
    /// Policy used when a request does not name one.
    pub default_policy: RangePolicy,
}

impl AppState {
    pub fn new(admin: Box<dyn ConfigAdmin>, default_policy: RangePolicy) -> Self {
        Self {
            facade: Arc::new(ConfigFacade::new(admin)),
            default_policy,
        }
    }
}

// =============================================================================
// ERRORS
// =============================================================================

/// Error returned by handlers.
#[derive(Debug)]
pub enum ApiError {
    Fault(ManagementFault),
    Model(FeatureError),
    BadRequest(String),
    NotFound(String),
}

impl From<ManagementFault> for ApiError {
    fn from(fault: ManagementFault) -> Self {
        Self::Fault(fault)
    }
}

impl From<JsonError> for ApiError {
    fn from(err: JsonError) -> Self {
        Self::BadRequest(err.to_string())
    }
}

impl From<FeatureError> for ApiError {
    fn from(err: FeatureError) -> Self {
        Self::Model(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, operation, message) = match self {
            Self::Fault(fault) => {
                let status = match &fault.cause {
                    ConfigError::NotFound(_) => StatusCode::NOT_FOUND,
                    ConfigError::InvalidState(_) => StatusCode::CONFLICT,
                    ConfigError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, Some(fault.operation), fault.cause.to_string())
            }
            Self::Model(err) => (StatusCode::BAD_REQUEST, None, err.to_string()),
            Self::BadRequest(message) => (StatusCode::BAD_REQUEST, None, message),
            Self::NotFound(message) => (StatusCode::NOT_FOUND, None, message),
        };

        if status.is_server_error() {
            tracing::error!(?operation, %message, "management request failed");
        } else {
            tracing::warn!(?operation, %message, "management request rejected");
        }
        (status, Json(json!({ "error": message, "operation": operation }))).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

// =============================================================================
// ROUTER
// =============================================================================

pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/health", get(health))
        .route("/configs", get(list_configs))
        .route(
            "/configs/{pid}",
            post(create_config)
                .get(list_properties)
                .put(update_config)
                .delete(delete_config),
        )
        .route(
            "/configs/{pid}/properties/{key}",
            get(get_property).put(set_property).delete(delete_property),
        )
        .route("/configs/{pid}/properties/{key}/append", post(append_property))
        .route("/factories/{factory_pid}", post(create_factory_configuration))
        .route("/range", post(effective_range))
        .route("/build", post(build_repository));

    Router::new()
        .nest("/api/v1", api)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// =============================================================================
// HANDLERS
// =============================================================================

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn list_configs(State(state): State<AppState>) -> ApiResult<Json<Vec<String>>> {
    Ok(Json(state.facade.configs()?))
}

async fn create_config(
    State(state): State<AppState>,
    Path(pid): Path<String>,
) -> ApiResult<StatusCode> {
    state.facade.create(&pid)?;
    tracing::info!(%pid, "configuration created");
    Ok(StatusCode::CREATED)
}

async fn list_properties(
    State(state): State<AppState>,
    Path(pid): Path<String>,
) -> ApiResult<Json<Value>> {
    let properties = state.facade.list_properties(&pid)?;
    Ok(Json(properties_to_json(&properties)))
}

async fn update_config(
    State(state): State<AppState>,
    Path(pid): Path<String>,
    Json(body): Json<Value>,
) -> ApiResult<StatusCode> {
    let properties = properties_from_json(body)?;
    state.facade.update(&pid, properties)?;
    tracing::info!(%pid, "configuration replaced");
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_config(
    State(state): State<AppState>,
    Path(pid): Path<String>,
) -> ApiResult<StatusCode> {
    state.facade.delete(&pid)?;
    tracing::info!(%pid, "configuration deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn get_property(
    State(state): State<AppState>,
    Path((pid, key)): Path<(String, String)>,
) -> ApiResult<Json<Value>> {
    state
        .facade
        .get_property(&pid, &key)?
        .map(|value| Json(property_to_json(&value)))
        .ok_or_else(|| ApiError::NotFound(format!("property '{key}' of '{pid}' is not set")))
}

async fn set_property(
    State(state): State<AppState>,
    Path((pid, key)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> ApiResult<StatusCode> {
    let value = property_from_json(&key, body)?;
    state.facade.set_property(&pid, &key, value)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_property(
    State(state): State<AppState>,
    Path((pid, key)): Path<(String, String)>,
) -> ApiResult<StatusCode> {
    state.facade.delete_property(&pid, &key)?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
struct AppendRequest {
    value: String,
}

async fn append_property(
    State(state): State<AppState>,
    Path((pid, key)): Path<(String, String)>,
    Json(body): Json<AppendRequest>,
) -> ApiResult<StatusCode> {
    state.facade.append_property(&pid, &key, &body.value)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn create_factory_configuration(
    State(state): State<AppState>,
    Path(factory_pid): Path<String>,
    Json(body): Json<Value>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let properties = properties_from_json(body)?;
    let pid = state
        .facade
        .create_factory_configuration(&factory_pid, properties)?;
    tracing::info!(%factory_pid, %pid, "factory configuration created");
    Ok((StatusCode::CREATED, Json(json!({ "pid": pid }))))
}

#[derive(Debug, Deserialize)]
struct RangeRequest {
    version: String,
    #[serde(default)]
    policy: Option<RangePolicy>,
}

async fn effective_range(
    State(state): State<AppState>,
    Json(body): Json<RangeRequest>,
) -> ApiResult<Json<Value>> {
    let policy = body.policy.unwrap_or(state.default_policy);
    let range = compute_effective_range(&body.version, &policy)?;
    Ok(Json(json!({
        "policy": policy.to_string(),
        "unconstrained": range.is_unconstrained(),
        "range": range.text(),
    })))
}

#[derive(Debug, Deserialize)]
struct BuildRequest {
    #[serde(default)]
    modules: Vec<ModuleManifest>,
    #[serde(default)]
    features: Vec<FeatureDescriptor>,
    #[serde(default)]
    policy: Option<RangePolicy>,
}

async fn build_repository(
    State(state): State<AppState>,
    Json(body): Json<BuildRequest>,
) -> ApiResult<Json<Value>> {
    let policy = body.policy.unwrap_or(state.default_policy);
    let repository = RepositoryFile {
        modules: body.modules,
        features: body.features,
    };
    let built = build_repository_file(&repository, &policy).map_err(|e| match e {
        CliError::Feature(err) => ApiError::Model(err),
        other => ApiError::BadRequest(other.to_string()),
    })?;
    serde_json::to_value(&built)
        .map(Json)
        .map_err(|e| ApiError::BadRequest(e.to_string()))
}
