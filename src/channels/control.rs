//! Control API routes.
//!
//! The only writer of the pairing registry. Every failure is turned into a
//! JSON body at this boundary; malformed request bodies count as `{}`.

use std::any::Any;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{ConnectInfo, Query, State, rejection::QueryRejection},
    http::{Method, StatusCode, Uri, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::de::DeserializeOwned;
use tower::ServiceBuilder;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any as AnyOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::channels::types::{
    ActionResponse, DiscoveryStatus, ErrorBody, HealthResponse, NotifyBody, RequestIdBody,
    RequestsResponse, StatusQuery, StatusResponse,
};
use crate::error::{IdentityError, PairingError};
use crate::identity::IdentityProvider;
use crate::pairing::{PairingNotice, PairingRegistry, PairingStatus};

/// Shared state of the control API.
#[derive(Clone)]
pub struct ControlState {
    pub registry: PairingRegistry,
    pub identity: Arc<dyn IdentityProvider>,
    pub discovery: DiscoveryStatus,
}

/// Handler-level failure, rendered as a JSON body.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("missing required fields")]
    MissingFields,

    #[error("missing request_id")]
    MissingRequestId,

    #[error(transparent)]
    Pairing(#[from] PairingError),

    #[error(transparent)]
    Identity(#[from] IdentityError),

    #[error("no route for {0}")]
    NoRoute(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::MissingFields => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    required: Some(vec!["host_id".to_string(), "request_id".to_string()]),
                    ..ErrorBody::new("missing_fields")
                },
            ),
            ApiError::MissingRequestId => {
                (StatusCode::BAD_REQUEST, ErrorBody::new("missing_request_id"))
            }
            ApiError::Pairing(PairingError::NotFound { .. }) => {
                (StatusCode::NOT_FOUND, ErrorBody::new("unknown_request_id"))
            }
            ApiError::Pairing(PairingError::Closed { request_id, status }) => (
                StatusCode::CONFLICT,
                ErrorBody {
                    request_id: Some(request_id),
                    status: Some(status),
                    ..ErrorBody::new("request_closed")
                },
            ),
            ApiError::Pairing(PairingError::MissingCallback { .. }) => {
                (StatusCode::BAD_REQUEST, ErrorBody::new("missing_preboot_ip"))
            }
            ApiError::Identity(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorBody {
                    ok: Some(false),
                    detail: Some(e.to_string()),
                    ..ErrorBody::new("identity_error")
                },
            ),
            ApiError::NoRoute(path) => (
                StatusCode::NOT_FOUND,
                ErrorBody {
                    path: Some(path),
                    ..ErrorBody::new("not_found")
                },
            ),
        };
        (status, Json(body)).into_response()
    }
}

/// Build the control router, including the legacy `/daemon/...` aliases.
pub fn routes(state: ControlState) -> Router {
    let router = Router::new()
        .route("/health", get(health))
        .route("/discovery", get(discovery_status))
        .route("/pairing", post(notify))
        .route("/pairing/status", get(status))
        .route("/pairing/requests", get(list_requests))
        .route("/pairing/approve", post(approve))
        .route("/pairing/dismiss", post(dismiss))
        .route("/daemon/health", get(health))
        .route("/daemon/ui/pairing", post(notify))
        .route("/daemon/pairing/status", get(status))
        .route("/daemon/pairing/requests", get(list_requests))
        .route("/daemon/pairing/approve", post(approve))
        .route("/daemon/pairing/dismiss", post(dismiss))
        .fallback(not_found)
        .method_not_allowed_fallback(not_found);
    with_control_layers(router).with_state(state)
}

/// Tracing, CORS and panic recovery shared by every control route.
fn with_control_layers<S>(router: Router<S>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(cors_layer())
            .layer(CatchPanicLayer::custom(panic_response)),
    )
}

/// The control plane is trusted by network locality, not by origin.
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AnyOrigin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
}

pub(crate) fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };
    tracing::error!(detail = %detail, "Control handler panicked");

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorBody::new("internal_error")),
    )
        .into_response()
}

/// Parse a JSON body, treating anything unparseable as an empty payload.
fn parse_body<T: DeserializeOwned + Default>(raw: &Bytes) -> T {
    if raw.is_empty() {
        return T::default();
    }
    serde_json::from_slice(raw).unwrap_or_else(|e| {
        tracing::debug!(error = %e, "Malformed control body, treating as empty");
        T::default()
    })
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

async fn health(State(state): State<ControlState>) -> Result<Json<HealthResponse>, ApiError> {
    let identity = state.identity.load().await.map_err(|e| {
        tracing::warn!(error = %e, "Health check could not load identity");
        e
    })?;
    Ok(Json(HealthResponse {
        ok: true,
        ts: chrono::Utc::now().timestamp(),
        identity,
    }))
}

async fn discovery_status(State(state): State<ControlState>) -> Json<DiscoveryStatus> {
    Json(state.discovery.clone())
}

async fn notify(
    State(state): State<ControlState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    raw: Bytes,
) -> Result<Json<ActionResponse>, ApiError> {
    let body: NotifyBody = parse_body(&raw);
    let (Some(host_id), Some(request_id)) = (non_blank(body.host_id), non_blank(body.request_id))
    else {
        return Err(ApiError::MissingFields);
    };

    let preboot_ip = peer.ip().to_canonical();
    tracing::info!(
        %host_id,
        %request_id,
        client_ip = body.client_ip.as_deref().unwrap_or("-"),
        %preboot_ip,
        "Pairing notify received"
    );

    let request = state
        .registry
        .upsert(PairingNotice {
            request_id,
            host_id,
            client_ip: non_blank(body.client_ip),
            preboot_ip: Some(preboot_ip),
            message: non_blank(body.message),
        })
        .await?;

    Ok(Json(ActionResponse {
        ok: true,
        request_id: request.request_id,
        status: PairingStatus::Pending,
    }))
}

async fn status(
    State(state): State<ControlState>,
    query: Result<Query<StatusQuery>, QueryRejection>,
) -> Result<Json<StatusResponse>, ApiError> {
    // An unparseable query string carries no usable request id.
    let query = match query {
        Ok(Query(query)) => query,
        Err(rejection) => {
            tracing::debug!(error = %rejection, "Ignoring malformed status query");
            StatusQuery::default()
        }
    };
    let request_id = non_blank(query.request_id).ok_or(ApiError::MissingRequestId)?;
    let request = state.registry.get(&request_id).await?;
    Ok(Json(request.into()))
}

async fn list_requests(State(state): State<ControlState>) -> Json<RequestsResponse> {
    Json(RequestsResponse {
        requests: state.registry.list().await,
    })
}

async fn approve(
    State(state): State<ControlState>,
    raw: Bytes,
) -> Result<Json<ActionResponse>, ApiError> {
    let body: RequestIdBody = parse_body(&raw);
    let request_id = non_blank(body.request_id).ok_or(ApiError::MissingRequestId)?;

    let outcome = state.registry.approve(&request_id).await?;
    if !outcome.confirmed {
        tracing::warn!(%request_id, "Pairing approval not confirmed by preboot; still pending");
    }

    Ok(Json(ActionResponse {
        ok: outcome.confirmed,
        request_id,
        status: outcome.status,
    }))
}

async fn dismiss(
    State(state): State<ControlState>,
    raw: Bytes,
) -> Result<Json<ActionResponse>, ApiError> {
    let body: RequestIdBody = parse_body(&raw);
    let request_id = non_blank(body.request_id).ok_or(ApiError::MissingRequestId)?;

    let request = state.registry.dismiss(&request_id).await?;
    tracing::info!(%request_id, "Pairing request dismissed");

    Ok(Json(ActionResponse {
        ok: true,
        request_id,
        status: request.status,
    }))
}

async fn not_found(uri: Uri) -> ApiError {
    ApiError::NoRoute(uri.path().to_string())
}
