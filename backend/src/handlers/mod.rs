pub mod echoes;
pub mod feed;
pub mod interests;
pub mod policy;

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use std::sync::Arc;

use crate::constants::ACTING_USER_HEADER;
use crate::engine::Engine;
use crate::error::EngineError;
use crate::models::UserId;

pub use echoes::{grant_offer, list_offers, redeem_offer};
pub use feed::stream_feed;
pub use interests::{archive_interest, delete_interest, list_interests, restore_interest, send_interest};
pub use policy::{chat_gate, filter_threads, match_status, visibility};

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
}

impl AppState {
    pub fn new(engine: Arc<Engine>) -> Self {
        Self { engine }
    }
}

/// User-facing routes. Every handler except `/health` acts as the caller
/// named by the identity header.
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        // Interest ledger
        .route("/api/interests", post(send_interest).get(list_interests))
        .route("/api/interests/{id}", axum::routing::delete(delete_interest))
        .route("/api/interests/{id}/archive", post(archive_interest))
        .route("/api/interests/{id}/restore", post(restore_interest))
        // Echo offers
        .route("/api/echoes", get(list_offers))
        .route("/api/echoes/{id}/redeem", post(redeem_offer))
        // Read-only policy checks
        .route("/api/matches/{other}", get(match_status))
        .route("/api/visibility/{other}", get(visibility))
        .route("/api/chat-gate/{recipient}", get(chat_gate))
        .route("/api/threads/filter", post(filter_threads))
        // Real-time feed
        .route("/api/feed", get(stream_feed))
        .with_state(state)
}

/// Platform-only routes for system-issued actions. Served on a separate
/// loopback listener, never behind the public gateway.
pub fn internal_routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/internal/echoes", post(grant_offer))
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}

/// The authenticated caller, as asserted by the auth gateway in front of
/// this service.
#[derive(Debug, Clone, Copy)]
pub struct ActingUser(pub UserId);

impl<S: Send + Sync> FromRequestParts<S> for ActingUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(ACTING_USER_HEADER)
            .ok_or_else(|| ApiError::bad_request(format!("Missing {} header", ACTING_USER_HEADER)))?;
        let user = raw
            .to_str()
            .ok()
            .and_then(|v| v.parse::<UserId>().ok())
            .ok_or_else(|| ApiError::bad_request(format!("Invalid {} header", ACTING_USER_HEADER)))?;
        Ok(ActingUser(user))
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub detail: String,
    pub retryable: bool,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorBody,
}

impl ApiError {
    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            body: ErrorBody {
                error: "bad_request".to_string(),
                detail: detail.into(),
                retryable: false,
            },
        }
    }
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        let status = match &err {
            EngineError::PolicyDenied(_) => StatusCode::FORBIDDEN,
            EngineError::Conflict(_) => StatusCode::CONFLICT,
            EngineError::NotFound(_) => StatusCode::NOT_FOUND,
            EngineError::Transient { .. } | EngineError::Uncertain { .. } => StatusCode::SERVICE_UNAVAILABLE,
        };
        if status == StatusCode::SERVICE_UNAVAILABLE {
            tracing::error!("Request failed with recoverable error: {}", err);
        }
        Self {
            status,
            body: ErrorBody {
                error: err.kind().to_string(),
                detail: err.to_string(),
                retryable: err.is_retryable(),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

pub type ApiResult<T> = Result<Json<T>, ApiError>;

#[cfg(test)]
pub(crate) mod test_support {
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
        Router,
    };
    use serde_json::Value;
    use tower::ServiceExt;

    use super::{internal_routes, routes, AppState};
    use crate::constants::ACTING_USER_HEADER;
    use crate::engine::fixtures::Harness;

    pub fn app(h: &Harness) -> Router {
        routes(AppState::new(h.engine.clone()))
    }

    pub fn internal_app(h: &Harness) -> Router {
        internal_routes(AppState::new(h.engine.clone()))
    }

    pub async fn call(app: &Router, method: &str, uri: &str, user: Option<i64>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(user) = user {
            builder = builder.header(ACTING_USER_HEADER, user.to_string());
        }
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }
}
