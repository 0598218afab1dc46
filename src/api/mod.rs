//! HTTP surface.
//!
//! Axum router for the OAuth login flow, the client shell, the monthly
//! learning-time API and client status reports.

pub mod routes;
pub mod session;
pub mod state;

use axum::{
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use thiserror::Error;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::intra::IntraError;
use crate::store::StoreError;

use self::state::AppState;

/// API error types.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Login required")]
    Unauthenticated { authorize_url: String },

    #[error("Upstream service unavailable, please try again")]
    UpstreamUnavailable(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub authorize_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            ApiError::Unauthenticated { .. } => (StatusCode::UNAUTHORIZED, "UNAUTHENTICATED"),
            ApiError::UpstreamUnavailable(_) => (StatusCode::BAD_GATEWAY, "UPSTREAM_UNAVAILABLE"),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
        };

        // Upstream details go to the log, not to the user
        if let ApiError::UpstreamUnavailable(detail) = &self {
            warn!("Upstream failure: {}", detail);
        }

        let authorize_url = match &self {
            ApiError::Unauthenticated { authorize_url } => Some(authorize_url.clone()),
            _ => None,
        };
        let body = ErrorResponse {
            error: ErrorDetail {
                code: code.to_string(),
                message: self.to_string(),
            },
            authorize_url,
        };

        if status == StatusCode::UNAUTHORIZED {
            let clear = [(header::SET_COOKIE, session::clear_cookie())];
            return (status, clear, Json(body)).into_response();
        }
        (status, Json(body)).into_response()
    }
}

impl From<IntraError> for ApiError {
    fn from(e: IntraError) -> Self {
        ApiError::UpstreamUnavailable(e.to_string())
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        let StoreError::NotFound(user) = e;
        ApiError::NotFound(format!("no state for {}", user))
    }
}

/// Build the application router.
pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.server.cors_origin);

    Router::new()
        .route("/", get(routes::auth::root))
        .route("/callback", get(routes::auth::callback))
        .route("/time", get(routes::time::shell))
        .route("/api/time", get(routes::time::month_time))
        .route(
            "/api/state",
            get(routes::status::current_status).post(routes::status::report_status),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn cors_layer(origin: &str) -> CorsLayer {
    if origin == "*" {
        return CorsLayer::permissive();
    }
    match HeaderValue::from_str(origin) {
        Ok(origin) => CorsLayer::new()
            .allow_origin(origin)
            .allow_methods([Method::GET, Method::POST])
            .allow_headers([header::CONTENT_TYPE])
            .allow_credentials(true),
        Err(_) => {
            warn!("Invalid CORS origin {:?}, allowing any origin", origin);
            CorsLayer::permissive()
        }
    }
}
