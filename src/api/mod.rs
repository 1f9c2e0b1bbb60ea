//! HTTP API for the peerpulse evaluation service
//!
//! One POST JSON operation per callable function, served by axum. Errors
//! collapse to a coarse wire taxonomy: `invalid-argument`, `not-found`,
//! `conflict`, `resource-exhausted`, and a generic `internal` for
//! everything else (including decryption failures, so the API never acts
//! as a key-checking oracle).

pub mod handlers;
pub mod rate_limit;
pub mod server;

use crate::error::PeerpulseError;
use crate::services::{EvaluationService, MemberService, ResponseService, ResultsService};
use crate::storage::libsql::LibsqlStorage;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use self::rate_limit::RateLimiter;
use serde_json::json;
use std::sync::Arc;
use tracing::error;

pub use self::server::{ApiServer, ApiServerConfig};

/// Shared state behind every handler
#[derive(Clone)]
pub struct AppState {
    pub evaluations: EvaluationService,
    pub members: MemberService,
    pub responses: ResponseService,
    pub results: ResultsService,
    /// Login rate limiter; injected state with an explicit lifecycle
    pub login_limiter: Arc<RateLimiter>,
}

impl AppState {
    /// Wire all services onto one storage backend
    pub fn new(storage: Arc<LibsqlStorage>, login_limiter: RateLimiter) -> Self {
        Self {
            evaluations: EvaluationService::new(storage.clone()),
            members: MemberService::new(storage.clone(), storage.clone()),
            responses: ResponseService::new(storage.clone(), storage.clone()),
            results: ResultsService::new(storage.clone(), storage.clone(), storage),
            login_limiter: Arc::new(login_limiter),
        }
    }
}

/// Wire-level error with the coarse client-facing taxonomy
#[derive(Debug)]
pub enum ApiError {
    /// Request is structurally valid but violates a domain rule
    InvalidArgument(String),
    /// Referenced record does not exist (or the access code is unknown)
    NotFound(String),
    /// Write rejected because an equivalent record already exists
    Conflict(String),
    /// Client exceeded the login rate limit
    ResourceExhausted,
    /// Anything else; details are logged server-side only
    Internal,
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::ResourceExhausted => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            ApiError::InvalidArgument(_) => "invalid-argument",
            ApiError::NotFound(_) => "not-found",
            ApiError::Conflict(_) => "conflict",
            ApiError::ResourceExhausted => "resource-exhausted",
            ApiError::Internal => "internal",
        }
    }

    fn message(&self) -> &str {
        match self {
            ApiError::InvalidArgument(msg)
            | ApiError::NotFound(msg)
            | ApiError::Conflict(msg) => msg,
            ApiError::ResourceExhausted => "too many attempts, retry later",
            // One generic message for every internal failure kind.
            ApiError::Internal => "internal error",
        }
    }
}

impl From<PeerpulseError> for ApiError {
    fn from(err: PeerpulseError) -> Self {
        match err {
            PeerpulseError::Validation(msg) => ApiError::InvalidArgument(msg),
            PeerpulseError::NotFound(msg) => ApiError::NotFound(msg),
            PeerpulseError::Conflict(msg) => ApiError::Conflict(msg),
            other => {
                // Wrong manager tokens, database failures, and the rest all
                // surface identically; the detail stays in the log.
                error!("Internal error serving request: {}", other);
                ApiError::Internal
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({
            "error": {
                "code": self.code(),
                "message": self.message(),
            }
        });
        (self.status(), Json(body)).into_response()
    }
}
