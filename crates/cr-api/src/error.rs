use std::{borrow::Cow, future::Future};

use axum::{Json, http::StatusCode, response::IntoResponse};
use cr_common::ranking::RankingError;
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

tokio::task_local! {
    static REQUEST_ID: String;
}

/// Strips control characters, URLs, query strings and paths from a message
/// before it is shown to a client.
fn sanitize_message(message: &str) -> String {
    const MAX_LEN: usize = 240;

    let mut cleaned = message
        .chars()
        .filter(|c| !c.is_control())
        .collect::<String>()
        .split_whitespace()
        .map(|token| {
            if token.contains("://") {
                "[redacted-url]".to_string()
            } else if let Some((base, _)) = token.split_once('?') {
                if base.is_empty() {
                    "[redacted-query]".to_string()
                } else {
                    format!("{base}?[redacted]")
                }
            } else if looks_like_path(token) {
                "[redacted-path]".to_string()
            } else {
                token.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(" ");

    if cleaned.len() > MAX_LEN {
        let mut cut = MAX_LEN;
        while !cleaned.is_char_boundary(cut) {
            cut -= 1;
        }
        cleaned.truncate(cut);
        cleaned.push('…');
    }

    if cleaned.trim().is_empty() {
        "unexpected error".to_string()
    } else {
        cleaned
    }
}

/// Absolute paths, Windows paths, and relative paths naming a file such as
/// `data/parsed_jds/JD-1.json:`. Ratios like `12.5/40` are left alone.
fn looks_like_path(token: &str) -> bool {
    if token.starts_with('/') || token.contains('\\') {
        return true;
    }
    let trimmed = token.trim_end_matches([':', ',', ';', '.', ')']);
    trimmed.contains('/')
        && trimmed
            .rsplit('/')
            .next()
            .is_some_and(|file| file.chars().any(|c| c.is_ascii_alphabetic()) && file.contains('.'))
}

pub async fn with_request_id<Fut, T>(request_id: Option<String>, fut: Fut) -> T
where
    Fut: Future<Output = T>,
{
    match request_id {
        Some(request_id) => REQUEST_ID.scope(request_id, fut).await,
        None => fut.await,
    }
}

pub fn current_request_id() -> Option<String> {
    REQUEST_ID.try_with(|value| value.clone()).ok()
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("database error: {0}")]
    Database(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("upstream failure: {0}")]
    BadGateway(String),
    #[error("timed out: {0}")]
    GatewayTimeout(String),
    #[error("too many requests: {0}")]
    TooManyRequests(String),
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
    #[error("internal server error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorResponse {
    success: bool,
    code: &'static str,
    message: String,
    request_id: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();
        let code = self.code();
        let request_id = current_request_id();

        if status.is_server_error() {
            error!(
                code,
                status = %status,
                request_id = request_id.as_deref().unwrap_or(""),
                error = %self,
                "api_error"
            );
        } else {
            warn!(
                code,
                status = %status,
                request_id = request_id.as_deref().unwrap_or(""),
                error = %self,
                "api_error"
            );
        }

        let body = Json(ErrorResponse {
            success: false,
            code,
            message: self.public_message().into_owned(),
            request_id,
        });

        (status, body).into_response()
    }
}

impl ApiError {
    fn code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "bad_request",
            ApiError::NotFound(_) => "not_found",
            ApiError::BadGateway(_) => "upstream_error",
            ApiError::GatewayTimeout(_) => "timeout",
            ApiError::TooManyRequests(_) => "too_many_requests",
            ApiError::ServiceUnavailable(_) => "service_unavailable",
            ApiError::Database(_) => "database_error",
            ApiError::Config(_) | ApiError::Internal(_) => "internal_error",
        }
    }

    fn public_message(&self) -> Cow<'static, str> {
        match self {
            ApiError::BadRequest(msg) | ApiError::NotFound(msg) | ApiError::BadGateway(msg) => {
                Cow::Owned(sanitize_message(msg))
            }
            ApiError::GatewayTimeout(_) => Cow::Borrowed("ranking took too long; retry later"),
            ApiError::TooManyRequests(_) => Cow::Borrowed("too many requests"),
            ApiError::ServiceUnavailable(_) => Cow::Borrowed("service unavailable"),
            ApiError::Config(_) | ApiError::Database(_) | ApiError::Internal(_) => {
                Cow::Borrowed("internal server error")
            }
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadGateway(_) => StatusCode::BAD_GATEWAY,
            ApiError::GatewayTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            ApiError::TooManyRequests(_) => StatusCode::TOO_MANY_REQUESTS,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Config(_) | ApiError::Database(_) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<RankingError> for ApiError {
    fn from(value: RankingError) -> Self {
        match value {
            RankingError::JobNotFound(id) => ApiError::NotFound(format!("job {id} not found")),
            RankingError::RankingNotFound(id) => {
                ApiError::NotFound(format!("ranking {id} not found"))
            }
            err @ (RankingError::InvalidJob { .. } | RankingError::Upstream(_)) => {
                ApiError::BadGateway(err.to_string())
            }
            err @ RankingError::Timeout(_) => ApiError::GatewayTimeout(err.to_string()),
            err @ RankingError::Store(_) => ApiError::Database(err.to_string()),
            err @ RankingError::Worker(_) => ApiError::Internal(err.to_string()),
        }
    }
}
