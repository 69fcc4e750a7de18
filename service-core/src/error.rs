use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Media type for RFC 7807 problem documents.
pub const PROBLEM_JSON: &str = "application/problem+json";

/// Problem-details error body.
///
/// `instance` and `correlation_id` are usually left empty by the code that
/// produces the error and filled in by `middleware::problem` on the way out,
/// since only the request knows its own path and correlation id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProblemDetails {
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub status: u16,
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
}

impl ProblemDetails {
    pub fn new(status: StatusCode, slug: &str, title: &str, detail: impl Into<String>) -> Self {
        Self {
            kind: format!("/problems/{}", slug),
            title: title.to_string(),
            status: status.as_u16(),
            detail: detail.into(),
            instance: None,
            correlation_id: None,
        }
    }
}

impl IntoResponse for ProblemDetails {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let mut res = (status, Json(self)).into_response();
        res.headers_mut()
            .insert(header::CONTENT_TYPE, HeaderValue::from_static(PROBLEM_JSON));
        res
    }
}

/// Infrastructure-level errors shared by every service.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Too many requests: {0}")]
    TooManyRequests(String, Option<u64>),

    #[error("Internal server error: {0}")]
    InternalError(#[from] anyhow::Error),

    #[error("Database error: {0}")]
    DatabaseError(anyhow::Error),

    #[error("Configuration error: {0}")]
    ConfigError(anyhow::Error),
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::ConfigError(anyhow::Error::new(err))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::InternalError(anyhow::Error::new(err))
    }
}

impl AppError {
    /// Convert into a problem document. Internal failures are logged here and
    /// reported with a generic detail so store errors never leak to clients.
    pub fn to_problem(&self) -> ProblemDetails {
        match self {
            AppError::TooManyRequests(msg, _) => ProblemDetails::new(
                StatusCode::TOO_MANY_REQUESTS,
                "too-many-requests",
                "Too Many Requests",
                msg.clone(),
            ),
            AppError::InternalError(err) => {
                tracing::error!(error = ?err, "Internal error");
                ProblemDetails::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal",
                    "Internal Server Error",
                    "Internal server error",
                )
            }
            AppError::DatabaseError(err) => {
                tracing::error!(error = %err, "Database error");
                ProblemDetails::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "database",
                    "Internal Server Error",
                    "Database error",
                )
            }
            AppError::ConfigError(err) => {
                tracing::error!(error = %err, "Configuration error");
                ProblemDetails::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "configuration",
                    "Internal Server Error",
                    "Configuration error",
                )
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let retry_after = match &self {
            AppError::TooManyRequests(_, retry) => *retry,
            _ => None,
        };

        let mut res = self.to_problem().into_response();

        if let Some(retry) = retry_after {
            res.headers_mut()
                .insert(axum::http::header::RETRY_AFTER, retry.into());
        }

        res
    }
}
