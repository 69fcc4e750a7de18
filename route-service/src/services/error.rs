use service_core::axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use service_core::error::ProblemDetails;
use thiserror::Error;
use uuid::Uuid;

/// Failures of the route administration core.
///
/// Every variant maps to exactly one status code. Store and infrastructure
/// failures collapse into `Internal` and never leak their message to clients.
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("{0}")]
    AuthenticationRequired(String),

    #[error("{0}")]
    InsufficientRole(String),

    #[error("{0}")]
    NotOwner(String),

    #[error("{0}")]
    InvalidTransition(String),

    #[error("A route with path '{0}' already exists")]
    DuplicatePath(String),

    #[error("A rate limit policy named '{0}' already exists")]
    DuplicatePolicyName(String),

    #[error("A user named '{0}' already exists")]
    DuplicateUsername(String),

    #[error("Rate limit policy is in use by {0} route(s)")]
    PolicyInUse(i64),

    #[error("{0}")]
    ValidationFailed(String),

    #[error("Rate limit policy {0} does not exist")]
    PolicyNotFound(Uuid),

    #[error("{0} not found")]
    ResourceNotFound(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl GatewayError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationFailed(message.into())
    }

    pub fn not_found(resource: &str, id: Uuid) -> Self {
        Self::ResourceNotFound(format!("{} {}", resource, id))
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::AuthenticationRequired(_) => StatusCode::UNAUTHORIZED,
            Self::InsufficientRole(_) | Self::NotOwner(_) => StatusCode::FORBIDDEN,
            Self::InvalidTransition(_)
            | Self::DuplicatePath(_)
            | Self::DuplicatePolicyName(_)
            | Self::DuplicateUsername(_)
            | Self::PolicyInUse(_) => StatusCode::CONFLICT,
            Self::ValidationFailed(_) | Self::PolicyNotFound(_) => StatusCode::BAD_REQUEST,
            Self::ResourceNotFound(_) => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn slug_and_title(&self) -> (&'static str, &'static str) {
        match self {
            Self::AuthenticationRequired(_) => ("authentication-required", "Authentication Required"),
            Self::InsufficientRole(_) => ("insufficient-role", "Forbidden"),
            Self::NotOwner(_) => ("not-owner", "Forbidden"),
            Self::InvalidTransition(_) => ("invalid-transition", "Invalid State Transition"),
            Self::DuplicatePath(_) => ("duplicate-path", "Duplicate Route Path"),
            Self::DuplicatePolicyName(_) => ("duplicate-policy-name", "Duplicate Policy Name"),
            Self::DuplicateUsername(_) => ("duplicate-username", "Duplicate Username"),
            Self::PolicyInUse(_) => ("policy-in-use", "Rate Limit Policy In Use"),
            Self::ValidationFailed(_) => ("validation-failed", "Validation Failed"),
            Self::PolicyNotFound(_) => ("policy-not-found", "Rate Limit Policy Not Found"),
            Self::ResourceNotFound(_) => ("not-found", "Not Found"),
            Self::Internal(_) => ("internal-error", "Internal Server Error"),
        }
    }

    pub fn to_problem(&self) -> ProblemDetails {
        let (slug, title) = self.slug_and_title();
        let detail = match self {
            Self::Internal(err) => {
                tracing::error!(error = ?err, "Internal error");
                "An unexpected error occurred".to_string()
            }
            other => other.to_string(),
        };
        ProblemDetails::new(self.status(), slug, title, detail)
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        self.to_problem().into_response()
    }
}

impl From<sqlx::Error> for GatewayError {
    fn from(err: sqlx::Error) -> Self {
        GatewayError::Internal(anyhow::Error::new(err))
    }
}

impl From<service_core::error::AppError> for GatewayError {
    fn from(err: service_core::error::AppError) -> Self {
        GatewayError::Internal(anyhow::Error::new(err))
    }
}
