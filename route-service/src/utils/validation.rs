use axum::{
    extract::{FromRequest, FromRequestParts, Path, Query, Request},
    http::request::Parts,
    Json,
};
use serde::de::DeserializeOwned;
use std::convert::Infallible;
use validator::Validate;

use crate::services::GatewayError;

/// JSON body parsed and validated, with the failure deferred to the handler.
///
/// Handlers run the authorization guard before calling [`into_inner`], so an
/// unauthenticated caller sending a malformed body still gets 401 rather than
/// 400.
///
/// [`into_inner`]: ValidatedJson::into_inner
pub struct ValidatedJson<T>(pub Result<T, GatewayError>);

impl<T> ValidatedJson<T> {
    pub fn into_inner(self) -> Result<T, GatewayError> {
        self.0
    }
}

#[axum::async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate + 'static,
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let parsed = match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => value
                .validate()
                .map(|_| value)
                .map_err(|e| GatewayError::validation(format!("Validation error: {}", e))),
            Err(e) => Err(GatewayError::validation(format!(
                "Json parse error: {}",
                e.body_text()
            ))),
        };

        Ok(ValidatedJson(parsed))
    }
}

/// Path parameters with the parse failure deferred, like [`ValidatedJson`].
pub struct ValidatedPath<T>(pub Result<T, GatewayError>);

impl<T> ValidatedPath<T> {
    pub fn into_inner(self) -> Result<T, GatewayError> {
        self.0
    }
}

#[axum::async_trait]
impl<T, S> FromRequestParts<S> for ValidatedPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let parsed = Path::<T>::from_request_parts(parts, state)
            .await
            .map(|Path(value)| value)
            .map_err(|e| GatewayError::validation(e.body_text()));
        Ok(ValidatedPath(parsed))
    }
}

/// Query string with the parse failure deferred, like [`ValidatedJson`].
pub struct ValidatedQuery<T>(pub Result<T, GatewayError>);

impl<T> ValidatedQuery<T> {
    pub fn into_inner(self) -> Result<T, GatewayError> {
        self.0
    }
}

#[axum::async_trait]
impl<T, S> FromRequestParts<S> for ValidatedQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let parsed = Query::<T>::from_request_parts(parts, state)
            .await
            .map(|Query(value)| value)
            .map_err(|e| GatewayError::validation(e.body_text()));
        Ok(ValidatedQuery(parsed))
    }
}
