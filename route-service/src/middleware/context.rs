use axum::{
    extract::{ConnectInfo, FromRequestParts},
    http::{header, request::Parts, HeaderMap},
};
use axum_extra::extract::cookie::CookieJar;
use service_core::middleware::{client_ip::resolve_client_ip, tracing::CORRELATION_ID_HEADER};
use std::convert::Infallible;
use std::net::SocketAddr;
use uuid::Uuid;

use crate::models::{CorrelationContext, CredentialFailure, RequestContext};
use crate::services::CredentialOutcome;
use crate::AppState;

/// Resolves who is calling and from where.
///
/// Never rejects: a missing or bad credential yields an anonymous context and
/// the service layer decides whether that is acceptable.
#[axum::async_trait]
impl FromRequestParts<AppState> for RequestContext {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let direct = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);

        let correlation = CorrelationContext {
            correlation_id: correlation_id(&parts.headers),
            ip_address: resolve_client_ip(&parts.headers, direct).map(|ip| ip.to_string()),
        };

        let Some(token) = credential(&parts.headers, &state.config.cookie.name) else {
            return Ok(RequestContext::anonymous(correlation));
        };

        Ok(match state.credentials.validate(&token) {
            CredentialOutcome::Valid(identity) => RequestContext::authenticated(identity, correlation),
            CredentialOutcome::Expired => rejected(correlation, CredentialFailure::Expired),
            CredentialOutcome::Invalid => rejected(correlation, CredentialFailure::Invalid),
        })
    }
}

fn rejected(correlation: CorrelationContext, failure: CredentialFailure) -> RequestContext {
    tracing::debug!(correlation_id = %correlation.correlation_id, ?failure, "Credential rejected");
    RequestContext {
        identity: None,
        credential_failure: Some(failure),
        correlation,
    }
}

/// The correlation middleware has normally set the header already.
fn correlation_id(headers: &HeaderMap) -> String {
    headers
        .get(CORRELATION_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

/// Session cookie first, then `Authorization: Bearer`.
pub fn credential(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    let jar = CookieJar::from_headers(headers);
    if let Some(cookie) = jar.get(cookie_name) {
        if !cookie.value().is_empty() {
            return Some(cookie.value().to_string());
        }
    }

    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}
