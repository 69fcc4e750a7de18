//! Per-request identity and audit metadata.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Role;

/// Authenticated caller, resolved fresh from a validated credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub user_id: Uuid,
    pub username: String,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Why a presented credential did not yield an identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialFailure {
    Missing,
    Expired,
    Invalid,
}

impl CredentialFailure {
    pub fn detail(self) -> &'static str {
        match self {
            Self::Missing => "Authentication is required",
            Self::Expired => "Credential has expired",
            Self::Invalid => "Credential is invalid",
        }
    }
}

/// Correlation id and client address captured once at the edge of a request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CorrelationContext {
    pub correlation_id: String,
    pub ip_address: Option<String>,
}

/// Everything a use case needs to know about who is calling and from where.
///
/// Built once per request and passed explicitly into every service call; audit
/// entries are enriched from the captured [`CorrelationContext`] rather than
/// re-reading headers at write time.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub identity: Option<Identity>,
    pub credential_failure: Option<CredentialFailure>,
    pub correlation: CorrelationContext,
}

impl RequestContext {
    pub fn anonymous(correlation: CorrelationContext) -> Self {
        Self {
            identity: None,
            credential_failure: Some(CredentialFailure::Missing),
            correlation,
        }
    }

    pub fn authenticated(identity: Identity, correlation: CorrelationContext) -> Self {
        Self {
            identity: Some(identity),
            credential_failure: None,
            correlation,
        }
    }

    pub fn correlation_id(&self) -> &str {
        &self.correlation.correlation_id
    }

    pub fn ip_address(&self) -> Option<&str> {
        self.correlation.ip_address.as_deref()
    }
}
