//! Routing rule model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Lifecycle state of a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RouteStatus {
    Draft,
    Pending,
    Published,
    Rejected,
}

impl RouteStatus {
    pub const ALL: [RouteStatus; 4] = [
        RouteStatus::Draft,
        RouteStatus::Pending,
        RouteStatus::Published,
        RouteStatus::Rejected,
    ];

    /// Get string representation for database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::Pending => "PENDING",
            Self::Published => "PUBLISHED",
            Self::Rejected => "REJECTED",
        }
    }
}

impl fmt::Display for RouteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RouteStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DRAFT" => Ok(Self::Draft),
            "PENDING" => Ok(Self::Pending),
            "PUBLISHED" => Ok(Self::Published),
            "REJECTED" => Ok(Self::Rejected),
            _ => Err(format!("Invalid route status: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "PATCH" => Ok(Self::Patch),
            "DELETE" => Ok(Self::Delete),
            "HEAD" => Ok(Self::Head),
            "OPTIONS" => Ok(Self::Options),
            _ => Err(format!("Unsupported HTTP method: {}", s)),
        }
    }
}

impl TryFrom<String> for HttpMethod {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<HttpMethod> for String {
    fn from(method: HttpMethod) -> Self {
        method.as_str().to_string()
    }
}

/// A routing rule proposed by an operator and reviewed before it is served.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    pub id: Uuid,
    pub path: String,
    pub upstream_url: String,
    pub methods: BTreeSet<HttpMethod>,
    pub description: Option<String>,
    pub status: RouteStatus,
    pub rate_limit_id: Option<Uuid>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub approved_by: Option<Uuid>,
    pub approved_at: Option<DateTime<Utc>>,
    pub rejected_by: Option<Uuid>,
    pub rejected_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
}

impl Route {
    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.created_by == user_id
    }

    /// Field snapshot used for audit diffs.
    pub fn audit_snapshot(&self) -> serde_json::Value {
        serde_json::json!({
            "path": self.path,
            "upstreamUrl": self.upstream_url,
            "methods": self.methods,
            "description": self.description,
            "rateLimitId": self.rate_limit_id,
            "status": self.status,
        })
    }
}

/// Editable fields of a route. `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RouteChanges {
    pub path: Option<String>,
    pub upstream_url: Option<String>,
    pub methods: Option<BTreeSet<HttpMethod>>,
    pub description: Option<Option<String>>,
    pub rate_limit_id: Option<Option<Uuid>>,
}

/// Who a route listing should be restricted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnerFilter {
    Me,
    User(Uuid),
}

#[derive(Debug, Clone, Default)]
pub struct RouteFilter {
    pub status: Option<RouteStatus>,
    pub created_by: Option<Uuid>,
    /// Case-insensitive substring over path and description.
    pub search: Option<String>,
    /// Case-insensitive substring over upstream url.
    pub upstream: Option<String>,
    /// Exact upstream url match.
    pub upstream_exact: Option<String>,
}

impl RouteFilter {
    pub fn matches(&self, route: &Route) -> bool {
        if self.status.is_some_and(|s| s != route.status) {
            return false;
        }
        if self.created_by.is_some_and(|u| u != route.created_by) {
            return false;
        }
        if let Some(term) = &self.search {
            let term = term.to_lowercase();
            let in_path = route.path.to_lowercase().contains(&term);
            let in_description = route
                .description
                .as_deref()
                .is_some_and(|d| d.to_lowercase().contains(&term));
            if !in_path && !in_description {
                return false;
            }
        }
        if let Some(term) = &self.upstream {
            if !route
                .upstream_url
                .to_lowercase()
                .contains(&term.to_lowercase())
            {
                return false;
            }
        }
        if let Some(exact) = &self.upstream_exact {
            if &route.upstream_url != exact {
                return false;
            }
        }
        true
    }
}
