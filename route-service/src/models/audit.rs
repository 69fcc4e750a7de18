//! Append-only audit trail.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityType {
    Route,
    RateLimit,
    User,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Route => "ROUTE",
            Self::RateLimit => "RATE_LIMIT",
            Self::User => "USER",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ROUTE" => Ok(Self::Route),
            "RATE_LIMIT" => Ok(Self::RateLimit),
            "USER" => Ok(Self::User),
            _ => Err(format!("Invalid entity type: {}", s)),
        }
    }
}

/// Action names written to the audit trail.
pub mod actions {
    pub const ROUTE_CREATED: &str = "route.created";
    pub const ROUTE_UPDATED: &str = "route.updated";
    pub const ROUTE_DELETED: &str = "route.deleted";
    pub const ROUTE_CLONED: &str = "route.cloned";
    pub const ROUTE_SUBMITTED: &str = "route.submitted";
    pub const ROUTE_RESUBMITTED: &str = "route.resubmitted";
    pub const APPROVED: &str = "approved";
    pub const PUBLISHED: &str = "published";
    pub const REJECTED: &str = "rejected";
    pub const RATE_LIMIT_CREATED: &str = "rate_limit.created";
    pub const RATE_LIMIT_UPDATED: &str = "rate_limit.updated";
    pub const RATE_LIMIT_DELETED: &str = "rate_limit.deleted";
    pub const USER_CREATED: &str = "user.created";
    pub const USER_DEACTIVATED: &str = "user.deactivated";
    pub const ROLE_CHANGED: &str = "role_changed";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    pub id: Uuid,
    pub entity_type: EntityType,
    pub entity_id: Uuid,
    pub action: String,
    pub actor_id: Uuid,
    pub actor_username: String,
    pub changes: Option<serde_json::Value>,
    pub ip_address: Option<String>,
    pub correlation_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct AuditFilter {
    pub entity_type: Option<EntityType>,
    pub entity_id: Option<Uuid>,
    pub actor_id: Option<Uuid>,
    /// Any of these actions; empty means all.
    pub actions: Vec<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    /// History views read oldest first, the audit log newest first.
    pub oldest_first: bool,
}

impl AuditFilter {
    pub fn matches(&self, entry: &AuditEntry) -> bool {
        self.entity_type.map_or(true, |t| t == entry.entity_type)
            && self.entity_id.map_or(true, |id| id == entry.entity_id)
            && self.actor_id.map_or(true, |id| id == entry.actor_id)
            && (self.actions.is_empty() || self.actions.iter().any(|a| a == &entry.action))
            && self.from.map_or(true, |from| entry.timestamp >= from)
            && self.to.map_or(true, |to| entry.timestamp <= to)
    }
}
