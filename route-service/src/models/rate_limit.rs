use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Named throttling policy that routes may reference.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitPolicy {
    pub id: Uuid,
    pub name: String,
    pub requests_per_second: i32,
    pub burst_size: i32,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RateLimitPolicy {
    pub fn audit_snapshot(&self) -> serde_json::Value {
        serde_json::json!({
            "name": self.name,
            "requestsPerSecond": self.requests_per_second,
            "burstSize": self.burst_size,
        })
    }
}

/// Policy together with the number of routes referencing it.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitPolicyUsage {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub policy: RateLimitPolicy,
    pub usage_count: i64,
}
