use serde::Deserialize;
use validator::Validate;

use crate::services::rate_limits::PolicyInput;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PolicyRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be between 1 and 100 characters"))]
    pub name: String,

    #[validate(range(min = 1, message = "requestsPerSecond must be positive"))]
    pub requests_per_second: i32,

    #[validate(range(min = 1, message = "burstSize must be positive"))]
    pub burst_size: i32,
}

impl From<PolicyRequest> for PolicyInput {
    fn from(req: PolicyRequest) -> Self {
        PolicyInput {
            name: req.name,
            requests_per_second: req.requests_per_second,
            burst_size: req.burst_size,
        }
    }
}
