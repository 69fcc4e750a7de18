pub mod audit;
pub mod identity;
pub mod page;
pub mod rate_limit;
pub mod role;
pub mod route;
pub mod user;

pub use audit::{actions, AuditEntry, AuditFilter, EntityType};
pub use identity::{CorrelationContext, CredentialFailure, Identity, RequestContext};
pub use page::{Page, PageRequest};
pub use rate_limit::{RateLimitPolicy, RateLimitPolicyUsage};
pub use role::Role;
pub use route::{HttpMethod, OwnerFilter, Route, RouteChanges, RouteFilter, RouteStatus};
pub use user::{SanitizedUser, User};
