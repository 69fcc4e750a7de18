use async_trait::async_trait;
use uuid::Uuid;

use super::error::GatewayError;
use crate::models::{
    AuditEntry, AuditFilter, Page, PageRequest, RateLimitPolicy, RateLimitPolicyUsage, Route,
    RouteFilter, RouteStatus, User,
};

/// Persistence collaborator for routes, policies, audit entries and users.
///
/// Unique-constraint violations surface as the matching `Duplicate*` error;
/// conditional writes report whether a row matched instead of failing.
#[async_trait]
pub trait Repository: Send + Sync {
    async fn insert_route(&self, route: &Route) -> Result<(), GatewayError>;
    async fn find_route(&self, id: Uuid) -> Result<Option<Route>, GatewayError>;
    async fn route_path_exists(
        &self,
        path: &str,
        excluding: Option<Uuid>,
    ) -> Result<bool, GatewayError>;
    /// Every stored path starting with `prefix`, compared literally.
    async fn find_paths_with_prefix(&self, prefix: &str) -> Result<Vec<String>, GatewayError>;
    /// Overwrite the route only if its stored status still equals `expected`.
    async fn update_route_if_status(
        &self,
        route: &Route,
        expected: RouteStatus,
    ) -> Result<bool, GatewayError>;
    async fn delete_route_if_status(
        &self,
        id: Uuid,
        expected: RouteStatus,
    ) -> Result<bool, GatewayError>;
    async fn list_routes(
        &self,
        filter: &RouteFilter,
        page: PageRequest,
    ) -> Result<Page<Route>, GatewayError>;
    async fn count_routes_using_policy(&self, policy_id: Uuid) -> Result<i64, GatewayError>;

    async fn insert_policy(&self, policy: &RateLimitPolicy) -> Result<(), GatewayError>;
    async fn find_policy(&self, id: Uuid) -> Result<Option<RateLimitPolicy>, GatewayError>;
    async fn update_policy(&self, policy: &RateLimitPolicy) -> Result<bool, GatewayError>;
    async fn delete_policy(&self, id: Uuid) -> Result<bool, GatewayError>;
    async fn list_policies(
        &self,
        page: PageRequest,
    ) -> Result<Page<RateLimitPolicyUsage>, GatewayError>;

    async fn append_audit(&self, entry: &AuditEntry) -> Result<(), GatewayError>;
    async fn list_audit(
        &self,
        filter: &AuditFilter,
        page: PageRequest,
    ) -> Result<Page<AuditEntry>, GatewayError>;

    async fn insert_user(&self, user: &User) -> Result<(), GatewayError>;
    async fn find_user(&self, id: Uuid) -> Result<Option<User>, GatewayError>;
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, GatewayError>;
    async fn update_user(&self, user: &User) -> Result<bool, GatewayError>;
    async fn list_users(&self, page: PageRequest) -> Result<Page<User>, GatewayError>;

    async fn health_check(&self) -> Result<(), GatewayError>;
}
