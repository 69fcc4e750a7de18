//! In-process repository for tests and local runs.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::error::GatewayError;
use super::repository::Repository;
use crate::models::{
    AuditEntry, AuditFilter, Page, PageRequest, RateLimitPolicy, RateLimitPolicyUsage, Route,
    RouteFilter, RouteStatus, User,
};

#[derive(Default)]
struct Store {
    routes: HashMap<Uuid, Route>,
    policies: HashMap<Uuid, RateLimitPolicy>,
    /// Insertion order is the audit sequence.
    audit: Vec<AuditEntry>,
    users: HashMap<Uuid, User>,
}

impl Store {
    fn path_taken(&self, path: &str, excluding: Option<Uuid>) -> bool {
        self.routes
            .values()
            .any(|r| r.path == path && Some(r.id) != excluding)
    }

    fn policy_name_taken(&self, name: &str, excluding: Option<Uuid>) -> bool {
        self.policies
            .values()
            .any(|p| p.name == name && Some(p.id) != excluding)
    }

    fn usage(&self, policy_id: Uuid) -> i64 {
        self.routes
            .values()
            .filter(|r| r.rate_limit_id == Some(policy_id))
            .count() as i64
    }

    fn check_policy_ref(&self, route: &Route) -> Result<(), GatewayError> {
        match route.rate_limit_id {
            Some(id) if !self.policies.contains_key(&id) => Err(GatewayError::PolicyNotFound(id)),
            _ => Ok(()),
        }
    }
}

#[derive(Default)]
pub struct InMemoryRepository {
    store: RwLock<Store>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn insert_route(&self, route: &Route) -> Result<(), GatewayError> {
        let mut store = self.store.write().await;
        if store.path_taken(&route.path, None) {
            return Err(GatewayError::DuplicatePath(route.path.clone()));
        }
        store.check_policy_ref(route)?;
        store.routes.insert(route.id, route.clone());
        Ok(())
    }

    async fn find_route(&self, id: Uuid) -> Result<Option<Route>, GatewayError> {
        Ok(self.store.read().await.routes.get(&id).cloned())
    }

    async fn route_path_exists(
        &self,
        path: &str,
        excluding: Option<Uuid>,
    ) -> Result<bool, GatewayError> {
        Ok(self.store.read().await.path_taken(path, excluding))
    }

    async fn find_paths_with_prefix(&self, prefix: &str) -> Result<Vec<String>, GatewayError> {
        Ok(self
            .store
            .read()
            .await
            .routes
            .values()
            .filter(|r| r.path.starts_with(prefix))
            .map(|r| r.path.clone())
            .collect())
    }

    async fn update_route_if_status(
        &self,
        route: &Route,
        expected: RouteStatus,
    ) -> Result<bool, GatewayError> {
        let mut store = self.store.write().await;
        match store.routes.get(&route.id) {
            Some(current) if current.status == expected => {}
            _ => return Ok(false),
        }
        if store.path_taken(&route.path, Some(route.id)) {
            return Err(GatewayError::DuplicatePath(route.path.clone()));
        }
        store.check_policy_ref(route)?;
        store.routes.insert(route.id, route.clone());
        Ok(true)
    }

    async fn delete_route_if_status(
        &self,
        id: Uuid,
        expected: RouteStatus,
    ) -> Result<bool, GatewayError> {
        let mut store = self.store.write().await;
        match store.routes.get(&id) {
            Some(current) if current.status == expected => {
                store.routes.remove(&id);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn list_routes(
        &self,
        filter: &RouteFilter,
        page: PageRequest,
    ) -> Result<Page<Route>, GatewayError> {
        let store = self.store.read().await;
        let mut matching: Vec<Route> = store
            .routes
            .values()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.path.cmp(&b.path)));
        Ok(Page::from_slice(matching, page))
    }

    async fn count_routes_using_policy(&self, policy_id: Uuid) -> Result<i64, GatewayError> {
        Ok(self.store.read().await.usage(policy_id))
    }

    async fn insert_policy(&self, policy: &RateLimitPolicy) -> Result<(), GatewayError> {
        let mut store = self.store.write().await;
        if store.policy_name_taken(&policy.name, None) {
            return Err(GatewayError::DuplicatePolicyName(policy.name.clone()));
        }
        store.policies.insert(policy.id, policy.clone());
        Ok(())
    }

    async fn find_policy(&self, id: Uuid) -> Result<Option<RateLimitPolicy>, GatewayError> {
        Ok(self.store.read().await.policies.get(&id).cloned())
    }

    async fn update_policy(&self, policy: &RateLimitPolicy) -> Result<bool, GatewayError> {
        let mut store = self.store.write().await;
        if !store.policies.contains_key(&policy.id) {
            return Ok(false);
        }
        if store.policy_name_taken(&policy.name, Some(policy.id)) {
            return Err(GatewayError::DuplicatePolicyName(policy.name.clone()));
        }
        store.policies.insert(policy.id, policy.clone());
        Ok(true)
    }

    async fn delete_policy(&self, id: Uuid) -> Result<bool, GatewayError> {
        let mut store = self.store.write().await;
        let usage = store.usage(id);
        if usage > 0 {
            return Err(GatewayError::PolicyInUse(usage));
        }
        Ok(store.policies.remove(&id).is_some())
    }

    async fn list_policies(
        &self,
        page: PageRequest,
    ) -> Result<Page<RateLimitPolicyUsage>, GatewayError> {
        let store = self.store.read().await;
        let mut policies: Vec<RateLimitPolicyUsage> = store
            .policies
            .values()
            .map(|p| RateLimitPolicyUsage {
                policy: p.clone(),
                usage_count: store.usage(p.id),
            })
            .collect();
        policies.sort_by(|a, b| a.policy.name.cmp(&b.policy.name));
        Ok(Page::from_slice(policies, page))
    }

    async fn append_audit(&self, entry: &AuditEntry) -> Result<(), GatewayError> {
        self.store.write().await.audit.push(entry.clone());
        Ok(())
    }

    async fn list_audit(
        &self,
        filter: &AuditFilter,
        page: PageRequest,
    ) -> Result<Page<AuditEntry>, GatewayError> {
        let store = self.store.read().await;
        let mut entries: Vec<AuditEntry> = store
            .audit
            .iter()
            .filter(|e| filter.matches(e))
            .cloned()
            .collect();
        if !filter.oldest_first {
            entries.reverse();
        }
        Ok(Page::from_slice(entries, page))
    }

    async fn insert_user(&self, user: &User) -> Result<(), GatewayError> {
        let mut store = self.store.write().await;
        if store
            .users
            .values()
            .any(|u| u.username.eq_ignore_ascii_case(&user.username))
        {
            return Err(GatewayError::DuplicateUsername(user.username.clone()));
        }
        store.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, GatewayError> {
        Ok(self.store.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, GatewayError> {
        Ok(self
            .store
            .read()
            .await
            .users
            .values()
            .find(|u| u.username.eq_ignore_ascii_case(username))
            .cloned())
    }

    async fn update_user(&self, user: &User) -> Result<bool, GatewayError> {
        let mut store = self.store.write().await;
        match store.users.get_mut(&user.id) {
            Some(existing) => {
                *existing = user.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list_users(&self, page: PageRequest) -> Result<Page<User>, GatewayError> {
        let store = self.store.read().await;
        let mut users: Vec<User> = store.users.values().cloned().collect();
        users.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(Page::from_slice(users, page))
    }

    async fn health_check(&self) -> Result<(), GatewayError> {
        Ok(())
    }
}
