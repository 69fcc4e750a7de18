//! Rate-limit policy administration.

use serde_json::json;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

use super::audit::{AuditEvent, AuditRecorder};
use super::error::GatewayError;
use super::guard;
use super::lifecycle;
use super::repository::Repository;
use super::validation;
use crate::models::{actions, Page, PageRequest, RateLimitPolicy, RateLimitPolicyUsage, RequestContext};

#[derive(Debug, Clone)]
pub struct PolicyInput {
    pub name: String,
    pub requests_per_second: i32,
    pub burst_size: i32,
}

#[derive(Clone)]
pub struct RateLimitService {
    repo: Arc<dyn Repository>,
    audit: AuditRecorder,
}

impl RateLimitService {
    pub fn new(repo: Arc<dyn Repository>, audit: AuditRecorder) -> Self {
        Self { repo, audit }
    }

    async fn load(&self, id: Uuid) -> Result<RateLimitPolicy, GatewayError> {
        self.repo
            .find_policy(id)
            .await?
            .ok_or_else(|| GatewayError::not_found("Rate limit policy", id))
    }

    #[instrument(skip(self, ctx), fields(correlation_id = %ctx.correlation_id()))]
    pub async fn list(
        &self,
        ctx: &RequestContext,
        page: PageRequest,
    ) -> Result<Page<RateLimitPolicyUsage>, GatewayError> {
        guard::authorize(ctx, &guard::READ_RATE_LIMITS)?;
        self.repo.list_policies(page).await
    }

    #[instrument(skip(self, ctx), fields(correlation_id = %ctx.correlation_id()))]
    pub async fn get(
        &self,
        ctx: &RequestContext,
        id: Uuid,
    ) -> Result<RateLimitPolicyUsage, GatewayError> {
        guard::authorize(ctx, &guard::READ_RATE_LIMITS)?;
        let policy = self.load(id).await?;
        let usage_count = self.repo.count_routes_using_policy(id).await?;
        Ok(RateLimitPolicyUsage {
            policy,
            usage_count,
        })
    }

    #[instrument(skip(self, ctx, input), fields(correlation_id = %ctx.correlation_id(), name = %input.name))]
    pub async fn create(
        &self,
        ctx: &RequestContext,
        input: PolicyInput,
    ) -> Result<RateLimitPolicyUsage, GatewayError> {
        let actor = guard::authorize(ctx, &guard::MANAGE_RATE_LIMITS)?;
        let name =
            validation::validate_policy(&input.name, input.requests_per_second, input.burst_size)?;

        let now = lifecycle::now();
        let policy = RateLimitPolicy {
            id: Uuid::new_v4(),
            name,
            requests_per_second: input.requests_per_second,
            burst_size: input.burst_size,
            created_by: actor.user_id,
            created_at: now,
            updated_at: now,
        };
        self.repo.insert_policy(&policy).await?;

        info!(policy_id = %policy.id, actor = %actor.username, "Rate limit policy created");
        self.audit
            .record(
                ctx,
                actor,
                vec![AuditEvent::rate_limit(policy.id, actions::RATE_LIMIT_CREATED)
                    .with_changes(json!({ "after": policy.audit_snapshot() }))],
            )
            .await;

        Ok(RateLimitPolicyUsage {
            policy,
            usage_count: 0,
        })
    }

    #[instrument(skip(self, ctx, input), fields(correlation_id = %ctx.correlation_id()))]
    pub async fn update(
        &self,
        ctx: &RequestContext,
        id: Uuid,
        input: PolicyInput,
    ) -> Result<RateLimitPolicyUsage, GatewayError> {
        let actor = guard::authorize(ctx, &guard::MANAGE_RATE_LIMITS)?;
        let before = self.load(id).await?;
        let name =
            validation::validate_policy(&input.name, input.requests_per_second, input.burst_size)?;

        let policy = RateLimitPolicy {
            name,
            requests_per_second: input.requests_per_second,
            burst_size: input.burst_size,
            updated_at: lifecycle::now(),
            ..before.clone()
        };
        if !self.repo.update_policy(&policy).await? {
            return Err(GatewayError::not_found("Rate limit policy", id));
        }

        info!(policy_id = %id, actor = %actor.username, "Rate limit policy updated");
        self.audit
            .record(
                ctx,
                actor,
                vec![AuditEvent::rate_limit(id, actions::RATE_LIMIT_UPDATED).with_changes(json!({
                    "before": before.audit_snapshot(),
                    "after": policy.audit_snapshot(),
                }))],
            )
            .await;

        let usage_count = self.repo.count_routes_using_policy(id).await?;
        Ok(RateLimitPolicyUsage {
            policy,
            usage_count,
        })
    }

    #[instrument(skip(self, ctx), fields(correlation_id = %ctx.correlation_id()))]
    pub async fn delete(&self, ctx: &RequestContext, id: Uuid) -> Result<(), GatewayError> {
        let actor = guard::authorize(ctx, &guard::MANAGE_RATE_LIMITS)?;
        let policy = self.load(id).await?;

        let usage = self.repo.count_routes_using_policy(id).await?;
        if usage > 0 {
            return Err(GatewayError::PolicyInUse(usage));
        }
        if !self.repo.delete_policy(id).await? {
            return Err(GatewayError::not_found("Rate limit policy", id));
        }

        info!(policy_id = %id, actor = %actor.username, "Rate limit policy deleted");
        self.audit
            .record(
                ctx,
                actor,
                vec![AuditEvent::rate_limit(id, actions::RATE_LIMIT_DELETED)
                    .with_changes(json!({ "before": policy.audit_snapshot() }))],
            )
            .await;

        Ok(())
    }
}
