//! Route use cases.
//!
//! Each operation runs the same pipeline: guard (authentication, role),
//! load, lifecycle precondition, ownership, content validation, conflict
//! checks, conditional write, audit, and for approvals cache invalidation.

use chrono::{DateTime, Utc};
use serde_json::{json, Map, Value};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

use super::audit::{AuditEvent, AuditRecorder};
use super::error::GatewayError;
use super::guard;
use super::lifecycle::{self, Transition};
use super::metrics::ROUTE_TRANSITIONS_TOTAL;
use super::notifier::{notify_route_published, CacheInvalidationNotifier};
use super::repository::Repository;
use super::validation;
use crate::models::{
    actions, AuditEntry, AuditFilter, EntityType, HttpMethod, Identity, OwnerFilter, Page,
    PageRequest, RequestContext, Route, RouteChanges, RouteFilter, RouteStatus,
};

/// Clone attempts before giving up on a path race.
const CLONE_PATH_ATTEMPTS: usize = 3;

#[derive(Debug, Clone, Default)]
pub struct NewRoute {
    pub path: String,
    pub upstream_url: String,
    pub methods: BTreeSet<HttpMethod>,
    pub description: Option<String>,
    pub rate_limit_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default)]
pub struct RouteListQuery {
    pub status: Option<RouteStatus>,
    pub owner: Option<OwnerFilter>,
    pub search: Option<String>,
    pub upstream: Option<String>,
    pub upstream_exact: Option<String>,
}

#[derive(Clone)]
pub struct RouteService {
    repo: Arc<dyn Repository>,
    audit: AuditRecorder,
    notifier: Arc<dyn CacheInvalidationNotifier>,
}

impl RouteService {
    pub fn new(
        repo: Arc<dyn Repository>,
        audit: AuditRecorder,
        notifier: Arc<dyn CacheInvalidationNotifier>,
    ) -> Self {
        Self {
            repo,
            audit,
            notifier,
        }
    }

    async fn load(&self, id: Uuid) -> Result<Route, GatewayError> {
        self.repo
            .find_route(id)
            .await?
            .ok_or_else(|| GatewayError::not_found("Route", id))
    }

    async fn ensure_policy_exists(&self, policy_id: Option<Uuid>) -> Result<(), GatewayError> {
        if let Some(id) = policy_id {
            if self.repo.find_policy(id).await?.is_none() {
                return Err(GatewayError::PolicyNotFound(id));
            }
        }
        Ok(())
    }

    /// Persist a lifecycle change, failing if another writer moved the route
    /// out of `expected` first.
    async fn commit(
        &self,
        route: &Route,
        expected: RouteStatus,
        transition: Transition,
    ) -> Result<(), GatewayError> {
        if self.repo.update_route_if_status(route, expected).await? {
            Ok(())
        } else {
            tracing::warn!(route_id = %route.id, %expected, transition = transition.name(), "Concurrent transition detected");
            let current = self.load(route.id).await?;
            transition.ensure_allowed(current.status)?;
            Err(GatewayError::InvalidTransition(format!(
                "Route {} was modified concurrently",
                route.id
            )))
        }
    }

    async fn record(
        &self,
        ctx: &RequestContext,
        actor: &Identity,
        events: Vec<AuditEvent>,
    ) {
        for event in &events {
            ROUTE_TRANSITIONS_TOTAL
                .with_label_values(&[event.action])
                .inc();
        }
        self.audit.record(ctx, actor, events).await;
    }

    #[instrument(skip(self, ctx, input), fields(correlation_id = %ctx.correlation_id(), path = %input.path))]
    pub async fn create_route(
        &self,
        ctx: &RequestContext,
        input: NewRoute,
    ) -> Result<Route, GatewayError> {
        let actor = guard::authorize(ctx, &guard::CREATE_ROUTE)?;

        let path = validation::normalize_path(&input.path)?;
        self.ensure_policy_exists(input.rate_limit_id).await?;
        if self.repo.route_path_exists(&path, None).await? {
            return Err(GatewayError::DuplicatePath(path));
        }

        let now = lifecycle::now();
        let route = Route {
            id: Uuid::new_v4(),
            path,
            upstream_url: input.upstream_url.trim().to_string(),
            methods: input.methods,
            description: input.description,
            status: RouteStatus::Draft,
            rate_limit_id: input.rate_limit_id,
            created_by: actor.user_id,
            created_at: now,
            updated_at: now,
            submitted_at: None,
            approved_by: None,
            approved_at: None,
            rejected_by: None,
            rejected_at: None,
            rejection_reason: None,
        };
        self.repo.insert_route(&route).await?;

        info!(route_id = %route.id, actor = %actor.username, "Route created");
        self.record(
            ctx,
            actor,
            vec![AuditEvent::route(route.id, actions::ROUTE_CREATED)
                .with_changes(json!({ "after": route.audit_snapshot() }))],
        )
        .await;

        Ok(route)
    }

    #[instrument(skip(self, ctx), fields(correlation_id = %ctx.correlation_id()))]
    pub async fn get_route(&self, ctx: &RequestContext, id: Uuid) -> Result<Route, GatewayError> {
        guard::authorize(ctx, &guard::VIEW_ROUTES)?;
        self.load(id).await
    }

    #[instrument(skip(self, ctx, query), fields(correlation_id = %ctx.correlation_id()))]
    pub async fn list_routes(
        &self,
        ctx: &RequestContext,
        query: RouteListQuery,
        page: PageRequest,
    ) -> Result<Page<Route>, GatewayError> {
        let actor = guard::authorize(ctx, &guard::VIEW_ROUTES)?;

        let filter = RouteFilter {
            status: query.status,
            created_by: query.owner.map(|owner| match owner {
                OwnerFilter::Me => actor.user_id,
                OwnerFilter::User(id) => id,
            }),
            search: non_blank(query.search),
            upstream: non_blank(query.upstream),
            upstream_exact: non_blank(query.upstream_exact),
        };
        self.repo.list_routes(&filter, page).await
    }

    #[instrument(skip(self, ctx), fields(correlation_id = %ctx.correlation_id()))]
    pub async fn list_pending_routes(
        &self,
        ctx: &RequestContext,
        page: PageRequest,
    ) -> Result<Page<Route>, GatewayError> {
        guard::authorize(ctx, &guard::REVIEW_ROUTE)?;
        let filter = RouteFilter {
            status: Some(RouteStatus::Pending),
            ..Default::default()
        };
        self.repo.list_routes(&filter, page).await
    }

    #[instrument(skip(self, ctx, changes), fields(correlation_id = %ctx.correlation_id()))]
    pub async fn update_route(
        &self,
        ctx: &RequestContext,
        id: Uuid,
        mut changes: RouteChanges,
    ) -> Result<Route, GatewayError> {
        let policy = guard::UPDATE_ROUTE;
        let actor = guard::authorize(ctx, &policy)?;
        let before = self.load(id).await?;
        Transition::Update.ensure_allowed(before.status)?;
        guard::check_ownership(actor, &policy, before.created_by)?;

        if let Some(path) = changes.path.take() {
            changes.path = Some(validation::normalize_path(&path)?);
        }
        if let Some(upstream) = changes.upstream_url.take() {
            changes.upstream_url = Some(upstream.trim().to_string());
        }
        if let Some(policy_id) = changes.rate_limit_id {
            self.ensure_policy_exists(policy_id).await?;
        }
        if let Some(path) = &changes.path {
            if path != &before.path && self.repo.route_path_exists(path, Some(id)).await? {
                return Err(GatewayError::DuplicatePath(path.clone()));
            }
        }

        let mut route = before.clone();
        lifecycle::apply_update(&mut route, changes, lifecycle::now());
        self.commit(&route, RouteStatus::Draft, Transition::Update)
            .await?;

        info!(route_id = %id, actor = %actor.username, "Route updated");
        self.record(
            ctx,
            actor,
            vec![AuditEvent::route(id, actions::ROUTE_UPDATED)
                .with_changes(diff(&before.audit_snapshot(), &route.audit_snapshot()))],
        )
        .await;

        Ok(route)
    }

    #[instrument(skip(self, ctx), fields(correlation_id = %ctx.correlation_id()))]
    pub async fn delete_route(&self, ctx: &RequestContext, id: Uuid) -> Result<(), GatewayError> {
        let policy = guard::DELETE_ROUTE;
        let actor = guard::authorize(ctx, &policy)?;
        let route = self.load(id).await?;
        Transition::Delete.ensure_allowed(route.status)?;
        guard::check_ownership(actor, &policy, route.created_by)?;

        if !self
            .repo
            .delete_route_if_status(id, RouteStatus::Draft)
            .await?
        {
            let current = self.load(id).await?;
            Transition::Delete.ensure_allowed(current.status)?;
            return Err(GatewayError::InvalidTransition(format!(
                "Route {} was modified concurrently",
                id
            )));
        }

        info!(route_id = %id, actor = %actor.username, "Route deleted");
        self.record(
            ctx,
            actor,
            vec![AuditEvent::route(id, actions::ROUTE_DELETED)
                .with_changes(json!({ "before": route.audit_snapshot() }))],
        )
        .await;

        Ok(())
    }

    #[instrument(skip(self, ctx), fields(correlation_id = %ctx.correlation_id()))]
    pub async fn submit_route(&self, ctx: &RequestContext, id: Uuid) -> Result<Route, GatewayError> {
        let policy = guard::SUBMIT_ROUTE;
        let actor = guard::authorize(ctx, &policy)?;
        let mut route = self.load(id).await?;
        Transition::Submit.ensure_allowed(route.status)?;
        guard::check_ownership(actor, &policy, route.created_by)?;
        validation::validate_for_submission(&route)?;

        let prior = route.status;
        let action = lifecycle::apply_submit(&mut route, lifecycle::now());
        self.commit(&route, prior, Transition::Submit).await?;

        info!(route_id = %id, actor = %actor.username, from = %prior, "Route submitted for review");
        self.record(
            ctx,
            actor,
            vec![AuditEvent::route(id, action).with_changes(json!({
                "status": { "before": prior, "after": route.status },
                "submittedAt": route.submitted_at,
            }))],
        )
        .await;

        Ok(route)
    }

    #[instrument(skip(self, ctx), fields(correlation_id = %ctx.correlation_id()))]
    pub async fn approve_route(
        &self,
        ctx: &RequestContext,
        id: Uuid,
    ) -> Result<Route, GatewayError> {
        let actor = guard::authorize(ctx, &guard::REVIEW_ROUTE)?;
        let mut route = self.load(id).await?;
        Transition::Approve.ensure_allowed(route.status)?;

        lifecycle::apply_approve(&mut route, actor.user_id, lifecycle::now());
        self.commit(&route, RouteStatus::Pending, Transition::Approve)
            .await?;

        info!(route_id = %id, actor = %actor.username, "Route approved and published");
        let status_change = json!({
            "status": { "before": RouteStatus::Pending, "after": RouteStatus::Published },
        });
        self.record(
            ctx,
            actor,
            vec![
                AuditEvent::route(id, actions::APPROVED).with_changes(status_change),
                AuditEvent::route(id, actions::PUBLISHED)
                    .with_changes(json!({ "path": route.path, "upstreamUrl": route.upstream_url })),
            ],
        )
        .await;

        notify_route_published(self.notifier.as_ref(), id).await;
        Ok(route)
    }

    #[instrument(skip(self, ctx, reason), fields(correlation_id = %ctx.correlation_id()))]
    pub async fn reject_route(
        &self,
        ctx: &RequestContext,
        id: Uuid,
        reason: Option<String>,
    ) -> Result<Route, GatewayError> {
        let actor = guard::authorize(ctx, &guard::REVIEW_ROUTE)?;
        let mut route = self.load(id).await?;
        Transition::Reject.ensure_allowed(route.status)?;
        let reason = lifecycle::require_reason(reason.as_deref())?;

        lifecycle::apply_reject(&mut route, actor.user_id, reason.clone(), lifecycle::now());
        self.commit(&route, RouteStatus::Pending, Transition::Reject)
            .await?;

        info!(route_id = %id, actor = %actor.username, "Route rejected");
        self.record(
            ctx,
            actor,
            vec![AuditEvent::route(id, actions::REJECTED).with_changes(json!({
                "status": { "before": RouteStatus::Pending, "after": RouteStatus::Rejected },
                "reason": reason,
            }))],
        )
        .await;

        Ok(route)
    }

    #[instrument(skip(self, ctx), fields(correlation_id = %ctx.correlation_id()))]
    pub async fn clone_route(&self, ctx: &RequestContext, id: Uuid) -> Result<Route, GatewayError> {
        let actor = guard::authorize(ctx, &guard::CLONE_ROUTE)?;
        let source = self.load(id).await?;
        let sibling_prefix = format!("{}{}", source.path, validation::CLONE_SUFFIX);

        let mut attempt = 0;
        let clone = loop {
            attempt += 1;
            let existing = self.repo.find_paths_with_prefix(&sibling_prefix).await?;
            let now = lifecycle::now();
            let candidate = Route {
                id: Uuid::new_v4(),
                path: validation::next_clone_path(&source.path, &existing),
                upstream_url: source.upstream_url.clone(),
                methods: source.methods.clone(),
                description: source.description.clone(),
                status: RouteStatus::Draft,
                rate_limit_id: source.rate_limit_id,
                created_by: actor.user_id,
                created_at: now,
                updated_at: now,
                submitted_at: None,
                approved_by: None,
                approved_at: None,
                rejected_by: None,
                rejected_at: None,
                rejection_reason: None,
            };

            match self.repo.insert_route(&candidate).await {
                Ok(()) => break candidate,
                Err(GatewayError::DuplicatePath(path)) if attempt < CLONE_PATH_ATTEMPTS => {
                    tracing::debug!(%path, attempt, "Clone path taken concurrently, retrying");
                }
                Err(e) => return Err(e),
            }
        };

        info!(source_id = %id, route_id = %clone.id, path = %clone.path, "Route cloned");
        self.record(
            ctx,
            actor,
            vec![AuditEvent::route(clone.id, actions::ROUTE_CLONED).with_changes(json!({
                "sourceId": id,
                "sourcePath": source.path,
                "after": clone.audit_snapshot(),
            }))],
        )
        .await;

        Ok(clone)
    }

    #[instrument(skip(self, ctx), fields(correlation_id = %ctx.correlation_id()))]
    pub async fn route_history(
        &self,
        ctx: &RequestContext,
        id: Uuid,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
        page: PageRequest,
    ) -> Result<Page<AuditEntry>, GatewayError> {
        guard::authorize(ctx, &guard::VIEW_ROUTES)?;
        let filter = AuditFilter {
            from,
            to,
            ..Default::default()
        };
        self.audit
            .history(EntityType::Route, id, filter, page)
            .await
    }

    #[instrument(skip(self, ctx, filter), fields(correlation_id = %ctx.correlation_id()))]
    pub async fn audit_log(
        &self,
        ctx: &RequestContext,
        filter: AuditFilter,
        page: PageRequest,
    ) -> Result<Page<AuditEntry>, GatewayError> {
        guard::authorize(ctx, &guard::READ_AUDIT_LOG)?;
        self.audit.search(filter, page).await
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// `{field: {before, after}}` for every field that changed.
fn diff(before: &Value, after: &Value) -> Value {
    let mut changes = Map::new();
    if let (Some(before), Some(after)) = (before.as_object(), after.as_object()) {
        for (key, new) in after {
            let old = before.get(key).unwrap_or(&Value::Null);
            if old != new {
                changes.insert(key.clone(), json!({ "before": old, "after": new }));
            }
        }
    }
    Value::Object(changes)
}
