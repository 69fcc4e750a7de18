//! Audit recording.
//!
//! Entries are enriched from the request's captured correlation context. A
//! failed write is logged and counted but never changes the outcome of the
//! operation that produced it.

use std::sync::Arc;
use uuid::Uuid;

use super::error::GatewayError;
use super::metrics::AUDIT_WRITE_FAILURES;
use super::repository::Repository;
use crate::models::{AuditEntry, AuditFilter, EntityType, Identity, Page, PageRequest, RequestContext};
use crate::services::lifecycle;

/// When audit writes happen relative to the response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuditMode {
    /// Awaited before the operation returns.
    #[default]
    Inline,
    /// Spawned onto the runtime; the response does not wait for it.
    Detached,
}

impl std::str::FromStr for AuditMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "inline" => Ok(AuditMode::Inline),
            "detached" => Ok(AuditMode::Detached),
            _ => Err(format!("Invalid audit mode: {}", s)),
        }
    }
}

/// One logical event to record.
#[derive(Debug, Clone)]
pub struct AuditEvent {
    pub entity_type: EntityType,
    pub entity_id: Uuid,
    pub action: &'static str,
    pub changes: Option<serde_json::Value>,
}

impl AuditEvent {
    pub fn route(entity_id: Uuid, action: &'static str) -> Self {
        Self {
            entity_type: EntityType::Route,
            entity_id,
            action,
            changes: None,
        }
    }

    pub fn rate_limit(entity_id: Uuid, action: &'static str) -> Self {
        Self {
            entity_type: EntityType::RateLimit,
            entity_id,
            action,
            changes: None,
        }
    }

    pub fn user(entity_id: Uuid, action: &'static str) -> Self {
        Self {
            entity_type: EntityType::User,
            entity_id,
            action,
            changes: None,
        }
    }

    pub fn with_changes(mut self, changes: serde_json::Value) -> Self {
        self.changes = Some(changes);
        self
    }
}

#[derive(Clone)]
pub struct AuditRecorder {
    repo: Arc<dyn Repository>,
    mode: AuditMode,
}

impl AuditRecorder {
    pub fn new(repo: Arc<dyn Repository>, mode: AuditMode) -> Self {
        Self { repo, mode }
    }

    /// Append the events in order, attributed to `actor`.
    pub async fn record(&self, ctx: &RequestContext, actor: &Identity, events: Vec<AuditEvent>) {
        let timestamp = lifecycle::now();
        let entries: Vec<AuditEntry> = events
            .into_iter()
            .map(|event| AuditEntry {
                id: Uuid::new_v4(),
                entity_type: event.entity_type,
                entity_id: event.entity_id,
                action: event.action.to_string(),
                actor_id: actor.user_id,
                actor_username: actor.username.clone(),
                changes: event.changes,
                ip_address: ctx.ip_address().map(str::to_string),
                correlation_id: ctx.correlation_id().to_string(),
                timestamp,
            })
            .collect();

        match self.mode {
            AuditMode::Inline => write_all(self.repo.as_ref(), entries).await,
            AuditMode::Detached => {
                let repo = self.repo.clone();
                tokio::spawn(async move { write_all(repo.as_ref(), entries).await });
            }
        }
    }

    /// Entries for one entity, oldest first.
    pub async fn history(
        &self,
        entity_type: EntityType,
        entity_id: Uuid,
        mut filter: AuditFilter,
        page: PageRequest,
    ) -> Result<Page<AuditEntry>, GatewayError> {
        filter.entity_type = Some(entity_type);
        filter.entity_id = Some(entity_id);
        filter.oldest_first = true;
        self.repo.list_audit(&filter, page).await
    }

    /// Global audit log, newest first.
    pub async fn search(
        &self,
        mut filter: AuditFilter,
        page: PageRequest,
    ) -> Result<Page<AuditEntry>, GatewayError> {
        filter.oldest_first = false;
        self.repo.list_audit(&filter, page).await
    }
}

async fn write_all(repo: &dyn Repository, entries: Vec<AuditEntry>) {
    for entry in entries {
        if let Err(e) = repo.append_audit(&entry).await {
            AUDIT_WRITE_FAILURES
                .with_label_values(&[entry.action.as_str()])
                .inc();
            tracing::error!(
                entity_type = %entry.entity_type,
                entity_id = %entry.entity_id,
                action = %entry.action,
                correlation_id = %entry.correlation_id,
                error = %e,
                "Failed to write audit entry"
            );
        }
    }
}
