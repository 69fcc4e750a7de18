//! Route lifecycle state machine.
//!
//! ```text
//! Draft --submit--> Pending --approve--> Published
//!   ^                 |  ^
//!   |              reject |
//! (update/delete)     v  | submit
//!                   Rejected
//! ```
//!
//! Preconditions are enforced independently of the actor's role. The effects
//! here are pure mutations of an in-memory [`Route`]; persisting them with a
//! conditional write on the prior status is the caller's job.

use chrono::{DateTime, Duration, SubsecRound, Utc};
use uuid::Uuid;

use super::error::GatewayError;
use crate::models::{actions, Route, RouteChanges, RouteStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Update,
    Delete,
    Submit,
    Approve,
    Reject,
}

impl Transition {
    pub fn allowed_from(self) -> &'static [RouteStatus] {
        match self {
            Self::Update | Self::Delete => &[RouteStatus::Draft],
            Self::Submit => &[RouteStatus::Draft, RouteStatus::Rejected],
            Self::Approve | Self::Reject => &[RouteStatus::Pending],
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Submit => "submit",
            Self::Approve => "approve",
            Self::Reject => "reject",
        }
    }

    fn rejection_message(self) -> &'static str {
        match self {
            Self::Update => "Only draft routes can be updated",
            Self::Delete => "Only draft routes can be deleted",
            Self::Submit => "Only draft or rejected routes can be submitted",
            Self::Approve => "Only pending routes can be approved",
            Self::Reject => "Only pending routes can be rejected",
        }
    }

    /// Fails with `InvalidTransition` unless `current` is a legal source state.
    pub fn ensure_allowed(self, current: RouteStatus) -> Result<(), GatewayError> {
        if self.allowed_from().contains(&current) {
            Ok(())
        } else {
            Err(GatewayError::InvalidTransition(
                self.rejection_message().to_string(),
            ))
        }
    }
}

/// Wall clock truncated to the store's microsecond precision.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

pub fn apply_update(route: &mut Route, changes: RouteChanges, at: DateTime<Utc>) {
    if let Some(path) = changes.path {
        route.path = path;
    }
    if let Some(upstream_url) = changes.upstream_url {
        route.upstream_url = upstream_url;
    }
    if let Some(methods) = changes.methods {
        route.methods = methods;
    }
    if let Some(description) = changes.description {
        route.description = description;
    }
    if let Some(rate_limit_id) = changes.rate_limit_id {
        route.rate_limit_id = rate_limit_id;
    }
    route.updated_at = at;
}

/// Move to `Pending`. Returns the audit action for the submission.
///
/// `submitted_at` is kept strictly increasing across resubmissions even when
/// the clock has not advanced past the previous value.
pub fn apply_submit(route: &mut Route, at: DateTime<Utc>) -> &'static str {
    let action = if route.status == RouteStatus::Rejected {
        actions::ROUTE_RESUBMITTED
    } else {
        actions::ROUTE_SUBMITTED
    };

    let submitted_at = match route.submitted_at {
        Some(previous) if at <= previous => previous + Duration::microseconds(1),
        _ => at,
    };

    route.status = RouteStatus::Pending;
    route.submitted_at = Some(submitted_at);
    route.updated_at = submitted_at;
    route.rejected_by = None;
    route.rejected_at = None;
    route.rejection_reason = None;
    route.approved_by = None;
    route.approved_at = None;
    action
}

pub fn apply_approve(route: &mut Route, approver: Uuid, at: DateTime<Utc>) {
    route.status = RouteStatus::Published;
    route.approved_by = Some(approver);
    route.approved_at = Some(at);
    route.updated_at = at;
}

pub fn apply_reject(route: &mut Route, reviewer: Uuid, reason: String, at: DateTime<Utc>) {
    route.status = RouteStatus::Rejected;
    route.rejected_by = Some(reviewer);
    route.rejected_at = Some(at);
    route.rejection_reason = Some(reason);
    route.updated_at = at;
}

/// Non-blank, trimmed rejection reason.
pub fn require_reason(reason: Option<&str>) -> Result<String, GatewayError> {
    match reason.map(str::trim) {
        Some(reason) if !reason.is_empty() => Ok(reason.to_string()),
        _ => Err(GatewayError::validation("A rejection reason is required")),
    }
}
