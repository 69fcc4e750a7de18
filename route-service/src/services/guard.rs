//! Authorization guard.
//!
//! Every use case starts by evaluating its declared [`AccessPolicy`] against
//! the request context. Checks run in a fixed order so clients always observe
//! the same status for the same situation: authentication (401), role (403),
//! then ownership (403) once the caller has loaded the resource.

use uuid::Uuid;

use super::error::GatewayError;
use crate::models::{CredentialFailure, Identity, RequestContext, Role};

/// How a resource's recorded creator constrains the actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ownership {
    NotChecked,
    /// Only the creator may act, regardless of role.
    OwnerOnly,
    /// The creator, or anyone holding at least the given role.
    OwnerOrAtLeast(Role),
}

#[derive(Debug, Clone, Copy)]
pub struct AccessPolicy {
    /// Acceptable roles; the actor passes if it satisfies any of them.
    pub required_roles: &'static [Role],
    pub ownership: Ownership,
    pub verb: &'static str,
    pub resource: &'static str,
}

const ANY_ROLE: &[Role] = &[Role::Developer];
const SECURITY_OR_ABOVE: &[Role] = &[Role::Security];
const ADMIN_ONLY: &[Role] = &[Role::Admin];

pub const CREATE_ROUTE: AccessPolicy = AccessPolicy {
    required_roles: ANY_ROLE,
    ownership: Ownership::NotChecked,
    verb: "create",
    resource: "routes",
};

pub const VIEW_ROUTES: AccessPolicy = AccessPolicy {
    required_roles: ANY_ROLE,
    ownership: Ownership::NotChecked,
    verb: "view",
    resource: "routes",
};

pub const UPDATE_ROUTE: AccessPolicy = AccessPolicy {
    required_roles: ANY_ROLE,
    ownership: Ownership::OwnerOrAtLeast(Role::Security),
    verb: "update",
    resource: "routes",
};

pub const DELETE_ROUTE: AccessPolicy = AccessPolicy {
    required_roles: ANY_ROLE,
    ownership: Ownership::OwnerOrAtLeast(Role::Security),
    verb: "delete",
    resource: "routes",
};

pub const SUBMIT_ROUTE: AccessPolicy = AccessPolicy {
    required_roles: ANY_ROLE,
    ownership: Ownership::OwnerOnly,
    verb: "submit",
    resource: "routes",
};

pub const REVIEW_ROUTE: AccessPolicy = AccessPolicy {
    required_roles: SECURITY_OR_ABOVE,
    ownership: Ownership::NotChecked,
    verb: "review",
    resource: "routes",
};

pub const CLONE_ROUTE: AccessPolicy = AccessPolicy {
    required_roles: ANY_ROLE,
    ownership: Ownership::NotChecked,
    verb: "clone",
    resource: "routes",
};

pub const READ_AUDIT_LOG: AccessPolicy = AccessPolicy {
    required_roles: SECURITY_OR_ABOVE,
    ownership: Ownership::NotChecked,
    verb: "read",
    resource: "audit log",
};

pub const READ_RATE_LIMITS: AccessPolicy = AccessPolicy {
    required_roles: ANY_ROLE,
    ownership: Ownership::NotChecked,
    verb: "read",
    resource: "rate limit policies",
};

pub const MANAGE_RATE_LIMITS: AccessPolicy = AccessPolicy {
    required_roles: SECURITY_OR_ABOVE,
    ownership: Ownership::NotChecked,
    verb: "manage",
    resource: "rate limit policies",
};

pub const MANAGE_USERS: AccessPolicy = AccessPolicy {
    required_roles: ADMIN_ONLY,
    ownership: Ownership::NotChecked,
    verb: "manage",
    resource: "users",
};

/// Identity present? The 401 detail says why not.
pub fn authenticate(ctx: &RequestContext) -> Result<&Identity, GatewayError> {
    ctx.identity.as_ref().ok_or_else(|| {
        let failure = ctx.credential_failure.unwrap_or(CredentialFailure::Missing);
        GatewayError::AuthenticationRequired(failure.detail().to_string())
    })
}

/// Authentication then role requirement. Ownership is checked separately once
/// the resource is loaded.
pub fn authorize<'a>(
    ctx: &'a RequestContext,
    policy: &AccessPolicy,
) -> Result<&'a Identity, GatewayError> {
    let identity = authenticate(ctx)?;
    if !identity.role.satisfies_any(policy.required_roles) {
        return Err(GatewayError::InsufficientRole(format!(
            "Role {} is not allowed to {} {}",
            identity.role, policy.verb, policy.resource
        )));
    }
    Ok(identity)
}

/// Ownership predicate against an already-loaded creator id.
pub fn check_ownership(
    identity: &Identity,
    policy: &AccessPolicy,
    created_by: Uuid,
) -> Result<(), GatewayError> {
    let permitted = match policy.ownership {
        Ownership::NotChecked => true,
        Ownership::OwnerOnly => identity.user_id == created_by,
        Ownership::OwnerOrAtLeast(floor) => {
            identity.user_id == created_by || identity.role.satisfies(floor)
        }
    };

    if permitted {
        Ok(())
    } else {
        Err(GatewayError::NotOwner(format!(
            "You can only {} your own {}",
            policy.verb, policy.resource
        )))
    }
}
