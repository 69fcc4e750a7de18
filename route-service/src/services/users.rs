//! Local user accounts and login.

use serde_json::json;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::audit::{AuditEvent, AuditRecorder};
use super::credentials::CredentialValidator;
use super::error::GatewayError;
use super::guard;
use super::lifecycle;
use super::repository::Repository;
use crate::models::{actions, Identity, Page, PageRequest, RequestContext, Role, SanitizedUser, User};
use crate::utils::password::{hash_password, verify_password, Password, MIN_PASSWORD_LENGTH};

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: Option<String>,
    pub password: Password,
    pub role: Role,
}

/// Successful login.
#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub expires_in: i64,
    pub user: SanitizedUser,
}

#[derive(Clone)]
pub struct UserService {
    repo: Arc<dyn Repository>,
    audit: AuditRecorder,
    credentials: CredentialValidator,
}

impl UserService {
    pub fn new(
        repo: Arc<dyn Repository>,
        audit: AuditRecorder,
        credentials: CredentialValidator,
    ) -> Self {
        Self {
            repo,
            audit,
            credentials,
        }
    }

    async fn load(&self, id: Uuid) -> Result<User, GatewayError> {
        self.repo
            .find_user(id)
            .await?
            .ok_or_else(|| GatewayError::not_found("User", id))
    }

    fn build_user(input: NewUser) -> Result<User, GatewayError> {
        let username = input.username.trim().to_string();
        if username.is_empty() {
            return Err(GatewayError::validation("Username must not be empty"));
        }
        if !input.password.meets_minimum_length() {
            return Err(GatewayError::validation(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LENGTH
            )));
        }

        let now = lifecycle::now();
        Ok(User {
            id: Uuid::new_v4(),
            username,
            email: input.email.map(|e| e.trim().to_string()).filter(|e| !e.is_empty()),
            password_hash: hash_password(&input.password)?,
            role: input.role,
            active: true,
            created_at: now,
            updated_at: now,
        })
    }

    #[instrument(skip(self, username, password))]
    pub async fn login(&self, username: &str, password: &Password) -> Result<Session, GatewayError> {
        let user = match self.repo.find_user_by_username(username.trim()).await? {
            Some(user) if user.active => user,
            _ => {
                warn!("Login attempt for unknown or inactive user");
                return Err(invalid_login());
            }
        };

        if !verify_password(password, &user.password_hash)? {
            warn!(user_id = %user.id, "Login attempt with wrong password");
            return Err(invalid_login());
        }

        let token = self.credentials.issue(&user)?;
        info!(user_id = %user.id, role = %user.role, "User logged in");
        Ok(Session {
            token,
            expires_in: self.credentials.access_token_expiry_seconds(),
            user: user.into(),
        })
    }

    /// Identity resolved from the caller's credential.
    pub fn me(&self, ctx: &RequestContext) -> Result<Identity, GatewayError> {
        let identity = guard::authenticate(ctx)?;
        Ok(identity.clone())
    }

    #[instrument(skip(self, ctx), fields(correlation_id = %ctx.correlation_id()))]
    pub async fn list(
        &self,
        ctx: &RequestContext,
        page: PageRequest,
    ) -> Result<Page<SanitizedUser>, GatewayError> {
        guard::authorize(ctx, &guard::MANAGE_USERS)?;
        Ok(self.repo.list_users(page).await?.map(SanitizedUser::from))
    }

    #[instrument(skip(self, ctx, input), fields(correlation_id = %ctx.correlation_id(), username = %input.username))]
    pub async fn create(
        &self,
        ctx: &RequestContext,
        input: NewUser,
    ) -> Result<SanitizedUser, GatewayError> {
        let actor = guard::authorize(ctx, &guard::MANAGE_USERS)?;
        let user = Self::build_user(input)?;
        if self.repo.find_user_by_username(&user.username).await?.is_some() {
            return Err(GatewayError::DuplicateUsername(user.username));
        }
        self.repo.insert_user(&user).await?;

        info!(user_id = %user.id, role = %user.role, actor = %actor.username, "User created");
        self.audit
            .record(
                ctx,
                actor,
                vec![AuditEvent::user(user.id, actions::USER_CREATED).with_changes(json!({
                    "username": user.username,
                    "role": user.role,
                }))],
            )
            .await;

        Ok(user.into())
    }

    #[instrument(skip(self, ctx), fields(correlation_id = %ctx.correlation_id()))]
    pub async fn change_role(
        &self,
        ctx: &RequestContext,
        id: Uuid,
        role: Role,
    ) -> Result<SanitizedUser, GatewayError> {
        let actor = guard::authorize(ctx, &guard::MANAGE_USERS)?;
        let mut user = self.load(id).await?;
        if user.id == actor.user_id && role != user.role {
            return Err(GatewayError::validation("You cannot change your own role"));
        }
        if user.role == role {
            return Ok(user.into());
        }

        let before = user.role;
        user.role = role;
        user.updated_at = lifecycle::now();
        if !self.repo.update_user(&user).await? {
            return Err(GatewayError::not_found("User", id));
        }

        info!(user_id = %id, %before, after = %role, actor = %actor.username, "User role changed");
        self.audit
            .record(
                ctx,
                actor,
                vec![AuditEvent::user(id, actions::ROLE_CHANGED)
                    .with_changes(json!({ "before": before, "after": role }))],
            )
            .await;

        Ok(user.into())
    }

    #[instrument(skip(self, ctx), fields(correlation_id = %ctx.correlation_id()))]
    pub async fn deactivate(&self, ctx: &RequestContext, id: Uuid) -> Result<(), GatewayError> {
        let actor = guard::authorize(ctx, &guard::MANAGE_USERS)?;
        let mut user = self.load(id).await?;
        if user.id == actor.user_id {
            return Err(GatewayError::validation("You cannot deactivate your own account"));
        }
        if !user.active {
            return Ok(());
        }

        user.active = false;
        user.updated_at = lifecycle::now();
        if !self.repo.update_user(&user).await? {
            return Err(GatewayError::not_found("User", id));
        }

        info!(user_id = %id, actor = %actor.username, "User deactivated");
        self.audit
            .record(
                ctx,
                actor,
                vec![AuditEvent::user(id, actions::USER_DEACTIVATED)
                    .with_changes(json!({ "active": { "before": true, "after": false } }))],
            )
            .await;

        Ok(())
    }

    /// Create the configured administrator if no account with that name exists.
    #[instrument(skip(self, password))]
    pub async fn ensure_bootstrap_admin(
        &self,
        username: &str,
        password: Password,
    ) -> Result<(), GatewayError> {
        if self.repo.find_user_by_username(username).await?.is_some() {
            return Ok(());
        }

        let user = Self::build_user(NewUser {
            username: username.to_string(),
            email: None,
            password,
            role: Role::Admin,
        })?;
        match self.repo.insert_user(&user).await {
            Ok(()) => {
                info!(user_id = %user.id, "Bootstrap administrator created");
                Ok(())
            }
            Err(GatewayError::DuplicateUsername(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }
}

/// Same detail for unknown, inactive and wrong-password logins.
fn invalid_login() -> GatewayError {
    GatewayError::AuthenticationRequired("Invalid username or password".to_string())
}
