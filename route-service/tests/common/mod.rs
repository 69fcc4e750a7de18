#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::Utc;
use http_body_util::BodyExt;
use route_service::{
    build_router,
    config::{
        CookieConfig, DatabaseConfig, Environment, GatewayConfig, JwtConfig, RateLimitConfig,
        SecurityConfig,
    },
    models::{CorrelationContext, Identity, RequestContext, Role, User},
    services::{AuditMode, InMemoryRepository, RecordingNotifier, Repository},
    utils::password::{hash_password, Password},
    AppState,
};
use secrecy::Secret;
use serde_json::Value;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

pub const JWT_SECRET: &str = "integration-test-secret-of-sufficient-length";
pub const PASSWORD: &str = "correct-horse-battery";

pub fn test_config() -> GatewayConfig {
    GatewayConfig {
        common: service_core::config::Config {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 8080,
        },
        environment: Environment::Dev,
        service_name: "route-service".to_string(),
        service_version: "test".to_string(),
        log_level: "debug".to_string(),
        otlp_endpoint: None,
        database: DatabaseConfig {
            url: Secret::new("postgres://unused".to_string()),
            max_connections: 1,
            min_connections: 1,
        },
        redis: None,
        jwt: JwtConfig {
            secret: Secret::new(JWT_SECRET.to_string()),
            issuer: "route-service".to_string(),
            access_token_expiry_minutes: 30,
            federated_public_key_path: None,
            federated_issuer: None,
        },
        cookie: CookieConfig {
            name: "access_token".to_string(),
            secure: false,
        },
        security: SecurityConfig {
            allowed_origins: vec!["http://localhost:3000".to_string()],
        },
        audit_mode: AuditMode::Inline,
        rate_limit: RateLimitConfig {
            global_ip_limit: 10_000,
            global_ip_window_seconds: 60,
            login_attempts: 1_000,
            login_window_seconds: 60,
        },
        bootstrap_admin: None,
    }
}

/// A service wired over in-memory persistence and a recording notifier.
pub struct TestApp {
    pub state: AppState,
    pub repo: Arc<InMemoryRepository>,
    pub notifier: Arc<RecordingNotifier>,
    pub router: Router,
}

/// Seeded user with a signed credential.
#[derive(Debug, Clone)]
pub struct TestUser {
    pub identity: Identity,
    pub token: String,
}

impl TestUser {
    pub fn id(&self) -> Uuid {
        self.identity.user_id
    }

    pub fn ctx(&self) -> RequestContext {
        RequestContext::authenticated(
            self.identity.clone(),
            CorrelationContext {
                correlation_id: Uuid::new_v4().to_string(),
                ip_address: Some("203.0.113.10".to_string()),
            },
        )
    }
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_notifier(RecordingNotifier::new())
    }

    pub fn with_notifier(notifier: RecordingNotifier) -> Self {
        Self::with_config(test_config(), notifier)
    }

    pub fn with_config(config: GatewayConfig, notifier: RecordingNotifier) -> Self {
        let repo = Arc::new(InMemoryRepository::new());
        let notifier = Arc::new(notifier);
        let state = AppState::new(config, repo.clone(), notifier.clone())
            .expect("app state");
        let router = build_router(state.clone());
        Self {
            state,
            repo,
            notifier,
            router,
        }
    }

    pub async fn user(&self, username: &str, role: Role) -> TestUser {
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            username: username.to_string(),
            email: Some(format!("{}@example.com", username)),
            password_hash: hash_password(&Password::new(PASSWORD.to_string()))
                .expect("hash password"),
            role,
            active: true,
            created_at: now,
            updated_at: now,
        };
        self.repo.insert_user(&user).await.expect("insert user");
        let token = self.state.credentials.issue(&user).expect("issue token");
        TestUser {
            identity: Identity {
                user_id: user.id,
                username: user.username,
                role,
                email: user.email,
            },
            token,
        }
    }

    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        user: Option<&TestUser>,
        body: Option<Value>,
    ) -> (StatusCode, axum::http::HeaderMap, Value) {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("x-forwarded-for", "203.0.113.10");
        if let Some(user) = user {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", user.token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, headers, json)
    }
}
