pub mod config;
pub mod dtos;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod utils;

use axum::{
    extract::State,
    http::{header, HeaderName, HeaderValue, Method, StatusCode},
    middleware::{from_fn, from_fn_with_state},
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use service_core::middleware::{
    problem::problem_details_middleware,
    rate_limit::{create_ip_rate_limiter, ip_rate_limit_middleware, IpRateLimiter},
    security_headers::security_headers_middleware,
    tracing::{correlation_id_middleware, CORRELATION_ID_HEADER},
};
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::config::GatewayConfig;
use crate::services::{
    AuditRecorder, CacheInvalidationNotifier, CredentialValidator, RateLimitService, Repository,
    RouteService, UserService,
};

#[derive(Clone)]
pub struct AppState {
    pub config: GatewayConfig,
    pub repo: Arc<dyn Repository>,
    pub credentials: CredentialValidator,
    pub routes: RouteService,
    pub rate_limits: RateLimitService,
    pub users: UserService,
    pub ip_rate_limiter: IpRateLimiter,
    pub login_rate_limiter: IpRateLimiter,
}

impl AppState {
    /// Wire the services over a persistence adapter and a notifier.
    pub fn new(
        config: GatewayConfig,
        repo: Arc<dyn Repository>,
        notifier: Arc<dyn CacheInvalidationNotifier>,
    ) -> Result<Self, anyhow::Error> {
        let credentials = CredentialValidator::new(&config.jwt)?;
        let audit = AuditRecorder::new(repo.clone(), config.audit_mode);

        Ok(Self {
            routes: RouteService::new(repo.clone(), audit.clone(), notifier),
            rate_limits: RateLimitService::new(repo.clone(), audit.clone()),
            users: UserService::new(repo.clone(), audit, credentials.clone()),
            ip_rate_limiter: create_ip_rate_limiter(
                config.rate_limit.global_ip_limit,
                config.rate_limit.global_ip_window_seconds,
            ),
            login_rate_limiter: create_ip_rate_limiter(
                config.rate_limit.login_attempts,
                config.rate_limit.login_window_seconds,
            ),
            credentials,
            repo,
            config,
        })
    }
}

pub fn build_router(state: AppState) -> Router {
    let route_api = Router::new()
        .route(
            "/api/routes",
            post(handlers::routes::create_route).get(handlers::routes::list_routes),
        )
        .route("/api/routes/pending", get(handlers::routes::list_pending_routes))
        .route(
            "/api/routes/:id",
            get(handlers::routes::get_route)
                .put(handlers::routes::update_route)
                .delete(handlers::routes::delete_route),
        )
        .route("/api/routes/:id/submit", post(handlers::routes::submit_route))
        .route("/api/routes/:id/approve", post(handlers::routes::approve_route))
        .route("/api/routes/:id/reject", post(handlers::routes::reject_route))
        .route("/api/routes/:id/clone", post(handlers::routes::clone_route))
        .route("/api/routes/:id/history", get(handlers::routes::route_history))
        .route("/api/audit", get(handlers::audit::list_audit_log));

    let admin_api = Router::new()
        .route(
            "/api/rate-limits",
            get(handlers::rate_limits::list_policies).post(handlers::rate_limits::create_policy),
        )
        .route(
            "/api/rate-limits/:id",
            get(handlers::rate_limits::get_policy)
                .put(handlers::rate_limits::update_policy)
                .delete(handlers::rate_limits::delete_policy),
        )
        .route(
            "/api/users",
            get(handlers::users::list_users).post(handlers::users::create_user),
        )
        .route("/api/users/:id/role", put(handlers::users::change_role))
        .route(
            "/api/users/:id",
            axum::routing::delete(handlers::users::deactivate_user),
        );

    let login_route = Router::new()
        .route("/auth/login", post(handlers::auth::login))
        .layer(from_fn_with_state(
            state.login_rate_limiter.clone(),
            ip_rate_limit_middleware,
        ));

    let ip_limiter = state.ip_rate_limiter.clone();
    let cors = cors_layer(&state.config.security.allowed_origins);

    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(handlers::metrics::metrics))
        .route("/auth/logout", post(handlers::auth::logout))
        .route("/auth/me", get(handlers::auth::me))
        .merge(login_route)
        .merge(route_api)
        .merge(admin_api)
        .with_state(state)
        .layer(from_fn(middleware::metrics_middleware))
        .layer(from_fn_with_state(ip_limiter, ip_rate_limit_middleware))
        .layer(from_fn(problem_details_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(
            |request: &axum::http::Request<_>| {
                let correlation_id = request
                    .headers()
                    .get(CORRELATION_ID_HEADER)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    correlation_id = %correlation_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            },
        ))
        .layer(from_fn(correlation_id_middleware))
        .layer(from_fn(security_headers_middleware))
        .layer(cors)
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static(CORRELATION_ID_HEADER),
        ])
        .expose_headers([HeaderName::from_static(CORRELATION_ID_HEADER)]);

    // Credentialed CORS cannot be combined with a wildcard origin.
    if allowed_origins.iter().any(|o| o == "*") {
        return layer.allow_origin(AllowOrigin::any());
    }

    let origins = allowed_origins
        .iter()
        .filter_map(|o| match o.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::error!("Invalid CORS origin '{}': {}. Skipping.", o, e);
                None
            }
        })
        .collect::<Vec<HeaderValue>>();

    layer
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
}

/// Service health check
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    match state.repo.health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "status": "healthy",
                "service": state.config.service_name,
                "version": state.config.service_version,
            })),
        ),
        Err(e) => {
            tracing::error!(error = %e, "Persistence health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(serde_json::json!({
                    "status": "unhealthy",
                    "service": state.config.service_name,
                    "version": state.config.service_version,
                })),
            )
        }
    }
}
