//! Rate-limit policy administration.

mod common;

use common::TestApp;
use route_service::models::{Role, RouteChanges};
use route_service::services::rate_limits::PolicyInput;
use route_service::services::routes::NewRoute;
use route_service::services::GatewayError;

fn policy(name: &str, rps: i32, burst: i32) -> PolicyInput {
    PolicyInput {
        name: name.to_string(),
        requests_per_second: rps,
        burst_size: burst,
    }
}

#[tokio::test]
async fn burst_must_cover_rate() {
    let app = TestApp::new();
    let sec = app.user("sam", Role::Security).await;

    for input in [policy("bad", 0, 10), policy("bad", 10, 5), policy("  ", 1, 1)] {
        let err = app.state.rate_limits.create(&sec.ctx(), input).await.unwrap_err();
        assert!(matches!(err, GatewayError::ValidationFailed(_)));
    }

    let created = app
        .state
        .rate_limits
        .create(&sec.ctx(), policy("standard", 10, 10))
        .await
        .unwrap();
    assert_eq!(created.usage_count, 0);
    assert_eq!(created.policy.created_by, sec.id());
}

#[tokio::test]
async fn developers_can_read_but_not_write() {
    let app = TestApp::new();
    let dev = app.user("dana", Role::Developer).await;
    let sec = app.user("sam", Role::Security).await;
    let created = app
        .state
        .rate_limits
        .create(&sec.ctx(), policy("standard", 10, 20))
        .await
        .unwrap();

    let fetched = app.state.rate_limits.get(&dev.ctx(), created.policy.id).await.unwrap();
    assert_eq!(fetched.policy.name, "standard");

    let err = app
        .state
        .rate_limits
        .update(&dev.ctx(), created.policy.id, policy("standard", 5, 5))
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::InsufficientRole(_)));
}

#[tokio::test]
async fn policy_in_use_cannot_be_deleted_until_released() {
    let app = TestApp::new();
    let dev = app.user("dana", Role::Developer).await;
    let sec = app.user("sam", Role::Security).await;
    let created = app
        .state
        .rate_limits
        .create(&sec.ctx(), policy("standard", 10, 20))
        .await
        .unwrap();
    let policy_id = created.policy.id;

    let route = app
        .state
        .routes
        .create_route(
            &dev.ctx(),
            NewRoute {
                path: "/api/orders".into(),
                rate_limit_id: Some(policy_id),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let err = app.state.rate_limits.delete(&sec.ctx(), policy_id).await.unwrap_err();
    assert!(matches!(err, GatewayError::PolicyInUse(1)));

    app.state
        .routes
        .update_route(
            &dev.ctx(),
            route.id,
            RouteChanges {
                rate_limit_id: Some(None),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    app.state.rate_limits.delete(&sec.ctx(), policy_id).await.unwrap();
    let err = app.state.rate_limits.get(&sec.ctx(), policy_id).await.unwrap_err();
    assert!(matches!(err, GatewayError::ResourceNotFound(_)));
}

#[tokio::test]
async fn policy_names_are_unique() {
    let app = TestApp::new();
    let sec = app.user("sam", Role::Security).await;
    app.state
        .rate_limits
        .create(&sec.ctx(), policy("standard", 10, 20))
        .await
        .unwrap();

    let err = app
        .state
        .rate_limits
        .create(&sec.ctx(), policy("standard", 1, 1))
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::DuplicatePolicyName(_)));
}
