//! Route lifecycle and review workflow, driven through the service layer.

mod common;

use common::{test_config, TestApp, TestUser};
use route_service::models::{
    AuditFilter, EntityType, HttpMethod, PageRequest, Role, Route, RouteChanges, RouteStatus,
};
use route_service::services::routes::NewRoute;
use route_service::services::{AuditMode, GatewayError, RecordingNotifier, Repository};
use std::collections::BTreeSet;
use std::time::Duration;
use uuid::Uuid;

fn complete_route(path: &str) -> NewRoute {
    NewRoute {
        path: path.to_string(),
        upstream_url: "http://orders.internal:8080".to_string(),
        methods: BTreeSet::from([HttpMethod::Get, HttpMethod::Post]),
        description: Some("Order API".to_string()),
        rate_limit_id: None,
    }
}

async fn draft(app: &TestApp, owner: &TestUser, path: &str) -> Route {
    app.state
        .routes
        .create_route(&owner.ctx(), complete_route(path))
        .await
        .unwrap()
}

async fn pending(app: &TestApp, owner: &TestUser, path: &str) -> Route {
    let route = draft(app, owner, path).await;
    app.state.routes.submit_route(&owner.ctx(), route.id).await.unwrap()
}

async fn published(app: &TestApp, owner: &TestUser, reviewer: &TestUser, path: &str) -> Route {
    let route = pending(app, owner, path).await;
    app.state
        .routes
        .approve_route(&reviewer.ctx(), route.id)
        .await
        .unwrap()
}

async fn rejected(app: &TestApp, owner: &TestUser, reviewer: &TestUser, path: &str) -> Route {
    let route = pending(app, owner, path).await;
    app.state
        .routes
        .reject_route(&reviewer.ctx(), route.id, Some("Upstream is not allowlisted".into()))
        .await
        .unwrap()
}

async fn route_actions(app: &TestApp, route_id: Uuid) -> Vec<String> {
    let filter = AuditFilter {
        entity_type: Some(EntityType::Route),
        entity_id: Some(route_id),
        oldest_first: true,
        ..Default::default()
    };
    app.repo
        .list_audit(&filter, PageRequest::new(None, Some(100)))
        .await
        .unwrap()
        .items
        .into_iter()
        .map(|e| e.action)
        .collect()
}

#[tokio::test]
async fn draft_to_published_records_approved_and_published() {
    let app = TestApp::new();
    let dev = app.user("dana", Role::Developer).await;
    let sec = app.user("sam", Role::Security).await;

    let route = draft(&app, &dev, "/api/orders").await;
    assert_eq!(route.status, RouteStatus::Draft);
    assert_eq!(route.created_by, dev.id());

    let submitted = app.state.routes.submit_route(&dev.ctx(), route.id).await.unwrap();
    assert_eq!(submitted.status, RouteStatus::Pending);
    assert!(submitted.submitted_at.is_some());

    let approved = app.state.routes.approve_route(&sec.ctx(), route.id).await.unwrap();
    assert_eq!(approved.status, RouteStatus::Published);
    assert_eq!(approved.approved_by, Some(sec.id()));
    assert!(approved.approved_at.is_some());

    let actions = route_actions(&app, route.id).await;
    let review: Vec<_> = actions
        .iter()
        .filter(|a| *a == "approved" || *a == "published")
        .collect();
    assert_eq!(review, vec!["approved", "published"]);
    assert_eq!(app.notifier.published(), vec![route.id]);
}

#[tokio::test]
async fn non_owner_cannot_submit() {
    let app = TestApp::new();
    let owner = app.user("dana", Role::Developer).await;
    let other = app.user("devon", Role::Developer).await;
    let admin = app.user("ada", Role::Admin).await;
    let route = draft(&app, &owner, "/api/orders").await;

    let err = app
        .state
        .routes
        .submit_route(&other.ctx(), route.id)
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::NotOwner(_)));
    assert_eq!(err.to_string(), "You can only submit your own routes");

    // Submission has no role override.
    let err = app
        .state
        .routes
        .submit_route(&admin.ctx(), route.id)
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::NotOwner(_)));
}

#[tokio::test]
async fn non_owner_gets_forbidden_before_content_validation() {
    let app = TestApp::new();
    let owner = app.user("dana", Role::Developer).await;
    let other = app.user("devon", Role::Developer).await;
    let incomplete = app
        .state
        .routes
        .create_route(
            &owner.ctx(),
            NewRoute {
                path: "/api/incomplete".into(),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let err = app
        .state
        .routes
        .submit_route(&other.ctx(), incomplete.id)
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::NotOwner(_)));

    let err = app
        .state
        .routes
        .submit_route(&owner.ctx(), incomplete.id)
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::ValidationFailed(_)));
}

#[tokio::test]
async fn reject_requires_reason_and_leaves_no_trace() {
    let app = TestApp::new();
    let dev = app.user("dana", Role::Developer).await;
    let sec = app.user("sam", Role::Security).await;
    let route = pending(&app, &dev, "/api/orders").await;
    let before = route_actions(&app, route.id).await;

    for reason in [None, Some(String::new()), Some("   ".to_string())] {
        let err = app
            .state
            .routes
            .reject_route(&sec.ctx(), route.id, reason)
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::ValidationFailed(_)));
    }

    let stored = app.repo.find_route(route.id).await.unwrap().unwrap();
    assert_eq!(stored.status, RouteStatus::Pending);
    assert_eq!(route_actions(&app, route.id).await, before);
}

#[tokio::test]
async fn clone_takes_highest_suffix_plus_one() {
    let app = TestApp::new();
    let dev = app.user("dana", Role::Developer).await;
    let source = draft(&app, &dev, "/api/orders").await;
    draft(&app, &dev, "/api/orders-copy").await;
    draft(&app, &dev, "/api/orders-copy-2").await;
    draft(&app, &dev, "/api/orders-copyright").await;

    let other = app.user("devon", Role::Developer).await;
    let clone = app.state.routes.clone_route(&other.ctx(), source.id).await.unwrap();

    assert_eq!(clone.path, "/api/orders-copy-3");
    assert_ne!(clone.id, source.id);
    assert_eq!(clone.status, RouteStatus::Draft);
    assert_eq!(clone.created_by, other.id());
    assert_eq!(clone.upstream_url, source.upstream_url);
    assert_eq!(clone.methods, source.methods);

    let unchanged = app.repo.find_route(source.id).await.unwrap().unwrap();
    assert_eq!(unchanged, source);
    assert_eq!(route_actions(&app, clone.id).await, vec!["route.cloned"]);
}

#[tokio::test]
async fn clone_of_published_route_is_a_fresh_draft() {
    let app = TestApp::new();
    let dev = app.user("dana", Role::Developer).await;
    let sec = app.user("sam", Role::Security).await;
    let source = published(&app, &dev, &sec, "/api/orders").await;

    let clone = app.state.routes.clone_route(&dev.ctx(), source.id).await.unwrap();
    assert_eq!(clone.path, "/api/orders-copy");
    assert_eq!(clone.status, RouteStatus::Draft);
    assert!(clone.approved_by.is_none());
    assert!(clone.submitted_at.is_none());
}

#[tokio::test]
async fn admin_cannot_delete_or_update_published_route() {
    let app = TestApp::new();
    let dev = app.user("dana", Role::Developer).await;
    let sec = app.user("sam", Role::Security).await;
    let admin = app.user("ada", Role::Admin).await;
    let route = published(&app, &dev, &sec, "/api/orders").await;

    for actor in [&dev, &sec, &admin] {
        let err = app
            .state
            .routes
            .delete_route(&actor.ctx(), route.id)
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::InvalidTransition(_)));
        assert_eq!(err.to_string(), "Only draft routes can be deleted");

        let err = app
            .state
            .routes
            .update_route(
                &actor.ctx(),
                route.id,
                RouteChanges {
                    description: Some(Some("changed".into())),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::InvalidTransition(_)));
    }

    assert!(app.repo.find_route(route.id).await.unwrap().is_some());
}

#[tokio::test]
async fn resubmission_clears_rejection_and_advances_submitted_at() {
    let app = TestApp::new();
    let dev = app.user("dana", Role::Developer).await;
    let sec = app.user("sam", Role::Security).await;
    let route = rejected(&app, &dev, &sec, "/api/orders").await;
    assert_eq!(route.rejected_by, Some(sec.id()));
    let first_submission = route.submitted_at.unwrap();

    let resubmitted = app.state.routes.submit_route(&dev.ctx(), route.id).await.unwrap();
    assert_eq!(resubmitted.status, RouteStatus::Pending);
    assert!(resubmitted.rejected_by.is_none());
    assert!(resubmitted.rejected_at.is_none());
    assert!(resubmitted.rejection_reason.is_none());
    assert!(resubmitted.submitted_at.unwrap() > first_submission);

    let actions = route_actions(&app, route.id).await;
    assert_eq!(
        actions.iter().filter(|a| *a == "route.resubmitted").count(),
        1
    );
    assert_eq!(actions.last().map(String::as_str), Some("route.resubmitted"));
}

#[tokio::test]
async fn approve_only_from_pending_for_every_role() {
    let app = TestApp::new();
    let dev = app.user("dana", Role::Developer).await;
    let sec = app.user("sam", Role::Security).await;
    let admin = app.user("ada", Role::Admin).await;

    let routes = [
        draft(&app, &dev, "/api/draft").await,
        published(&app, &dev, &sec, "/api/published").await,
        rejected(&app, &dev, &sec, "/api/rejected").await,
    ];

    for route in &routes {
        for reviewer in [&sec, &admin] {
            let err = app
                .state
                .routes
                .approve_route(&reviewer.ctx(), route.id)
                .await
                .unwrap_err();
            assert!(
                matches!(err, GatewayError::InvalidTransition(_)),
                "approve from {} should be an invalid transition",
                route.status
            );
        }
    }

    let route = pending(&app, &dev, "/api/pending").await;
    let err = app
        .state
        .routes
        .approve_route(&dev.ctx(), route.id)
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::InsufficientRole(_)));
}

#[tokio::test]
async fn published_route_never_carries_rejection_fields() {
    let app = TestApp::new();
    let dev = app.user("dana", Role::Developer).await;
    let sec = app.user("sam", Role::Security).await;

    let route = rejected(&app, &dev, &sec, "/api/orders").await;
    app.state.routes.submit_route(&dev.ctx(), route.id).await.unwrap();
    let approved = app.state.routes.approve_route(&sec.ctx(), route.id).await.unwrap();

    assert_eq!(approved.status, RouteStatus::Published);
    assert!(approved.rejection_reason.is_none());
    assert!(approved.rejected_by.is_none());
    assert!(approved.rejected_at.is_none());
}

#[tokio::test]
async fn duplicate_path_conflicts_on_create_and_update() {
    let app = TestApp::new();
    let dev = app.user("dana", Role::Developer).await;
    draft(&app, &dev, "/api/orders").await;
    let other = draft(&app, &dev, "/api/payments").await;

    let err = app
        .state
        .routes
        .create_route(&dev.ctx(), complete_route("/api/orders"))
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::DuplicatePath(_)));

    let err = app
        .state
        .routes
        .update_route(
            &dev.ctx(),
            other.id,
            RouteChanges {
                path: Some("/api/orders".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::DuplicatePath(_)));
}

#[tokio::test]
async fn unknown_rate_limit_policy_is_a_bad_request() {
    let app = TestApp::new();
    let dev = app.user("dana", Role::Developer).await;
    let route = draft(&app, &dev, "/api/orders").await;

    let err = app
        .state
        .routes
        .update_route(
            &dev.ctx(),
            route.id,
            RouteChanges {
                rate_limit_id: Some(Some(Uuid::new_v4())),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::PolicyNotFound(_)));
}

#[tokio::test]
async fn security_may_edit_but_developer_may_not_edit_others() {
    let app = TestApp::new();
    let owner = app.user("dana", Role::Developer).await;
    let other = app.user("devon", Role::Developer).await;
    let sec = app.user("sam", Role::Security).await;
    let route = draft(&app, &owner, "/api/orders").await;

    let changes = RouteChanges {
        upstream_url: Some("https://orders-v2.internal".into()),
        ..Default::default()
    };

    let err = app
        .state
        .routes
        .update_route(&other.ctx(), route.id, changes.clone())
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "You can only update your own routes");

    let updated = app
        .state
        .routes
        .update_route(&sec.ctx(), route.id, changes)
        .await
        .unwrap();
    assert_eq!(updated.upstream_url, "https://orders-v2.internal");
    assert!(updated.updated_at >= route.updated_at);
    assert_eq!(
        route_actions(&app, route.id).await,
        vec!["route.created", "route.updated"]
    );
}

#[tokio::test]
async fn history_is_oldest_first_and_survives_delete() {
    let app = TestApp::new();
    let dev = app.user("dana", Role::Developer).await;
    let route = draft(&app, &dev, "/api/orders").await;
    app.state.routes.delete_route(&dev.ctx(), route.id).await.unwrap();

    let history = app
        .state
        .routes
        .route_history(&dev.ctx(), route.id, None, None, PageRequest::default())
        .await
        .unwrap();
    let actions: Vec<_> = history.items.iter().map(|e| e.action.as_str()).collect();
    assert_eq!(actions, vec!["route.created", "route.deleted"]);
    assert!(history.items.iter().all(|e| e.actor_id == dev.id()));
    assert!(history
        .items
        .iter()
        .all(|e| e.ip_address.as_deref() == Some("203.0.113.10")));
}

#[tokio::test]
async fn concurrent_approvals_have_exactly_one_winner() {
    let app = TestApp::new();
    let dev = app.user("dana", Role::Developer).await;
    let sam = app.user("sam", Role::Security).await;
    let ada = app.user("ada", Role::Admin).await;
    let route = pending(&app, &dev, "/api/orders").await;

    let (sam_ctx, ada_ctx) = (sam.ctx(), ada.ctx());
    let (first, second) = tokio::join!(
        app.state.routes.approve_route(&sam_ctx, route.id),
        app.state.routes.approve_route(&ada_ctx, route.id),
    );

    let outcomes = [first, second];
    assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(outcomes
        .iter()
        .any(|r| matches!(r, Err(GatewayError::InvalidTransition(_)))));
    assert_eq!(
        route_actions(&app, route.id).await,
        vec!["route.created", "route.submitted", "approved", "published"]
    );
    assert_eq!(app.notifier.published(), vec![route.id]);
}

#[tokio::test]
async fn concurrent_approve_and_reject_settle_on_one_outcome() {
    let app = TestApp::new();
    let dev = app.user("dana", Role::Developer).await;
    let sam = app.user("sam", Role::Security).await;
    let ada = app.user("ada", Role::Admin).await;
    let route = pending(&app, &dev, "/api/orders").await;

    let (sam_ctx, ada_ctx) = (sam.ctx(), ada.ctx());
    let (approved, rejected) = tokio::join!(
        app.state.routes.approve_route(&sam_ctx, route.id),
        app.state
            .routes
            .reject_route(&ada_ctx, route.id, Some("Not allowlisted".into())),
    );
    assert_ne!(approved.is_ok(), rejected.is_ok());

    let stored = app.state.routes.get_route(&dev.ctx(), route.id).await.unwrap();
    let actions = route_actions(&app, route.id).await;
    if approved.is_ok() {
        assert_eq!(stored.status, RouteStatus::Published);
        assert!(!actions.contains(&"rejected".to_string()));
    } else {
        assert_eq!(stored.status, RouteStatus::Rejected);
        assert!(!actions.contains(&"approved".to_string()));
        assert!(app.notifier.published().is_empty());
    }
}

#[tokio::test]
async fn detached_audit_entries_arrive_after_the_response() {
    let mut config = test_config();
    config.audit_mode = AuditMode::Detached;
    let app = TestApp::with_config(config, RecordingNotifier::new());
    let dev = app.user("dana", Role::Developer).await;
    let route = draft(&app, &dev, "/api/orders").await;

    let mut actions = Vec::new();
    for _ in 0..50 {
        actions = route_actions(&app, route.id).await;
        if !actions.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(actions, vec!["route.created"]);
}

#[tokio::test]
async fn failed_notification_does_not_fail_approval() {
    let app = TestApp::with_notifier(RecordingNotifier::failing());
    let dev = app.user("dana", Role::Developer).await;
    let sec = app.user("sam", Role::Security).await;
    let route = pending(&app, &dev, "/api/orders").await;

    let approved = app.state.routes.approve_route(&sec.ctx(), route.id).await.unwrap();
    assert_eq!(approved.status, RouteStatus::Published);
}

#[tokio::test]
async fn list_filters_by_owner_status_and_search() {
    let app = TestApp::new();
    let dana = app.user("dana", Role::Developer).await;
    let devon = app.user("devon", Role::Developer).await;
    pending(&app, &dana, "/api/orders").await;
    draft(&app, &dana, "/api/order_items").await;
    draft(&app, &devon, "/api/payments").await;

    use route_service::models::OwnerFilter;
    use route_service::services::routes::RouteListQuery;

    let mine = app
        .state
        .routes
        .list_routes(
            &dana.ctx(),
            RouteListQuery {
                owner: Some(OwnerFilter::Me),
                ..Default::default()
            },
            PageRequest::default(),
        )
        .await
        .unwrap();
    assert_eq!(mine.total, 2);

    let pending_only = app
        .state
        .routes
        .list_routes(
            &devon.ctx(),
            RouteListQuery {
                status: Some(RouteStatus::Pending),
                ..Default::default()
            },
            PageRequest::default(),
        )
        .await
        .unwrap();
    assert_eq!(pending_only.total, 1);

    // `_` is matched literally, not as a single-character wildcard.
    let search = app
        .state
        .routes
        .list_routes(
            &devon.ctx(),
            RouteListQuery {
                search: Some("ORDER_".into()),
                ..Default::default()
            },
            PageRequest::default(),
        )
        .await
        .unwrap();
    assert_eq!(search.total, 1);
    assert_eq!(search.items[0].path, "/api/order_items");
}
