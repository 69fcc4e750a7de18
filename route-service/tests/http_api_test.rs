//! HTTP surface: status codes, problem documents, cookies and headers.

mod common;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};
use chrono::Utc;
use common::{TestApp, JWT_SECRET, PASSWORD};
use http_body_util::BodyExt;
use jsonwebtoken::{encode, EncodingKey, Header};
use route_service::models::Role;
use route_service::services::credentials::AccessTokenClaims;
use serde_json::{json, Value};
use tower::ServiceExt;

fn route_body(path: &str) -> Value {
    json!({
        "path": path,
        "upstreamUrl": "https://orders.internal",
        "methods": ["GET", "post"],
        "description": "Order API",
    })
}

#[tokio::test]
async fn health_and_metrics_are_public() {
    let app = TestApp::new();

    let (status, _, body) = app.send(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let response = app
        .router
        .clone()
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn unauthenticated_request_is_401_problem_with_correlation_id() {
    let app = TestApp::new();

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/api/routes")
                .header("x-correlation-id", "corr-42")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(response.headers()["x-correlation-id"], "corr-42");
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/problem+json"
    );
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let problem: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(problem["status"], 401);
    assert_eq!(problem["type"], "/problems/authentication-required");
    assert_eq!(problem["instance"], "/api/routes");
    assert_eq!(problem["correlationId"], "corr-42");
}

#[tokio::test]
async fn generated_correlation_id_is_echoed() {
    let app = TestApp::new();
    let (status, headers, body) = app.send(Method::GET, "/api/routes", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let header_id = headers["x-correlation-id"].to_str().unwrap();
    assert!(!header_id.is_empty());
    assert_eq!(body["correlationId"], header_id);
}

#[tokio::test]
async fn invalid_token_is_rejected() {
    let app = TestApp::new();
    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/routes")
                .header(header::AUTHORIZATION, "Bearer not.a.token")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn anonymous_malformed_ids_and_queries_are_401() {
    let app = TestApp::new();

    for (method, uri) in [
        (Method::GET, "/api/routes/not-a-uuid"),
        (Method::POST, "/api/routes/not-a-uuid/approve"),
        (Method::GET, "/api/routes/not-a-uuid/history?from=yesterday"),
        (Method::GET, "/api/routes?page=-1"),
        (Method::GET, "/api/audit?userId=bogus"),
        (Method::DELETE, "/api/rate-limits/not-a-uuid"),
        (Method::DELETE, "/api/users/not-a-uuid"),
    ] {
        let (status, _, problem) = app.send(method.clone(), uri, None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{} {}", method, uri);
        assert_eq!(problem["type"], "/problems/authentication-required");
    }
}

#[tokio::test]
async fn malformed_ids_and_queries_are_400_once_authorized() {
    let app = TestApp::new();
    let dev = app.user("dana", Role::Developer).await;
    let sec = app.user("sam", Role::Security).await;

    let (status, _, problem) = app
        .send(Method::GET, "/api/routes/not-a-uuid", Some(&dev), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(problem["type"], "/problems/validation-failed");

    let (status, _, _) = app
        .send(Method::GET, "/api/routes?page=-1", Some(&dev), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _, _) = app
        .send(Method::GET, "/api/audit?userId=bogus", Some(&dev), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _, _) = app
        .send(Method::GET, "/api/audit?userId=bogus", Some(&sec), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn expired_token_is_401_with_expiry_detail() {
    let app = TestApp::new();
    let dev = app.user("dana", Role::Developer).await;
    let issued = Utc::now().timestamp() - 7_200;
    let claims = AccessTokenClaims {
        sub: dev.id().to_string(),
        username: "dana".to_string(),
        role: Role::Developer,
        email: None,
        iss: "route-service".to_string(),
        exp: issued + 3_600,
        iat: issued,
        jti: "expired-token".to_string(),
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .unwrap();

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/routes")
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let problem: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(problem["detail"], "Credential has expired");
}

#[tokio::test]
async fn approval_audit_entries_carry_request_correlation_id_and_ip() {
    let app = TestApp::new();
    let dev = app.user("dana", Role::Developer).await;
    let sec = app.user("sam", Role::Security).await;

    let (_, _, route) = app
        .send(Method::POST, "/api/routes", Some(&dev), Some(route_body("/api/orders")))
        .await;
    let id = route["id"].as_str().unwrap().to_string();
    let (status, _, _) = app
        .send(Method::POST, &format!("/api/routes/{}/submit", id), Some(&dev), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri(format!("/api/routes/{}/approve", id))
                .header(header::AUTHORIZATION, format!("Bearer {}", sec.token))
                .header("x-correlation-id", "corr-approve-7")
                .header("x-forwarded-for", "198.51.100.23")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let (status, _, history) = app
        .send(Method::GET, &format!("/api/routes/{}/history", id), Some(&dev), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let review: Vec<&Value> = history["items"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|e| e["action"] == "approved" || e["action"] == "published")
        .collect();
    assert_eq!(review.len(), 2);
    for entry in review {
        assert_eq!(entry["correlationId"], "corr-approve-7");
        assert_eq!(entry["ipAddress"], "198.51.100.23");
        assert_eq!(entry["actorId"], sec.id().to_string());
    }
}

#[tokio::test]
async fn full_review_flow_over_http() {
    let app = TestApp::new();
    let dev = app.user("dana", Role::Developer).await;
    let sec = app.user("sam", Role::Security).await;

    let (status, _, route) = app
        .send(Method::POST, "/api/routes", Some(&dev), Some(route_body("/api/orders")))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(route["status"], "DRAFT");
    assert_eq!(route["methods"], json!(["GET", "POST"]));
    let id = route["id"].as_str().unwrap().to_string();

    let (status, _, route) = app
        .send(Method::POST, &format!("/api/routes/{}/submit", id), Some(&dev), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(route["status"], "PENDING");

    let (status, _, pending) = app
        .send(Method::GET, "/api/routes/pending", Some(&sec), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(pending["total"], 1);

    let (status, _, _) = app
        .send(Method::GET, "/api/routes/pending", Some(&dev), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _, route) = app
        .send(Method::POST, &format!("/api/routes/{}/approve", id), Some(&sec), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(route["status"], "PUBLISHED");
    assert_eq!(route["approvedBy"], sec.id().to_string());

    let (status, _, history) = app
        .send(Method::GET, &format!("/api/routes/{}/history", id), Some(&dev), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let actions: Vec<&str> = history["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["action"].as_str().unwrap())
        .collect();
    assert_eq!(
        actions,
        vec!["route.created", "route.submitted", "approved", "published"]
    );

    let (status, _, problem) = app
        .send(Method::DELETE, &format!("/api/routes/{}", id), Some(&dev), None)
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(problem["detail"], "Only draft routes can be deleted");
}

#[tokio::test]
async fn non_owner_submit_is_403_with_detail() {
    let app = TestApp::new();
    let owner = app.user("dana", Role::Developer).await;
    let other = app.user("devon", Role::Developer).await;

    let (_, _, route) = app
        .send(Method::POST, "/api/routes", Some(&owner), Some(route_body("/api/orders")))
        .await;
    let id = route["id"].as_str().unwrap();

    let (status, _, problem) = app
        .send(Method::POST, &format!("/api/routes/{}/submit", id), Some(&other), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(problem["detail"], "You can only submit your own routes");
    assert!(problem["correlationId"].is_string());
}

#[tokio::test]
async fn reject_without_body_is_400() {
    let app = TestApp::new();
    let dev = app.user("dana", Role::Developer).await;
    let sec = app.user("sam", Role::Security).await;

    let (_, _, route) = app
        .send(Method::POST, "/api/routes", Some(&dev), Some(route_body("/api/orders")))
        .await;
    let id = route["id"].as_str().unwrap();
    app.send(Method::POST, &format!("/api/routes/{}/submit", id), Some(&dev), None)
        .await;

    let (status, _, _) = app
        .send(Method::POST, &format!("/api/routes/{}/reject", id), Some(&sec), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _, _) = app
        .send(
            Method::POST,
            &format!("/api/routes/{}/reject", id),
            Some(&sec),
            Some(json!({ "reason": "" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _, route) = app
        .send(
            Method::POST,
            &format!("/api/routes/{}/reject", id),
            Some(&sec),
            Some(json!({ "reason": "Needs a rate limit" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(route["status"], "REJECTED");
    assert_eq!(route["rejectionReason"], "Needs a rate limit");
}

#[tokio::test]
async fn unknown_route_is_404_and_bad_body_is_400() {
    let app = TestApp::new();
    let dev = app.user("dana", Role::Developer).await;

    let (status, _, problem) = app
        .send(
            Method::GET,
            &format!("/api/routes/{}", uuid::Uuid::new_v4()),
            Some(&dev),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(problem["type"], "/problems/not-found");

    let (status, _, problem) = app
        .send(Method::POST, "/api/routes", Some(&dev), Some(json!({ "path": "" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(problem["type"], "/problems/validation-failed");
}

#[tokio::test]
async fn audit_log_requires_security_and_filters_by_action() {
    let app = TestApp::new();
    let dev = app.user("dana", Role::Developer).await;
    let sec = app.user("sam", Role::Security).await;

    app.send(Method::POST, "/api/routes", Some(&dev), Some(route_body("/api/a")))
        .await;
    app.send(Method::POST, "/api/routes", Some(&dev), Some(route_body("/api/b")))
        .await;

    let (status, _, _) = app.send(Method::GET, "/api/audit", Some(&dev), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _, log) = app
        .send(
            Method::GET,
            &format!("/api/audit?action=route.created&userId={}&size=1", dev.id()),
            Some(&sec),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(log["total"], 2);
    assert_eq!(log["size"], 1);
    assert_eq!(log["items"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn login_sets_http_only_strict_cookie_usable_for_me() {
    let app = TestApp::new();
    app.user("dana", Role::Developer).await;

    let (status, headers, body) = app
        .send(
            Method::POST,
            "/auth/login",
            None,
            Some(json!({ "username": "dana", "password": PASSWORD })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["username"], "dana");
    assert!(body["user"].get("passwordHash").is_none());

    let set_cookie = headers[header::SET_COOKIE].to_str().unwrap().to_string();
    assert!(set_cookie.starts_with("access_token="));
    assert!(set_cookie.contains("HttpOnly"));
    assert!(set_cookie.contains("SameSite=Strict"));

    let cookie = set_cookie.split(';').next().unwrap().to_string();
    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/auth/me")
                .header(header::COOKIE, cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let me: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(me["username"], "dana");
    assert_eq!(me["role"], "DEVELOPER");
}

#[tokio::test]
async fn wrong_password_is_401() {
    let app = TestApp::new();
    app.user("dana", Role::Developer).await;

    let (status, headers, _) = app
        .send(
            Method::POST,
            "/auth/login",
            None,
            Some(json!({ "username": "dana", "password": "not-the-password" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(headers.get(header::SET_COOKIE).is_none());
}

#[tokio::test]
async fn logout_expires_cookie() {
    let app = TestApp::new();
    let (status, headers, _) = app.send(Method::POST, "/auth/logout", None, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let set_cookie = headers[header::SET_COOKIE].to_str().unwrap();
    assert!(set_cookie.starts_with("access_token="));
    assert!(set_cookie.contains("Max-Age=0"));
}

#[tokio::test]
async fn security_headers_are_present() {
    let app = TestApp::new();
    let (_, headers, _) = app.send(Method::GET, "/health", None, None).await;
    assert_eq!(headers[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
    assert_eq!(headers[header::X_FRAME_OPTIONS], "DENY");
}

#[tokio::test]
async fn rate_limit_policies_round_trip_over_http() {
    let app = TestApp::new();
    let dev = app.user("dana", Role::Developer).await;
    let sec = app.user("sam", Role::Security).await;
    let body = json!({ "name": "standard", "requestsPerSecond": 10, "burstSize": 20 });

    let (status, _, _) = app
        .send(Method::POST, "/api/rate-limits", Some(&dev), Some(body.clone()))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _, policy) = app
        .send(Method::POST, "/api/rate-limits", Some(&sec), Some(body.clone()))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(policy["usageCount"], 0);
    let policy_id = policy["id"].as_str().unwrap().to_string();

    let (status, _, _) = app
        .send(Method::POST, "/api/rate-limits", Some(&sec), Some(body))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let mut route = route_body("/api/orders");
    route["rateLimitId"] = json!(policy_id);
    app.send(Method::POST, "/api/routes", Some(&dev), Some(route)).await;

    let (status, _, listed) = app
        .send(Method::GET, "/api/rate-limits", Some(&dev), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed["items"][0]["usageCount"], 1);

    let (status, _, problem) = app
        .send(
            Method::DELETE,
            &format!("/api/rate-limits/{}", policy_id),
            Some(&sec),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(problem["detail"], "Rate limit policy is in use by 1 route(s)");
}
