//! End-to-end requests through the router: login, bearer auth, status codes.

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use common::{Desk, PASSWORD};
use helpdesk::server::build_router;
use helpdesk_auth::Role;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

async fn send(app: &Router, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => request
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

async fn login(app: &Router, email: &str) -> String {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({ "email": email, "password": PASSWORD })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "login failed: {body}");
    assert_eq!(body["token_type"], "bearer");
    body["access_token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn health_endpoints_need_no_token() {
    let desk = Desk::new();
    let app = build_router(desk.state.clone());

    let (status, _) = send(&app, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, Method::GET, "/ready", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn bad_credentials_and_missing_tokens_are_unauthorized() {
    let desk = Desk::new();
    desk.account("sato@example.com", Role::Requester).await;
    let app = build_router(desk.state.clone());

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({ "email": "sato@example.com", "password": "wrong" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, Method::GET, "/api/tickets", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, Method::GET, "/api/tickets", Some("forged"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn logout_revokes_the_token() {
    let desk = Desk::new();
    desk.account("sato@example.com", Role::Requester).await;
    let app = build_router(desk.state.clone());
    let token = login(&app, "sato@example.com").await;

    let (status, me) = send(&app, Method::GET, "/api/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["email"], "sato@example.com");
    assert_eq!(me["role"], "requester");
    assert!(me.get("password_hash").is_none());

    let (status, _) = send(&app, Method::POST, "/api/auth/logout", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, Method::GET, "/api/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn ticket_flow_over_http() {
    let desk = Desk::new();
    desk.account("sato@example.com", Role::Requester).await;
    desk.account("agent@example.com", Role::Operator).await;
    let app = build_router(desk.state.clone());
    let requester = login(&app, "sato@example.com").await;
    let operator = login(&app, "agent@example.com").await;

    let (status, ticket) = send(
        &app,
        Method::POST,
        "/api/tickets",
        Some(&requester),
        Some(json!({
            "title": "VPN drops every hour",
            "description": "Since Monday",
            "priority": "HIGH",
            "tags": ["vpn", "vpn", "network"]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(ticket["ticket_number"], "TKT-00001");
    assert_eq!(ticket["status"], "OPEN");
    assert_eq!(ticket["tags"].as_array().map(Vec::len), Some(2));
    let id = ticket["id"].as_str().unwrap().to_string();

    let (status, _) = send(
        &app,
        Method::POST,
        &format!("/api/tickets/{id}/transition"),
        Some(&requester),
        Some(json!({ "status": "IN_PROGRESS" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, moved) = send(
        &app,
        Method::POST,
        &format!("/api/tickets/{id}/transition"),
        Some(&operator),
        Some(json!({ "status": "IN_PROGRESS" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(moved["status"], "IN_PROGRESS");

    let (status, comment) = send(
        &app,
        Method::POST,
        &format!("/api/tickets/{id}/comments"),
        Some(&operator),
        Some(json!({ "content": "Checking the gateway", "is_internal": true })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(comment["is_internal"], true);

    let (status, comments) =
        send(&app, Method::GET, &format!("/api/tickets/{id}/comments"), Some(&requester), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(comments, json!([]));

    let (status, page) = send(&app, Method::GET, "/api/tickets?status=IN_PROGRESS&limit=10", Some(&operator), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total"], 1);
    assert_eq!(page["limit"], 10);

    let (status, _) = send(&app, Method::GET, "/api/tickets?status=PENDING", Some(&operator), None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = send(&app, Method::GET, "/api/tickets?limit=500", Some(&operator), None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let unknown = uuid::Uuid::new_v4();
    let (status, _) = send(&app, Method::GET, &format!("/api/tickets/{unknown}"), Some(&operator), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn archived_article_answers_no_content() {
    let desk = Desk::new();
    desk.account("writer@example.com", Role::Operator).await;
    desk.account("sato@example.com", Role::Requester).await;
    let app = build_router(desk.state.clone());
    let writer = login(&app, "writer@example.com").await;
    let reader = login(&app, "sato@example.com").await;

    let (status, article) = send(
        &app,
        Method::POST,
        "/api/articles",
        Some(&writer),
        Some(json!({ "title": "Resetting the VPN client", "content": "Open settings, reset." })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = article["id"].as_str().unwrap().to_string();

    let (status, _) = send(&app, Method::GET, &format!("/api/articles/{id}"), Some(&reader), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, published) =
        send(&app, Method::POST, &format!("/api/articles/{id}/publish"), Some(&writer), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(published["status"], "PUBLISHED");

    let (status, read) = send(&app, Method::GET, &format!("/api/articles/{id}"), Some(&reader), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(read["view_count"], 1);

    let (status, _) = send(&app, Method::DELETE, &format!("/api/articles/{id}"), Some(&writer), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(
        &app,
        Method::PATCH,
        &format!("/api/articles/{id}"),
        Some(&writer),
        Some(json!({ "title": "Too late" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn admin_routes_are_admin_only() {
    let desk = Desk::new();
    desk.account("admin@example.com", Role::Admin).await;
    desk.account("agent@example.com", Role::Operator).await;
    let app = build_router(desk.state.clone());
    let admin = login(&app, "admin@example.com").await;
    let operator = login(&app, "agent@example.com").await;

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/admin/teams",
        Some(&operator),
        Some(json!({ "name": "Network" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, team) = send(
        &app,
        Method::POST,
        "/api/admin/teams",
        Some(&admin),
        Some(json!({ "name": "Network", "description": "Routers and VPN" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(team["name"], "Network");

    let body = json!({
        "priority": "URGENT",
        "first_response_target_minutes": 15,
        "resolution_target_minutes": 120
    });
    let (status, policy) =
        send(&app, Method::POST, "/api/admin/sla-settings", Some(&admin), Some(body.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(policy["pause_on_waiting_customer"], true);
    assert_eq!(policy["timezone"], "Asia/Tokyo");

    let (status, _) = send(&app, Method::POST, "/api/admin/sla-settings", Some(&admin), Some(body)).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(&app, Method::GET, "/api/admin/audit-logs", Some(&operator), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, log) = send(&app, Method::GET, "/api/admin/audit-logs", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(log["limit"], 50);
}

#[tokio::test]
async fn demotion_applies_to_tokens_already_issued() {
    let desk = Desk::new();
    desk.account("admin@example.com", Role::Admin).await;
    let deputy = desk.account("deputy@example.com", Role::Admin).await;
    let app = build_router(desk.state.clone());
    let admin = login(&app, "admin@example.com").await;
    let deputy_token = login(&app, "deputy@example.com").await;

    let (status, _) = send(&app, Method::GET, "/api/admin/audit-logs", Some(&deputy_token), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, user) = send(
        &app,
        Method::PATCH,
        &format!("/api/admin/users/{}", deputy.id),
        Some(&admin),
        Some(json!({ "role": "requester" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(user["role"], "requester");

    let (status, me) = send(&app, Method::GET, "/api/auth/me", Some(&deputy_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["role"], "requester");

    let (status, _) = send(&app, Method::GET, "/api/admin/audit-logs", Some(&deputy_token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/admin/teams",
        Some(&deputy_token),
        Some(json!({ "name": "Shadow" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}
