use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use tower::ServiceExt;
use uuid::Uuid;

use spill_shared::middleware::sign_jwt;
use spill_shared::types::auth::{Claims, UserRole};

use crate::{build_router, test_support};

fn app() -> Router {
    build_router(test_support::state())
}

fn token(role: UserRole) -> String {
    sign_jwt(&Claims::new(Uuid::new_v4(), role, 300), "test-secret").unwrap()
}

fn json_post(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn send(req: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = app().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
    (status, value)
}

#[tokio::test]
async fn blank_comment_rejected_before_store() {
    let uri = format!("/confessions/{}/comments", Uuid::new_v4());
    let (status, body) = send(json_post(&uri, serde_json::json!({ "content": "   " }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "E2003");
}

#[tokio::test]
async fn blank_report_reason_rejected() {
    let uri = format!("/confessions/{}/reports", Uuid::new_v4());
    let (status, body) = send(json_post(&uri, serde_json::json!({ "reason": "" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["message"], "please provide a reason for reporting");
}

#[tokio::test]
async fn unknown_vote_kind_rejected() {
    let uri = format!("/confessions/{}/vote", Uuid::new_v4());
    let (status, body) = send(json_post(&uri, serde_json::json!({ "kind": "meh" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "E2002");
}

#[tokio::test]
async fn oversized_title_rejected() {
    let payload = serde_json::json!({ "title": "t".repeat(101), "content": "body" });
    let (status, body) = send(json_post("/confessions", payload)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "E0002");
}

#[tokio::test]
async fn admin_routes_require_admin() {
    let anonymous = Request::get("/admin/reports").body(Body::empty()).unwrap();
    let (status, _) = send(anonymous).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let user = Request::get("/admin/analytics")
        .header(header::AUTHORIZATION, format!("Bearer {}", token(UserRole::User)))
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(user).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body.get("data").is_none());
}

#[tokio::test]
async fn bulk_delete_needs_a_selection() {
    let mut req = json_post("/admin/confessions/bulk-delete", serde_json::json!({ "ids": [] }));
    req.headers_mut().insert(
        header::AUTHORIZATION,
        format!("Bearer {}", token(UserRole::Admin)).parse().unwrap(),
    );
    let (status, body) = send(req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "E3002");
}

#[tokio::test]
async fn events_reject_unknown_tables() {
    let req = Request::get("/events?tables=votes,accounts").body(Body::empty()).unwrap();
    let (status, _) = send(req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn health_reports_unreachable_database() {
    let req = Request::get("/health").body(Body::empty()).unwrap();
    let (status, body) = send(req).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "unhealthy");
    assert_eq!(body["checks"][0]["name"], "database");
}
