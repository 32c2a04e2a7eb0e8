use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use course_payments_api::app::build_router;
use course_payments_api::database::in_memory::InMemoryStore;
use course_payments_api::models::user::Role;

mod common;
use common::*;

fn app() -> (InMemoryStore, Router) {
    let (store, state) = setup();
    (store, build_router(state))
}

fn admin_token() -> String {
    token("admin-1", Role::Admin, None)
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    bearer: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(bearer) = bearer {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", bearer));
    }

    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}

fn submission_body(phone: &str) -> Value {
    json!({
        "studentName": "Ahmed",
        "studentPhone": phone,
        "courseId": "c1",
        "courseName": "Math",
        "coursePrice": 300
    })
}

async fn submit(app: &Router, phone: &str) -> String {
    let (status, body) = send(
        app,
        Method::POST,
        "/payment-request",
        None,
        Some(submission_body(phone)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["requestId"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_health_endpoints() {
    let (_store, app) = app();

    let (status, body) = send(&app, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, body) = send(&app, Method::GET, "/api/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["database"], "connected");
}

#[tokio::test]
async fn test_submit_returns_request_id() {
    let (_store, app) = app();

    let (status, body) = send(
        &app,
        Method::POST,
        "/payment-request",
        None,
        Some(submission_body("0101")),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Payment request submitted successfully");
    assert!(body["requestId"].as_str().is_some_and(|id| !id.is_empty()));
}

#[tokio::test]
async fn test_submit_missing_field_is_bad_request() {
    let (store, app) = app();

    let (status, body) = send(
        &app,
        Method::POST,
        "/payment-request",
        None,
        Some(json!({
            "studentName": "Ahmed",
            "courseId": "c1",
            "courseName": "Math"
        })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["fields"], json!(["studentPhone"]));
    assert_eq!(store.request_count().await, 0);
}

#[tokio::test]
async fn test_submit_with_invalid_token_is_unauthorized() {
    let (store, app) = app();

    let (status, _) = send(
        &app,
        Method::POST,
        "/payment-request",
        Some("not-a-jwt"),
        Some(submission_body("0101")),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(store.request_count().await, 0);
}

#[tokio::test]
async fn test_list_requires_authentication() {
    let (_store, app) = app();

    let (status, body) = send(&app, Method::GET, "/payment-request", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_list_filters_by_status_and_phone() {
    let (_store, app) = app();
    let first = submit(&app, "0101").await;
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let second = submit(&app, "0101").await;
    submit(&app, "0202").await;

    let admin = admin_token();
    let (status, body) = send(
        &app,
        Method::GET,
        "/payment-request?studentPhone=0101",
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["_id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec![second.as_str(), first.as_str()]);

    let (status, body) = send(
        &app,
        Method::GET,
        "/payment-request?status=pending",
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 3);

    let (status, _) = send(
        &app,
        Method::GET,
        "/payment-request?status=refunded",
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_student_list_is_scoped_to_own_phone() {
    let (_store, app) = app();
    submit(&app, "0101").await;
    submit(&app, "0202").await;

    let student = token("s1", Role::Student, Some("0101"));
    let (status, body) = send(&app, Method::GET, "/payment-request", Some(&student), None).await;

    assert_eq!(status, StatusCode::OK);
    let requests = body.as_array().unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0]["student_phone"], "0101");
}

#[tokio::test]
async fn test_decide_requires_admin() {
    let (_store, app) = app();
    let id = submit(&app, "0101").await;
    let body = json!({ "requestId": id, "status": "approved" });

    let (status, _) = send(
        &app,
        Method::PATCH,
        "/payment-request",
        None,
        Some(body.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let student = token("s1", Role::Student, Some("0101"));
    let (status, _) = send(
        &app,
        Method::PATCH,
        "/payment-request",
        Some(&student),
        Some(body),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_decide_rejects_bad_input() {
    let (_store, app) = app();
    let id = submit(&app, "0101").await;
    let admin = admin_token();

    let (status, body) = send(
        &app,
        Method::PATCH,
        "/payment-request",
        Some(&admin),
        Some(json!({ "requestId": id })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["fields"], json!(["status"]));

    let (status, _) = send(
        &app,
        Method::PATCH,
        "/payment-request",
        Some(&admin),
        Some(json!({ "requestId": id, "status": "refunded" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        Method::PATCH,
        "/payment-request",
        Some(&admin),
        Some(json!({ "requestId": "missing", "status": "approved" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_approve_then_conflict() {
    let (store, app) = app();
    store.add_user(student("s1", "0101")).await;
    let id = submit(&app, "0101").await;
    let admin = admin_token();

    let (status, body) = send(
        &app,
        Method::PATCH,
        "/payment-request",
        Some(&admin),
        Some(json!({ "requestId": id, "status": "approved", "adminNotes": "ok" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Payment request approved successfully");
    assert_eq!(body["status"], "approved");
    assert_eq!(body["enrollment"], "created");

    let (status, body) = send(
        &app,
        Method::PATCH,
        "/payment-request",
        Some(&admin),
        Some(json!({ "requestId": id, "status": "rejected" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);

    assert_eq!(store.enrollments_for("s1", "c1").await.len(), 1);
}

#[tokio::test]
async fn test_admin_notifications_flow() {
    let (_store, app) = app();
    let id = submit(&app, "0101").await;
    let admin = admin_token();

    let student = token("s1", Role::Student, Some("0101"));
    let (status, _) = send(&app, Method::GET, "/notifications", Some(&student), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(
        &app,
        Method::GET,
        "/notifications?unread_only=true",
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let notifications = body.as_array().unwrap();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0]["related_id"], id.as_str());

    let (status, body) = send(
        &app,
        Method::PATCH,
        "/notifications/read",
        Some(&admin),
        Some(json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["modified_count"], 1);

    let (status, body) = send(
        &app,
        Method::GET,
        "/notifications?unread_only=true",
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_submit_null_field_is_reported_missing() {
    let (store, app) = app();

    let (status, body) = send(
        &app,
        Method::POST,
        "/payment-request",
        None,
        Some(json!({
            "studentName": null,
            "studentPhone": "0101",
            "courseId": "c1",
            "courseName": "Math"
        })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["fields"], json!(["studentName"]));
    assert_eq!(store.request_count().await, 0);
}

#[tokio::test]
async fn test_malformed_bodies_use_error_envelope() {
    let (store, app) = app();

    let mut wrong_type = submission_body("0101");
    wrong_type["coursePrice"] = json!("300");
    let (status, body) = send(
        &app,
        Method::POST,
        "/payment-request",
        None,
        Some(wrong_type),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().is_some_and(|e| !e.is_empty()));
    assert_eq!(store.request_count().await, 0);

    let request = Request::builder()
        .method(Method::POST)
        .uri("/payment-request")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["success"], false);

    let admin = admin_token();
    let (status, body) = send(
        &app,
        Method::PATCH,
        "/payment-request",
        Some(&admin),
        Some(json!({ "requestId": 42, "status": "approved" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_malformed_query_uses_error_envelope() {
    let (_store, app) = app();
    let admin = admin_token();

    let (status, body) = send(
        &app,
        Method::GET,
        "/notifications?unread_only=maybe",
        Some(&admin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}
