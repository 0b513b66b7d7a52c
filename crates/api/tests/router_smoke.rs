use std::sync::Arc;

use api::{ApiContext, build_router};
use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use havamath_core::time::fixed_now;
use serde_json::{Value, json};
use services::{AppServices, Clock};
use tower::ServiceExt;

fn router() -> Router {
    let services = AppServices::in_memory(Clock::fixed(fixed_now()));
    let ctx = ApiContext::new(services, vec!["admin_1".to_string()]);
    build_router(Arc::new(ctx))
}

fn request(method: &str, uri: &str, user: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        builder = builder.header("x-user-id", user);
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request"),
        None => builder.body(Body::empty()).expect("request"),
    }
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("json body")
}

fn course_body() -> Value {
    json!({
        "title": "Toán 12",
        "category": "Toán",
        "author": "Thầy Hà",
        "price_vnd": 599_000,
        "modules": [{
            "title": "Chương 1",
            "lessons": [{
                "title": "Kiểm tra",
                "type": "quiz",
                "questions": [
                    {"type": "single_choice", "choices": ["21", "22"], "correct": "22"},
                    {"type": "fill_in_blank", "answer": "96"}
                ]
            }]
        }]
    })
}

#[tokio::test]
async fn health_is_open() {
    let response = router()
        .oneshot(request("GET", "/api/v1/health", None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await, json!({"ok": true}));
}

#[tokio::test]
async fn admin_routes_enforce_the_allow_list() {
    let app = router();

    let anonymous = app
        .clone()
        .oneshot(request(
            "POST",
            "/api/v1/admin/courses",
            None,
            Some(course_body()),
        ))
        .await
        .unwrap();
    assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);

    let student = app
        .clone()
        .oneshot(request(
            "POST",
            "/api/v1/admin/courses",
            Some("user_1"),
            Some(course_body()),
        ))
        .await
        .unwrap();
    assert_eq!(student.status(), StatusCode::FORBIDDEN);
    let body = json_body(student).await;
    assert_eq!(body["success"], json!(false));

    let admin = app
        .oneshot(request(
            "POST",
            "/api/v1/admin/courses",
            Some("admin_1"),
            Some(course_body()),
        ))
        .await
        .unwrap();
    assert_eq!(admin.status(), StatusCode::OK);
}

#[tokio::test]
async fn catalog_detail_never_leaks_answer_keys() {
    let app = router();
    let created = app
        .clone()
        .oneshot(request(
            "POST",
            "/api/v1/admin/courses",
            Some("admin_1"),
            Some(course_body()),
        ))
        .await
        .unwrap();
    let id = json_body(created).await["id"].as_u64().unwrap();

    let detail = app
        .oneshot(request(
            "GET",
            &format!("/api/v1/courses/{id}"),
            None,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(detail.status(), StatusCode::OK);
    let body = json_body(detail).await;

    let rendered = body.to_string();
    assert!(rendered.contains("single_choice"));
    assert!(!rendered.contains("correct"), "answer key leaked: {rendered}");
    assert!(!rendered.contains("\"96\""), "answer key leaked: {rendered}");
}

#[tokio::test]
async fn redemption_flow_over_http() {
    let app = router();

    // Admin issues one code.
    let issued = app
        .clone()
        .oneshot(request(
            "POST",
            "/api/v1/admin/codes",
            Some("admin_1"),
            Some(json!({"count": 1})),
        ))
        .await
        .unwrap();
    assert_eq!(issued.status(), StatusCode::OK);
    let token = json_body(issued).await[0]["code"].as_str().unwrap().to_string();

    // Anonymous redemption is refused.
    let anonymous = app
        .clone()
        .oneshot(request(
            "POST",
            "/api/v1/redeem",
            None,
            Some(json!({"code": token})),
        ))
        .await
        .unwrap();
    assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);

    // The buyer redeems, sloppily typed.
    let redeemed = app
        .clone()
        .oneshot(request(
            "POST",
            "/api/v1/redeem",
            Some("user_1"),
            Some(json!({"code": format!("  {} ", token.to_lowercase())})),
        ))
        .await
        .unwrap();
    assert_eq!(redeemed.status(), StatusCode::OK);
    let body = json_body(redeemed).await;
    assert_eq!(body["grant"]["amount_vnd"], json!(0));
    assert_eq!(body["grant"]["status"], json!("completed"));

    // Second use returns the Vietnamese "already redeemed" toast.
    let again = app
        .oneshot(request(
            "POST",
            "/api/v1/redeem",
            Some("user_2"),
            Some(json!({"code": token})),
        ))
        .await
        .unwrap();
    assert_eq!(again.status(), StatusCode::CONFLICT);
    let body = json_body(again).await;
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["error"], json!("Mã kích hoạt đã được sử dụng"));
}

#[tokio::test]
async fn quiz_submission_and_progress_over_http() {
    let app = router();
    let created = app
        .clone()
        .oneshot(request(
            "POST",
            "/api/v1/admin/courses",
            Some("admin_1"),
            Some(course_body()),
        ))
        .await
        .unwrap();
    let course_id = json_body(created).await["id"].as_u64().unwrap();

    let detail = app
        .clone()
        .oneshot(request(
            "GET",
            &format!("/api/v1/courses/{course_id}"),
            None,
            None,
        ))
        .await
        .unwrap();
    let body = json_body(detail).await;
    let lesson = &body["modules"][0]["lessons"][0];
    let lesson_id = lesson["id"].as_u64().unwrap();
    let q1 = lesson["questions"][0]["id"].as_u64().unwrap();
    let q2 = lesson["questions"][1]["id"].as_u64().unwrap();

    let mut answers = serde_json::Map::new();
    answers.insert(q1.to_string(), json!({"kind": "choice", "value": "22"}));
    answers.insert(q2.to_string(), json!({"kind": "text", "value": " 96 "}));

    let submitted = app
        .clone()
        .oneshot(request(
            "POST",
            &format!("/api/v1/lessons/{lesson_id}/attempts"),
            Some("user_1"),
            Some(json!({"course_id": course_id, "answers": answers})),
        ))
        .await
        .unwrap();
    assert_eq!(submitted.status(), StatusCode::OK);
    let body = json_body(submitted).await;
    assert_eq!(body["score"], json!(100));
    assert_eq!(body["passed"], json!(true));
    assert_eq!(body["recorded"], json!(true));

    let progress = app
        .oneshot(request(
            "GET",
            &format!("/api/v1/courses/{course_id}/progress"),
            Some("user_1"),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(progress.status(), StatusCode::OK);
    let body = json_body(progress).await;
    assert_eq!(body["total_lessons"], json!(1));
    assert_eq!(body["completed_lessons"], json!(1));
    assert_eq!(body["percent"], json!(100));
}
