use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tempfile::NamedTempFile;
use tower::ServiceExt;

use template_manager::config::Config;
use template_manager::database::{init_db, AppState};
use template_manager::route::create_app;

fn setup_test_app() -> (Router, NamedTempFile) {
    setup_test_app_with(Config::default())
}

fn setup_test_app_with(config: Config) -> (Router, NamedTempFile) {
    let temp_db = NamedTempFile::new().expect("Failed to create temp file");
    let db_path = temp_db.path().to_str().unwrap();
    let db = init_db(db_path).expect("Failed to initialize test database");
    let state = AppState::new(db, config).expect("Failed to build state");
    (create_app(state), temp_db)
}

/// Helper function to parse response body as JSON
async fn response_json(body: Body) -> Value {
    let bytes = body
        .collect()
        .await
        .expect("Failed to read response body")
        .to_bytes();

    serde_json::from_slice(&bytes).expect("Failed to parse JSON")
}

fn post_json(uri: &str, payload: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(payload.to_string()))
        .unwrap()
}

fn get_with(uri: &str, header_name: &str, value: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header_name, value)
        .body(Body::empty())
        .unwrap()
}

fn credentials() -> Value {
    json!({ "email": "Alice@Example.com", "password": "secret123" })
}

async fn signed_in_token(app: &Router) -> String {
    let response = app
        .clone()
        .oneshot(post_json("/auth/signup", credentials()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .clone()
        .oneshot(post_json("/auth/login", credentials()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response.into_body()).await;
    body["token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_signup_normalizes_email() {
    let (app, _temp_db) = setup_test_app();

    let response = app.oneshot(post_json("/auth/signup", credentials())).await.unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = response_json(response.into_body()).await;
    assert_eq!(body["user"]["email"], "alice@example.com");
}

#[tokio::test]
async fn test_signup_duplicate_and_short_password() {
    let (app, _temp_db) = setup_test_app();

    app.clone()
        .oneshot(post_json("/auth/signup", credentials()))
        .await
        .unwrap();
    let response = app
        .clone()
        .oneshot(post_json("/auth/signup", credentials()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = app
        .oneshot(post_json(
            "/auth/signup",
            json!({ "email": "bob@example.com", "password": "123" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response_json(response.into_body()).await;
    assert_eq!(body["code"], "validation_error");
}

#[tokio::test]
async fn test_login_sets_cookie_and_greets() {
    let (app, _temp_db) = setup_test_app();
    app.clone()
        .oneshot(post_json("/auth/signup", credentials()))
        .await
        .unwrap();

    let response = app
        .oneshot(post_json("/auth/login", credentials()))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let cookie = response.headers()[header::SET_COOKIE].to_str().unwrap().to_string();
    assert!(cookie.starts_with("session="));
    assert!(cookie.contains("HttpOnly"));

    let body = response_json(response.into_body()).await;
    assert_eq!(body["message"], "Welcome back, alice!");
    assert_eq!(body["token"].as_str().unwrap().len(), 32);
}

#[tokio::test]
async fn test_login_wrong_password() {
    let (app, _temp_db) = setup_test_app();
    app.clone()
        .oneshot(post_json("/auth/signup", credentials()))
        .await
        .unwrap();

    let response = app
        .oneshot(post_json(
            "/auth/login",
            json!({ "email": "alice@example.com", "password": "wrong-password" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = response_json(response.into_body()).await;
    assert_eq!(body["code"], "unauthorized");
}

#[tokio::test]
async fn test_session_then_logout() {
    let (app, _temp_db) = setup_test_app();
    let token = signed_in_token(&app).await;
    let bearer = format!("Bearer {token}");

    let response = app
        .clone()
        .oneshot(get_with("/auth/session", "Authorization", &bearer))
        .await
        .unwrap();
    let body = response_json(response.into_body()).await;
    assert_eq!(body["session"]["user"]["email"], "alice@example.com");

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/auth/logout")
                .header("Authorization", &bearer)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(get_with("/auth/session", "Authorization", &bearer))
        .await
        .unwrap();
    let body = response_json(response.into_body()).await;
    assert!(body["session"].is_null());
}

#[tokio::test]
async fn test_api_requires_session() {
    let (app, _temp_db) = setup_test_app();

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/api/templates").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = response_json(response.into_body()).await;
    assert_eq!(body["error"], "Unauthorized");

    let response = app
        .oneshot(get_with("/api/templates", "Authorization", "Bearer not-a-token"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_expired_session_is_rejected() {
    let (app, _temp_db) = setup_test_app_with(Config {
        session_ttl_hours: 0,
        ..Config::default()
    });
    let token = signed_in_token(&app).await;
    let bearer = format!("Bearer {token}");

    let response = app
        .clone()
        .oneshot(get_with("/auth/session", "Authorization", &bearer))
        .await
        .unwrap();
    let body = response_json(response.into_body()).await;
    assert!(body["session"].is_null());

    let response = app
        .oneshot(get_with("/api/templates", "Authorization", &bearer))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_api_accepts_session_cookie() {
    let (app, _temp_db) = setup_test_app();
    let token = signed_in_token(&app).await;

    let response = app
        .oneshot(get_with("/api/templates", "Cookie", &format!("session={token}")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_reset_password_answers_uniformly() {
    let (app, _temp_db) = setup_test_app();

    let response = app
        .oneshot(post_json(
            "/auth/reset-password",
            json!({ "email": "nobody@example.com" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response.into_body()).await;
    assert_eq!(body["message"], "Password reset email sent!");
}

#[tokio::test]
async fn test_protected_page_redirects_to_login() {
    let (app, _temp_db) = setup_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/templates/create")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        response.headers()[header::LOCATION],
        "/login?from=/templates/create"
    );
}

#[tokio::test]
async fn test_signed_in_pages() {
    let (app, _temp_db) = setup_test_app();
    let token = signed_in_token(&app).await;
    let cookie = format!("session={token}");

    let response = app
        .clone()
        .oneshot(get_with("/login", "Cookie", &cookie))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[header::LOCATION], "/dashboard");

    let response = app
        .clone()
        .oneshot(get_with("/templates", "Cookie", &cookie))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let html = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(html.contains("No templates found."));

    let response = app
        .oneshot(get_with("/unknown/page", "Cookie", &cookie))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[header::LOCATION], "/");
}
