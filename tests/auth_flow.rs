mod common;

use async_trait::async_trait;
use axum::{
    http::{header, Method, StatusCode},
    Router,
};
use chrono::{DateTime, Utc};
use common::{get, post, send};
use scaffold_sdk::service::CodeNotifier;
use scaffold_sdk::{
    users_routes, AppError, AuthConfig, AuthRoutes, AuthService, HttpApp, Repository, TimestampConfig, User,
    USERS_COLLECTION,
};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Default)]
struct CapturedCode(Mutex<Option<String>>);

#[async_trait]
impl CodeNotifier for CapturedCode {
    async fn send_code(&self, _user: &User, code: &str, _expires_at: DateTime<Utc>) -> Result<(), AppError> {
        *self.0.lock().unwrap() = Some(code.to_string());
        Ok(())
    }
}

impl CapturedCode {
    fn take(&self) -> String {
        self.0.lock().unwrap().take().unwrap()
    }
}

struct AuthApp {
    _store: common::TestStore,
    app: Router,
    codes: Arc<CapturedCode>,
}

async fn auth_app() -> AuthApp {
    let store = common::json_store().await;
    let users: Repository<User> = Repository::new(store.store.clone(), USERS_COLLECTION, TimestampConfig::both());
    let config = AuthConfig::new("test_secret_key_for_testing", Duration::from_secs(3600))
        .unwrap()
        .with_password_cost(4);
    let codes = Arc::new(CapturedCode::default());
    let auth = AuthService::new(config, users).with_notifier(codes.clone());
    let app = HttpApp::new(common::config(), store.externals.clone())
        .mount(users_routes(&auth))
        .unwrap()
        .mount(AuthRoutes::new(auth))
        .unwrap()
        .build()
        .unwrap();
    AuthApp {
        _store: store,
        app,
        codes,
    }
}

fn registration(username: &str, email: &str) -> Value {
    json!({
        "email": email,
        "username": username,
        "firstName": "Ada",
        "lastName": "Lovelace",
        "password": "correct horse",
        "confirmPassword": "correct horse",
    })
}

async fn register_and_login(app: &Router) -> String {
    let res = post(app, "/api/v1/users", registration("ada", "ada@example.com")).await;
    assert_eq!(res.status, StatusCode::CREATED, "{}", res.body);
    let res = post(
        app,
        "/api/v1/auth/login",
        json!({"usernameOrEmail": "ada", "password": "correct horse"}),
    )
    .await;
    assert_eq!(res.status, StatusCode::OK, "{}", res.body);
    res.body["data"]["token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn register_returns_profile_without_secrets() {
    let t = auth_app().await;
    let res = post(&t.app, "/api/v1/users", registration("ada", "ada@example.com")).await;
    assert_eq!(res.status, StatusCode::CREATED);
    let data = &res.body["data"];
    assert_eq!(data["username"], "ada");
    assert_eq!(data["emailVerifiedAt"], Value::Null);
    assert!(data["id"].is_string());
    assert!(data.get("password").is_none());
    assert!(data.get("confirmPassword").is_none());
}

#[tokio::test]
async fn registration_is_validated() {
    let t = auth_app().await;
    let mut body = registration("ada", "not-an-email");
    body["confirmPassword"] = json!("something else");
    let res = post(&t.app, "/api/v1/users", body).await;
    assert_eq!(res.status, StatusCode::UNPROCESSABLE_ENTITY);
    let details = &res.body["error"]["details"];
    assert_eq!(details["email"], "email is not a valid email.");
    assert_eq!(details["password"], "password does not match with confirmPassword.");
}

#[tokio::test]
async fn duplicate_username_or_email_is_rejected() {
    let t = auth_app().await;
    post(&t.app, "/api/v1/users", registration("ada", "ada@example.com")).await;

    let res = post(&t.app, "/api/v1/users", registration("ada", "other@example.com")).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.body["error"]["message"], "Username already taken.");

    let res = post(&t.app, "/api/v1/users", registration("grace", "ada@example.com")).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.body["error"]["message"], "Email already taken.");
}

#[tokio::test]
async fn login_by_email_sets_cookie() {
    let t = auth_app().await;
    post(&t.app, "/api/v1/users", registration("ada", "ada@example.com")).await;
    let res = post(
        &t.app,
        "/api/v1/auth/login",
        json!({"usernameOrEmail": "ada@example.com", "password": "correct horse"}),
    )
    .await;
    assert_eq!(res.status, StatusCode::OK);
    let token = res.body["data"]["token"].as_str().unwrap();
    let cookie = res.headers.get(header::SET_COOKIE).unwrap().to_str().unwrap();
    assert!(cookie.starts_with(&format!("token={};", token)));
    assert!(cookie.contains("HttpOnly"));
}

#[tokio::test]
async fn wrong_password_and_unknown_user_look_the_same() {
    let t = auth_app().await;
    post(&t.app, "/api/v1/users", registration("ada", "ada@example.com")).await;
    for (who, password) in [("ada", "wrong password"), ("nobody", "correct horse")] {
        let res = post(
            &t.app,
            "/api/v1/auth/login",
            json!({"usernameOrEmail": who, "password": password}),
        )
        .await;
        assert_eq!(res.status, StatusCode::UNAUTHORIZED);
        assert_eq!(res.body["error"]["message"], "Wrong username / email or password.");
    }
}

#[tokio::test]
async fn login_requires_both_fields() {
    let t = auth_app().await;
    let res = post(&t.app, "/api/v1/auth/login", json!({"usernameOrEmail": "ada"})).await;
    assert_eq!(res.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(res.body["error"]["details"]["password"], "password is a required field.");
}

#[tokio::test]
async fn current_user_needs_a_valid_token() {
    let t = auth_app().await;
    let token = register_and_login(&t.app).await;

    let res = send(&t.app, Method::GET, "/api/v1/auth", None, Some(&token)).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["data"]["email"], "ada@example.com");

    let res = get(&t.app, "/api/v1/auth").await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert_eq!(res.body["error"]["message"], "Missing authentication token.");

    let res = send(&t.app, Method::GET, "/api/v1/auth", None, Some("garbage")).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert_eq!(res.body["error"]["message"], "Invalid token.");
    let cleared = res.headers.get(header::SET_COOKIE).unwrap().to_str().unwrap();
    assert!(cleared.contains("Max-Age=0"));
}

#[tokio::test]
async fn verification_unlocks_user_listing() {
    let t = auth_app().await;
    let token = register_and_login(&t.app).await;

    let res = send(&t.app, Method::GET, "/api/v1/users", None, Some(&token)).await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
    assert_eq!(res.body["error"]["message"], "Please verify your account.");

    let res = send(&t.app, Method::POST, "/api/v1/auth/verification/code/send", None, Some(&token)).await;
    assert_eq!(res.status, StatusCode::OK, "{}", res.body);
    assert_eq!(
        res.body["message"],
        "Code sent. Please verify your account within 2 minutes."
    );
    assert!(res.body["data"]["emailVerificationCodeExpiredAt"].is_string());
    let code = t.codes.take();
    assert_eq!(code.len(), 6);

    let wrong = if code == "000000" { "111111" } else { "000000" };
    let res = send(
        &t.app,
        Method::POST,
        "/api/v1/auth/verification/code/verify",
        Some(json!({ "verificationCode": wrong })),
        Some(&token),
    )
    .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.body["error"]["message"], "Wrong verification code.");

    let res = send(
        &t.app,
        Method::POST,
        "/api/v1/auth/verification/code/verify",
        Some(json!({ "verificationCode": code })),
        Some(&token),
    )
    .await;
    assert_eq!(res.status, StatusCode::OK, "{}", res.body);
    assert!(res.body["data"]["emailVerifiedAt"].is_string());

    let res = send(&t.app, Method::POST, "/api/v1/auth/verification/code/send", None, Some(&token)).await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
    assert_eq!(res.body["error"]["message"], "Account already verified.");

    let res = send(&t.app, Method::GET, "/api/v1/users", None, Some(&token)).await;
    assert_eq!(res.status, StatusCode::OK);
    let records = res.body["data"]["records"].as_array().unwrap();
    assert_eq!(records.len(), 1);
    assert!(records[0].get("password").is_none());
    assert!(records[0].get("emailVerificationCode").is_none());

    let id = records[0]["id"].as_str().unwrap();
    let res = send(&t.app, Method::GET, &format!("/api/v1/users/{}", id), None, Some(&token)).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["data"]["username"], "ada");
}

#[tokio::test]
async fn verify_code_must_be_six_characters() {
    let t = auth_app().await;
    let token = register_and_login(&t.app).await;
    let res = send(
        &t.app,
        Method::POST,
        "/api/v1/auth/verification/code/verify",
        Some(json!({ "verificationCode": "123" })),
        Some(&token),
    )
    .await;
    assert_eq!(res.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        res.body["error"]["details"]["verificationCode"],
        "verificationCode must be of 6 character(s)."
    );
}

#[tokio::test]
async fn user_listing_rejects_anonymous_requests_before_lookup() {
    let t = auth_app().await;
    let res = get(&t.app, "/api/v1/users/not-a-uuid").await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
}
