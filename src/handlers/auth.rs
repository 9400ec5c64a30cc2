//! Login, current user and e-mail verification handlers.

use crate::config::{InputSchema, ValidationRule};
use crate::error::AppError;
use crate::extractors::{AuthUser, JsonBody};
use crate::middleware::auth::session_cookie;
use crate::response::{success_ok, success_with_message};
use crate::service::{AuthService, RequestValidator};
use axum::{
    extract::State,
    http::{header, HeaderValue},
    response::IntoResponse,
};
use chrono::SecondsFormat;
use serde_json::{json, Value};

fn login_schema() -> InputSchema {
    InputSchema::new()
        .field("usernameOrEmail", ValidationRule::required())
        .field("password", ValidationRule::required())
}

fn verify_schema() -> InputSchema {
    InputSchema::new().field("verificationCode", ValidationRule::required().length(6))
}

fn text<'a>(doc: &'a crate::store::Document, field: &str) -> &'a str {
    doc.get(field).and_then(Value::as_str).unwrap_or_default()
}

pub async fn login(
    State(auth): State<AuthService>,
    JsonBody(body): JsonBody<Value>,
) -> Result<impl IntoResponse, AppError> {
    let input = RequestValidator::bind(body, &login_schema())?;
    let token = auth
        .login(text(&input, "usernameOrEmail"), text(&input, "password"))
        .await?;
    let cookie = HeaderValue::from_str(&session_cookie(&token))
        .map_err(|e| AppError::Internal(format!("invalid cookie value: {}", e)))?;
    Ok(([(header::SET_COOKIE, cookie)], success_ok(json!({ "token": token }))))
}

pub async fn me(AuthUser(user): AuthUser) -> impl IntoResponse {
    success_ok(user.profile())
}

pub async fn send_verification_code(
    State(auth): State<AuthService>,
    AuthUser(user): AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let expires_at = auth.send_verification_code(&user).await?;
    let minutes = (auth.config().verification_code_ttl.as_secs() / 60).max(1);
    Ok(success_with_message(
        format!("Code sent. Please verify your account within {} minutes.", minutes),
        json!({
            "emailVerificationCodeExpiredAt": expires_at.to_rfc3339_opts(SecondsFormat::Millis, true),
        }),
    ))
}

pub async fn verify_code(
    State(auth): State<AuthService>,
    AuthUser(user): AuthUser,
    JsonBody(body): JsonBody<Value>,
) -> Result<impl IntoResponse, AppError> {
    let input = RequestValidator::bind(body, &verify_schema())?;
    let verified = auth.verify_code(&user, text(&input, "verificationCode")).await?;
    Ok(success_ok(verified.profile()))
}
