//! Token authentication and account-verification guards.

use super::Middleware;
use crate::error::AppError;
use crate::models::User;
use crate::service::AuthService;
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};

pub const TOKEN_COOKIE: &str = "token";

/// `Authorization: Bearer <token>`, else the `token` cookie.
pub fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| {
            h.get(..7)
                .filter(|p| p.eq_ignore_ascii_case("bearer "))
                .map(|_| h[7..].trim().to_string())
        })
        .filter(|t| !t.is_empty());
    bearer.or_else(|| {
        headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|h| h.to_str().ok())
            .flat_map(|h| h.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| *name == TOKEN_COOKIE)
            .map(|(_, value)| value.trim().to_string())
            .filter(|t| !t.is_empty())
    })
}

pub fn session_cookie(token: &str) -> String {
    format!("{}={}; HttpOnly; Path=/; SameSite=Lax", TOKEN_COOKIE, token)
}

pub fn cleared_cookie() -> HeaderValue {
    HeaderValue::from_static("token=; HttpOnly; Path=/; SameSite=Lax; Max-Age=0")
}

/// 401 unless the request carries a valid token for an existing user; inserts the `User`.
pub async fn require_auth(State(auth): State<AuthService>, mut req: Request, next: Next) -> Response {
    let Some(token) = token_from_headers(req.headers()) else {
        return AppError::Unauthorized("Missing authentication token.".into()).into_response();
    };
    match auth.authenticate(&token).await {
        Ok(user) => {
            req.extensions_mut().insert(user);
            next.run(req).await
        }
        Err(err @ AppError::Unauthorized(_)) => {
            let mut response = err.into_response();
            response
                .headers_mut()
                .append(header::SET_COOKIE, cleared_cookie());
            response
        }
        Err(err) => err.into_response(),
    }
}

/// 403 for accounts without `emailVerifiedAt`. Must run inside `require_auth`.
pub async fn require_verified(req: Request, next: Next) -> Result<Response, AppError> {
    match req.extensions().get::<User>() {
        None => Err(AppError::Unauthorized("Missing authentication token.".into())),
        Some(user) if !user.is_verified() => Err(AppError::Forbidden("Please verify your account.".into())),
        Some(_) => Ok(next.run(req).await),
    }
}

/// `require_auth` as a resource-operation middleware.
pub fn authenticated(auth: AuthService) -> Middleware {
    Middleware::from_fn(move |req, next| require_auth(State(auth.clone()), req, next))
}

/// `require_verified` as a resource-operation middleware.
pub fn verified() -> Middleware {
    Middleware::from_fn(require_verified)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_header_wins_over_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        headers.insert(header::COOKIE, HeaderValue::from_static("token=def"));
        assert_eq!(token_from_headers(&headers).as_deref(), Some("abc"));
    }

    #[test]
    fn token_cookie_is_found_among_others() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("theme=dark; token=def; x=1"));
        assert_eq!(token_from_headers(&headers).as_deref(), Some("def"));
    }

    #[test]
    fn missing_or_other_scheme_yields_none() {
        let mut headers = HeaderMap::new();
        assert!(token_from_headers(&headers).is_none());
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert!(token_from_headers(&headers).is_none());
    }
}
