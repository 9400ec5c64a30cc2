//! Auth routes: login, current user, e-mail verification.

use super::table::RouteTable;
use super::RouteGroup;
use crate::error::ConfigError;
use crate::handlers::auth as handlers;
use crate::middleware::require_auth;
use crate::service::AuthService;
use axum::{
    http::Method,
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};

pub struct AuthRoutes {
    auth: AuthService,
}

impl AuthRoutes {
    pub fn new(auth: AuthService) -> Self {
        AuthRoutes { auth }
    }
}

impl RouteGroup for AuthRoutes {
    fn into_router(self, table: &mut RouteTable) -> Result<Router, ConfigError> {
        table.record(Method::POST, "/auth/login")?;
        table.record(Method::GET, "/auth")?;
        table.record(Method::POST, "/auth/verification/code/send")?;
        table.record(Method::POST, "/auth/verification/code/verify")?;

        let router = Router::new()
            .route("/auth", get(handlers::me))
            .route("/auth/verification/code/send", post(handlers::send_verification_code))
            .route("/auth/verification/code/verify", post(handlers::verify_code))
            .route_layer(from_fn_with_state(self.auth.clone(), require_auth))
            .route("/auth/login", post(handlers::login))
            .with_state(self.auth);
        Ok(router)
    }
}
