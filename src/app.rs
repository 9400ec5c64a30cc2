//! HTTP application shell: prefix nesting, global middleware, fallback, route table, serving.

use crate::config::{normalize_prefix, AppConfig};
use crate::error::{AppError, ConfigError};
use crate::externals::Externals;
use crate::routes::{common_routes, RouteGroup, RouteTable};
use axum::{
    http::{header, Method, StatusCode},
    middleware::map_response,
    response::{IntoResponse, Response},
    Router,
};
use std::any::Any;
use tokio::net::TcpListener;
use tower_http::{
    catch_panic::CatchPanicLayer, limit::RequestBodyLimitLayer, timeout::TimeoutLayer, trace::TraceLayer,
};
use tracing::{info, warn};

pub struct HttpApp {
    config: AppConfig,
    externals: Externals,
    api: Router,
    /// Mounted routes, relative to the API prefix.
    table: RouteTable,
}

impl HttpApp {
    pub fn new(config: AppConfig, externals: Externals) -> Self {
        HttpApp {
            config,
            externals,
            api: Router::new(),
            table: RouteTable::new(),
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn externals(&self) -> &Externals {
        &self.externals
    }

    /// Add a route group under the API prefix.
    pub fn mount(mut self, group: impl RouteGroup) -> Result<Self, ConfigError> {
        let router = group.into_router(&mut self.table)?;
        self.api = self.api.merge(router);
        Ok(self)
    }

    /// Every route the built application serves, with full paths.
    pub fn route_table(&self) -> Result<RouteTable, ConfigError> {
        let prefix = normalize_prefix(&self.config.api_prefix)?;
        let mut table = RouteTable::new();
        for path in ["/health", "/ready", "/version"] {
            table.record(Method::GET, path)?;
        }
        table.extend_prefixed(&prefix, self.table.clone())?;
        Ok(table)
    }

    pub fn build(self) -> Result<Router, ConfigError> {
        let prefix = normalize_prefix(&self.config.api_prefix)?;
        let common = common_routes(self.externals.clone());
        let router = if prefix.is_empty() {
            common.merge(self.api)
        } else {
            common.nest(&prefix, self.api)
        };
        Ok(router
            .fallback(not_found)
            .layer(RequestBodyLimitLayer::new(self.config.body_limit_bytes))
            .layer(TimeoutLayer::new(self.config.request_timeout))
            .layer(map_response(timeout_body))
            .layer(CatchPanicLayer::custom(panic_response))
            .layer(TraceLayer::new_for_http()))
    }

    /// Bind `0.0.0.0:<port>` and serve until Ctrl-C.
    pub async fn serve(self) -> Result<(), AppError> {
        let listener = TcpListener::bind(("0.0.0.0", self.config.port)).await?;
        self.serve_on(listener).await
    }

    pub async fn serve_on(self, listener: TcpListener) -> Result<(), AppError> {
        self.route_table()?.log();
        let router = self.build()?;
        info!("listening on {}", listener.local_addr()?);
        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        info!("server stopped");
        Ok(())
    }
}

async fn not_found() -> AppError {
    AppError::NotFound("Route not found.".into())
}

/// `TimeoutLayer` answers with an empty 408; give it the standard error body.
async fn timeout_body(response: Response) -> Response {
    if response.status() == StatusCode::REQUEST_TIMEOUT && !response.headers().contains_key(header::CONTENT_TYPE) {
        return AppError::Timeout.into_response();
    }
    response
}

fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .cloned()
        .or_else(|| err.downcast_ref::<&str>().map(|s| s.to_string()))
        .unwrap_or_else(|| "unknown panic payload".into());
    AppError::Internal(format!("handler panicked: {}", detail)).into_response()
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
