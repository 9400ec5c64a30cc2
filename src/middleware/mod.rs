//! Per-operation middleware and the built-in guards (record existence, authentication, verification).

pub mod auth;
pub mod existing;

pub use auth::{require_auth, require_verified};
pub use existing::{require_existing, LoadedRecord, ResolvedId};

use axum::{
    extract::Request,
    middleware::Next,
    response::{IntoResponse, Response},
    routing::MethodRouter,
};
use futures::future::BoxFuture;
use futures::FutureExt;
use std::future::Future;
use std::sync::Arc;

type MiddlewareFn = dyn Fn(Request, Next) -> BoxFuture<'static, Response> + Send + Sync;

/// A request/response interceptor attached to one operation.
///
/// Lists of middlewares are applied outermost-first: the first entry sees the request
/// first and the response last.
#[derive(Clone)]
pub struct Middleware(Arc<MiddlewareFn>);

impl Middleware {
    pub fn from_fn<F, Fut, R>(f: F) -> Self
    where
        F: Fn(Request, Next) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: IntoResponse + 'static,
    {
        Middleware(Arc::new(move |req, next| f(req, next).map(IntoResponse::into_response).boxed()))
    }

    pub(crate) fn call(&self, req: Request, next: Next) -> BoxFuture<'static, Response> {
        (self.0)(req, next)
    }
}

impl std::fmt::Debug for Middleware {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Middleware")
    }
}

/// Wrap `route` so that `middlewares[0]` is the outermost layer.
pub(crate) fn apply<S>(mut route: MethodRouter<S>, middlewares: &[Middleware]) -> MethodRouter<S>
where
    S: Clone + Send + Sync + 'static,
{
    for mw in middlewares.iter().rev() {
        let mw = mw.clone();
        route = route.route_layer(axum::middleware::from_fn(move |req: Request, next: Next| {
            let mw = mw.clone();
            async move { mw.call(req, next).await }
        }));
    }
    route
}
