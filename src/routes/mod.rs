pub mod auth;
pub mod common;
pub mod resource;
pub mod table;
pub mod users;

pub use auth::AuthRoutes;
pub use common::common_routes;
pub use resource::{OperationConfig, Override, ResourceRoutes};
pub use table::{RouteEntry, RouteTable};
pub use users::users_routes;

use crate::error::ConfigError;
use axum::Router;

/// A set of routes mounted under the API prefix. Every mounted `(method, path)` is
/// recorded in `table`, relative to the prefix.
pub trait RouteGroup {
    fn into_router(self, table: &mut RouteTable) -> Result<Router, ConfigError>;
}

/// A hand-written router. Its routes are not listed in the route table, so no
/// `DuplicateRoute` check runs for them: a path and method that overlaps a generated
/// route makes `HttpApp::mount` panic inside axum's `Router::merge`. Mount such routers
/// on paths no resource uses.
impl RouteGroup for Router {
    fn into_router(self, _table: &mut RouteTable) -> Result<Router, ConfigError> {
        Ok(self)
    }
}
