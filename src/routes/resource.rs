//! Generated CRUD routes for one resource.
//!
//! `POST /{name}` and `GET /{name}` act on the collection; `GET`, `PUT` and `DELETE`
//! on `/{name}/:id` act on one record and sit behind `require_existing`. Each operation
//! is mounted only when enabled, and may swap the default handler for an override and
//! carry its own middlewares (outermost-first).

use super::table::RouteTable;
use super::RouteGroup;
use crate::config::{validate_resource_name, InputSchema, OutputSchema};
use crate::error::ConfigError;
use crate::handlers::resource::{self as handlers, OperationContext, Resource};
use crate::middleware::{self, require_existing, Middleware};
use crate::repository::Repository;
use crate::store::Document;
use axum::{
    handler::Handler,
    http::Method,
    routing::{self, MethodFilter, MethodRouter},
    Router,
};
use std::sync::Arc;

/// A handler that replaces the generated one for a single operation.
pub struct Override(Box<dyn FnOnce(MethodFilter) -> MethodRouter + Send>);

impl Override {
    pub fn new<H, T>(handler: H) -> Self
    where
        H: Handler<T, ()>,
        T: 'static,
    {
        Override(Box::new(move |filter| routing::on(filter, handler)))
    }

    fn into_method_router(self, filter: MethodFilter) -> MethodRouter {
        (self.0)(filter)
    }
}

impl std::fmt::Debug for Override {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Override")
    }
}

/// Per-operation settings. Disabled by default.
#[derive(Debug, Default)]
pub struct OperationConfig {
    pub enabled: bool,
    pub handler_override: Option<Override>,
    pub input_schema: Option<InputSchema>,
    pub output_schema: Option<OutputSchema>,
    pub middlewares: Vec<Middleware>,
}

impl OperationConfig {
    pub fn enabled() -> Self {
        OperationConfig {
            enabled: true,
            ..Default::default()
        }
    }

    pub fn disabled() -> Self {
        OperationConfig::default()
    }

    pub fn with_override(mut self, handler: Override) -> Self {
        self.handler_override = Some(handler);
        self
    }

    pub fn input(mut self, schema: InputSchema) -> Self {
        self.input_schema = Some(schema);
        self
    }

    pub fn output(mut self, schema: OutputSchema) -> Self {
        self.output_schema = Some(schema);
        self
    }

    pub fn middleware(mut self, mw: Middleware) -> Self {
        self.middlewares.push(mw);
        self
    }
}

pub struct ResourceRoutes<T = Document> {
    name: String,
    repository: Repository<T>,
    create: OperationConfig,
    get_all: OperationConfig,
    get_by_id: OperationConfig,
    update_by_id: OperationConfig,
    delete_by_id: OperationConfig,
}

impl<T: Resource> ResourceRoutes<T> {
    pub fn new(name: impl Into<String>, repository: Repository<T>) -> Self {
        ResourceRoutes {
            name: name.into(),
            repository,
            create: OperationConfig::default(),
            get_all: OperationConfig::default(),
            get_by_id: OperationConfig::default(),
            update_by_id: OperationConfig::default(),
            delete_by_id: OperationConfig::default(),
        }
    }

    /// Enable all five operations with their default handlers.
    pub fn all_enabled(name: impl Into<String>, repository: Repository<T>) -> Self {
        ResourceRoutes::new(name, repository)
            .create(OperationConfig::enabled())
            .get_all(OperationConfig::enabled())
            .get_by_id(OperationConfig::enabled())
            .update_by_id(OperationConfig::enabled())
            .delete_by_id(OperationConfig::enabled())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn create(mut self, op: OperationConfig) -> Self {
        self.create = op;
        self
    }

    pub fn get_all(mut self, op: OperationConfig) -> Self {
        self.get_all = op;
        self
    }

    pub fn get_by_id(mut self, op: OperationConfig) -> Self {
        self.get_by_id = op;
        self
    }

    pub fn update_by_id(mut self, op: OperationConfig) -> Self {
        self.update_by_id = op;
        self
    }

    pub fn delete_by_id(mut self, op: OperationConfig) -> Self {
        self.delete_by_id = op;
        self
    }

    fn context(&self, op: &OperationConfig) -> Arc<OperationContext<T>> {
        Arc::new(OperationContext {
            repository: self.repository.clone(),
            input: op.input_schema.clone(),
            output: op.output_schema.clone(),
        })
    }

    /// Override or default handler for `op`, optionally guarded, then wrapped in its middlewares.
    fn operation<H, Args>(
        &self,
        op: OperationConfig,
        filter: MethodFilter,
        default: H,
        guarded: bool,
    ) -> MethodRouter
    where
        H: Handler<Args, Arc<OperationContext<T>>>,
        Args: 'static,
    {
        let ctx = self.context(&op);
        let mut route = match op.handler_override {
            Some(o) => o.into_method_router(filter),
            None => routing::on(filter, default).with_state(ctx),
        };
        if guarded {
            let repo: Repository<Document> = self.repository.typed();
            route = route.route_layer(axum::middleware::from_fn_with_state(repo, require_existing));
        }
        middleware::apply(route, &op.middlewares)
    }
}

fn add(slot: &mut Option<MethodRouter>, route: MethodRouter) {
    *slot = Some(match slot.take() {
        Some(existing) => existing.merge(route),
        None => route,
    });
}

impl<T: Resource> RouteGroup for ResourceRoutes<T> {
    fn into_router(mut self, table: &mut RouteTable) -> Result<Router, ConfigError> {
        validate_resource_name(&self.name)?;
        tracing::debug!(
            resource = %self.name,
            collection = self.repository.collection(),
            store = self.repository.store().kind(),
            "mounting resource"
        );
        let collection_path = format!("/{}", self.name);
        let item_path = format!("/{}/:id", self.name);
        let mut router = Router::new();

        let mut collection: Option<MethodRouter> = None;
        let mut item: Option<MethodRouter> = None;
        let create = std::mem::take(&mut self.create);
        if create.enabled {
            table.record(Method::POST, collection_path.clone())?;
            let route = self.operation(create, MethodFilter::POST, handlers::create::<T>, false);
            add(&mut collection, route);
        }
        let get_all = std::mem::take(&mut self.get_all);
        if get_all.enabled {
            table.record(Method::GET, collection_path.clone())?;
            let route = self.operation(get_all, MethodFilter::GET, handlers::get_all::<T>, false);
            add(&mut collection, route);
        }
        let get_by_id = std::mem::take(&mut self.get_by_id);
        if get_by_id.enabled {
            table.record(Method::GET, item_path.clone())?;
            let route = self.operation(get_by_id, MethodFilter::GET, handlers::get_by_id::<T>, true);
            add(&mut item, route);
        }
        let update_by_id = std::mem::take(&mut self.update_by_id);
        if update_by_id.enabled {
            table.record(Method::PUT, item_path.clone())?;
            let route = self.operation(update_by_id, MethodFilter::PUT, handlers::update_by_id::<T>, true);
            add(&mut item, route);
        }
        let delete_by_id = std::mem::take(&mut self.delete_by_id);
        if delete_by_id.enabled {
            table.record(Method::DELETE, item_path.clone())?;
            let route = self.operation(delete_by_id, MethodFilter::DELETE, handlers::delete_by_id::<T>, true);
            add(&mut item, route);
        }

        if let Some(route) = collection {
            router = router.route(&collection_path, route);
        }
        if let Some(route) = item {
            router = router.route(&item_path, route);
        }
        Ok(router)
    }
}
