//! Scaffold SDK: REST API starter kit with generated CRUD resource routes,
//! pluggable document stores and JWT authentication.

pub mod app;
pub mod config;
pub mod error;
pub mod externals;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod query;
pub mod repository;
pub mod response;
pub mod routes;
pub mod service;
pub mod sql;
pub mod store;
pub mod telemetry;

pub use app::HttpApp;
pub use config::{AppConfig, InputSchema, OutputSchema, TimestampConfig, ValidationRule};
pub use error::{AppError, ConfigError};
pub use externals::{External, Externals, JsonFileExternal, PostgresExternal};
pub use middleware::Middleware;
pub use models::{User, USERS_COLLECTION};
pub use query::{Filter, FilterOp, ListQuery, PaginationParams, SortField};
pub use repository::Repository;
pub use routes::{users_routes, AuthRoutes, OperationConfig, Override, ResourceRoutes, RouteGroup, RouteTable};
pub use service::{AuthConfig, AuthService, UserService};
pub use store::{Document, JsonFileStore, PgStore, RecordId, Store};
