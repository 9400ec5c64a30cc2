//! Validation, password hashing and the auth/user services.

pub mod auth;
pub mod password;
pub mod users;
mod validation;

pub use auth::{AuthConfig, AuthService, Claims, CodeNotifier, LogNotifier};
pub use users::{registration_schema, UserService};
pub use validation::RequestValidator;
