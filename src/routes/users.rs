//! The `users` resource: registration plus authenticated, verified listing and lookup.

use super::resource::{OperationConfig, ResourceRoutes};
use crate::config::OutputSchema;
use crate::handlers::users::register_override;
use crate::middleware::auth::{authenticated, verified};
use crate::models::{User, PROFILE_FIELDS, USERS_COLLECTION};
use crate::service::{AuthService, UserService};

/// `POST /users` registers; `GET /users` and `GET /users/:id` need a verified account
/// and only expose profile fields.
pub fn users_routes(auth: &AuthService) -> ResourceRoutes<User> {
    let users = auth.users().clone();
    let registration = UserService::new(users.clone(), auth.config().password_cost);
    let profile = OutputSchema::only(PROFILE_FIELDS);
    let guarded = |output: OutputSchema| {
        OperationConfig::enabled()
            .output(output)
            .middleware(authenticated(auth.clone()))
            .middleware(verified())
    };

    ResourceRoutes::new(USERS_COLLECTION, users)
        .create(OperationConfig::enabled().with_override(register_override(registration)))
        .get_all(guarded(profile.clone()))
        .get_by_id(guarded(profile))
}
