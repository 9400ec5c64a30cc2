//! Registration, mounted as the create override of the `users` resource.

use crate::error::AppError;
use crate::extractors::JsonBody;
use crate::response::success_created;
use crate::routes::resource::Override;
use crate::service::{registration_schema, RequestValidator, UserService};
use axum::response::IntoResponse;
use serde_json::Value;

pub async fn register(users: &UserService, body: Value) -> Result<impl IntoResponse, AppError> {
    let input = RequestValidator::bind(body, &registration_schema())?;
    let user = users.register(input).await?;
    Ok(success_created(user.profile()))
}

/// `POST /users` handler that registers an account instead of inserting the raw body.
pub fn register_override(users: UserService) -> Override {
    Override::new(move |JsonBody(body): JsonBody<Value>| {
        let users = users.clone();
        async move { register(&users, body).await }
    })
}
