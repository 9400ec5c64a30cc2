//! Account registration.

use super::password;
use crate::config::{InputSchema, ValidationRule};
use crate::error::AppError;
use crate::models::User;
use crate::query::Filter;
use crate::repository::Repository;
use crate::store::Document;
use serde_json::Value;

/// Body accepted by `POST /users`.
pub fn registration_schema() -> InputSchema {
    InputSchema::new()
        .field("email", ValidationRule::required().format("email"))
        .field("username", ValidationRule::required())
        .field("firstName", ValidationRule::required())
        .field("lastName", ValidationRule::required())
        .field(
            "password",
            ValidationRule::required().min_length(8).equals_field("confirmPassword"),
        )
        .field(
            "confirmPassword",
            ValidationRule::required().min_length(8).equals_field("password"),
        )
}

#[derive(Clone)]
pub struct UserService {
    users: Repository<User>,
    password_cost: u32,
}

impl UserService {
    pub fn new(users: Repository<User>, password_cost: u32) -> Self {
        UserService { users, password_cost }
    }

    /// Create an account from a validated registration body. Username and email must be unused.
    pub async fn register(&self, mut input: Document) -> Result<User, AppError> {
        for (field, message) in [("username", "Username already taken."), ("email", "Email already taken.")] {
            let value = input.get(field).and_then(Value::as_str).unwrap_or_default().to_string();
            if self.users.find_one(&[Filter::eq(field, value)]).await?.is_some() {
                return Err(AppError::Conflict(message.into()));
            }
        }
        input.remove("confirmPassword");
        let plain = input
            .get("password")
            .and_then(Value::as_str)
            .ok_or_else(|| AppError::field("password", "password is a required field."))?
            .to_string();
        let hash = password::hash_password(plain, self.password_cost).await?;
        input.insert("password".into(), Value::String(hash));
        input.insert("emailVerifiedAt".into(), Value::Null);
        let user = self.users.create(input).await?;
        tracing::info!(user = %user.id, username = %user.username, "registered user");
        Ok(user)
    }
}
