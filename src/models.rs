//! Records used by the auth subsystem.

use crate::store::RecordId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const USERS_COLLECTION: &str = "users";

/// A stored user, as kept in the `users` collection.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: RecordId,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    /// bcrypt hash.
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub email_verified_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub email_verification_code: Option<String>,
    #[serde(default)]
    pub email_verification_code_expired_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn is_verified(&self) -> bool {
        self.email_verified_at.is_some()
    }

    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id,
            username: self.username.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            email: self.email.clone(),
            email_verified_at: self.email_verified_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// What a user may see about an account: no password hash, no verification code.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: RecordId,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub email_verified_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Field names of `UserProfile`, for output projections over raw user documents.
pub const PROFILE_FIELDS: [&str; 8] = [
    "id",
    "username",
    "firstName",
    "lastName",
    "email",
    "emailVerifiedAt",
    "createdAt",
    "updatedAt",
];

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn profile_hides_secrets() {
        let user: User = serde_json::from_value(json!({
            "id": "6f1c2d3e-4b5a-4c6d-8e7f-901a2b3c4d5e",
            "username": "ann",
            "email": "ann@example.com",
            "password": "$2b$04$hash",
            "emailVerificationCode": "123456",
            "emailVerifiedAt": null,
            "createdAt": "2024-01-02T03:04:05.000Z"
        }))
        .unwrap();
        assert!(!user.is_verified());
        let v = serde_json::to_value(user.profile()).unwrap();
        assert!(v.get("password").is_none());
        assert!(v.get("emailVerificationCode").is_none());
        let keys: Vec<&str> = v.as_object().unwrap().keys().map(String::as_str).collect();
        for k in keys {
            assert!(PROFILE_FIELDS.contains(&k), "unexpected {k}");
        }
    }
}
