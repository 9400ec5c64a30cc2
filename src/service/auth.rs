//! Login, token issue/verification and e-mail verification codes.

use super::password;
use crate::config::AppConfig;
use crate::error::{AppError, ConfigError};
use crate::models::User;
use crate::query::Filter;
use crate::repository::Repository;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_VERIFICATION_CODE_TTL: Duration = Duration::from_secs(120);

const WRONG_CREDENTIALS: &str = "Wrong username / email or password.";
const WRONG_CODE: &str = "Wrong verification code.";

/// Everything the auth subsystem needs, built once at startup.
#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub token_ttl: Duration,
    pub verification_code_ttl: Duration,
    pub password_cost: u32,
}

impl AuthConfig {
    pub fn new(jwt_secret: impl Into<String>, token_ttl: Duration) -> Result<Self, ConfigError> {
        let jwt_secret = jwt_secret.into();
        if jwt_secret.trim().is_empty() {
            return Err(ConfigError::InvalidEnv {
                name: "JWT_SECRET".into(),
                reason: "must not be empty".into(),
            });
        }
        Ok(AuthConfig {
            jwt_secret,
            token_ttl,
            verification_code_ttl: DEFAULT_VERIFICATION_CODE_TTL,
            password_cost: password::DEFAULT_COST,
        })
    }

    pub fn from_app_config(config: &AppConfig) -> Result<Self, ConfigError> {
        let secret = config
            .jwt_secret
            .clone()
            .ok_or_else(|| ConfigError::MissingEnv(vec!["JWT_SECRET".into()]))?;
        AuthConfig::new(secret, config.token_ttl)
    }

    pub fn with_verification_code_ttl(mut self, ttl: Duration) -> Self {
        self.verification_code_ttl = ttl;
        self
    }

    pub fn with_password_cost(mut self, cost: u32) -> Self {
        self.password_cost = cost;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: String,
    pub email: String,
    pub iat: i64,
    pub exp: i64,
}

pub fn create_token(config: &AuthConfig, user: &User) -> Result<String, AppError> {
    let now = Utc::now().timestamp();
    let ttl = i64::try_from(config.token_ttl.as_secs()).unwrap_or(i64::MAX);
    let claims = Claims {
        sub: user.id.to_string(),
        email: user.email.clone(),
        iat: now,
        exp: now.saturating_add(ttl),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("token creation failed: {}", e)))
}

pub fn verify_token(config: &AuthConfig, token: &str) -> Result<Claims, AppError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => AppError::Unauthorized("Token expired.".into()),
        _ => AppError::Unauthorized("Invalid token.".into()),
    })
}

/// Delivers verification codes to users.
#[async_trait]
pub trait CodeNotifier: Send + Sync {
    async fn send_code(&self, user: &User, code: &str, expires_at: DateTime<Utc>) -> Result<(), AppError>;
}

/// Writes the code to the log instead of sending it anywhere.
pub struct LogNotifier;

#[async_trait]
impl CodeNotifier for LogNotifier {
    async fn send_code(&self, user: &User, code: &str, expires_at: DateTime<Utc>) -> Result<(), AppError> {
        tracing::info!(user = %user.id, email = %user.email, code, %expires_at, "verification code issued");
        Ok(())
    }
}

fn generate_code() -> String {
    format!("{:06}", rand::thread_rng().gen_range(100_000..1_000_000))
}

fn timestamp(t: DateTime<Utc>) -> Value {
    Value::String(t.to_rfc3339_opts(SecondsFormat::Millis, true))
}

#[derive(Clone)]
pub struct AuthService {
    config: Arc<AuthConfig>,
    users: Repository<User>,
    notifier: Arc<dyn CodeNotifier>,
}

impl AuthService {
    pub fn new(config: AuthConfig, users: Repository<User>) -> Self {
        AuthService {
            config: Arc::new(config),
            users,
            notifier: Arc::new(LogNotifier),
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn CodeNotifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    pub fn users(&self) -> &Repository<User> {
        &self.users
    }

    /// Check credentials and issue a token. Username is tried before email.
    pub async fn login(&self, username_or_email: &str, password: &str) -> Result<String, AppError> {
        let user = match self.users.find_one(&[Filter::eq("username", username_or_email)]).await? {
            Some(u) => Some(u),
            None => self.users.find_one(&[Filter::eq("email", username_or_email)]).await?,
        };
        let Some(user) = user else {
            return Err(AppError::Unauthorized(WRONG_CREDENTIALS.into()));
        };
        if !password::verify_password(password.to_string(), user.password.clone()).await? {
            return Err(AppError::Unauthorized(WRONG_CREDENTIALS.into()));
        }
        create_token(&self.config, &user)
    }

    /// Resolve a token to its (still existing) user.
    pub async fn authenticate(&self, token: &str) -> Result<User, AppError> {
        let claims = verify_token(&self.config, token)?;
        let id = claims
            .sub
            .parse::<crate::store::RecordId>()
            .map_err(|_| AppError::Unauthorized("Invalid token.".into()))?;
        self.users
            .get_by_id(id)
            .await?
            .ok_or_else(|| AppError::Unauthorized("Account does not exist.".into()))
    }

    /// Store a fresh code on the user and hand it to the notifier. Returns the expiry.
    pub async fn send_verification_code(&self, user: &User) -> Result<DateTime<Utc>, AppError> {
        if user.is_verified() {
            return Err(AppError::Forbidden("Account already verified.".into()));
        }
        let code = generate_code();
        let ttl = chrono::Duration::from_std(self.config.verification_code_ttl)
            .map_err(|e| AppError::Internal(e.to_string()))?;
        let expires_at = Utc::now() + ttl;
        let patch = json!({
            "emailVerificationCode": code,
            "emailVerificationCodeExpiredAt": timestamp(expires_at),
        });
        let updated = self
            .users
            .update_by_id(user.id, patch.as_object().cloned().unwrap_or_default())
            .await?
            .ok_or_else(|| AppError::Unauthorized("Account does not exist.".into()))?;
        self.notifier.send_code(&updated, &code, expires_at).await?;
        Ok(expires_at)
    }

    /// Accept `code` if it matches the stored, unexpired one; marks the account verified.
    pub async fn verify_code(&self, user: &User, code: &str) -> Result<User, AppError> {
        let valid = match (&user.email_verification_code, user.email_verification_code_expired_at) {
            (Some(stored), Some(expires_at)) => stored == code && Utc::now() <= expires_at,
            _ => false,
        };
        if !valid {
            return Err(AppError::BadRequest(WRONG_CODE.into()));
        }
        let patch = json!({
            "emailVerificationCode": null,
            "emailVerificationCodeExpiredAt": null,
            "emailVerifiedAt": timestamp(Utc::now()),
        });
        self.users
            .update_by_id(user.id, patch.as_object().cloned().unwrap_or_default())
            .await?
            .ok_or_else(|| AppError::Unauthorized("Account does not exist.".into()))
    }
}
