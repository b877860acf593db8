use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sqlx::FromRow;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::error::AppError;

/// Fields a client may change through `PATCH /users/me`.
pub const USER_UPDATABLE_FIELDS: &[&str] = &["name", "email", "password", "age"];

/// A registered account.
///
/// The password hash, session tokens and avatar bytes never leave the server
/// through this type's `Serialize` impl; the avatar has its own endpoint.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub age: i32,
    #[serde(skip_serializing)]
    pub avatar: Option<Vec<u8>>,
    #[serde(skip_serializing)]
    pub tokens: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Builds a user from validated signup input and an already-hashed password.
    pub fn new(input: &UserInput, password_hash: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: input.name.clone(),
            email: input.email.clone(),
            password_hash,
            age: input.age.unwrap_or(0),
            avatar: None,
            tokens: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn has_token(&self, token: &str) -> bool {
        self.tokens.iter().any(|t| t == token)
    }
}

/// Signup payload.
#[derive(Debug, Deserialize, Validate)]
pub struct UserInput {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[validate(email(message = "Invalid Email!"))]
    pub email: String,
    #[validate(custom = "validate_password")]
    pub password: String,
    #[validate(range(min = 0, message = "Age must be a positive number"))]
    pub age: Option<i32>,
}

impl UserInput {
    /// Trims every text field and lower-cases the email, mirroring what is stored.
    pub fn normalize(mut self) -> Self {
        self.name = self.name.trim().to_string();
        self.email = normalize_email(&self.email);
        self.password = self.password.trim().to_string();
        self
    }
}

/// Partial profile update. Only built after the payload keys have passed
/// the `USER_UPDATABLE_FIELDS` allow-list.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UserUpdate {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: Option<String>,
    #[validate(email(message = "Invalid Email!"))]
    pub email: Option<String>,
    #[validate(custom = "validate_password")]
    pub password: Option<String>,
    #[validate(range(min = 0, message = "Age must be a positive number"))]
    pub age: Option<i32>,
}

impl UserUpdate {
    /// Checks the allow-list, then deserializes, normalizes and validates the payload.
    ///
    /// Any key outside the allow-list rejects the whole update.
    pub fn from_payload(payload: Map<String, Value>) -> Result<Self, AppError> {
        ensure_allowed_fields(&payload, USER_UPDATABLE_FIELDS)?;
        let update: UserUpdate = serde_json::from_value(Value::Object(payload))
            .map_err(|e| AppError::ValidationError(e.to_string()))?;
        let update = UserUpdate {
            name: update.name.map(|n| n.trim().to_string()),
            email: update.email.as_deref().map(normalize_email),
            password: update.password.map(|p| p.trim().to_string()),
            age: update.age,
        };
        update.validate()?;
        Ok(update)
    }
}

/// Login payload.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Password rules: at least 8 characters, at least one digit, and never the word "password".
pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    if password.chars().count() < 8 {
        let mut err = ValidationError::new("password_length");
        err.message = Some("Password must be at least 8 characters long".into());
        return Err(err);
    }
    if password.to_lowercase().contains("password") || !password.chars().any(|c| c.is_ascii_digit())
    {
        let mut err = ValidationError::new("password_rules");
        err.message = Some("Password must contain a digit and must not contain \"password\"".into());
        return Err(err);
    }
    Ok(())
}

/// Rejects the payload if it names any field outside `allowed`.
pub fn ensure_allowed_fields(payload: &Map<String, Value>, allowed: &[&str]) -> Result<(), AppError> {
    if payload.keys().all(|key| allowed.contains(&key.as_str())) {
        Ok(())
    } else {
        Err(AppError::InvalidOperation("Invalid updates!".into()))
    }
}
