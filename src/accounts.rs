//! User registration and login
//!
//! Passwords are stored as argon2 PHC strings. Successful registration or
//! login returns a signed credential for the new session.

use std::sync::Arc;

use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use chrono::{DateTime, Utc};
use password_hash::{PasswordHash, SaltString};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::guard::require_authenticated;
use crate::identity::{JwtCredentials, Principal};
use crate::store::UserStore;
use crate::task::UserId;
use crate::{Result, ServiceError};

pub const PASSWORD_MIN_LEN: usize = 8;

/// A registered account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(email: String, password_hash: String) -> Self {
        Self {
            id: UserId::new(),
            email,
            password_hash,
            created_at: Utc::now(),
        }
    }
}

/// Email and password as submitted by the caller
#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

/// Signed credential plus the account it belongs to
#[derive(Debug, Clone)]
pub struct AuthPayload {
    pub token: String,
    pub user: User,
}

#[derive(Clone)]
pub struct AccountService {
    users: Arc<dyn UserStore>,
    credentials: Arc<JwtCredentials>,
}

impl AccountService {
    pub fn new(users: Arc<dyn UserStore>, credentials: Arc<JwtCredentials>) -> Self {
        Self { users, credentials }
    }

    pub async fn register(&self, input: Credentials) -> Result<AuthPayload> {
        let email = normalize_email(&input.email)?;
        if input.password.chars().count() < PASSWORD_MIN_LEN {
            return Err(ServiceError::ValidationFailed(format!(
                "password must be at least {} characters",
                PASSWORD_MIN_LEN
            )));
        }
        if self.users.find_by_email(&email).await?.is_some() {
            return Err(ServiceError::ValidationFailed(
                "email is already registered".to_string(),
            ));
        }

        let user = self
            .users
            .insert(User::new(email, hash_password(&input.password)?))
            .await?;
        let token = self.credentials.issue(user.id)?;

        info!(target: "pleme_tasks::accounts", user_id = %user.id, "User registered");
        Ok(AuthPayload { token, user })
    }

    pub async fn login(&self, input: Credentials) -> Result<AuthPayload> {
        let email = normalize_email(&input.email).map_err(|_| ServiceError::InvalidCredentials)?;

        let user = match self.users.find_by_email(&email).await? {
            Some(user) if verify_password(&user.password_hash, &input.password) => user,
            _ => {
                debug!(target: "pleme_tasks::accounts", "Login rejected");
                return Err(ServiceError::InvalidCredentials);
            }
        };
        let token = self.credentials.issue(user.id)?;

        info!(target: "pleme_tasks::accounts", user_id = %user.id, "User logged in");
        Ok(AuthPayload { token, user })
    }

    /// Account of the calling principal
    pub async fn me(&self, principal: Option<&Principal>) -> Result<User> {
        let principal = require_authenticated(principal)?;
        self.users
            .find_by_id(principal.id)
            .await?
            .ok_or(ServiceError::NotFound("user"))
    }
}

fn normalize_email(raw: &str) -> Result<String> {
    let email = raw.trim().to_lowercase();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !domain.contains('@')
                && !email.contains(char::is_whitespace)
        }
        None => false,
    };
    if !valid {
        return Err(ServiceError::ValidationFailed(format!("'{}' is not a valid email", raw.trim())));
    }
    Ok(email)
}

fn hash_password(password: &str) -> Result<String> {
    let mut salt_bytes = [0u8; 16];
    getrandom::getrandom(&mut salt_bytes)
        .map_err(|e| ServiceError::Configuration(format!("entropy source: {}", e)))?;
    let salt = SaltString::encode_b64(&salt_bytes)
        .map_err(|e| ServiceError::Configuration(e.to_string()))?;
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|phc| phc.to_string())
        .map_err(|e| ServiceError::Configuration(format!("password hashing: {}", e)))
}

fn verify_password(hash: &str, password: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}
