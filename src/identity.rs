//! Identity resolution from bearer credentials
//!
//! Credentials are HS256 JWTs carrying the user id as `sub`. Resolution never
//! fails: an absent, malformed, expired or forged token yields an anonymous
//! caller, and the reason stays in the debug log.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::config::AuthConfig;
use crate::task::UserId;
use crate::{Result, ServiceError};

/// Authenticated caller for the duration of one request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    pub id: UserId,
}

impl Principal {
    pub fn new(id: UserId) -> Self {
        Self { id }
    }
}

/// Result of a successful credential check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedCredential {
    pub subject: UserId,
    pub expires_at: DateTime<Utc>,
}

/// In-process credential verification
pub trait CredentialVerifier: Send + Sync {
    fn verify(&self, token: &str) -> Result<VerifiedCredential>;
}

/// JWT claims
#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: UserId,
    iat: i64,
    exp: i64,
}

/// Issues and verifies HS256 credentials with the configured secret
pub struct JwtCredentials {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: chrono::Duration,
}

impl JwtCredentials {
    pub fn new(config: &AuthConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding: EncodingKey::from_secret(config.secret_bytes()),
            decoding: DecodingKey::from_secret(config.secret_bytes()),
            validation,
            ttl: config.token_ttl,
        }
    }

    /// Sign a credential for `subject`, valid from now for the configured TTL
    pub fn issue(&self, subject: UserId) -> Result<String> {
        self.issue_at(subject, Utc::now())
    }

    pub(crate) fn issue_at(&self, subject: UserId, issued_at: DateTime<Utc>) -> Result<String> {
        let claims = Claims {
            sub: subject,
            iat: issued_at.timestamp(),
            exp: (issued_at + self.ttl).timestamp(),
        };

        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| ServiceError::Configuration(format!("cannot sign credential: {}", e)))
    }
}

impl CredentialVerifier for JwtCredentials {
    fn verify(&self, token: &str) -> Result<VerifiedCredential> {
        let data = jsonwebtoken::decode::<Claims>(token, &self.decoding, &self.validation)
            .map_err(|_| ServiceError::AuthenticationRequired)?;

        let expires_at = DateTime::from_timestamp(data.claims.exp, 0)
            .ok_or(ServiceError::AuthenticationRequired)?;

        Ok(VerifiedCredential {
            subject: data.claims.sub,
            expires_at,
        })
    }
}

/// Turns an optional bearer credential into an optional [`Principal`]
#[derive(Clone)]
pub struct IdentityResolver {
    verifier: Arc<dyn CredentialVerifier>,
}

impl IdentityResolver {
    pub fn new(verifier: Arc<dyn CredentialVerifier>) -> Self {
        Self { verifier }
    }

    pub fn resolve(&self, credential: Option<&str>) -> Option<Principal> {
        let token = credential?.trim();
        if token.is_empty() {
            return None;
        }

        match self.verifier.verify(token) {
            Ok(verified) => Some(Principal::new(verified.subject)),
            Err(e) => {
                tracing::debug!(target: "pleme_tasks::identity", error = %e, "Credential rejected");
                None
            }
        }
    }
}
