//! Authentication Models
//! Mission: Define user, token and wire data structures

use crate::auth::credential_store::MAX_PASSWORD_BYTES;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Registered account
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub login: String,
    #[serde(skip_serializing)]
    pub password_hash: String, // bcrypt hash - never serialize
    pub created_at: DateTime<Utc>,
}

/// JWT Claims payload
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    pub iss: String,
    pub sub: String, // subject (login)
    pub aud: String,
    pub iat: i64,
    pub exp: i64,    // expiration timestamp, seconds
    pub jti: String, // unit of revocation
}

impl Claims {
    /// `exp` as a timestamp, `None` if it is out of range
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp, 0)
    }
}

/// Login and register request body
#[derive(Clone, Deserialize)]
pub struct CredentialsRequest {
    pub login: String,
    pub password: String,
}

impl CredentialsRequest {
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.login.is_empty() || self.password.is_empty() {
            return Err("login and password must not be empty");
        }
        if self.password.len() > MAX_PASSWORD_BYTES {
            return Err("password must be at most 72 bytes");
        }
        Ok(())
    }
}

impl fmt::Debug for CredentialsRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialsRequest")
            .field("login", &self.login)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Login response
#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: String,
}

impl LoginResponse {
    pub fn bearer(token: String) -> Self {
        Self {
            access_token: token,
            token_type: "Bearer".to_string(),
        }
    }
}

/// Plain status body (register)
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
}

/// Current session info, built from verified claims
#[derive(Debug, Serialize, Deserialize)]
pub struct MeResponse {
    pub login: String,
    pub jti: String,
    pub expires_at: Option<DateTime<Utc>>,
}

impl MeResponse {
    pub fn from_claims(claims: &Claims) -> Self {
        Self {
            login: claims.sub.clone(),
            jti: claims.jti.clone(),
            expires_at: claims.expires_at(),
        }
    }
}

/// Error body shared by every failing endpoint
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub error_description: String,
}

impl ErrorBody {
    pub fn new(error: &str, description: impl Into<String>) -> Self {
        Self {
            error: error.to_string(),
            error_description: description.into(),
        }
    }
}
