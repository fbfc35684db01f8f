//! Authentication Errors
//! Mission: One taxonomy from storage failures up to request denials

use thiserror::Error;

/// Failures of the credential store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CredentialError {
    #[error("login \"{login}\": user already registered in the system")]
    AlreadyRegistered { login: String },

    #[error("login \"{login}\": user not found")]
    NotFound { login: String },

    #[error("login \"{login}\": incorrect password")]
    IncorrectPassword { login: String },

    #[error("login \"{login}\": error hashing password: {message}")]
    HashingFailed { login: String, message: String },
}

/// Failures of the revocation list.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RevocationError {
    #[error("jti {jti} already revoked")]
    AlreadyExists { jti: String },

    #[error("jti {jti} already expired")]
    Expired { jti: String },
}

/// Failures of token issuance and verification.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("no token found")]
    NoToken,

    #[error("token is expired")]
    Expired,

    #[error("token is malformed: {0}")]
    Malformed(String),

    #[error("token generation failed for login \"{login}\": {message}")]
    GenerationFailed { login: String, message: String },
}

/// Errors surfaced by the auth pipeline to its callers.
///
/// Storage and signing detail is logged where it happens and never crosses
/// this boundary.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    #[error("bad request")]
    BadRequest,

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("internal server error")]
    Internal,
}

/// Reason a protected request was refused by the request gate.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denial {
    #[error("no token provided")]
    NoToken,

    #[error("token expired")]
    Expired,

    #[error("token malformed")]
    Malformed,

    #[error("token revoked")]
    Revoked,

    #[error("internal")]
    Internal,
}

impl Denial {
    /// Stable machine-readable reason code
    pub fn code(&self) -> &'static str {
        match self {
            Denial::NoToken => "no_token",
            Denial::Expired => "token_expired",
            Denial::Malformed => "token_malformed",
            Denial::Revoked => "token_revoked",
            Denial::Internal => "internal",
        }
    }
}
