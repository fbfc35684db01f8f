//! JWT Token Codec
//! Mission: Issue and verify signed bearer tokens

use crate::auth::{clock::Clock, errors::TokenError, models::Claims};
use chrono::Duration;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// Static token parameters, fixed for the process lifetime
#[derive(Debug, Clone)]
pub struct TokenSettings {
    pub secret: String,
    pub ttl: Duration,
    pub skew: Duration,
    pub issuer: String,
    pub audience: String,
}

/// HS256 token issuer and verifier
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl: Duration,
    skew: Duration,
    issuer: String,
    audience: String,
    clock: Arc<dyn Clock>,
}

impl TokenCodec {
    pub fn new(settings: TokenSettings, clock: Arc<dyn Clock>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked against the injected clock, with skew
        validation.validate_exp = false;
        validation.required_spec_claims.clear();
        validation.set_issuer(&[settings.issuer.as_str()]);
        validation.set_audience(&[settings.audience.as_str()]);

        Self {
            encoding_key: EncodingKey::from_secret(settings.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(settings.secret.as_bytes()),
            validation,
            ttl: settings.ttl,
            skew: settings.skew,
            issuer: settings.issuer,
            audience: settings.audience,
            clock,
        }
    }

    /// Issue a fresh token for `login` with a new random `jti`
    pub fn issue(&self, login: &str) -> Result<String, TokenError> {
        let now = self.clock.now();
        let expiration =
            now.checked_add_signed(self.ttl)
                .ok_or_else(|| TokenError::GenerationFailed {
                    login: login.to_string(),
                    message: "Invalid timestamp".to_string(),
                })?;

        let claims = Claims {
            iss: self.issuer.clone(),
            sub: login.to_string(),
            aud: self.audience.clone(),
            iat: now.timestamp(),
            exp: expiration.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key).map_err(
            |e| TokenError::GenerationFailed {
                login: login.to_string(),
                message: e.to_string(),
            },
        )?;

        debug!(login, jti = %claims.jti, exp = claims.exp, "Issued token");
        Ok(token)
    }

    /// Check signature, issuer/audience and expiry (with skew), and require
    /// well-typed `jti` and `exp` claims.
    pub fn verify(&self, token: Option<&str>) -> Result<Claims, TokenError> {
        let token = token
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(TokenError::NoToken)?;

        let claims = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| TokenError::Malformed(e.to_string()))?
            .claims;

        if claims.jti.is_empty() {
            return Err(TokenError::Malformed("empty jti".to_string()));
        }

        let expires_at = claims
            .expires_at()
            .ok_or_else(|| TokenError::Malformed("exp out of range".to_string()))?;

        let now = self.clock.now();
        let expired = expires_at
            .checked_add_signed(self.skew)
            .map_or(false, |deadline| now > deadline);
        if expired {
            return Err(TokenError::Expired);
        }

        Ok(claims)
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn skew(&self) -> Duration {
        self.skew
    }
}
