//! Authentication Pipeline
//! Mission: Register, Login, Logout and the per-request token gate
//!
//! The only place where storage/codec errors are translated into the
//! caller-facing taxonomy. Detail is logged here and masked at the boundary.

use crate::auth::{
    clock::Clock,
    credential_store::CredentialStore,
    errors::{AuthError, CredentialError, Denial, RevocationError, TokenError},
    jwt::{TokenCodec, TokenSettings},
    models::Claims,
    revocation::RevocationList,
};
use crate::config::Config;
use std::sync::Arc;
use tracing::{error, info, trace, warn};
use uuid::Uuid;

/// Request-scoped correlation data, threaded explicitly through every call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub request_id: String,
}

impl RequestContext {
    pub fn new(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
        }
    }

    /// Context with a freshly generated id
    pub fn generate() -> Self {
        Self::new(Uuid::new_v4().to_string())
    }
}

/// Orchestrates the credential store, token codec and revocation list
pub struct AuthPipeline {
    credentials: CredentialStore,
    tokens: TokenCodec,
    revocations: RevocationList,
}

impl AuthPipeline {
    /// The revocation list is built from the codec's skew so both sides of
    /// the expiry comparison always agree.
    pub fn new(credentials: CredentialStore, tokens: TokenCodec, clock: Arc<dyn Clock>) -> Self {
        let revocations = RevocationList::new(tokens.skew(), clock);
        Self {
            credentials,
            tokens,
            revocations,
        }
    }

    /// Build every component from configuration around one shared clock
    pub fn from_config(config: &Config, clock: Arc<dyn Clock>) -> Self {
        let settings = TokenSettings {
            secret: config.token.secret.clone(),
            ttl: config.token.ttl(),
            skew: config.token.skew(),
            issuer: config.token.issuer.clone(),
            audience: config.token.audience.clone(),
        };

        Self::new(
            CredentialStore::new(config.password.hash_cost, clock.clone()),
            TokenCodec::new(settings, clock.clone()),
            clock,
        )
    }

    pub fn register(
        &self,
        ctx: &RequestContext,
        login: &str,
        password: &str,
    ) -> Result<(), AuthError> {
        const OP: &str = "auth.register";

        match self.credentials.register(login, password) {
            Ok(()) => {
                info!(op = OP, request_id = %ctx.request_id, login, "User registered successfully");
                Ok(())
            }
            Err(e @ CredentialError::AlreadyRegistered { .. }) => {
                warn!(op = OP, request_id = %ctx.request_id, error = %e, "User is already registered");
                Err(AuthError::BadRequest)
            }
            Err(e) => {
                error!(op = OP, request_id = %ctx.request_id, error = %e, "Failed to register user");
                Err(AuthError::Internal)
            }
        }
    }

    /// Verify credentials and issue a token
    pub fn login(
        &self,
        ctx: &RequestContext,
        login: &str,
        password: &str,
    ) -> Result<String, AuthError> {
        const OP: &str = "auth.login";

        match self.credentials.verify(login, password) {
            Ok(()) => {}
            Err(
                e @ (CredentialError::NotFound { .. } | CredentialError::IncorrectPassword { .. }),
            ) => {
                warn!(op = OP, request_id = %ctx.request_id, error = %e, "Failed login attempt");
                return Err(AuthError::InvalidCredentials);
            }
            Err(e) => {
                error!(op = OP, request_id = %ctx.request_id, error = %e, "Failed to login");
                return Err(AuthError::Internal);
            }
        }

        let token = self.tokens.issue(login).map_err(|e| {
            error!(op = OP, request_id = %ctx.request_id, error = %e, "Error generating token");
            AuthError::Internal
        })?;

        info!(op = OP, request_id = %ctx.request_id, login, "User logged in successfully");
        Ok(token)
    }

    /// Revoke the token the claims were taken from.
    ///
    /// Claims are expected to come from the request gate; anything it should
    /// have rejected is reported as `Internal`.
    pub fn logout(&self, ctx: &RequestContext, claims: &Claims) -> Result<(), AuthError> {
        const OP: &str = "auth.logout";

        let Some(expires_at) = claims.expires_at().filter(|_| !claims.jti.is_empty()) else {
            error!(op = OP, request_id = %ctx.request_id, "Malformed token passed through middleware");
            return Err(AuthError::Internal);
        };

        match self.revocations.add(&claims.jti, expires_at) {
            Ok(()) => {
                info!(op = OP, request_id = %ctx.request_id, jti = %claims.jti, "jti invalidated");
                Ok(())
            }
            Err(e @ RevocationError::AlreadyExists { .. }) => {
                error!(op = OP, request_id = %ctx.request_id, error = %e, "Trying to add an existing jti into revocation list");
                Err(AuthError::Internal)
            }
            Err(e @ RevocationError::Expired { .. }) => {
                error!(op = OP, request_id = %ctx.request_id, error = %e, "Trying to add an expired jti into revocation list");
                Err(AuthError::Internal)
            }
        }
    }

    pub fn is_token_revoked(&self, ctx: &RequestContext, jti: &str) -> bool {
        let revoked = self.revocations.contains(jti);
        trace!(op = "auth.is_token_revoked", request_id = %ctx.request_id, jti, revoked);
        revoked
    }

    /// Request gate: signature and expiry first, revocation last.
    pub fn authorize(&self, ctx: &RequestContext, token: Option<&str>) -> Result<Claims, Denial> {
        const OP: &str = "auth.authorize";

        let claims = match self.tokens.verify(token) {
            Ok(claims) => claims,
            Err(TokenError::Expired) => {
                warn!(op = OP, request_id = %ctx.request_id, "Token expired");
                return Err(Denial::Expired);
            }
            Err(TokenError::NoToken) => {
                warn!(op = OP, request_id = %ctx.request_id, "Token not found");
                return Err(Denial::NoToken);
            }
            Err(TokenError::Malformed(reason)) => {
                warn!(op = OP, request_id = %ctx.request_id, reason = %reason, "Token malformed");
                return Err(Denial::Malformed);
            }
            Err(e @ TokenError::GenerationFailed { .. }) => {
                error!(op = OP, request_id = %ctx.request_id, error = %e, "Error getting token");
                return Err(Denial::Internal);
            }
        };

        if claims.jti.is_empty() || claims.expires_at().is_none() {
            warn!(op = OP, request_id = %ctx.request_id, "Token does not carry jti/exp");
            return Err(Denial::Malformed);
        }

        if self.is_token_revoked(ctx, &claims.jti) {
            warn!(op = OP, request_id = %ctx.request_id, jti = %claims.jti, "Token is revoked");
            return Err(Denial::Revoked);
        }

        info!(op = OP, request_id = %ctx.request_id, login = %claims.sub, "Token accepted");
        Ok(claims)
    }

    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    pub fn tokens(&self) -> &TokenCodec {
        &self.tokens
    }

    pub fn revocations(&self) -> &RevocationList {
        &self.revocations
    }
}
