//! Authentication Middleware
//! Mission: Gate protected endpoints behind the token pipeline

use crate::auth::{
    errors::Denial,
    models::ErrorBody,
    service::{AuthPipeline, RequestContext},
};
use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::{
    extract::CookieJar,
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use std::convert::Infallible;
use std::sync::Arc;

/// Correlation id header, set or propagated by the request-id layers
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Cookie checked when no Authorization header is present
pub const TOKEN_COOKIE: &str = "jwt";

impl RequestContext {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        headers
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .map(RequestContext::new)
            .unwrap_or_else(RequestContext::generate)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(RequestContext::from_headers(&parts.headers))
    }
}

/// Auth middleware that runs the request gate before the handler
pub async fn auth_middleware(
    State(pipeline): State<Arc<AuthPipeline>>,
    ctx: RequestContext,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Result<Response, Denial> {
    // Authorization header first, then the cookie
    let token = bearer
        .map(|TypedHeader(Authorization(bearer))| bearer.token().to_string())
        .or_else(|| jar.get(TOKEN_COOKIE).map(|c| c.value().to_string()));

    let claims = pipeline.authorize(&ctx, token.as_deref())?;

    // Add claims to request extensions so handlers can access them
    req.extensions_mut().insert(claims);

    Ok(next.run(req).await)
}

impl IntoResponse for Denial {
    fn into_response(self) -> Response {
        let description = match self {
            Denial::NoToken => {
                return (StatusCode::UNAUTHORIZED, [(header::WWW_AUTHENTICATE, "Bearer")])
                    .into_response();
            }
            Denial::Internal => {
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorBody::new(
                        "internal_error",
                        "Something went wrong on the server",
                    )),
                )
                    .into_response();
            }
            Denial::Expired => "Token expired",
            Denial::Malformed => "Token has been malformed",
            Denial::Revoked => "Token has been revoked",
        };

        let challenge = format!(
            "Bearer error=\"invalid_token\", error_description=\"{}\"",
            description
        );

        (
            StatusCode::UNAUTHORIZED,
            [(header::WWW_AUTHENTICATE, challenge)],
            Json(ErrorBody::new(self.code(), description)),
        )
            .into_response()
    }
}
