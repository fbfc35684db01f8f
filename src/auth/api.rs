//! Authentication API Endpoints
//! Mission: Expose register, login, logout and session info over HTTP

use crate::auth::{
    errors::AuthError,
    models::{Claims, CredentialsRequest, ErrorBody, LoginResponse, MeResponse, StatusResponse},
    service::{AuthPipeline, RequestContext},
};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use std::sync::Arc;
use tracing::{debug, error};

/// Shared auth state
pub type AuthState = Arc<AuthPipeline>;

/// Register endpoint - POST /api/register
pub async fn register(
    State(pipeline): State<AuthState>,
    ctx: RequestContext,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<StatusResponse>), AuthApiError> {
    let credentials = decode_credentials(&ctx, payload)?;
    debug!(request_id = %ctx.request_id, login = %credentials.login, "Register request received");

    // bcrypt is CPU-bound; keep it off the async workers
    let task_ctx = ctx.clone();
    run_blocking(&ctx, move || {
        pipeline.register(&task_ctx, &credentials.login, &credentials.password)
    })
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(StatusResponse {
            status: "User registered successfully".to_string(),
        }),
    ))
}

/// Login endpoint - POST /api/login
pub async fn login(
    State(pipeline): State<AuthState>,
    ctx: RequestContext,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, AuthApiError> {
    let credentials = decode_credentials(&ctx, payload)?;
    debug!(request_id = %ctx.request_id, login = %credentials.login, "Login request received");

    let task_ctx = ctx.clone();
    let token = run_blocking(&ctx, move || {
        pipeline.login(&task_ctx, &credentials.login, &credentials.password)
    })
    .await?;

    Ok(Json(LoginResponse::bearer(token)))
}

/// Logout endpoint - DELETE /api/logout (behind auth middleware)
pub async fn logout(
    State(pipeline): State<AuthState>,
    ctx: RequestContext,
    Extension(claims): Extension<Claims>,
) -> Result<StatusCode, AuthApiError> {
    pipeline.logout(&ctx, &claims)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Current session info - GET /api/me (behind auth middleware)
pub async fn me(Extension(claims): Extension<Claims>) -> Json<MeResponse> {
    Json(MeResponse::from_claims(&claims))
}

fn decode_credentials(
    ctx: &RequestContext,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<CredentialsRequest, AuthApiError> {
    let Json(credentials) = payload.map_err(|rejection| {
        debug!(request_id = %ctx.request_id, error = %rejection, "Error decoding request");
        AuthApiError::InvalidRequest(rejection.body_text())
    })?;
    credentials
        .validate()
        .map_err(|msg| AuthApiError::InvalidRequest(msg.to_string()))?;
    Ok(credentials)
}

async fn run_blocking<T, F>(ctx: &RequestContext, f: F) -> Result<T, AuthApiError>
where
    F: FnOnce() -> Result<T, AuthError> + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(f).await {
        Ok(result) => result.map_err(AuthApiError::from),
        Err(e) => {
            error!(request_id = %ctx.request_id, error = %e, "Blocking auth task failed");
            Err(AuthApiError::Service(AuthError::Internal))
        }
    }
}

/// Auth API errors
#[derive(Debug)]
pub enum AuthApiError {
    InvalidRequest(String),
    Service(AuthError),
}

impl From<AuthError> for AuthApiError {
    fn from(err: AuthError) -> Self {
        AuthApiError::Service(err)
    }
}

impl IntoResponse for AuthApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AuthApiError::InvalidRequest(message) => (
                StatusCode::BAD_REQUEST,
                ErrorBody::new("invalid_request", message),
            ),
            AuthApiError::Service(AuthError::BadRequest) => (
                StatusCode::BAD_REQUEST,
                ErrorBody::new("invalid_request", "User already registered"),
            ),
            AuthApiError::Service(AuthError::InvalidCredentials) => (
                StatusCode::UNAUTHORIZED,
                ErrorBody::new("invalid_credentials", "Invalid username or password"),
            ),
            AuthApiError::Service(AuthError::Internal) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorBody::new("internal_error", "Something went wrong on the server"),
            ),
        };

        (status, Json(body)).into_response()
    }
}
