//! HTTP application: router assembly and the server run loop

use crate::{
    auth::{api as auth_api, auth_middleware, AuthPipeline, SystemClock},
    config::Config,
    middleware::request_logging,
};
use anyhow::{Context, Result};
use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};
use std::future::IntoFuture;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tracing::{info, warn};

/// Build the full router around a shared pipeline
pub fn router(pipeline: Arc<AuthPipeline>) -> Router {
    // Protected routes
    let protected_routes = Router::new()
        .route("/api/logout", delete(auth_api::logout))
        .route("/api/me", get(auth_api::me))
        .route_layer(middleware::from_fn_with_state(
            pipeline.clone(),
            auth_middleware,
        ));

    let public_routes = Router::new()
        .route("/health", get(health_check))
        .route("/api/register", post(auth_api::register))
        .route("/api/login", post(auth_api::login));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(pipeline)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(middleware::from_fn(request_logging))
                .layer(PropagateRequestIdLayer::x_request_id()),
        )
}

async fn health_check() -> &'static str {
    "ok"
}

/// Serve until Ctrl-C / SIGTERM, then drain for at most the shutdown timeout
pub async fn run(config: Config) -> Result<()> {
    if config.token.secret.len() < 32 {
        warn!("⚠️  Token secret is shorter than 32 bytes");
    }

    let pipeline = Arc::new(AuthPipeline::from_config(&config, Arc::new(SystemClock)));
    info!(
        ttl_secs = pipeline.tokens().ttl().num_seconds(),
        skew_secs = pipeline.revocations().skew().num_seconds(),
        hash_cost = pipeline.credentials().hash_cost(),
        "🔐 Authentication initialized"
    );

    let app = router(pipeline);

    let addr = config.server.addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("🎯 API server listening on {}", addr);

    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
    let server = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            info!("Shutting down server...");
            let _ = stop_tx.send(());
        })
        .into_future();

    let timeout = config.server.shutdown_timeout();
    tokio::select! {
        result = server => result.context("Server error")?,
        _ = async {
            if stop_rx.await.is_ok() {
                tokio::time::sleep(timeout).await;
            } else {
                std::future::pending::<()>().await;
            }
        } => {
            warn!(timeout_secs = timeout.as_secs(), "Shutdown timeout elapsed, dropping open connections");
        }
    }

    info!("Shut down successfully");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
