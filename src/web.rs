use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use serde_json::json;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::pipeline::FramePipeline;

#[derive(Clone)]
struct AppState {
    pipeline: Arc<FramePipeline>,
}

/// `/next` plus static files (including the output slots) from `html_dir`.
pub fn router(pipeline: Arc<FramePipeline>, html_dir: &Path) -> Router {
    Router::new()
        .route("/next", get(next))
        .fallback_service(ServeDir::new(html_dir))
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { pipeline })
}

async fn next(State(state): State<AppState>) -> Response {
    match state.pipeline.next().await {
        Ok(body) => Json(body).into_response(),
        Err(err) => {
            error!(stage = %err.stage, error = %err.source, "next request failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": err.to_string(),
                    "stage": err.stage.as_str(),
                })),
            )
                .into_response()
        }
    }
}

/// Serve `router` on `listener` until `shutdown` resolves.
pub async fn serve(
    listener: TcpListener,
    router: Router,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "frame server listening");
    }
    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown)
        .await
        .context("frame server exited")
}

pub async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.ok();
    };
    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        if let Ok(mut term) = signal(SignalKind::terminate()) {
            term.recv().await;
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();
    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}
