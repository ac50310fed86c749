//! Control HTTP surface.
//!
//! A small axum router that lets a front end drive the scheduler:
//!
//! | Method | Path      | Effect                                  |
//! |--------|-----------|-----------------------------------------|
//! | POST   | `/start`  | `LifecycleController::start()`          |
//! | POST   | `/stop`   | `LifecycleController::stop()`           |
//! | GET    | `/status` | current state and completed cycle count |
//! | GET    | `/health` | `ok`                                    |
//!
//! Handlers only flip controller flags; no cycle logic runs on this side.

use anyhow::Result;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use iotsentry_ingest::{LifecycleController, SchedulerState};

/// Snapshot returned by every control endpoint except `/health`.
#[derive(Debug, Clone, Serialize)]
pub struct StatusView {
    pub state: SchedulerState,
    pub loop_count: u64,
    pub running: bool,
    pub stop_requested: bool,
}

impl StatusView {
    fn of(controller: &LifecycleController) -> Self {
        Self {
            state: controller.state(),
            loop_count: controller.loop_count(),
            running: controller.is_running(),
            stop_requested: controller.is_stop_requested(),
        }
    }
}

/// Build the control router around a shared controller.
pub fn router(controller: LifecycleController) -> Router {
    Router::new()
        .route("/start", post(start))
        .route("/stop", post(stop))
        .route("/status", get(status))
        .route("/health", get(|| async { "ok" }))
        .with_state(controller)
}

async fn start(State(controller): State<LifecycleController>) -> Json<StatusView> {
    tracing::info!("start requested over control surface");
    controller.start();
    Json(StatusView::of(&controller))
}

async fn stop(State(controller): State<LifecycleController>) -> Json<StatusView> {
    tracing::info!("stop requested over control surface");
    controller.stop();
    Json(StatusView::of(&controller))
}

async fn status(State(controller): State<LifecycleController>) -> Json<StatusView> {
    Json(StatusView::of(&controller))
}

/// Serve the control router until `shutdown` is cancelled.
pub async fn serve(
    listener: TcpListener,
    controller: LifecycleController,
    shutdown: CancellationToken,
) -> Result<()> {
    let addr = listener
        .local_addr()
        .map_err(|e| anyhow::anyhow!("control listener has no local address: {}", e))?;
    if addr.ip().is_unspecified() {
        tracing::warn!(
            bind = %addr,
            "control surface is exposed on all interfaces and has no authentication"
        );
    }
    tracing::info!(bind = %addr, "control surface listening");

    axum::serve(listener, router(controller))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| anyhow::anyhow!("control server failed: {}", e))?;

    tracing::debug!("control surface shut down");
    Ok(())
}

/// Bind the configured address and spawn [`serve`] on a background task.
pub async fn spawn(
    bind: &str,
    controller: LifecycleController,
    shutdown: CancellationToken,
) -> Result<tokio::task::JoinHandle<()>> {
    let listener = TcpListener::bind(bind)
        .await
        .map_err(|e| anyhow::anyhow!("failed to bind control surface on {}: {}", bind, e))?;

    Ok(tokio::spawn(async move {
        if let Err(e) = serve(listener, controller, shutdown).await {
            tracing::error!(error = %e, "control surface stopped with error");
        }
    }))
}
