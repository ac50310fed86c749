//! Control surface integration tests.
//!
//! Serves the router on an ephemeral port and drives it over HTTP.

use std::net::SocketAddr;

use iotsentry_daemon::control;
use iotsentry_ingest::{LifecycleController, SchedulerState};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

async fn spawn_server(
    controller: LifecycleController,
) -> (SocketAddr, CancellationToken, tokio::task::JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("failed to bind control listener");
    let addr = listener.local_addr().expect("listener has an address");
    let shutdown = CancellationToken::new();
    let token = shutdown.clone();
    let task = tokio::spawn(async move {
        control::serve(listener, controller, token)
            .await
            .expect("control server should shut down cleanly");
    });
    (addr, shutdown, task)
}

#[tokio::test]
async fn test_health_returns_ok() {
    let (addr, shutdown, task) = spawn_server(LifecycleController::new()).await;

    let body = reqwest::get(format!("http://{addr}/health"))
        .await
        .expect("health request should succeed")
        .text()
        .await
        .expect("health body");
    assert_eq!(body, "ok");

    shutdown.cancel();
    task.await.expect("server task should join");
}

#[tokio::test]
async fn test_start_and_stop_flip_controller_flags() {
    let controller = LifecycleController::new();
    let (addr, shutdown, task) = spawn_server(controller.clone()).await;
    let http = reqwest::Client::new();

    // Given: an idle controller
    let status: serde_json::Value = http
        .get(format!("http://{addr}/status"))
        .send()
        .await
        .expect("status request")
        .json()
        .await
        .expect("status json");
    assert_eq!(status["state"], "idle");
    assert_eq!(status["loop_count"], 0);
    assert_eq!(status["running"], false);

    // When: POST /start
    let response = http
        .post(format!("http://{addr}/start"))
        .send()
        .await
        .expect("start request");
    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.expect("start json");

    // Then: running is set
    assert_eq!(body["running"], true);
    assert!(controller.is_running());

    // When: POST /stop twice (idempotent)
    for _ in 0..2 {
        let response = http
            .post(format!("http://{addr}/stop"))
            .send()
            .await
            .expect("stop request");
        assert_eq!(response.status(), 200);
    }

    // Then: stop is requested and running is cleared
    assert!(!controller.is_running());
    assert!(controller.is_stop_requested());
    assert_eq!(controller.state(), SchedulerState::Idle);

    shutdown.cancel();
    task.await.expect("server task should join");
}

#[tokio::test]
async fn test_start_requires_post() {
    let (addr, shutdown, task) = spawn_server(LifecycleController::new()).await;

    let response = reqwest::get(format!("http://{addr}/start"))
        .await
        .expect("request should complete");
    assert_eq!(response.status(), 405);

    shutdown.cancel();
    task.await.expect("server task should join");
}

#[tokio::test]
async fn test_spawn_fails_on_invalid_bind() {
    let result = control::spawn(
        "not-an-address",
        LifecycleController::new(),
        CancellationToken::new(),
    )
    .await;
    assert!(result.is_err());
}
