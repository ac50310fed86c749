//! Daemon orchestration -- assembly, control surface, and shutdown.
//!
//! The [`Orchestrator`] loads configuration, builds the syslog sink, the
//! emitter, the platform client (or replay source), and the scheduler, then
//! supervises the scheduler task until it stops or a signal arrives.
//!
//! # Exit paths
//!
//! 1. Scheduler reaches `Stopped` (`POST /stop` or `max_cycles`) -> `Ok(Stopped)`
//! 2. SIGTERM / SIGINT -> `interrupt()`, scheduler task aborted -> `Ok(Terminated)`
//!
//! Both are clean exits. Only build and startup failures return an error.

use std::future::Future;
use std::path::Path;

use anyhow::Result;
use tokio_util::sync::CancellationToken;

use iotsentry_core::config::IotsentryConfig;
use iotsentry_ingest::{
    HttpPlatformClient, LifecycleController, PollCycleScheduler, PollCycleSchedulerBuilder,
    ReplaySource, SchedulerConfig, SchedulerState, SyslogEmitter, SyslogSink, discover_local_ip,
};

use crate::control;
use crate::metrics_server;

/// Scheduler type the daemon runs in production.
pub type DaemonScheduler = PollCycleScheduler<HttpPlatformClient, SyslogSink>;

/// The main daemon orchestrator.
pub struct Orchestrator {
    /// Loaded and validated configuration.
    config: IotsentryConfig,
    /// Shared handle given to the control surface and the signal path.
    controller: LifecycleController,
    /// Taken by `run`; `None` afterwards.
    scheduler: Option<DaemonScheduler>,
    /// Cancels background tasks (control surface).
    shutdown: CancellationToken,
}

impl Orchestrator {
    /// Load configuration and build the orchestrator.
    ///
    /// # Errors
    ///
    /// - Configuration file cannot be read, parsed or validated
    /// - Syslog sink or platform client cannot be created
    pub async fn build(config_path: &Path) -> Result<Self> {
        let config = IotsentryConfig::load(config_path)
            .await
            .map_err(|e| anyhow::anyhow!("failed to load config: {}", e))?;
        Self::build_from_config(config).await
    }

    /// Build from an already-loaded configuration.
    pub async fn build_from_config(config: IotsentryConfig) -> Result<Self> {
        config
            .validate()
            .map_err(|e| anyhow::anyhow!("config validation failed: {}", e))?;

        if config.metrics.enabled {
            metrics_server::install_metrics_recorder(&config.metrics)?;
        }
        record_daemon_metrics();

        let target = config.syslog.target();
        let sink = SyslogSink::from_config(&config.syslog)
            .await
            .map_err(|e| anyhow::anyhow!("failed to create syslog sink: {}", e))?;
        let local_ip = discover_local_ip(&target).await;
        tracing::info!(
            syslog_target = %target,
            protocol = %config.syslog.protocol,
            local_ip = %local_ip,
            "syslog emitter ready"
        );
        let emitter =
            SyslogEmitter::new(sink, config.syslog.app_name.clone()).with_local_ip(local_ip);

        let controller = LifecycleController::new();
        let builder = PollCycleSchedulerBuilder::new()
            .config(SchedulerConfig::from_core(&config.connector))
            .emitter(emitter)
            .controller(controller.clone());

        let builder = if config.connector.replay_mode {
            tracing::info!(
                replay_file = %config.connector.replay_file,
                "replay mode enabled, platform API will not be called"
            );
            builder.replay(ReplaySource::new(&config.connector.replay_file))
        } else {
            let client = HttpPlatformClient::from_config(&config.platform)
                .map_err(|e| anyhow::anyhow!("failed to create platform client: {}", e))?;
            tracing::info!(base_url = %client.base_url(), "platform client ready");
            builder.platform(client)
        };

        let scheduler = builder
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build scheduler: {}", e))?;

        Ok(Self {
            config,
            controller,
            scheduler: Some(scheduler),
            shutdown: CancellationToken::new(),
        })
    }

    /// Run until the scheduler stops or SIGTERM / SIGINT arrives.
    pub async fn run(&mut self) -> Result<SchedulerState> {
        self.run_until(wait_for_shutdown_signal()).await
    }

    /// Run until the scheduler stops or `shutdown_signal` resolves.
    ///
    /// `shutdown_signal` yields the name of the signal for logging.
    pub async fn run_until<F>(&mut self, shutdown_signal: F) -> Result<SchedulerState>
    where
        F: Future<Output = Result<&'static str>>,
    {
        let scheduler = self
            .scheduler
            .take()
            .ok_or_else(|| anyhow::anyhow!("orchestrator has already run"))?;

        let control_task = if self.config.control.enabled {
            Some(
                control::spawn(
                    &self.config.control.bind,
                    self.controller.clone(),
                    self.shutdown.clone(),
                )
                .await?,
            )
        } else {
            None
        };

        if self.config.connector.autostart {
            self.controller.start();
        } else {
            tracing::info!("autostart disabled, waiting for POST /start");
        }

        let mut scheduler_task = tokio::spawn(scheduler.run());

        let outcome = tokio::select! {
            joined = &mut scheduler_task => {
                joined.map_err(|e| anyhow::anyhow!("scheduler task failed: {}", e))?
            }
            signal = shutdown_signal => {
                let signal = signal?;
                tracing::info!(signal = signal, "shutdown signal received, interrupting scheduler");
                self.controller.interrupt();
                scheduler_task.abort();
                SchedulerState::Terminated
            }
        };

        self.shutdown.cancel();
        if let Some(task) = control_task {
            let _ = task.await;
        }

        tracing::info!(
            state = %outcome,
            loop_count = self.controller.loop_count(),
            "iotsentry-daemon shut down"
        );
        Ok(outcome)
    }

    /// Shared controller handle.
    pub fn controller(&self) -> &LifecycleController {
        &self.controller
    }

    /// Get a reference to the loaded configuration.
    pub fn config(&self) -> &IotsentryConfig {
        &self.config
    }
}

/// Wait for a shutdown signal (SIGTERM or SIGINT).
///
/// Returns the name of the signal that triggered the shutdown.
///
/// # Errors
///
/// Returns an error if signal handlers cannot be installed.
async fn wait_for_shutdown_signal() -> Result<&'static str> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("failed to install SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("failed to install SIGINT handler: {}", e))?;

    Ok(tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    })
}

/// Record daemon-level metrics (build info).
fn record_daemon_metrics() {
    use iotsentry_core::metrics as m;

    metrics::gauge!(m::DAEMON_BUILD_INFO, "version" => env!("CARGO_PKG_VERSION")).set(1.0);
    tracing::debug!(version = env!("CARGO_PKG_VERSION"), "daemon metrics recorded");
}
