//! CLI argument definitions for iotsentry-daemon.
//!
//! Uses `clap` v4 derive macros to parse command-line arguments.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use iotsentry_core::IotsentryConfig;
use iotsentry_core::error::{ConfigError, IotsentryError};

/// iotsentry connection-log connector daemon.
///
/// Polls the IoT platform's connection logs, classifies each entry,
/// and forwards the resulting events to a syslog SIEM.
#[derive(Parser, Debug)]
#[command(name = "iotsentry-daemon")]
#[command(version, about, long_about = None)]
pub struct DaemonCli {
    /// Path to iotsentry.toml configuration file.
    #[arg(short, long, default_value = "/etc/iotsentry/iotsentry.toml")]
    pub config: PathBuf,

    /// Start from built-in defaults when the configuration file does not exist.
    ///
    /// Environment overrides are still applied.
    #[arg(long)]
    pub defaults: bool,

    /// Override log level (trace, debug, info, warn, error).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_level: Option<String>,

    /// Override log format (json, pretty).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_format: Option<String>,

    /// Replay connection logs from a capture file instead of the platform API.
    #[arg(long, value_name = "FILE")]
    pub replay: Option<PathBuf>,

    /// Validate configuration file and exit without starting the daemon.
    #[arg(long)]
    pub validate: bool,
}

impl DaemonCli {
    /// Resolve the effective configuration.
    ///
    /// Order: file (or defaults with `--defaults`) -> environment -> CLI flags -> validate.
    pub async fn load_config(&self) -> Result<IotsentryConfig> {
        let mut config = match IotsentryConfig::from_file(&self.config).await {
            Ok(config) => config,
            Err(IotsentryError::Config(ConfigError::FileNotFound { .. })) if self.defaults => {
                IotsentryConfig::default()
            }
            Err(e) => return Err(anyhow::anyhow!("failed to load config: {}", e)),
        };
        config.apply_env_overrides();
        self.apply_overrides(&mut config);
        config
            .validate()
            .map_err(|e| anyhow::anyhow!("config validation failed: {}", e))?;
        Ok(config)
    }

    /// Apply command-line overrides on top of file and environment values.
    pub fn apply_overrides(&self, config: &mut IotsentryConfig) {
        if let Some(level) = &self.log_level {
            config.general.log_level.clone_from(level);
        }
        if let Some(format) = &self.log_format {
            config.general.log_format.clone_from(format);
        }
        if let Some(path) = &self.replay {
            config.connector.replay_mode = true;
            config.connector.replay_file = path.display().to_string();
        }
    }
}
