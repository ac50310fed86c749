//! iotsentry daemon library.
//!
//! This library exposes internal modules for integration testing.
//! In production, `iotsentry-daemon` is used as a binary (main.rs).

pub mod cli;
pub mod control;
pub mod logging;
pub mod metrics_server;
pub mod orchestrator;
