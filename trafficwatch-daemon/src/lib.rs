//! trafficwatch daemon library.
//!
//! Exposes the daemon's building blocks for integration testing.
//! In production, `trafficwatch-daemon` is used as a binary (main.rs).

pub mod cli;
pub mod collection;
pub mod logging;
pub mod metrics_server;
pub mod nginx_setup;
pub mod orchestrator;
