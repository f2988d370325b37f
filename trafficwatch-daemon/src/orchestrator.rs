//! Daemon orchestration -- assembly and lifecycle management.
//!
//! The [`Orchestrator`] turns a validated [`TrafficwatchConfig`] into running
//! components and tears them down on shutdown.
//!
//! # Startup
//!
//! 1. Metrics exporter (if enabled)
//! 2. Monitors built by the factory (interface monitors, then log tail)
//! 3. Writer (creates the output root)
//! 4. Retention observer (if enabled)
//! 5. Collection loop starts the monitors and begins ticking
//!
//! # Shutdown
//!
//! A single root [`CancellationToken`] is cancelled on SIGTERM/SIGINT.
//! The collection loop stops every monitor, flushes the remaining records,
//! and the retention observer exits on the same token.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;

use trafficwatch_collector::{CaptureBackend, PnetBackend, build_monitors};
use trafficwatch_core::TrafficwatchConfig;
use trafficwatch_writer::{RetentionObserver, TrafficWriter};

use crate::collection::{CollectionLoop, CollectionStats};
use crate::metrics_server;

/// The main daemon orchestrator.
pub struct Orchestrator {
    config: TrafficwatchConfig,
    backend: Arc<dyn CaptureBackend>,
}

impl Orchestrator {
    /// Load configuration (file, env overrides, validation) and build.
    pub async fn build(config_path: &Path) -> Result<Self> {
        let config = TrafficwatchConfig::load(config_path)
            .await
            .with_context(|| format!("failed to load config {}", config_path.display()))?;
        Self::build_from_config(config)
    }

    /// Build from an already-loaded configuration.
    ///
    /// Validates the configuration and installs the metrics exporter when
    /// enabled. Nothing is started yet.
    pub fn build_from_config(config: TrafficwatchConfig) -> Result<Self> {
        config.validate().context("config validation failed")?;

        if config.metrics.enabled {
            metrics_server::install_metrics_recorder(&config.metrics)?;
        }

        Ok(Self {
            config,
            backend: Arc::new(PnetBackend::new()),
        })
    }

    /// Replace the packet capture backend.
    pub fn with_capture_backend(mut self, backend: Arc<dyn CaptureBackend>) -> Self {
        self.backend = backend;
        self
    }

    /// Get a reference to the loaded configuration.
    pub fn config(&self) -> &TrafficwatchConfig {
        &self.config
    }

    /// Run until SIGTERM or SIGINT.
    pub async fn run(self) -> Result<CollectionStats> {
        let cancel = CancellationToken::new();

        let signal_cancel = cancel.clone();
        let signal_task = tokio::spawn(async move {
            match wait_for_shutdown_signal().await {
                Ok(signal) => tracing::info!(signal = signal, "shutdown signal received"),
                Err(e) => tracing::error!(error = %e, "signal handling failed, shutting down"),
            }
            signal_cancel.cancel();
        });

        let result = self.run_until(cancel).await;
        signal_task.abort();
        result
    }

    /// Assemble every component and run until `cancel` fires.
    ///
    /// Fails only on startup errors (unknown interface, unreadable log
    /// directory, unwritable output root). Runtime errors are logged.
    pub async fn run_until(self, cancel: CancellationToken) -> Result<CollectionStats> {
        let monitors = build_monitors(&self.config, Arc::clone(&self.backend))
            .context("failed to build monitors")?;
        if monitors.is_empty() {
            tracing::warn!("no monitors configured; nothing will be captured");
        }

        let writer = TrafficWriter::new(&self.config.writer, self.config.system.filter_superfluous_ip)
            .context("failed to prepare output directory")?;
        tracing::info!(
            path = %writer.base().display(),
            format = %writer.format(),
            interval = ?self.config.writer.interval_type,
            disguise = self.config.writer.fake_img,
            "writer ready"
        );

        let observer_task = self.config.observer.enabled.then(|| {
            RetentionObserver::from_config(writer.base(), &self.config.observer)
                .spawn(cancel.child_token())
        });

        let collection = CollectionLoop::new(
            monitors,
            writer,
            Duration::from_secs(self.config.system.tick_secs),
        );
        let stats = collection.run(cancel.clone()).await;

        if let Some(task) = observer_task {
            cancel.cancel();
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "retention observer task ended abnormally");
            }
        }

        tracing::info!("trafficwatch shut down");
        Ok(stats)
    }
}

/// Wait for a shutdown signal (SIGTERM or SIGINT).
///
/// Returns the name of the signal that triggered the shutdown.
async fn wait_for_shutdown_signal() -> Result<&'static str> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm =
        signal(SignalKind::terminate()).context("failed to install SIGTERM handler")?;
    let mut sigint = signal(SignalKind::interrupt()).context("failed to install SIGINT handler")?;

    Ok(tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    })
}
