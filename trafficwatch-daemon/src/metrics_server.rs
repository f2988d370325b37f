//! Prometheus metrics exporter.
//!
//! Uses the built-in HTTP listener from `metrics-exporter-prometheus`; any
//! path on the listener serves the scrape output.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use metrics_exporter_prometheus::PrometheusBuilder;

use trafficwatch_core::config::MetricsConfig;
use trafficwatch_core::metrics as m;

/// Resolve the listener address from `listen_addr` and `port`.
pub fn listen_socket(config: &MetricsConfig) -> Result<SocketAddr> {
    format!("{}:{}", config.listen_addr, config.port)
        .parse()
        .with_context(|| format!("invalid metrics listen address '{}'", config.listen_addr))
}

/// Install the global metrics recorder and start the HTTP listener.
///
/// Call at most once per process.
///
/// # Errors
///
/// - Invalid listen address
/// - Socket binding fails or a global recorder is already installed
pub fn install_metrics_recorder(config: &MetricsConfig) -> Result<()> {
    let addr = listen_socket(config)?;

    if addr.ip().is_unspecified() {
        tracing::warn!(
            listen_addr = %addr,
            "metrics endpoint is exposed on all interfaces; restrict listen_addr in untrusted networks"
        );
    }

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .context("failed to install metrics recorder")?;

    m::describe_all();
    record_start_time();

    tracing::info!(listen_addr = %addr, "Prometheus metrics endpoint active");
    Ok(())
}

fn record_start_time() {
    #[allow(clippy::cast_precision_loss)]
    metrics::gauge!(m::DAEMON_START_TIME_SECONDS).set(chrono::Utc::now().timestamp() as f64);
}
