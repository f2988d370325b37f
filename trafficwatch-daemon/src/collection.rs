//! Collection loop -- drains every monitor queue on a fixed tick and hands
//! per-source batches to the writer.
//!
//! # Tick
//!
//! ```text
//! sleep(tick) -> drain all queues -> group by source_id -> write each batch
//! ```
//!
//! A slow write delays the next tick; records stay queued in the meantime.
//! On cancellation every monitor is stopped, then one final drain-and-write
//! flushes whatever the producers enqueued before exiting.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use trafficwatch_collector::DynMonitor;
use trafficwatch_core::TrafficRecord;
use trafficwatch_core::metrics as m;
use trafficwatch_writer::TrafficWriter;

/// Counters accumulated over the lifetime of a collection loop.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CollectionStats {
    /// Ticks executed (the final flush is not counted).
    pub ticks: u64,
    /// Records persisted to disk, after merging.
    pub records_written: u64,
    /// Batches dropped because the writer failed.
    pub failed_batches: u64,
}

/// Owns the monitors and the writer for the lifetime of the daemon.
pub struct CollectionLoop {
    monitors: Vec<Box<dyn DynMonitor>>,
    writer: Arc<TrafficWriter>,
    tick: Duration,
    stats: CollectionStats,
}

impl CollectionLoop {
    /// Create a loop over already-built (not yet started) monitors.
    pub fn new(monitors: Vec<Box<dyn DynMonitor>>, writer: TrafficWriter, tick: Duration) -> Self {
        Self {
            monitors,
            writer: Arc::new(writer),
            tick,
            stats: CollectionStats::default(),
        }
    }

    /// Names of the monitors currently owned by the loop.
    pub fn monitor_names(&self) -> Vec<String> {
        self.monitors.iter().map(|m| m.name().to_owned()).collect()
    }

    /// Statistics so far.
    pub fn stats(&self) -> &CollectionStats {
        &self.stats
    }

    /// Start every monitor with a child token of `cancel`.
    ///
    /// A monitor whose start fails is logged and left out; the rest keep
    /// running. Returns the number of monitors started.
    pub async fn start_monitors(&mut self, cancel: &CancellationToken) -> usize {
        let mut started = Vec::with_capacity(self.monitors.len());
        for mut monitor in self.monitors.drain(..) {
            match monitor.start(cancel.child_token()).await {
                Ok(()) => {
                    tracing::info!(monitor = %monitor.name(), kind = %monitor.kind(), "monitor started");
                    started.push(monitor);
                }
                Err(e) => {
                    tracing::error!(monitor = %monitor.name(), error = %e, "monitor failed to start, skipping");
                }
            }
        }
        self.monitors = started;

        #[allow(clippy::cast_precision_loss)]
        metrics::gauge!(m::DAEMON_MONITORS_RUNNING).set(self.monitors.len() as f64);
        self.monitors.len()
    }

    /// Drain every queue without blocking, grouped by `source_id`.
    pub fn drain_batches(&self) -> BTreeMap<String, Vec<TrafficRecord>> {
        let mut batches: BTreeMap<String, Vec<TrafficRecord>> = BTreeMap::new();
        for monitor in &self.monitors {
            #[allow(clippy::cast_precision_loss)]
            metrics::gauge!(m::COLLECTOR_QUEUE_DEPTH, m::LABEL_MONITOR => monitor.name().to_owned())
                .set(monitor.queue_stats().queued as f64);

            for record in monitor.drain() {
                batches
                    .entry(record.source_id.clone())
                    .or_default()
                    .push(record);
            }
        }
        batches
    }

    /// Drain and write once. Returns the number of records written.
    pub async fn flush(&mut self) -> u64 {
        let mut written = 0;
        for (source, batch) in self.drain_batches() {
            let count = batch.len();
            let writer = Arc::clone(&self.writer);
            let result = tokio::task::spawn_blocking(move || writer.write(batch)).await;

            match result {
                Ok(Ok(Some(outcome))) => {
                    tracing::debug!(
                        source = %source,
                        path = %outcome.path.display(),
                        written = outcome.written,
                        "batch persisted"
                    );
                    written += outcome.written as u64;
                }
                Ok(Ok(None)) => {}
                Ok(Err(e)) => {
                    self.stats.failed_batches += 1;
                    tracing::error!(source = %source, records = count, error = %e, "write failed, batch dropped");
                }
                Err(e) => {
                    self.stats.failed_batches += 1;
                    tracing::error!(source = %source, records = count, error = %e, "writer task failed, batch dropped");
                }
            }
        }
        self.stats.records_written += written;
        written
    }

    /// Stop every running monitor, waiting for each producer to exit.
    pub async fn stop_monitors(&mut self) {
        for monitor in &mut self.monitors {
            if let Err(e) = monitor.stop().await {
                tracing::warn!(monitor = %monitor.name(), error = %e, "monitor stop failed");
            } else {
                tracing::info!(monitor = %monitor.name(), state = %monitor.state(), "monitor stopped");
            }
        }
        metrics::gauge!(m::DAEMON_MONITORS_RUNNING).set(0.0);
    }

    /// Start the monitors and tick until `cancel` fires, then stop the
    /// monitors and flush the remaining records.
    pub async fn run(mut self, cancel: CancellationToken) -> CollectionStats {
        let running = self.start_monitors(&cancel).await;
        if running == 0 {
            tracing::warn!("no monitor is running; collection loop idles until shutdown");
        }

        let tick = self.tick.max(Duration::from_millis(1));
        let mut ticker = tokio::time::interval_at(Instant::now() + tick, tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(tick_secs = tick.as_secs_f64(), monitors = running, "collection loop started");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    self.stats.ticks += 1;
                    metrics::counter!(m::DAEMON_TICKS_TOTAL).increment(1);
                    self.flush().await;
                }
            }
        }

        tracing::info!("collection loop stopping monitors");
        self.stop_monitors().await;
        let tail = self.flush().await;
        tracing::info!(
            ticks = self.stats.ticks,
            written = self.stats.records_written,
            final_flush = tail,
            failed_batches = self.stats.failed_batches,
            "collection loop finished"
        );
        self.stats
    }
}
