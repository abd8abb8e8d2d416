use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio::{select, time};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Default interval used by the metrics reporter task.
pub const DEFAULT_METRICS_INTERVAL: Duration = Duration::from_secs(5);

static TRACING_INIT: OnceLock<()> = OnceLock::new();

/// Installs a basic tracing subscriber (if one is not already active).
///
/// The subscriber honours `RUST_LOG` if it is present, otherwise it falls back to `info`.
/// Calling this function multiple times is harmless.
pub fn init_tracing() {
    if TRACING_INIT.get().is_some() {
        return;
    }

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_writer(std::io::stderr)
        .try_init();

    let _ = TRACING_INIT.set(());
}

/// Worker gauges shared by the dispatcher and its worker tasks.
///
/// These are observational only; the aggregator owns the authoritative counts.
#[derive(Default, Debug)]
pub struct Telemetry {
    dispatched: AtomicU64,
    completed: AtomicU64,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl Telemetry {
    pub fn record_dispatched(&self) {
        self.dispatched.fetch_add(1, Ordering::Relaxed);
    }

    /// Marks a worker as running until the returned guard is dropped.
    pub fn enter_worker(self: &Arc<Self>) -> InFlightGuard {
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(running, Ordering::SeqCst);
        InFlightGuard {
            telemetry: self.clone(),
        }
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        TelemetrySnapshot {
            dispatched: self.dispatched.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            in_flight: self.in_flight.load(Ordering::SeqCst),
            peak_in_flight: self.peak_in_flight.load(Ordering::SeqCst),
        }
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    fn exit_worker(&self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.completed.fetch_add(1, Ordering::Relaxed);
    }
}

#[derive(Debug)]
pub struct InFlightGuard {
    telemetry: Arc<Telemetry>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.telemetry.exit_worker();
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TelemetrySnapshot {
    pub dispatched: u64,
    pub completed: u64,
    pub in_flight: usize,
    pub peak_in_flight: usize,
}

/// Spawns a background task that periodically logs dispatch throughput and worker gauges.
pub fn spawn_metrics_reporter(
    telemetry: Arc<Telemetry>,
    shutdown: CancellationToken,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;

        let mut last_snapshot = telemetry.snapshot();
        let mut last_tick = Instant::now();

        loop {
            select! {
                _ = shutdown.cancelled() => {
                    tracing::debug!(target: "cbatch::metrics", "metrics reporter shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    let current_snapshot = telemetry.snapshot();
                    let completed_delta = current_snapshot
                        .completed
                        .saturating_sub(last_snapshot.completed);
                    let elapsed = last_tick.elapsed().as_secs_f64();
                    let throughput = if elapsed <= f64::EPSILON {
                        0.0
                    } else {
                        completed_delta as f64 / elapsed
                    };

                    tracing::debug!(
                        target: "cbatch::metrics",
                        throughput = format!("{throughput:.2}"),
                        dispatched = current_snapshot.dispatched,
                        completed = current_snapshot.completed,
                        in_flight = current_snapshot.in_flight,
                        peak_in_flight = current_snapshot.peak_in_flight,
                        "batch metrics snapshot"
                    );

                    last_snapshot = current_snapshot;
                    last_tick = Instant::now();
                }
            }
        }
    })
}
