//! Polling watcher over a tabular source.
//!
//! Every tick reads the full snapshot, normalizes each row, and forwards rows
//! that are both new (by fingerprint) and complete to the [`Ingestor`]. A row
//! is remembered the first time it is seen, complete or not, so an incomplete
//! row is not retried while its values stay the same.
//!
//! Lifecycle is an explicit state machine guarded by one mutex:
//!
//! ```text
//! Stopped ──start()──▶ Starting ──spawned──▶ Running ──stop()──▶ Stopping ──joined──▶ Stopped
//! ```
//!
//! Cancellation is cooperative: the token is observed between polls, and a
//! poll in progress always finishes its inserts.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use linea_core::config::WatcherConfig;
use linea_core::sheet::{to_event_record, SHEET_REQUIRED_COLUMNS};
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::dedup::{fingerprint, SeenSet};
use crate::error::WatcherError;
use crate::normalize::normalize;
use crate::orchestrator::{Ingestor, ValidationPolicy};
use crate::source::TabularSource;
use crate::validate::is_complete;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum WatcherState {
    Stopped,
    Starting,
    Running,
    Stopping,
}

/// What one poll cycle did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PollReport {
    /// Rows in the snapshot.
    pub rows: usize,
    /// Rows not seen before this cycle.
    pub new: usize,
    pub ingested: usize,
    pub incomplete: usize,
    /// New complete rows whose ingest failed.
    pub failed: usize,
    /// Rows skipped because their fingerprint was already seen.
    pub duplicates: usize,
    /// The source could not be read; the cycle counted as zero rows.
    pub read_failed: bool,
}

/// Totals across the watcher's lifetime.
#[derive(Debug, Clone, Default, Serialize)]
pub struct WatcherStats {
    pub cycles: u64,
    pub ingested: u64,
    pub incomplete: u64,
    pub failed: u64,
    pub read_failures: u64,
    pub last_poll_at: Option<DateTime<Utc>>,
}

impl WatcherStats {
    fn record(&mut self, report: &PollReport) {
        self.cycles += 1;
        self.ingested += report.ingested as u64;
        self.incomplete += report.incomplete as u64;
        self.failed += report.failed as u64;
        if report.read_failed {
            self.read_failures += 1;
        }
        self.last_poll_at = Some(Utc::now());
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// State shared with the polling task.
struct Shared {
    source: Arc<dyn TabularSource>,
    ingestor: Ingestor,
    /// Mutated only from poll cycles.
    seen: Mutex<SeenSet>,
    stats: Mutex<WatcherStats>,
    user: String,
    interval: Duration,
}

impl Shared {
    async fn poll_once(&self) -> PollReport {
        let mut report = PollReport::default();

        let rows = match self.source.read_rows().await {
            Ok(rows) => rows,
            Err(e) => {
                warn!(source = %self.source.describe(), error = %e, "failed to read source");
                report.read_failed = true;
                lock(&self.stats).record(&report);
                return report;
            }
        };
        report.rows = rows.len();

        for raw in &rows {
            let row = normalize(raw);
            let fp = fingerprint(&row);
            {
                let mut seen = lock(&self.seen);
                if seen.seen(&fp) {
                    report.duplicates += 1;
                    continue;
                }
                seen.mark_seen(fp);
            }
            report.new += 1;

            let (complete, missing) = is_complete(&row, &SHEET_REQUIRED_COLUMNS);
            if !complete {
                let values: Vec<&str> = SHEET_REQUIRED_COLUMNS
                    .iter()
                    .map(|c| row.get(*c).map(String::as_str).unwrap_or_default())
                    .collect();
                warn!(
                    missing_count = missing.len(),
                    missing = ?missing,
                    values = %values.join(" | "),
                    "incomplete row ignored"
                );
                report.incomplete += 1;
                continue;
            }

            debug!(row = ?row, "new entry detected");
            let record = to_event_record(&row, &self.user);
            match self.ingestor.ingest(record, ValidationPolicy::Strict).await {
                Ok(receipt) => {
                    info!(event_id = receipt.id, "row sent to ingestion");
                    report.ingested += 1;
                }
                Err(e) => {
                    error!(error = %e, "failed to ingest row");
                    report.failed += 1;
                }
            }
        }

        if report.new > 0 {
            info!(
                rows = report.rows,
                new = report.new,
                ingested = report.ingested,
                incomplete = report.incomplete,
                failed = report.failed,
                "poll cycle complete"
            );
        }
        lock(&self.stats).record(&report);
        report
    }

    async fn run(self: Arc<Self>, cancel: CancellationToken) {
        info!(source = %self.source.describe(), interval_ms = self.interval.as_millis() as u64, "monitoring started");
        loop {
            if cancel.is_cancelled() {
                break;
            }
            self.poll_once().await;
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.interval) => {}
            }
        }
        info!("monitoring stopped");
    }
}

struct Control {
    state: WatcherState,
    cancel: Option<CancellationToken>,
    task: Option<JoinHandle<()>>,
}

/// Long-running source watcher. At most one polling loop exists per watcher.
pub struct SourceWatcher {
    shared: Arc<Shared>,
    control: Mutex<Control>,
}

impl SourceWatcher {
    pub fn new(source: Arc<dyn TabularSource>, ingestor: Ingestor, config: &WatcherConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                source,
                ingestor,
                seen: Mutex::new(SeenSet::new(config.dedup_capacity)),
                stats: Mutex::new(WatcherStats::default()),
                user: config.user.clone(),
                interval: config.poll_interval(),
            }),
            control: Mutex::new(Control {
                state: WatcherState::Stopped,
                cancel: None,
                task: None,
            }),
        }
    }

    pub fn state(&self) -> WatcherState {
        lock(&self.control).state
    }

    /// Spawn the polling loop on the current tokio runtime.
    ///
    /// Fails with [`WatcherError::AlreadyRunning`] unless the watcher is
    /// `Stopped`.
    pub fn start(&self) -> Result<(), WatcherError> {
        let mut control = lock(&self.control);
        if control.state != WatcherState::Stopped {
            return Err(WatcherError::AlreadyRunning(control.state));
        }
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| WatcherError::NoRuntime)?;
        control.state = WatcherState::Starting;

        let cancel = CancellationToken::new();
        let task = runtime.spawn(Arc::clone(&self.shared).run(cancel.clone()));

        control.cancel = Some(cancel);
        control.task = Some(task);
        control.state = WatcherState::Running;
        Ok(())
    }

    /// Request the loop to stop and wait for it. A poll in progress finishes
    /// first. No-op unless `Running`.
    pub async fn stop(&self) {
        let (cancel, task) = {
            let mut control = lock(&self.control);
            if control.state != WatcherState::Running {
                return;
            }
            control.state = WatcherState::Stopping;
            (control.cancel.take(), control.task.take())
        };

        if let Some(cancel) = cancel {
            cancel.cancel();
        }
        if let Some(task) = task {
            if let Err(e) = task.await {
                warn!(error = %e, "watcher task ended abnormally");
            }
        }

        lock(&self.control).state = WatcherState::Stopped;
        info!("watcher stopped");
    }

    /// Run a single poll cycle on the caller's task.
    pub async fn poll_once(&self) -> PollReport {
        self.shared.poll_once().await
    }

    pub fn stats(&self) -> WatcherStats {
        lock(&self.shared.stats).clone()
    }

    /// Number of fingerprints currently remembered.
    pub fn seen_count(&self) -> usize {
        lock(&self.shared.seen).len()
    }
}

impl Drop for SourceWatcher {
    fn drop(&mut self) {
        if let Some(cancel) = lock(&self.control).cancel.take() {
            cancel.cancel();
        }
    }
}
