use crate::runtime::config::BatchConfig;
use crate::runtime::handler::RecordError;
use chrono::{DateTime, Local};
use std::collections::BTreeMap;
use std::time::Duration;

pub const EXECUTED_HEADER: &str = "Executed";
pub const CONCURRENCY_HEADER: &str = "Concurrency";

/// Running, then frozen, result of a batch.
///
/// Only the aggregator mutates a summary. Once [`BatchSummary::finished_at`] is set the
/// summary is handed back to the caller and never changes again.
#[derive(Debug)]
pub struct BatchSummary {
    title: Option<String>,
    started_at: DateTime<Local>,
    finished_at: Option<DateTime<Local>>,
    concurrency: usize,
    headers: BTreeMap<String, String>,
    failures: Vec<RecordError>,
    processed: u64,
    dispatched: u64,
}

impl BatchSummary {
    pub(crate) fn start(config: &BatchConfig, started_at: DateTime<Local>) -> Self {
        let mut headers = config.headers().clone();
        headers
            .entry(EXECUTED_HEADER.to_owned())
            .or_insert_with(|| started_at.to_string());
        headers.insert(
            CONCURRENCY_HEADER.to_owned(),
            config.concurrency().to_string(),
        );

        Self {
            title: config.title().map(str::to_owned),
            started_at,
            finished_at: None,
            concurrency: config.concurrency(),
            headers,
            failures: Vec::new(),
            processed: 0,
            dispatched: 0,
        }
    }

    pub(crate) fn record_dispatch(&mut self) {
        self.dispatched += 1;
    }

    pub(crate) fn record_success(&mut self) {
        self.processed += 1;
    }

    pub(crate) fn record_failure(&mut self, error: RecordError) {
        self.failures.push(error);
        self.processed += 1;
    }

    pub(crate) fn finish(&mut self, finished_at: DateTime<Local>) {
        self.finished_at = Some(finished_at);
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn started_at(&self) -> DateTime<Local> {
        self.started_at
    }

    /// Set once every dispatched record has been accounted for.
    pub fn finished_at(&self) -> Option<DateTime<Local>> {
        self.finished_at
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Configured headers plus the derived `Executed` and `Concurrency` entries.
    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    /// Handler failures in completion order.
    pub fn failures(&self) -> &[RecordError] {
        &self.failures
    }

    pub fn processed(&self) -> u64 {
        self.processed
    }

    pub fn dispatched(&self) -> u64 {
        self.dispatched
    }

    pub fn succeeded(&self) -> u64 {
        self.processed - self.failures.len() as u64
    }

    /// Wall time between start and finish; zero while the batch is still running.
    pub fn elapsed(&self) -> Duration {
        self.finished_at
            .and_then(|finished| (finished - self.started_at).to_std().ok())
            .unwrap_or(Duration::ZERO)
    }

    /// Mean wall time per processed record; zero when nothing was processed.
    pub fn average(&self) -> Duration {
        if self.processed == 0 {
            return Duration::ZERO;
        }
        let nanos = self.elapsed().as_nanos() / u128::from(self.processed);
        Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
    }

    pub fn into_failures(self) -> Vec<RecordError> {
        self.failures
    }
}
