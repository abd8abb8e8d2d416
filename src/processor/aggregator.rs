//! Single-owner coordination loop for batch results.
//!
//! Workers never touch the [`BatchSummary`] directly: they send [`AggregatorMessage`]s and the
//! aggregator task applies them one at a time, drives the progress bar, and hands the frozen
//! summary back through its `JoinHandle` once [`AggregatorMessage::Terminate`] arrives.

use super::outcome::{AggregatorMessage, AggregatorReceiver, Outcome};
use super::summary::BatchSummary;
use crate::runtime::progress::{DiagnosticSink, ProgressBar};
use chrono::Local;
use tokio::task::JoinHandle;

pub(crate) struct Aggregator {
    summary: BatchSummary,
    known_total: Option<u64>,
    progress: Option<ProgressBar<DiagnosticSink>>,
}

impl Aggregator {
    pub(crate) fn new(
        summary: BatchSummary,
        known_total: Option<u64>,
        progress: Option<ProgressBar<DiagnosticSink>>,
    ) -> Self {
        Self {
            summary,
            known_total,
            progress,
        }
    }

    pub(crate) fn spawn(self, inbox: AggregatorReceiver) -> JoinHandle<BatchSummary> {
        tokio::spawn(self.run(inbox))
    }

    pub(crate) async fn run(mut self, mut inbox: AggregatorReceiver) -> BatchSummary {
        let mut terminated = false;
        while let Some(message) = inbox.recv().await {
            match message {
                AggregatorMessage::Dispatched => self.summary.record_dispatch(),
                AggregatorMessage::Outcome(outcome) => self.apply(outcome),
                AggregatorMessage::Terminate => {
                    terminated = true;
                    break;
                }
            }
        }

        if !terminated {
            tracing::warn!(
                processed = self.summary.processed(),
                dispatched = self.summary.dispatched(),
                "aggregator inbox closed without a termination signal"
            );
        }

        self.finalize()
    }

    fn apply(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Success => self.summary.record_success(),
            Outcome::Failure(error) => {
                tracing::debug!(
                    position = error.position(),
                    error = %error,
                    "record failed"
                );
                self.summary.record_failure(error);
            }
        }
        self.render();
    }

    fn render(&mut self) {
        let Some(bar) = self.progress.as_mut() else {
            return;
        };

        let total = self.known_total.unwrap_or(self.summary.dispatched());
        bar.set_total(total);
        if let Err(err) = bar.play(self.summary.processed()) {
            tracing::warn!(error = %err, "progress output failed; disabling live progress");
            self.progress = None;
        }
    }

    fn finalize(mut self) -> BatchSummary {
        self.summary.finish(Local::now());

        if let Some(mut bar) = self.progress.take() {
            if let Err(err) = bar.finish() {
                tracing::warn!(error = %err, "failed to terminate progress line");
            }
        }

        self.summary
    }
}
