use crate::processor::dispatcher::Dispatcher;
use crate::processor::summary::BatchSummary;
use crate::runtime::config::BatchConfig;
use crate::runtime::handler::RecordHandler;
use crate::runtime::progress::{DiagnosticSink, ProgressBar};
use crate::runtime::telemetry::Telemetry;
use crate::split::source::RecordSource;
use anyhow::{Context, Result};
use std::io::{self, Write};
use std::sync::Arc;

/// Processes every record of `source` with `handler` under `config`.
///
/// Progress goes to stderr and the report to stdout when enabled; use [`Runner`] to redirect
/// either.
pub async fn process<T, H>(
    handler: H,
    source: RecordSource<T>,
    config: BatchConfig,
) -> Result<BatchSummary>
where
    T: Send + 'static,
    H: RecordHandler<T>,
{
    Runner::new(config, handler).run(source).await
}

/// Wires the dispatcher to its diagnostic and report sinks for a single batch.
pub struct Runner<T, H> {
    dispatcher: Dispatcher<T, H>,
    progress_sink: Option<DiagnosticSink>,
    report_sink: Option<Box<dyn Write + Send>>,
}

impl<T, H> Runner<T, H>
where
    T: Send + 'static,
    H: RecordHandler<T>,
{
    pub fn new(config: BatchConfig, handler: H) -> Self {
        Self {
            dispatcher: Dispatcher::new(config, handler),
            progress_sink: None,
            report_sink: None,
        }
    }

    /// Redirects the live progress bar. Only used when progress is enabled in the config.
    pub fn with_progress_sink(mut self, sink: impl Write + Send + 'static) -> Self {
        self.progress_sink = Some(Box::new(sink));
        self
    }

    /// Prints the summary report to `sink` once the batch finishes.
    pub fn with_report_sink(mut self, sink: impl Write + Send + 'static) -> Self {
        self.report_sink = Some(Box::new(sink));
        self
    }

    pub fn config(&self) -> &BatchConfig {
        self.dispatcher.config()
    }

    pub fn telemetry(&self) -> Arc<Telemetry> {
        self.dispatcher.telemetry()
    }

    pub async fn run(self, source: RecordSource<T>) -> Result<BatchSummary> {
        let Self {
            dispatcher,
            progress_sink,
            report_sink,
        } = self;
        let config = dispatcher.config();

        let progress = config.progress().then(|| {
            let sink = progress_sink.unwrap_or_else(|| Box::new(io::stderr()));
            let total = source.len_hint().unwrap_or(0) as u64;
            ProgressBar::new(0, total, sink)
        });

        let report_sink = match report_sink {
            Some(sink) => Some(sink),
            None if config.report() => Some(Box::new(io::stdout()) as Box<dyn Write + Send>),
            None => None,
        };

        let summary = dispatcher.dispatch(source, progress).await?;

        if let Some(mut sink) = report_sink {
            summary
                .write_report(&mut sink)
                .and_then(|_| sink.flush())
                .context("failed to write batch report")?;
        }

        Ok(summary)
    }
}
