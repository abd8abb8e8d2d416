//! Bounded-concurrency dispatch of records to handler tasks.
//!
//! The dispatcher owns the permit pool. Every record waits for a permit, then runs on its own
//! tokio task which reports exactly one [`Outcome`] to the aggregator before releasing the
//! permit. Once the source is exhausted the dispatcher reacquires the whole pool, which can
//! only succeed after every worker has delivered its outcome, and only then signals
//! termination.

use super::aggregator::Aggregator;
use super::outcome::{aggregator_channel, AggregatorMessage, AggregatorSender, Outcome};
use super::summary::BatchSummary;
use crate::runtime::config::BatchConfig;
use crate::runtime::handler::{RecordError, RecordHandler};
use crate::runtime::progress::{DiagnosticSink, ProgressBar};
use crate::runtime::telemetry::{self, Telemetry};
use crate::split::source::RecordSource;
use anyhow::{anyhow, Context, Result};
use chrono::Local;
use futures::FutureExt;
use std::any::Any;
use std::marker::PhantomData;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;

pub struct Dispatcher<T, H> {
    config: BatchConfig,
    handler: Arc<H>,
    telemetry: Arc<Telemetry>,
    _record: PhantomData<fn(T)>,
}

impl<T, H> Dispatcher<T, H>
where
    T: Send + 'static,
    H: RecordHandler<T>,
{
    pub fn new(config: BatchConfig, handler: H) -> Self {
        Self {
            config,
            handler: Arc::new(handler),
            telemetry: Arc::new(Telemetry::default()),
            _record: PhantomData,
        }
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    pub fn telemetry(&self) -> Arc<Telemetry> {
        self.telemetry.clone()
    }

    /// Runs every record of `source` through the handler and returns the frozen summary.
    ///
    /// A source read error stops dispatching; records already handed to workers still run to
    /// completion before the error is returned.
    pub async fn dispatch(
        &self,
        mut source: RecordSource<T>,
        progress: Option<ProgressBar<DiagnosticSink>>,
    ) -> Result<BatchSummary> {
        self.config
            .validate()
            .context("refusing to start batch with invalid configuration")?;

        let concurrency = self.config.concurrency();
        let known_total = source.len_hint().map(|total| total as u64);
        let summary = BatchSummary::start(&self.config, Local::now());

        tracing::info!(
            concurrency,
            records = ?known_total,
            title = self.config.title().unwrap_or_default(),
            "starting batch"
        );

        let (outbox, inbox) = aggregator_channel(concurrency);
        let aggregator = Aggregator::new(summary, known_total, progress).spawn(inbox);
        let run_token = CancellationToken::new();
        let metrics_handle = telemetry::spawn_metrics_reporter(
            self.telemetry.clone(),
            run_token.clone(),
            self.config.metrics_interval(),
        );

        let permits = Arc::new(Semaphore::new(concurrency));
        let dispatch_result = self.dispatch_all(&mut source, &permits, &outbox).await;

        let drained = permits
            .acquire_many(concurrency as u32)
            .await
            .context("failed to drain the permit pool")?;
        drop(drained);

        if outbox.send(AggregatorMessage::Terminate).await.is_err() {
            tracing::warn!("aggregator stopped before the termination signal");
        }
        drop(outbox);

        run_token.cancel();
        if let Err(err) = metrics_handle.await {
            tracing::warn!(error = %err, "metrics reporter task panicked");
        }

        let summary = aggregator.await.context("aggregator task failed")?;
        let dispatched = dispatch_result.with_context(|| {
            format!(
                "batch stopped after {} of {} dispatched records were processed",
                summary.processed(),
                summary.dispatched()
            )
        })?;

        tracing::info!(
            dispatched,
            processed = summary.processed(),
            failed = summary.failures().len(),
            elapsed_ms = summary.elapsed().as_millis() as u64,
            "batch finished"
        );

        Ok(summary)
    }

    async fn dispatch_all(
        &self,
        source: &mut RecordSource<T>,
        permits: &Arc<Semaphore>,
        outbox: &AggregatorSender,
    ) -> Result<u64> {
        let mut position = 0u64;
        while let Some(record) = source
            .next_record()
            .await
            .with_context(|| format!("failed to read record at position {position}"))?
        {
            let permit = permits
                .clone()
                .acquire_owned()
                .await
                .context("permit pool closed while dispatching")?;

            outbox
                .send(AggregatorMessage::Dispatched)
                .await
                .map_err(|_| anyhow!("aggregator stopped while dispatching"))?;
            self.telemetry.record_dispatched();
            self.spawn_worker(position, record, permit, outbox.clone());
            position += 1;
        }
        Ok(position)
    }

    fn spawn_worker(
        &self,
        position: u64,
        record: T,
        permit: OwnedSemaphorePermit,
        outbox: AggregatorSender,
    ) {
        let handler = self.handler.clone();
        let telemetry = self.telemetry.clone();

        tokio::spawn(async move {
            let _permit = permit;
            tracing::trace!(position, "record handler started");

            let in_flight = telemetry.enter_worker();
            let result = AssertUnwindSafe(async move { handler.handle(record).await })
                .catch_unwind()
                .await;
            drop(in_flight);

            let outcome = match result {
                Ok(Ok(())) => Outcome::Success,
                Ok(Err(err)) => Outcome::Failure(RecordError::new(position, err)),
                Err(panic_payload) => {
                    let panic_msg = panic_message(panic_payload.as_ref());
                    tracing::error!(
                        position,
                        panic = %panic_msg,
                        "record handler panicked"
                    );
                    Outcome::Failure(RecordError::new(
                        position,
                        anyhow!("handler panicked: {panic_msg}"),
                    ))
                }
            };

            if outbox.send(AggregatorMessage::Outcome(outcome)).await.is_err() {
                tracing::warn!(position, "aggregator dropped before outcome was delivered");
            }
        });
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
