use std::time::Duration;

use crate::support::helpers::{init_tracing, ActivityProbe};
use anyhow::{anyhow, Result};
use cbatch::{process, BatchConfig, ConfigError, Dispatcher, RecordSource, Runner};
use futures::stream;
use tokio::time::timeout;

fn config(concurrency: usize) -> Result<BatchConfig> {
    BatchConfig::builder()
        .title("Some Batch Job")
        .concurrency(concurrency)
        .build()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn failing_record_is_reported_without_stopping_batch() -> Result<()> {
    init_tracing();
    let handler = |record: &'static str| async move {
        if record == "two" {
            return Err(anyhow!("failed to process {record}"));
        }
        Ok(())
    };

    let summary = process(
        handler,
        RecordSource::from_items(["one", "two", "three", "four", "five", "six"]),
        config(2)?,
    )
    .await?;

    assert_eq!(summary.processed(), 6);
    assert_eq!(summary.succeeded(), 5);
    assert_eq!(summary.failures().len(), 1);
    assert_eq!(summary.failures()[0].to_string(), "failed to process two");
    assert_eq!(summary.failures()[0].position(), 1);
    assert!(summary.finished_at().is_some());
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn empty_batch_finishes_immediately() -> Result<()> {
    init_tracing();
    let probe = ActivityProbe::default();
    let handler = {
        let probe = probe.clone();
        move |_: u32| {
            let probe = probe.clone();
            async move { probe.run(Duration::ZERO, false).await }
        }
    };

    let summary = timeout(
        Duration::from_secs(2),
        process(handler, RecordSource::from_items(Vec::new()), config(5)?),
    )
    .await??;

    assert_eq!(summary.processed(), 0);
    assert!(summary.failures().is_empty());
    assert_eq!(probe.calls(), 0);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn active_handlers_never_exceed_concurrency() -> Result<()> {
    init_tracing();
    for (concurrency, records) in [(1, 8u32), (3, 20), (8, 40), (64, 16)] {
        let probe = ActivityProbe::default();
        let handler = {
            let probe = probe.clone();
            move |_: u32| {
                let probe = probe.clone();
                async move { probe.run(Duration::from_millis(3), false).await }
            }
        };

        let summary = process(handler, RecordSource::from_items(0..records), config(concurrency)?)
            .await?;

        assert_eq!(summary.processed(), u64::from(records));
        assert_eq!(probe.calls(), records as usize);
        assert_eq!(probe.active(), 0, "handlers still active after return");
        assert!(
            probe.peak() <= concurrency,
            "peak {} exceeded concurrency {concurrency}",
            probe.peak()
        );
    }
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn failure_count_matches_failing_records() -> Result<()> {
    init_tracing();
    let probe = ActivityProbe::default();
    let handler = {
        let probe = probe.clone();
        move |value: u32| {
            let probe = probe.clone();
            async move { probe.run(Duration::from_millis(1), value % 3 == 0).await }
        }
    };

    let summary = process(handler, RecordSource::from_items(0..30u32), config(4)?).await?;

    assert_eq!(summary.processed(), 30);
    assert_eq!(summary.failures().len(), 10);
    let mut positions: Vec<u64> = summary.failures().iter().map(|f| f.position()).collect();
    positions.sort_unstable();
    assert_eq!(positions, (0..30).step_by(3).collect::<Vec<u64>>());
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn streamed_source_is_fully_processed() -> Result<()> {
    init_tracing();
    let records = stream::iter((0..25u64).map(anyhow::Ok));
    let dispatcher = Dispatcher::new(config(3)?, |_: u64| async move { anyhow::Ok(()) });
    let telemetry = dispatcher.telemetry();

    let summary = dispatcher
        .dispatch(RecordSource::from_stream(records), None)
        .await?;

    assert_eq!(summary.processed(), 25);
    assert_eq!(summary.dispatched(), 25);
    let snapshot = telemetry.snapshot();
    assert_eq!(snapshot.dispatched, 25);
    assert_eq!(snapshot.completed, 25);
    assert_eq!(snapshot.in_flight, 0);
    Ok(())
}

#[tokio::test]
async fn zero_concurrency_is_rejected_before_dispatch() {
    init_tracing();
    let err = BatchConfig::builder()
        .concurrency(0)
        .build()
        .expect_err("zero concurrency must be rejected");
    let config_error = err
        .downcast_ref::<ConfigError>()
        .expect("error should be a ConfigError");
    assert_eq!(config_error.field(), "concurrency");
}

#[tokio::test]
async fn runner_exposes_config_and_telemetry() -> Result<()> {
    init_tracing();
    let runner = Runner::new(config(2)?, |_: u8| async move { anyhow::Ok(()) });
    assert_eq!(runner.config().concurrency(), 2);
    let telemetry = runner.telemetry();

    runner.run(RecordSource::from_items([1u8, 2, 3])).await?;
    assert_eq!(telemetry.snapshot().completed, 3);
    Ok(())
}
