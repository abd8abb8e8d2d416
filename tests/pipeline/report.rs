use crate::support::helpers::{init_tracing, SharedBuffer};
use anyhow::{anyhow, Result};
use cbatch::{BatchConfig, RecordSource, Runner};

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn report_lists_headers_failures_and_results() -> Result<()> {
    init_tracing();
    let config = BatchConfig::builder()
        .title("Nightly Import")
        .header("Source", "fixtures")
        .header("Executed", "2024-01-01")
        .concurrency(2)
        .report(true)
        .build()?;
    let report = SharedBuffer::default();

    let handler = |record: &'static str| async move {
        if record.starts_with('x') {
            return Err(anyhow!("cannot import {record}"));
        }
        Ok(())
    };

    let summary = Runner::new(config, handler)
        .with_report_sink(report.clone())
        .run(RecordSource::from_items(["a", "xb", "c"]))
        .await?;

    let text = report.contents();
    assert_eq!(text, summary.to_string());

    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(&lines[..3], ["  --------------", "  Nightly Import", "  --------------"]);
    assert_eq!(
        &lines[3..6],
        [" Concurrency: 2", "    Executed: 2024-01-01", "      Source: fixtures"]
    );
    assert_eq!(lines[6], "");
    assert_eq!(&lines[7..10], ["  --------", "   Errors", "  --------"]);
    assert_eq!(lines[10], "cannot import xb");
    assert_eq!(lines[11], "");
    assert_eq!(&lines[12..15], ["  --------", "  Results", "  --------"]);
    assert!(lines[15].starts_with("  Finished: "));
    assert_eq!(lines[16], " Processed: 3");
    assert_eq!(lines[17], "    Failed: 1");
    assert!(lines[18].starts_with("   Elapsed: ") && lines[18].ends_with("ms"));
    assert!(lines[19].starts_with("   Average: ") && lines[19].ends_with("ms"));
    assert_eq!(lines.len(), 20);
    Ok(())
}

#[tokio::test]
async fn progress_and_report_go_to_separate_sinks() -> Result<()> {
    init_tracing();
    let config = BatchConfig::builder()
        .concurrency(1)
        .progress(true)
        .report(true)
        .build()?;
    let progress = SharedBuffer::default();
    let report = SharedBuffer::default();

    Runner::new(config, |_: u32| async move { anyhow::Ok(()) })
        .with_progress_sink(progress.clone())
        .with_report_sink(report.clone())
        .run(RecordSource::from_items(0..4u32))
        .await?;

    let progress = progress.contents();
    assert!(progress.contains(" 25%        1/4"), "progress: {progress:?}");
    assert!(progress.ends_with("100%        4/4\n"), "progress: {progress:?}");
    assert!(!progress.contains("Results"));

    let report = report.contents();
    assert!(report.contains(" Processed: 4\n"), "report: {report}");
    assert!(!report.contains('\r'));
    Ok(())
}
