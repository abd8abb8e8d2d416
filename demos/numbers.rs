//! Reads integers from stdin, one record per line (or per group of lines), and reports which
//! records failed to parse.
//!
//! ```text
//! seq 1 1000 | CBATCH_CONCURRENCY=8 cargo run --example numbers
//! ```

use std::env;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{ensure, Context, Result};
use bytes::Bytes;
use cbatch::{BatchConfig, MultiLines, RecordSource, Runner};
use tokio::time::sleep;

const DEFAULT_CONCURRENCY: usize = 4;
const DEFAULT_LINES_PER_RECORD: i64 = 1;
const DEFAULT_DELAY_MS: u64 = 0;
const DEFAULT_LOG_DIRECTIVE: &str = "warn";

#[tokio::main]
async fn main() -> Result<()> {
    init_example_tracing();

    let args = ExampleArgs::from_env()?;
    let config = BatchConfig::builder()
        .title("Number Parsing")
        .header("Input", "stdin")
        .header("Lines per record", args.lines_per_record.to_string())
        .concurrency(args.concurrency)
        .progress(true)
        .report(true)
        .build()?;

    let source = if args.lines_per_record == 1 {
        RecordSource::from_reader(tokio::io::stdin())
    } else {
        RecordSource::from_reader_with(tokio::io::stdin(), MultiLines::new(args.lines_per_record))
    };

    let delay = args.delay;
    let handler = move |record: Bytes| async move {
        if !delay.is_zero() {
            sleep(delay).await;
        }
        parse_record(&record).map(|_| ())
    };

    let summary = Runner::new(config, handler).run(source).await?;
    ensure!(
        summary.failures().is_empty(),
        "{} of {} records could not be parsed",
        summary.failures().len(),
        summary.processed()
    );
    Ok(())
}

fn parse_record(record: &[u8]) -> Result<i64> {
    let text = std::str::from_utf8(record).context("record is not valid UTF-8")?;
    let mut total = 0i64;
    for line in text.lines().map(str::trim).filter(|line| !line.is_empty()) {
        let value = i64::from_str(line).with_context(|| format!("failed to parse {line:?}"))?;
        total = total
            .checked_add(value)
            .with_context(|| format!("sum overflowed at {line:?}"))?;
    }
    Ok(total)
}

fn init_example_tracing() {
    if env::var_os("RUST_LOG").is_none() {
        env::set_var("RUST_LOG", DEFAULT_LOG_DIRECTIVE);
    }
    cbatch::init_tracing();
}

struct ExampleArgs {
    concurrency: usize,
    lines_per_record: i64,
    delay: Duration,
}

impl ExampleArgs {
    fn from_env() -> Result<Self> {
        Ok(Self {
            concurrency: env_or("CBATCH_CONCURRENCY", DEFAULT_CONCURRENCY)?,
            lines_per_record: env_or("CBATCH_LINES_PER_RECORD", DEFAULT_LINES_PER_RECORD)?,
            delay: Duration::from_millis(env_or("CBATCH_DELAY_MS", DEFAULT_DELAY_MS)?),
        })
    }
}

fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .with_context(|| format!("invalid value for {key}: {value}")),
        Err(_) => Ok(default),
    }
}
