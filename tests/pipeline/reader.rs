use std::sync::{Arc, Mutex};

use crate::support::helpers::init_tracing;
use anyhow::{bail, Result};
use bytes::Bytes;
use cbatch::{process, BatchConfig, HandlerFuture, MultiLines, RecordSource, Split};

fn collecting_handler(
    seen: Arc<Mutex<Vec<String>>>,
) -> impl Fn(Bytes) -> HandlerFuture + Send + Sync + 'static {
    move |record: Bytes| {
        let seen = seen.clone();
        let fut: HandlerFuture = Box::pin(async move {
            let text = String::from_utf8(record.to_vec())?;
            if text.contains("bad") {
                bail!("rejected {text:?}");
            }
            seen.lock().expect("lock poisoned").push(text);
            anyhow::Ok(())
        });
        fut
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn line_records_from_reader() -> Result<()> {
    init_tracing();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let input: &[u8] = b"alpha\r\nbeta\nbad gamma\ndelta";

    let config = BatchConfig::builder().concurrency(2).build()?;
    let summary = process(
        collecting_handler(seen.clone()),
        RecordSource::from_reader(input),
        config,
    )
    .await?;

    assert_eq!(summary.processed(), 4);
    assert_eq!(summary.failures().len(), 1);
    assert_eq!(summary.failures()[0].to_string(), "rejected \"bad gamma\"");

    let mut seen = seen.lock().expect("lock poisoned").clone();
    seen.sort();
    assert_eq!(seen, vec!["alpha", "beta", "delta"]);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn multi_line_records_from_reader() -> Result<()> {
    init_tracing();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let input: &[u8] = b"1\n2\n3\n4\n5\n6\n7\n";

    let config = BatchConfig::builder().concurrency(3).build()?;
    let summary = process(
        collecting_handler(seen.clone()),
        RecordSource::from_reader_with(input, MultiLines::new(3)),
        config,
    )
    .await?;

    assert_eq!(summary.processed(), 3);
    let mut seen = seen.lock().expect("lock poisoned").clone();
    seen.sort();
    assert_eq!(seen, vec!["1\n2\n3", "4\n5\n6", "7\n"]);
    Ok(())
}

#[tokio::test]
async fn custom_policy_closure_from_reader() -> Result<()> {
    init_tracing();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let input: &[u8] = b"a,b,,c";

    let comma_split = |data: &[u8], at_eof: bool| -> Split {
        match data.iter().position(|&byte| byte == b',') {
            Some(0) => Split::Skip { advance: 1 },
            Some(index) => Split::Record {
                advance: index + 1,
                record: Bytes::copy_from_slice(&data[..index]),
            },
            None if at_eof && !data.is_empty() => Split::Record {
                advance: data.len(),
                record: Bytes::copy_from_slice(data),
            },
            None => Split::NeedMore,
        }
    };

    let summary = process(
        collecting_handler(seen.clone()),
        RecordSource::from_reader_with(input, comma_split),
        BatchConfig::default(),
    )
    .await?;

    assert_eq!(summary.processed(), 3);
    assert_eq!(*seen.lock().expect("lock poisoned"), vec!["a", "b", "c"]);
    Ok(())
}
