use super::policy::{Split, SplitPolicy};
use anyhow::{bail, Context, Result};
use bytes::{Buf, Bytes, BytesMut};
use futures::stream::{self, Stream};
use tokio::io::{AsyncRead, AsyncReadExt};

/// Number of bytes requested from the underlying reader per read call.
pub const DEFAULT_READ_CHUNK: usize = 8 * 1024;

/// Largest record the reader buffers before giving up on the split policy.
pub const DEFAULT_MAX_RECORD_BYTES: usize = 64 * 1024 * 1024;

/// Buffered async reader that applies a [`SplitPolicy`] to produce records.
pub struct RecordReader<R> {
    reader: R,
    policy: Box<dyn SplitPolicy>,
    buffer: BytesMut,
    at_eof: bool,
    finished: bool,
    read_chunk: usize,
    max_record_bytes: usize,
}

impl<R> RecordReader<R>
where
    R: AsyncRead + Unpin,
{
    pub fn new(reader: R, policy: impl SplitPolicy) -> Self {
        Self {
            reader,
            policy: Box::new(policy),
            buffer: BytesMut::with_capacity(DEFAULT_READ_CHUNK),
            at_eof: false,
            finished: false,
            read_chunk: DEFAULT_READ_CHUNK,
            max_record_bytes: DEFAULT_MAX_RECORD_BYTES,
        }
    }

    pub fn with_read_chunk(mut self, bytes: usize) -> Self {
        self.read_chunk = bytes.max(1);
        self
    }

    pub fn with_max_record_bytes(mut self, bytes: usize) -> Self {
        self.max_record_bytes = bytes.max(1);
        self
    }

    /// Returns the next record, or `None` once the input is exhausted.
    pub async fn next_record(&mut self) -> Result<Option<Bytes>> {
        if self.finished {
            return Ok(None);
        }

        loop {
            if !self.buffer.is_empty() || self.at_eof {
                match self.policy.split(&self.buffer, self.at_eof) {
                    Split::Record { advance, record } => {
                        self.consume(advance)?;
                        return Ok(Some(record));
                    }
                    Split::Skip { advance } => {
                        self.consume(advance)?;
                        continue;
                    }
                    Split::NeedMore if self.at_eof => {
                        if !self.buffer.is_empty() {
                            tracing::warn!(
                                discarded_bytes = self.buffer.len(),
                                "split policy left unconsumed input at end of stream"
                            );
                            self.buffer.clear();
                        }
                        self.finished = true;
                        return Ok(None);
                    }
                    Split::NeedMore => {}
                }
            }

            if self.buffer.len() >= self.max_record_bytes {
                bail!(
                    "record exceeds {} buffered bytes without a split boundary",
                    self.max_record_bytes
                );
            }

            self.fill().await?;
        }
    }

    /// Converts the reader into a stream of records.
    pub fn into_stream(self) -> impl Stream<Item = Result<Bytes>>
    where
        R: Send,
    {
        stream::try_unfold(self, |mut reader| async move {
            let record = reader.next_record().await?;
            Ok::<_, anyhow::Error>(record.map(|record| (record, reader)))
        })
    }

    fn consume(&mut self, advance: usize) -> Result<()> {
        if advance == 0 {
            bail!("split policy returned without consuming any input");
        }
        if advance > self.buffer.len() {
            bail!(
                "split policy advanced {advance} bytes past the {} buffered bytes",
                self.buffer.len()
            );
        }
        self.buffer.advance(advance);
        Ok(())
    }

    async fn fill(&mut self) -> Result<()> {
        self.buffer.reserve(self.read_chunk);
        let read = (&mut self.reader)
            .take(self.read_chunk as u64)
            .read_buf(&mut self.buffer)
            .await
            .context("failed to read from record source")?;
        if read == 0 {
            self.at_eof = true;
        }
        Ok(())
    }
}
