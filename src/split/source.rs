use super::policy::{Lines, SplitPolicy};
use super::reader::RecordReader;
use anyhow::Result;
use bytes::Bytes;
use futures::stream::{BoxStream, Stream, StreamExt};
use tokio::io::AsyncRead;

/// Ordered supply of records consumed by the dispatcher.
pub struct RecordSource<T> {
    kind: SourceKind<T>,
}

enum SourceKind<T> {
    Items(std::vec::IntoIter<T>),
    Stream(BoxStream<'static, Result<T>>),
}

impl<T: Send + 'static> RecordSource<T> {
    /// Pre-materialized records, dispatched in iteration order.
    pub fn from_items(items: impl IntoIterator<Item = T>) -> Self {
        let items: Vec<T> = items.into_iter().collect();
        Self {
            kind: SourceKind::Items(items.into_iter()),
        }
    }

    /// Lazily produced records. An `Err` item stops dispatching.
    pub fn from_stream<S>(stream: S) -> Self
    where
        S: Stream<Item = Result<T>> + Send + 'static,
    {
        Self {
            kind: SourceKind::Stream(stream.boxed()),
        }
    }

    /// Number of records still to come, when the source knows it up front.
    pub fn len_hint(&self) -> Option<usize> {
        match &self.kind {
            SourceKind::Items(items) => Some(items.len()),
            SourceKind::Stream(_) => None,
        }
    }

    pub async fn next_record(&mut self) -> Result<Option<T>> {
        match &mut self.kind {
            SourceKind::Items(items) => Ok(items.next()),
            SourceKind::Stream(stream) => stream.next().await.transpose(),
        }
    }
}

impl RecordSource<Bytes> {
    /// Byte-stream source split into lines.
    pub fn from_reader<R>(reader: R) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        Self::from_reader_with(reader, Lines)
    }

    /// Byte-stream source split by the given policy.
    pub fn from_reader_with<R>(reader: R, policy: impl SplitPolicy) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        Self::from_stream(RecordReader::new(reader, policy).into_stream())
    }
}

impl<T: Send + 'static> From<Vec<T>> for RecordSource<T> {
    fn from(items: Vec<T>) -> Self {
        Self::from_items(items)
    }
}
