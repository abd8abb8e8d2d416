use anyhow::Error as AnyError;
use core::future::Future;
use core::pin::Pin;

pub type HandlerFuture = Pin<Box<dyn Future<Output = Result<(), AnyError>> + Send + 'static>>;

/// Failure reported by a handler for a single record. Never fatal to the batch.
#[derive(Debug)]
pub struct RecordError {
    position: u64,
    source: AnyError,
}

impl RecordError {
    pub fn new(position: u64, source: AnyError) -> Self {
        Self { position, source }
    }

    /// Zero-based position of the failed record in source order.
    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn into_source(self) -> AnyError {
        self.source
    }
}

impl core::fmt::Display for RecordError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.source, f)
    }
}

impl std::error::Error for RecordError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.source.as_ref())
    }
}

/// Work applied to every record of a batch.
///
/// Handlers run concurrently on the tokio runtime, up to the configured concurrency. Any
/// `Fn(T) -> impl Future<Output = anyhow::Result<()>>` closure is a handler.
pub trait RecordHandler<T>: Send + Sync + 'static {
    fn handle(&self, record: T) -> HandlerFuture;
}

impl<T, F, Fut> RecordHandler<T> for F
where
    F: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), AnyError>> + Send + 'static,
{
    fn handle(&self, record: T) -> HandlerFuture {
        Box::pin(self(record))
    }
}
