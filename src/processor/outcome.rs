use crate::runtime::handler::RecordError;
use tokio::sync::mpsc;

const MIN_CHANNEL_CAPACITY: usize = 16;

/// Result of handling one record.
#[derive(Debug)]
pub enum Outcome {
    Success,
    Failure(RecordError),
}

impl Outcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Failure(_))
    }
}

/// Messages consumed by the aggregator, in delivery order.
#[derive(Debug)]
pub enum AggregatorMessage {
    /// A record was pulled from the source and handed to a worker.
    Dispatched,
    Outcome(Outcome),
    /// Every dispatched worker has delivered its outcome.
    Terminate,
}

pub type AggregatorSender = mpsc::Sender<AggregatorMessage>;
pub type AggregatorReceiver = mpsc::Receiver<AggregatorMessage>;

pub fn aggregator_channel(concurrency: usize) -> (AggregatorSender, AggregatorReceiver) {
    mpsc::channel(concurrency.saturating_mul(2).max(MIN_CHANNEL_CAPACITY))
}
