pub mod processor;
pub mod report;
pub mod runtime;
pub mod split;

pub use processor::dispatcher::Dispatcher;
pub use processor::outcome::{AggregatorMessage, Outcome};
pub use processor::summary::BatchSummary;
pub use runtime::config::{
    BatchConfig, BatchConfigBuilder, BatchConfigParams, ConfigError, MAX_CONCURRENCY,
};
pub use runtime::handler::{HandlerFuture, RecordError, RecordHandler};
pub use runtime::progress::{DiagnosticSink, ProgressBar, ProgressState};
pub use runtime::runner::{process, Runner};
pub use runtime::telemetry::{init_tracing, Telemetry, TelemetrySnapshot};
pub use split::policy::{Lines, MultiLines, Split, SplitPolicy};
pub use split::reader::RecordReader;
pub use split::source::RecordSource;
