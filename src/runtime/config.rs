use crate::runtime::telemetry;
use anyhow::Result;
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;
use tokio::sync::Semaphore;

const DEFAULT_CONCURRENCY: usize = 1;

/// Largest permit pool the dispatcher can drain in a single acquisition.
pub const MAX_CONCURRENCY: usize = if (u32::MAX as usize) < Semaphore::MAX_PERMITS {
    u32::MAX as usize
} else {
    Semaphore::MAX_PERMITS
};

/// Rejected configuration value. Detected before any record is dispatched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    field: &'static str,
    reason: String,
}

impl ConfigError {
    pub fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }

    pub fn field(&self) -> &'static str {
        self.field
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.field, self.reason)
    }
}

impl std::error::Error for ConfigError {}

/// Run options for a single batch.
///
/// All instances must be constructed via [`BatchConfig::builder`] or [`BatchConfig::new`]
/// so invariants are validated before the dispatcher observes the values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchConfig {
    title: Option<String>,
    headers: BTreeMap<String, String>,
    concurrency: usize,
    progress: bool,
    report: bool,
    metrics_interval: Duration,
}

pub struct BatchConfigParams {
    pub title: Option<String>,
    pub headers: BTreeMap<String, String>,
    pub concurrency: usize,
    pub progress: bool,
    pub report: bool,
    pub metrics_interval: Duration,
}

impl BatchConfig {
    /// Returns a builder to incrementally construct and validate a configuration.
    pub fn builder() -> BatchConfigBuilder {
        BatchConfigBuilder::default()
    }

    /// Constructs a configuration directly from the provided values.
    pub fn new(params: BatchConfigParams) -> Result<Self> {
        let BatchConfigParams {
            title,
            headers,
            concurrency,
            progress,
            report,
            metrics_interval,
        } = params;

        let config = Self {
            title: title.and_then(trimmed_title),
            headers: headers
                .into_iter()
                .map(|(key, value)| (key.trim().to_owned(), value))
                .collect(),
            concurrency,
            progress,
            report,
            metrics_interval,
        };

        config.validate()?;
        Ok(config)
    }

    /// Title printed above the report, if any.
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// Caller supplied report headers, ordered by key.
    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    /// Maximum number of handlers running at the same time.
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Whether a live progress bar is drawn while the batch runs.
    pub fn progress(&self) -> bool {
        self.progress
    }

    /// Whether the summary report is printed once the batch finishes.
    pub fn report(&self) -> bool {
        self.report
    }

    /// Interval used by the telemetry reporter.
    pub fn metrics_interval(&self) -> Duration {
        self.metrics_interval
    }

    /// Performs validation on an existing configuration instance.
    pub fn validate(&self) -> Result<()> {
        if self.concurrency == 0 {
            return Err(ConfigError::new("concurrency", "must be greater than 0").into());
        }

        if self.concurrency > MAX_CONCURRENCY {
            return Err(ConfigError::new(
                "concurrency",
                format!("must not exceed {MAX_CONCURRENCY}"),
            )
            .into());
        }

        if self.metrics_interval.is_zero() {
            return Err(ConfigError::new("metrics_interval", "must be greater than 0").into());
        }

        if self.headers.keys().any(|key| key.is_empty()) {
            return Err(ConfigError::new("headers", "keys cannot be empty").into());
        }

        Ok(())
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            title: None,
            headers: BTreeMap::new(),
            concurrency: DEFAULT_CONCURRENCY,
            progress: false,
            report: false,
            metrics_interval: telemetry::DEFAULT_METRICS_INTERVAL,
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct BatchConfigBuilder {
    title: Option<String>,
    headers: BTreeMap<String, String>,
    concurrency: Option<usize>,
    progress: Option<bool>,
    report: Option<bool>,
    metrics_interval: Option<Duration>,
}

impl BatchConfigBuilder {
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Adds a report header. Repeating a key replaces the earlier value.
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = Some(concurrency);
        self
    }

    pub fn progress(mut self, enabled: bool) -> Self {
        self.progress = Some(enabled);
        self
    }

    pub fn report(mut self, enabled: bool) -> Self {
        self.report = Some(enabled);
        self
    }

    pub fn metrics_interval(mut self, interval: Duration) -> Self {
        self.metrics_interval = Some(interval);
        self
    }

    pub fn build(self) -> Result<BatchConfig> {
        let params = BatchConfigParams {
            title: self.title,
            headers: self.headers,
            concurrency: self.concurrency.unwrap_or(DEFAULT_CONCURRENCY),
            progress: self.progress.unwrap_or(false),
            report: self.report.unwrap_or(false),
            metrics_interval: self
                .metrics_interval
                .unwrap_or(telemetry::DEFAULT_METRICS_INTERVAL),
        };

        BatchConfig::new(params)
    }
}

fn trimmed_title(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_owned())
    }
}
