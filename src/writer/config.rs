//! Writer configuration
//!
//! All four settings are required. There is no unbounded-queue mode and no
//! implicit flush-failure policy: a caller has to decide what happens to a
//! batch the sink refused.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Longest accepted `flush_interval` and retry `backoff`.
pub const MAX_FLUSH_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

/// What the consumer does when a batch cannot be written or synced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Report the failure, count the batch as lost, keep serving.
    ///
    /// Records of the failed batch that the sink had already accepted can
    /// still become durable with a later sync.
    Continue,
    /// Report the failure, refuse further pushes, count the batch and
    /// everything still queued as lost, stop.
    Abort,
    /// Retry a failed write up to `max_attempts` flush attempts in total,
    /// sleeping `backoff` in between; then behave as `Abort`.
    ///
    /// A retry resumes at the first record the sink did not accept, so each
    /// record is written once. A failed sync is not retried: the flush
    /// behaves as `Abort` at once.
    Retry {
        max_attempts: u32,
        #[serde(rename = "backoff_ms", with = "duration_ms")]
        backoff: Duration,
    },
}

impl FailurePolicy {
    pub fn retry(max_attempts: u32, backoff: Duration) -> Self {
        FailurePolicy::Retry {
            max_attempts,
            backoff,
        }
    }

    /// Total flush attempts this policy allows per batch.
    pub fn max_attempts(&self) -> u32 {
        match self {
            FailurePolicy::Retry { max_attempts, .. } => *max_attempts,
            FailurePolicy::Continue | FailurePolicy::Abort => 1,
        }
    }

    /// Whether an exhausted failure stops the consumer.
    pub fn stops_on_failure(&self) -> bool {
        !matches!(self, FailurePolicy::Continue)
    }
}

/// Batched writer configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WriterConfig {
    /// Bounded queue size (N)
    pub queue_capacity: usize,
    /// Records per batch before a size-triggered flush (M)
    pub max_batch_size: usize,
    /// Timer flush period (T)
    #[serde(rename = "flush_interval_ms", with = "duration_ms")]
    pub flush_interval: Duration,
    /// Sink failure handling
    pub on_flush_failure: FailurePolicy,
}

impl WriterConfig {
    pub fn new(
        queue_capacity: usize,
        max_batch_size: usize,
        flush_interval: Duration,
        on_flush_failure: FailurePolicy,
    ) -> Self {
        Self {
            queue_capacity,
            max_batch_size,
            flush_interval,
            on_flush_failure,
        }
    }

    /// Rejects zero sizes, a zero interval, a retry policy without attempts
    /// and durations above `MAX_FLUSH_INTERVAL`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.queue_capacity == 0 {
            return Err(ConfigError::ZeroQueueCapacity);
        }
        if self.max_batch_size == 0 {
            return Err(ConfigError::ZeroBatchSize);
        }
        if self.flush_interval.is_zero() {
            return Err(ConfigError::ZeroFlushInterval);
        }
        if self.flush_interval > MAX_FLUSH_INTERVAL {
            return Err(ConfigError::FlushIntervalTooLong(self.flush_interval));
        }
        if let FailurePolicy::Retry {
            max_attempts,
            backoff,
        } = self.on_flush_failure
        {
            if max_attempts == 0 {
                return Err(ConfigError::ZeroRetryAttempts);
            }
            if backoff > MAX_FLUSH_INTERVAL {
                return Err(ConfigError::BackoffTooLong(backoff));
            }
        }
        Ok(())
    }

    /// Loads and validates a JSON configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content)
    }

    /// Parses and validates a JSON configuration.
    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        let config: WriterConfig = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_pretty(&self) -> String {
        // Plain integers and strings only; serialization cannot fail.
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}

/// Invalid or unreadable configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("queue_capacity must be > 0")]
    ZeroQueueCapacity,

    #[error("max_batch_size must be > 0")]
    ZeroBatchSize,

    #[error("flush_interval must be > 0")]
    ZeroFlushInterval,

    #[error("flush_interval of {}ms exceeds the {}ms limit", .0.as_millis(), MAX_FLUSH_INTERVAL.as_millis())]
    FlushIntervalTooLong(Duration),

    #[error("retry policy requires max_attempts >= 1")]
    ZeroRetryAttempts,

    #[error("retry backoff of {}ms exceeds the {}ms limit", .0.as_millis(), MAX_FLUSH_INTERVAL.as_millis())]
    BackoffTooLong(Duration),

    #[error("failed to read config {}: {source}", .path.display())]
    Read { path: PathBuf, source: io::Error },

    #[error("invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
