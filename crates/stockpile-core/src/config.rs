//! Configuration types for Stockpile components.
//!
//! Defaults live here; the CLI layers environment variables and flags on top
//! (see `stockpile-cli`).

use std::time::Duration;

use crate::error::AppError;

/// Database connection pool configuration.
#[derive(Debug, Clone)]
pub struct DbConfig {
    pub max_connections: u32,
    /// Upper bound for a single statement (one batch upsert).
    pub statement_timeout: Duration,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            max_connections: 5,
            statement_timeout: Duration::from_secs(5),
        }
    }
}

/// HTTP client configuration for the ratings API.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub timeout: Duration,
    pub max_retries: u32,
    pub retry_base_delay: Duration,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            max_retries: 3,
            retry_base_delay: Duration::from_millis(500),
        }
    }
}

/// Sync engine configuration.
///
/// `workers` and `batch_size` are the two knobs of a run; `channel_capacity`
/// bounds how many batches may wait between the cursor walker and the
/// worker pool before the walker is suspended.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Number of concurrent upsert workers.
    pub workers: usize,
    /// Maximum number of items per upserted batch.
    pub batch_size: usize,
    /// Capacity of the batch channel.
    pub channel_capacity: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            workers: 5,
            batch_size: 100,
            channel_capacity: 5,
        }
    }
}

impl SyncConfig {
    /// Largest accepted worker count.
    pub const MAX_WORKERS: usize = 1024;

    /// Largest accepted channel capacity; the channel allocates every slot up front.
    pub const MAX_CHANNEL_CAPACITY: usize = 10_000;

    /// Creates a new SyncConfig with a custom worker count.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Creates a new SyncConfig with a custom batch size.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Creates a new SyncConfig with a custom channel capacity.
    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity;
        self
    }

    /// Checks that every knob is usable.
    ///
    /// Values are never clamped: a run asked to use zero workers, or more
    /// than [`MAX_WORKERS`](Self::MAX_WORKERS), is rejected before it fetches
    /// anything. `batch_size` has no upper bound.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::ConfigError`] naming the first invalid field.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.workers == 0 {
            return Err(AppError::ConfigError(
                "workers must be greater than 0".to_string(),
            ));
        }
        if self.workers > Self::MAX_WORKERS {
            return Err(AppError::ConfigError(format!(
                "workers must be at most {}",
                Self::MAX_WORKERS
            )));
        }
        if self.batch_size == 0 {
            return Err(AppError::ConfigError(
                "batch_size must be greater than 0".to_string(),
            ));
        }
        if self.channel_capacity == 0 {
            return Err(AppError::ConfigError(
                "channel_capacity must be greater than 0".to_string(),
            ));
        }
        if self.channel_capacity > Self::MAX_CHANNEL_CAPACITY {
            return Err(AppError::ConfigError(format!(
                "channel_capacity must be at most {}",
                Self::MAX_CHANNEL_CAPACITY
            )));
        }
        Ok(())
    }
}
