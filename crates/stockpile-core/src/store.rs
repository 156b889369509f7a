//! Store decorators.
//!
//! - [`LoggingStore`] wraps any [`RecordStore`] and logs each batch upsert
//!   with its size, duration, and outcome.
//! - [`NoopStore`] accepts and discards every batch; used for dry runs.

use std::marker::PhantomData;
use std::time::Instant;

use crate::AppError;
use crate::models::Record;
use crate::traits::RecordStore;

/// Store wrapper that logs every batch upsert through `tracing`.
#[derive(Debug, Clone)]
pub struct LoggingStore<S> {
    inner: S,
}

impl<S: RecordStore> LoggingStore<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }
}

impl<S: RecordStore> RecordStore for LoggingStore<S> {
    type Item = S::Item;

    async fn upsert_batch(&self, items: &[Self::Item]) -> Result<u64, AppError> {
        let start = Instant::now();
        let first_key = items.first().map(|item| item.key()).unwrap_or_default();
        let result = self.inner.upsert_batch(items).await;
        let elapsed_ms = start.elapsed().as_millis() as u64;

        match &result {
            Ok(rows) => {
                tracing::info!(
                    size = items.len(),
                    rows,
                    first_key,
                    elapsed_ms,
                    "Batch upserted"
                );
            }
            Err(e) => {
                tracing::error!(
                    size = items.len(),
                    first_key,
                    elapsed_ms,
                    error = %e,
                    "Batch upsert failed"
                );
            }
        }

        result
    }
}

/// Store that accepts every batch without persisting anything.
///
/// Reports each record as written, so summaries of a dry run match what a
/// real run would have sent.
#[derive(Debug)]
pub struct NoopStore<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> NoopStore<T> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for NoopStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

// Manual impl: `derive(Clone)` would require `T: Clone`.
impl<T> Clone for NoopStore<T> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<T: Record> RecordStore for NoopStore<T> {
    type Item = T;

    async fn upsert_batch(&self, items: &[T]) -> Result<u64, AppError> {
        tracing::debug!(size = items.len(), "Dry run: discarding batch");
        Ok(items.len() as u64)
    }
}
