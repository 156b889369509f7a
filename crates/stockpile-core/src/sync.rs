//! Run statistics and the shared first-error slot.
//!
//! These are the pieces of state the cursor walker and the upsert workers
//! share during a run. Both are lock-light: counters are atomics, and the
//! error slot is only locked on the (rare) failure path.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use tokio_util::sync::CancellationToken;

use crate::error::AppError;

/// Summary of a successful sync run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SyncSummary {
    /// Pages fetched from the provider.
    pub pages: usize,
    /// Records returned across all pages.
    pub items_fetched: usize,
    /// Batches written by the workers.
    pub batches_upserted: usize,
    /// Records written by the workers.
    pub items_upserted: usize,
    /// True if pagination ended because the provider repeated a cursor.
    pub cursor_repeated: bool,
}

/// Thread-safe counters shared by the walker and the workers.
#[derive(Debug, Default)]
pub struct AtomicSyncStats {
    pages: AtomicUsize,
    items_fetched: AtomicUsize,
    batches_upserted: AtomicUsize,
    items_upserted: AtomicUsize,
    cursor_repeated: AtomicBool,
}

impl AtomicSyncStats {
    /// Creates a new zeroed stats tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one fetched page of `items` records.
    pub fn record_page(&self, items: usize) {
        self.pages.fetch_add(1, Ordering::Relaxed);
        self.items_fetched.fetch_add(items, Ordering::Relaxed);
    }

    /// Records one upserted batch of `items` records.
    pub fn record_batch(&self, items: usize) {
        self.batches_upserted.fetch_add(1, Ordering::Relaxed);
        self.items_upserted.fetch_add(items, Ordering::Relaxed);
    }

    /// Marks that pagination stopped on a repeated cursor.
    pub fn mark_cursor_repeated(&self) {
        self.cursor_repeated.store(true, Ordering::Relaxed);
    }

    /// Takes a point-in-time snapshot.
    pub fn to_summary(&self) -> SyncSummary {
        SyncSummary {
            pages: self.pages.load(Ordering::Relaxed),
            items_fetched: self.items_fetched.load(Ordering::Relaxed),
            batches_upserted: self.batches_upserted.load(Ordering::Relaxed),
            items_upserted: self.items_upserted.load(Ordering::Relaxed),
            cursor_repeated: self.cursor_repeated.load(Ordering::Relaxed),
        }
    }
}

/// Single-assignment error slot coupled to the run's cancellation token.
///
/// The first call to [`FirstError::record`] stores its error and cancels the
/// token; later calls are discarded. The token is never reset.
#[derive(Debug)]
pub struct FirstError {
    slot: Mutex<Option<AppError>>,
    token: CancellationToken,
}

impl FirstError {
    /// Creates an empty slot that cancels `token` when an error is recorded.
    pub fn new(token: CancellationToken) -> Self {
        Self {
            slot: Mutex::new(None),
            token,
        }
    }

    /// Records `err` if no error has been recorded yet, then cancels the run.
    ///
    /// Returns true if this call won the slot.
    pub fn record(&self, err: AppError) -> bool {
        let won = match self.slot.lock() {
            Ok(mut slot) if slot.is_none() => {
                *slot = Some(err);
                true
            }
            Ok(_) => {
                tracing::debug!(error = %err, "Discarding error after first failure");
                false
            }
            Err(poisoned) => {
                // A panic while holding the lock cannot leave a partial write.
                let mut slot = poisoned.into_inner();
                let won = slot.is_none();
                if won {
                    *slot = Some(err);
                }
                won
            }
        };
        self.token.cancel();
        won
    }

    /// Takes the recorded error, if any.
    pub fn take(&self) -> Option<AppError> {
        match self.slot.lock() {
            Ok(mut slot) => slot.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        }
    }
}
