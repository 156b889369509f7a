//! Progress reporting for sync runs.
//!
//! The engine emits [`SyncEvent`]s through a [`ProgressReporter`] so that
//! frontends decide how (or whether) to surface them. The CLI uses
//! [`TracingReporter`]; library callers and tests default to [`SilentReporter`].

use tracing::{debug, info, warn};

use crate::sync::SyncSummary;

// =============================================================================
// Sync Events
// =============================================================================

/// Events emitted during a sync run.
#[derive(Debug, Clone)]
pub enum SyncEvent<'a> {
    /// The run passed validation and its workers are starting.
    Started {
        workers: usize,
        batch_size: usize,
        channel_capacity: usize,
    },
    /// A page was fetched from the provider.
    PageFetched {
        /// 1-based page number within this run.
        page: usize,
        items: usize,
        next_cursor: Option<&'a str>,
    },
    /// A batch was handed to the worker pool.
    BatchQueued { batch: usize, size: usize },
    /// The provider returned a cursor already visited in this run.
    CursorRepeated { cursor: &'a str },
    /// The run finished successfully.
    Completed { summary: &'a SyncSummary },
    /// The run stopped on its first error.
    Failed { error: &'a str },
    /// The run stopped because the caller cancelled it.
    Cancelled { items_upserted: usize },
}

// =============================================================================
// Reporter Trait
// =============================================================================

/// Trait for reporting sync progress.
pub trait ProgressReporter: Send + Sync {
    /// Called when a sync event occurs.
    ///
    /// The default implementation does nothing (silent mode).
    fn report(&self, event: SyncEvent<'_>) {
        let _ = event;
    }
}

/// Silent reporter that ignores all events.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {}

/// Tracing-based reporter for CLI logging.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl ProgressReporter for TracingReporter {
    fn report(&self, event: SyncEvent<'_>) {
        match event {
            SyncEvent::Started {
                workers,
                batch_size,
                channel_capacity,
            } => {
                info!(workers, batch_size, channel_capacity, "Sync started");
            }
            SyncEvent::PageFetched {
                page,
                items,
                next_cursor,
            } => {
                info!(page, items, next_cursor, "Fetched page");
            }
            SyncEvent::BatchQueued { batch, size } => {
                // Debug level to avoid spam
                debug!(batch, size, "Batch queued");
            }
            SyncEvent::CursorRepeated { cursor } => {
                warn!(cursor, "Cursor already visited, ending pagination");
            }
            SyncEvent::Completed { summary } => {
                info!(
                    pages = summary.pages,
                    items_fetched = summary.items_fetched,
                    batches = summary.batches_upserted,
                    items_upserted = summary.items_upserted,
                    cursor_repeated = summary.cursor_repeated,
                    "Sync completed"
                );
            }
            SyncEvent::Failed { error } => {
                warn!(error, "Sync failed");
            }
            SyncEvent::Cancelled { items_upserted } => {
                info!(items_upserted, "Sync cancelled - partial progress saved");
            }
        }
    }
}
