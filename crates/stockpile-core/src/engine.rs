//! Sync engine: paginated ingestion and batched upsert.
//!
//! This module provides [`SyncService`], which walks a cursor-paginated
//! [`PageProvider`] and persists every record into a [`RecordStore`] through
//! a bounded pool of concurrent workers.
//!
//! # Architecture
//!
//! ```text
//! cursor walker ──(bounded channel of batches)──> N upsert workers ──> store
//! ```
//!
//! - The **cursor walker** runs on the caller's task. It fetches pages one at
//!   a time, feeds a [`Batcher`], and sends full batches into the channel.
//!   It keeps the set of cursors visited during the run and ends pagination
//!   (successfully) when the provider hands back a cursor it has already
//!   seen. It owns the only `Sender`, so the channel closes exactly once,
//!   when the walker returns.
//! - The **upsert workers** are spawned on a [`JoinSet`]. Each one receives
//!   batches until the channel is closed and drained.
//! - The **coordinator** waits for the walker, then for every worker, and
//!   resolves the run outcome.
//!
//! # Failure handling
//!
//! Provider and store errors are never retried here. The first error is
//! stored in a [`FirstError`] slot, which also cancels a run-scoped child of
//! the caller's token; later errors are discarded. The walker checks the
//! token before every fetch and races it against every send, and workers
//! check it before taking the next batch. In-flight provider and store calls
//! are allowed to complete. Batches written before the failure stay written.
//!
//! # Cancellation Support
//!
//! The `*_cancellable` methods accept a `CancellationToken`. Cancelling it
//! stops the run at the next checkpoint. If no error was recorded the run
//! returns [`AppError::Cancelled`]; re-running is safe because upserts are
//! idempotent.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_channel::{Receiver, Sender};
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;

use crate::batch::Batcher;
use crate::progress::{ProgressReporter, SilentReporter, SyncEvent};
use crate::sync::{AtomicSyncStats, FirstError, SyncSummary};
use crate::traits::{PageProvider, RecordStore};
use crate::{AppError, SyncConfig};

/// Service that syncs every record from a provider into a store.
///
/// # Type Parameters
///
/// * `P` - Page provider implementation (e.g., `StockApiClient`)
/// * `S` - Record store implementation (e.g., `StockRepository`)
///
/// # Example
///
/// ```ignore
/// use stockpile_core::SyncService;
///
/// let service = SyncService::new(api_client, repository);
/// let summary = service.run(5, 100).await?;
/// println!("Upserted {} records in {} batches", summary.items_upserted, summary.batches_upserted);
/// ```
pub struct SyncService<P, S>
where
    P: PageProvider,
    S: RecordStore<Item = P::Item>,
{
    provider: P,
    store: S,
    config: SyncConfig,
}

impl<P, S> SyncService<P, S>
where
    P: PageProvider,
    S: RecordStore<Item = P::Item>,
{
    /// Creates a new sync service with default configuration.
    ///
    /// # Arguments
    ///
    /// * `provider` - Source of paginated records
    /// * `store` - Destination for upserted batches
    pub fn new(provider: P, store: S) -> Self {
        Self {
            provider,
            store,
            config: SyncConfig::default(),
        }
    }

    /// Creates a sync service with custom configuration.
    ///
    /// The configuration is validated when a run starts, not here.
    pub fn with_config(provider: P, store: S, config: SyncConfig) -> Self {
        Self {
            provider,
            store,
            config,
        }
    }

    /// Runs a sync with an explicit worker count and batch size.
    ///
    /// The channel capacity comes from the service's configuration.
    ///
    /// # Errors
    ///
    /// - [`AppError::ConfigError`] if `workers` or `batch_size` is zero, before
    ///   any page is fetched
    /// - the first error returned by the provider or the store
    pub async fn run(&self, workers: usize, batch_size: usize) -> Result<SyncSummary, AppError> {
        let config = self
            .config
            .clone()
            .with_workers(workers)
            .with_batch_size(batch_size);
        self.execute(&config, &SilentReporter, CancellationToken::new())
            .await
    }

    /// Runs a sync with the service's configuration.
    pub async fn sync(&self) -> Result<SyncSummary, AppError> {
        self.execute(&self.config, &SilentReporter, CancellationToken::new())
            .await
    }

    /// Runs a sync, emitting progress events through `reporter`.
    pub async fn sync_with_progress<R: ProgressReporter>(
        &self,
        reporter: &R,
    ) -> Result<SyncSummary, AppError> {
        self.execute(&self.config, reporter, CancellationToken::new())
            .await
    }

    /// Runs a sync that stops when `cancel_token` is cancelled.
    pub async fn sync_cancellable(
        &self,
        cancel_token: CancellationToken,
    ) -> Result<SyncSummary, AppError> {
        self.execute(&self.config, &SilentReporter, cancel_token)
            .await
    }

    /// Runs a sync with progress reporting and cancellation support.
    ///
    /// Same as [`sync_with_progress`](Self::sync_with_progress), but stops at
    /// the next checkpoint once `cancel_token` is cancelled.
    pub async fn sync_with_progress_cancellable<R: ProgressReporter>(
        &self,
        reporter: &R,
        cancel_token: CancellationToken,
    ) -> Result<SyncSummary, AppError> {
        self.execute(&self.config, reporter, cancel_token).await
    }

    async fn execute<R: ProgressReporter>(
        &self,
        config: &SyncConfig,
        reporter: &R,
        cancel_token: CancellationToken,
    ) -> Result<SyncSummary, AppError> {
        config.validate()?;

        let run_token = cancel_token.child_token();
        let first_error = Arc::new(FirstError::new(run_token.clone()));
        let stats = Arc::new(AtomicSyncStats::new());
        let was_cancelled = Arc::new(AtomicBool::new(false));

        let (tx, rx) = async_channel::bounded::<Vec<P::Item>>(config.channel_capacity);

        reporter.report(SyncEvent::Started {
            workers: config.workers,
            batch_size: config.batch_size,
            channel_capacity: config.channel_capacity,
        });

        let mut workers = JoinSet::new();
        for worker_id in 0..config.workers {
            workers.spawn(upsert_worker(
                worker_id,
                self.store.clone(),
                rx.clone(),
                run_token.clone(),
                Arc::clone(&first_error),
                Arc::clone(&stats),
                Arc::clone(&was_cancelled),
            ));
        }
        // Workers hold the only receivers from here on.
        drop(rx);

        // =====================================================================
        // Cursor walker
        //
        // Runs inline; returning drops the sender and closes the channel.
        // =====================================================================
        self.walk(
            tx,
            config.batch_size,
            reporter,
            &run_token,
            &first_error,
            &stats,
            &was_cancelled,
        )
        .await;

        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                tracing::error!(error = %e, "Upsert worker terminated abnormally");
                first_error.record(worker_failure(e));
            }
        }

        let summary = stats.to_summary();

        if let Some(err) = first_error.take() {
            let message = err.to_string();
            reporter.report(SyncEvent::Failed { error: &message });
            return Err(err);
        }

        if was_cancelled.load(Ordering::SeqCst) {
            reporter.report(SyncEvent::Cancelled {
                items_upserted: summary.items_upserted,
            });
            return Err(AppError::Cancelled);
        }

        reporter.report(SyncEvent::Completed { summary: &summary });
        Ok(summary)
    }

    /// Drives the provider until the stream ends, an error occurs, or the run
    /// is cancelled.
    #[allow(clippy::too_many_arguments)]
    async fn walk<R: ProgressReporter>(
        &self,
        tx: Sender<Vec<P::Item>>,
        batch_size: usize,
        reporter: &R,
        token: &CancellationToken,
        first_error: &FirstError,
        stats: &AtomicSyncStats,
        was_cancelled: &AtomicBool,
    ) {
        let mut batcher = Batcher::new(batch_size);
        let mut visited: HashSet<String> = HashSet::new();
        let mut cursor: Option<String> = None;
        let mut page_number = 0usize;
        let mut batches_queued = 0usize;

        loop {
            if token.is_cancelled() {
                was_cancelled.store(true, Ordering::SeqCst);
                return;
            }

            let page = match self.provider.fetch_page(cursor.as_deref()).await {
                Ok(page) => page,
                Err(e) => {
                    tracing::warn!(cursor = cursor.as_deref(), error = %e, "Failed to fetch page");
                    first_error.record(e);
                    return;
                }
            };

            page_number += 1;
            stats.record_page(page.items.len());

            // Normalise here too: providers may build pages without `Page::new`.
            let next_cursor = page.next_cursor.filter(|c| !c.is_empty());
            reporter.report(SyncEvent::PageFetched {
                page: page_number,
                items: page.items.len(),
                next_cursor: next_cursor.as_deref(),
            });

            for item in page.items {
                if let Some(batch) = batcher.push(item) {
                    batches_queued += 1;
                    let size = batch.len();
                    if !send_batch(&tx, batch, token, was_cancelled).await {
                        return;
                    }
                    reporter.report(SyncEvent::BatchQueued {
                        batch: batches_queued,
                        size,
                    });
                }
            }

            match next_cursor {
                None => break,
                Some(next) => {
                    if !visited.insert(next.clone()) {
                        stats.mark_cursor_repeated();
                        reporter.report(SyncEvent::CursorRepeated { cursor: &next });
                        break;
                    }
                    cursor = Some(next);
                }
            }
        }

        if let Some(batch) = batcher.finish() {
            batches_queued += 1;
            let size = batch.len();
            if send_batch(&tx, batch, token, was_cancelled).await {
                reporter.report(SyncEvent::BatchQueued {
                    batch: batches_queued,
                    size,
                });
            }
        }
    }
}

/// Hands a batch to the pool, giving up if the run is cancelled first.
///
/// Returns false if the walker should stop.
async fn send_batch<T>(
    tx: &Sender<Vec<T>>,
    batch: Vec<T>,
    token: &CancellationToken,
    was_cancelled: &AtomicBool,
) -> bool {
    tokio::select! {
        biased;
        _ = token.cancelled() => {
            was_cancelled.store(true, Ordering::SeqCst);
            false
        }
        sent = tx.send(batch) => {
            if sent.is_err() {
                tracing::warn!("All upsert workers exited, stopping pagination");
            }
            sent.is_ok()
        }
    }
}

/// Receives batches until the channel is drained or the run is cancelled.
async fn upsert_worker<S: RecordStore>(
    worker_id: usize,
    store: S,
    rx: Receiver<Vec<S::Item>>,
    token: CancellationToken,
    first_error: Arc<FirstError>,
    stats: Arc<AtomicSyncStats>,
    was_cancelled: Arc<AtomicBool>,
) {
    loop {
        let batch = tokio::select! {
            biased;
            _ = token.cancelled() => {
                was_cancelled.store(true, Ordering::SeqCst);
                break;
            }
            received = rx.recv() => match received {
                Ok(batch) => batch,
                // Closed and drained.
                Err(_) => break,
            },
        };

        let size = batch.len();
        // Own task: a panicking store comes back as a JoinError.
        let upsert = {
            let store = store.clone();
            tokio::spawn(async move { store.upsert_batch(&batch).await })
        };
        match upsert.await {
            Ok(Ok(rows)) => {
                stats.record_batch(size);
                tracing::debug!(worker_id, size, rows, "Upserted batch");
            }
            Ok(Err(e)) => {
                tracing::warn!(worker_id, size, error = %e, "Failed to upsert batch");
                first_error.record(e);
                break;
            }
            Err(e) => {
                tracing::error!(worker_id, size, error = %e, "Upsert task terminated abnormally");
                first_error.record(worker_failure(e));
                break;
            }
        }
    }
}

/// Maps a panicked or aborted upsert task to the run's error.
fn worker_failure(e: JoinError) -> AppError {
    AppError::Generic(format!("upsert worker failed: {}", e))
}
