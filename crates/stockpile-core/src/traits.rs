//! Trait definitions for external dependencies.
//!
//! The sync engine talks to the outside world through two ports:
//!
//! - [`PageProvider`]: returns one page of records plus an opaque cursor
//! - [`RecordStore`]: durably upserts a batch of records, idempotent by key
//!
//! Both are implemented by the concrete crates (`stockpile-client`,
//! `stockpile-db`) and by in-memory mocks in tests.
//!
//! # Example
//!
//! ```
//! use stockpile_core::traits::{PageProvider, RecordStore};
//!
//! // Copy the first page straight into a store.
//! async fn copy_first_page<P, S>(provider: &P, store: &S) -> Result<u64, stockpile_core::AppError>
//! where
//!     P: PageProvider,
//!     S: RecordStore<Item = P::Item>,
//! {
//!     let page = provider.fetch_page(None).await?;
//!     if page.items.is_empty() {
//!         return Ok(0);
//!     }
//!     store.upsert_batch(&page.items).await
//! }
//! ```

use std::future::Future;

use crate::AppError;
use crate::models::{Page, Record};

/// Source of cursor-paginated records.
///
/// Implementations own transport concerns, including any retry policy. The
/// engine treats every error returned here as fatal to the run.
pub trait PageProvider: Send + Sync {
    /// Record type carried by each page.
    type Item: Record;

    /// Fetches one page.
    ///
    /// # Arguments
    ///
    /// * `cursor` - `None` for the first page, otherwise the `next_cursor` of
    ///   the previous page, passed back verbatim
    fn fetch_page(
        &self,
        cursor: Option<&str>,
    ) -> impl Future<Output = Result<Page<Self::Item>, AppError>> + Send;
}

/// Destination for batches of records.
///
/// Cloned once per worker, so clones must share the underlying resource
/// (connection pool, map behind an `Arc`, ...).
pub trait RecordStore: Send + Sync + Clone + 'static {
    /// Record type accepted by this store.
    type Item: Record;

    /// Inserts or updates every record in `items`, keyed by [`Record::key`].
    ///
    /// Never called with an empty slice by the engine. Applying the same
    /// batch twice must leave the store as if it had been applied once.
    ///
    /// # Returns
    ///
    /// The number of rows written.
    fn upsert_batch(
        &self,
        items: &[Self::Item],
    ) -> impl Future<Output = Result<u64, AppError>> + Send;
}
