//! Stockpile Core - Domain types, ports, and the paginated sync engine.
//!
//! This crate provides the core functionality for Stockpile, including:
//!
//! - **Domain models**: [`Stock`], [`Page`], and the [`Record`] trait
//! - **Ports**: [`PageProvider`] and [`RecordStore`] for dependency injection
//! - **Services**: [`SyncService`], which walks a paginated provider and
//!   upserts batches through a bounded worker pool
//! - **Store decorators**: [`LoggingStore`] and [`NoopStore`]
//! - **Progress reporting**: [`ProgressReporter`] trait for decoupled logging/UI
//!
//! # Architecture
//!
//! This crate knows nothing about HTTP or SQL. The concrete provider lives in
//! `stockpile-client` and the concrete store in `stockpile-db`; the CLI wires
//! them together.
//!
//! # Example
//!
//! ```ignore
//! use stockpile_core::{SyncConfig, SyncService, TracingReporter};
//!
//! let config = SyncConfig::default().with_workers(4).with_batch_size(200);
//! let service = SyncService::with_config(api_client, repository, config);
//! let summary = service.sync_with_progress(&TracingReporter).await?;
//! ```

pub mod batch;
pub mod config;
pub mod engine;
pub mod error;
pub mod models;
pub mod progress;
pub mod store;
pub mod sync;
pub mod traits;

// Configuration
pub use config::{DbConfig, HttpConfig, SyncConfig};

// Error handling
pub use error::AppError;

// Domain models
pub use models::{Page, Record, Stock};

// Batching and run state
pub use batch::Batcher;
pub use sync::{AtomicSyncStats, FirstError, SyncSummary};

// Progress reporting
pub use progress::{ProgressReporter, SilentReporter, SyncEvent, TracingReporter};

// Traits for dependency injection
pub use traits::{PageProvider, RecordStore};

// Store decorators
pub use store::{LoggingStore, NoopStore};

// Services (generic over trait implementations)
pub use engine::SyncService;
