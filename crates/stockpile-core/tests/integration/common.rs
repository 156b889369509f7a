//! Test utilities and mock implementations for integration tests.
//!
//! Provides a scripted page provider and an in-memory record store for
//! testing `SyncService` in isolation.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use stockpile_core::models::{Page, Record};
use stockpile_core::traits::{PageProvider, RecordStore};
use stockpile_core::AppError;

// =============================================================================
// TestRecord
// =============================================================================

/// Minimal record: a key plus a version used to observe replacement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestRecord {
    pub id: String,
    pub version: u32,
}

impl TestRecord {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            version: 1,
        }
    }

    #[allow(dead_code)]
    pub fn versioned(id: &str, version: u32) -> Self {
        Self {
            id: id.to_string(),
            version,
        }
    }
}

impl Record for TestRecord {
    fn key(&self) -> &str {
        &self.id
    }
}

/// Builds records from their ids.
pub fn records(ids: &[&str]) -> Vec<TestRecord> {
    ids.iter().map(|id| TestRecord::new(id)).collect()
}

// =============================================================================
// MockPageProvider
// =============================================================================

#[derive(Clone)]
enum Scripted {
    Page {
        items: Vec<TestRecord>,
        next: Option<String>,
    },
    Fail(String),
}

/// Page provider answering from a script keyed by cursor.
///
/// In endless mode every cursor yields a fresh page pointing at a new
/// cursor, so pagination never ends on its own.
#[derive(Clone, Default)]
pub struct MockPageProvider {
    script: HashMap<Option<String>, Scripted>,
    endless_page_size: Option<usize>,
    delay: Option<Duration>,
    fetches: Arc<Mutex<Vec<Option<String>>>>,
}

impl MockPageProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts the page returned for `cursor` (`None` is the first page).
    pub fn page(mut self, cursor: Option<&str>, ids: &[&str], next: Option<&str>) -> Self {
        self.script.insert(
            cursor.map(str::to_string),
            Scripted::Page {
                items: records(ids),
                next: next.map(str::to_string),
            },
        );
        self
    }

    /// Scripts a page with explicit records.
    #[allow(dead_code)]
    pub fn page_with(
        mut self,
        cursor: Option<&str>,
        items: Vec<TestRecord>,
        next: Option<&str>,
    ) -> Self {
        self.script.insert(
            cursor.map(str::to_string),
            Scripted::Page {
                items,
                next: next.map(str::to_string),
            },
        );
        self
    }

    /// Scripts a provider error for `cursor`.
    #[allow(dead_code)]
    pub fn fail_at(mut self, cursor: Option<&str>, message: &str) -> Self {
        self.script
            .insert(cursor.map(str::to_string), Scripted::Fail(message.to_string()));
        self
    }

    /// Provider that never runs out of pages.
    #[allow(dead_code)]
    pub fn endless(page_size: usize) -> Self {
        Self {
            endless_page_size: Some(page_size),
            ..Self::default()
        }
    }

    /// Delays every fetch, to make cancellation timing observable.
    #[allow(dead_code)]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Cursors passed to `fetch_page`, in call order.
    pub fn fetched_cursors(&self) -> Vec<Option<String>> {
        self.fetches.lock().unwrap().clone()
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.lock().unwrap().len()
    }
}

impl PageProvider for MockPageProvider {
    type Item = TestRecord;

    async fn fetch_page(&self, cursor: Option<&str>) -> Result<Page<TestRecord>, AppError> {
        let call = {
            let mut fetches = self.fetches.lock().unwrap();
            fetches.push(cursor.map(str::to_string));
            fetches.len()
        };

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(size) = self.endless_page_size {
            let items = (0..size)
                .map(|i| TestRecord::new(&format!("rec-{}-{}", call, i)))
                .collect();
            return Ok(Page::new(items, Some(format!("page-{}", call + 1))));
        }

        match self.script.get(&cursor.map(str::to_string)) {
            Some(Scripted::Page { items, next }) => Ok(Page::new(items.clone(), next.clone())),
            Some(Scripted::Fail(message)) => Err(AppError::ClientError(message.clone())),
            None => Err(AppError::ClientError(format!(
                "no page scripted for cursor {:?}",
                cursor
            ))),
        }
    }
}

// =============================================================================
// MockRecordStore
// =============================================================================

/// In-memory record store keyed by record id.
///
/// Clones share state, as the engine hands one clone to each worker.
#[derive(Clone, Default)]
pub struct MockRecordStore {
    rows: Arc<Mutex<HashMap<String, TestRecord>>>,
    batches: Arc<Mutex<Vec<Vec<String>>>>,
    calls: Arc<AtomicUsize>,
    fail_on_call: Option<usize>,
    panic_on_call: Option<usize>,
    delay: Option<Duration>,
}

impl MockRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails the `n`-th call to `upsert_batch` (1-based, counted across clones).
    #[allow(dead_code)]
    pub fn failing_on_call(n: usize) -> Self {
        Self {
            fail_on_call: Some(n),
            ..Self::default()
        }
    }

    /// Panics inside the `n`-th call to `upsert_batch` (1-based).
    #[allow(dead_code)]
    pub fn panicking_on_call(n: usize) -> Self {
        Self {
            panic_on_call: Some(n),
            ..Self::default()
        }
    }

    /// Delays every upsert after recording the call.
    #[allow(dead_code)]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Keys of every applied batch, in application order.
    pub fn batches(&self) -> Vec<Vec<String>> {
        self.batches.lock().unwrap().clone()
    }

    /// Number of `upsert_batch` calls, including failed ones.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    #[allow(dead_code)]
    pub fn get(&self, id: &str) -> Option<TestRecord> {
        self.rows.lock().unwrap().get(id).cloned()
    }

    /// Snapshot of stored rows, sorted by id.
    #[allow(dead_code)]
    pub fn snapshot(&self) -> Vec<TestRecord> {
        let mut rows: Vec<_> = self.rows.lock().unwrap().values().cloned().collect();
        rows.sort_by(|a, b| a.id.cmp(&b.id));
        rows
    }

    /// Number of live handles to the shared state, this one included.
    #[allow(dead_code)]
    pub fn handle_count(&self) -> usize {
        Arc::strong_count(&self.rows)
    }
}

impl RecordStore for MockRecordStore {
    type Item = TestRecord;

    async fn upsert_batch(&self, items: &[TestRecord]) -> Result<u64, AppError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;

        if self.fail_on_call == Some(call) {
            return Err(AppError::Generic(format!("store failure on call {}", call)));
        }
        if self.panic_on_call == Some(call) {
            panic!("store panicked on call {}", call);
        }

        {
            let mut rows = self.rows.lock().unwrap();
            for item in items {
                rows.insert(item.id.clone(), item.clone());
            }
        }
        self.batches
            .lock()
            .unwrap()
            .push(items.iter().map(|i| i.id.clone()).collect());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        Ok(items.len() as u64)
    }
}
