use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A value the sync engine can move from a provider into a store.
///
/// The key is the record's unique identifier: two records with the same key
/// describe the same row, and the one upserted later replaces the earlier.
pub trait Record: Send + Sync + 'static {
    /// Returns the unique, non-empty identifier of this record.
    fn key(&self) -> &str;
}

/// A brokerage rating change for a single ticker.
///
/// This is the record type pulled from the ratings API and persisted in the
/// `stocks` table. The ticker is the primary key.
///
/// # Examples
///
/// ```
/// use stockpile_core::models::{Record, Stock};
///
/// let json = r#"{
///     "ticker": "AKBA",
///     "target_from": "$8.00",
///     "target_to": "$8.00",
///     "company": "Akebia Therapeutics",
///     "action": "reiterated by",
///     "brokerage": "HC Wainwright",
///     "rating_from": "Buy",
///     "rating_to": "Buy",
///     "time": "2025-01-13T00:30:05.813548892Z"
/// }"#;
///
/// let stock: Stock = serde_json::from_str(json).unwrap();
/// assert_eq!(stock.key(), "AKBA");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stock {
    pub ticker: String,
    pub target_from: String,
    pub target_to: String,
    pub company: String,
    pub action: String,
    pub brokerage: String,
    pub rating_from: String,
    pub rating_to: String,
    pub time: DateTime<Utc>,
}

impl Record for Stock {
    fn key(&self) -> &str {
        &self.ticker
    }
}

/// One page of records returned by a provider.
///
/// `next_cursor` is opaque to the engine. `None` marks the end of the stream;
/// use [`Page::new`] so that an empty cursor string is treated the same way.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_cursor: Option<String>,
}

impl<T> Page<T> {
    /// Builds a page, normalising an empty cursor to `None`.
    pub fn new(items: Vec<T>, next_cursor: Option<String>) -> Self {
        Self {
            items,
            next_cursor: next_cursor.filter(|c| !c.is_empty()),
        }
    }

    /// Builds the final page of a stream.
    pub fn last(items: Vec<T>) -> Self {
        Self {
            items,
            next_cursor: None,
        }
    }

    /// Returns true if no further page follows this one.
    pub fn is_last(&self) -> bool {
        self.next_cursor.as_deref().is_none_or(str::is_empty)
    }
}
