//! Integration tests for StockRepository.
//!
//! These tests verify the repository against a real PostgreSQL database.
//! Each test runs in an isolated container.

use stockpile_core::models::Page;
use stockpile_core::traits::PageProvider;
use stockpile_core::{AppError, Stock, SyncService};

use crate::integration::common::{sample_stock, setup_test_repo};

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_upsert_inserts_new_stocks() {
    let (repo, _pool, _container) = setup_test_repo().await;

    let stocks = vec![sample_stock("AKBA", "Buy"), sample_stock("BSBR", "Neutral")];
    let written = repo
        .upsert_batch(&stocks)
        .await
        .expect("upsert should succeed");

    assert_eq!(written, 2);
    assert_eq!(repo.count().await.unwrap(), 2);

    let stored = repo
        .get("AKBA")
        .await
        .expect("get should succeed")
        .expect("stock should exist");
    assert_eq!(stored, stocks[0]);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_upsert_updates_existing_stock() {
    let (repo, _pool, _container) = setup_test_repo().await;

    repo.upsert_batch(&[sample_stock("AKBA", "Buy")])
        .await
        .expect("first upsert should succeed");
    repo.upsert_batch(&[sample_stock("AKBA", "Sell")])
        .await
        .expect("second upsert should succeed");

    assert_eq!(repo.count().await.unwrap(), 1, "Ticker is the primary key");
    let stored = repo.get("AKBA").await.unwrap().unwrap();
    assert_eq!(stored.rating_to, "Sell", "Later write should win");
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_upsert_duplicate_tickers_in_one_batch() {
    let (repo, _pool, _container) = setup_test_repo().await;

    let stocks = vec![
        sample_stock("AKBA", "Buy"),
        sample_stock("BSBR", "Hold"),
        sample_stock("AKBA", "Sell"),
    ];
    let written = repo
        .upsert_batch(&stocks)
        .await
        .expect("duplicates within a batch should not fail the statement");

    assert_eq!(written, 2);
    assert_eq!(repo.get("AKBA").await.unwrap().unwrap().rating_to, "Sell");
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_upsert_is_idempotent() {
    let (repo, _pool, _container) = setup_test_repo().await;

    let stocks: Vec<Stock> = ["A", "B", "C"]
        .iter()
        .map(|t| sample_stock(t, "Buy"))
        .collect();
    repo.upsert_batch(&stocks).await.unwrap();
    repo.upsert_batch(&stocks).await.unwrap();

    assert_eq!(repo.count().await.unwrap(), 3);
    for stock in &stocks {
        assert_eq!(repo.get(&stock.ticker).await.unwrap().as_ref(), Some(stock));
    }
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_upsert_empty_batch() {
    let (repo, _pool, _container) = setup_test_repo().await;

    assert_eq!(repo.upsert_batch(&[]).await.unwrap(), 0);
    assert_eq!(repo.count().await.unwrap(), 0);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_get_missing_ticker() {
    let (repo, _pool, _container) = setup_test_repo().await;

    assert!(repo.get("NOPE").await.unwrap().is_none());
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_migrate_is_repeatable() {
    let (repo, _pool, _container) = setup_test_repo().await;

    repo.migrate().await.expect("second migration should be a no-op");
    repo.health_check().await.expect("database should be reachable");
}

/// Serves fixed pages of ratings; page `n` is fetched with cursor `"n"`.
struct FixedPages(Vec<Vec<Stock>>);

impl PageProvider for FixedPages {
    type Item = Stock;

    async fn fetch_page(&self, cursor: Option<&str>) -> Result<Page<Stock>, AppError> {
        let index = match cursor {
            None => 0,
            Some(c) => c
                .parse::<usize>()
                .map_err(|_| AppError::ClientError(format!("bad cursor {}", c)))?,
        };
        let items = self.0.get(index).cloned().unwrap_or_default();
        let next = (index + 1 < self.0.len()).then(|| (index + 1).to_string());
        Ok(Page::new(items, next))
    }
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_sync_service_writes_every_page() {
    let (repo, _pool, _container) = setup_test_repo().await;

    let pages = vec![
        vec![sample_stock("A", "Buy"), sample_stock("B", "Buy")],
        vec![sample_stock("C", "Buy"), sample_stock("A", "Sell")],
        vec![sample_stock("D", "Hold")],
    ];
    let service = SyncService::new(FixedPages(pages), repo.clone());

    let summary = service.run(3, 2).await.expect("sync should succeed");

    assert_eq!(summary.pages, 3);
    assert_eq!(summary.items_fetched, 5);
    assert_eq!(repo.count().await.unwrap(), 4);

    // Rerunning the same stream leaves the table unchanged.
    service.run(3, 2).await.expect("rerun should succeed");
    assert_eq!(repo.count().await.unwrap(), 4);
}
