//! Test utilities for integration tests.
//!
//! Provides helpers to start an isolated PostgreSQL container per test.

use chrono::{TimeZone, Utc};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use stockpile_core::Stock;
use stockpile_db::StockRepository;
use testcontainers::core::{ContainerPort, WaitFor};
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, GenericImage, ImageExt};

/// Starts a PostgreSQL container and returns a migrated repository.
///
/// Keep the returned container alive for the duration of the test; it is
/// removed when dropped.
pub async fn setup_test_repo() -> (StockRepository, PgPool, ContainerAsync<GenericImage>) {
    let container = GenericImage::new("postgres", "16-alpine")
        .with_exposed_port(ContainerPort::Tcp(5432))
        .with_wait_for(WaitFor::message_on_stderr(
            "database system is ready to accept connections",
        ))
        .with_env_var("POSTGRES_PASSWORD", "postgres")
        .with_env_var("POSTGRES_DB", "postgres")
        .start()
        .await
        .expect("Failed to start PostgreSQL container");

    let host = container.get_host().await.expect("Failed to get host");
    let port = container
        .get_host_port_ipv4(5432)
        .await
        .expect("Failed to get port");

    let connection_string = format!("postgresql://postgres:postgres@{}:{}/postgres", host, port);

    // The server restarts once after init, so the first attempts may fail.
    const MAX_RETRIES: u32 = 30;
    let mut retries = 0;
    let pool = loop {
        match PgPoolOptions::new()
            .max_connections(5)
            .connect(&connection_string)
            .await
        {
            Ok(pool) => break pool,
            Err(e) => {
                retries += 1;
                if retries >= MAX_RETRIES {
                    panic!(
                        "Failed to connect to database after {} retries: {}",
                        MAX_RETRIES, e
                    );
                }
                tokio::time::sleep(std::time::Duration::from_millis(100)).await;
            }
        }
    };

    let repo = StockRepository::new(pool.clone());
    repo.migrate().await.expect("Failed to run migrations");

    (repo, pool, container)
}

/// Creates a sample rating for `ticker`.
pub fn sample_stock(ticker: &str, rating_to: &str) -> Stock {
    Stock {
        ticker: ticker.to_string(),
        target_from: "$4.20".to_string(),
        target_to: "$4.70".to_string(),
        company: format!("{} Corp", ticker),
        action: "upgraded by".to_string(),
        brokerage: "The Goldman Sachs Group".to_string(),
        rating_from: "Sell".to_string(),
        rating_to: rating_to.to_string(),
        time: Utc.with_ymd_and_hms(2025, 1, 13, 0, 30, 5).unwrap(),
    }
}
