//! Stock repository for PostgreSQL / CockroachDB.
//!
//! All writes go through [`StockRepository::upsert_batch`], a single
//! multi-row `INSERT ... ON CONFLICT (ticker) DO UPDATE` per batch. The SQL
//! sticks to the subset CockroachDB shares with PostgreSQL.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Pool, Postgres, QueryBuilder};
use stockpile_core::DbConfig;
use stockpile_core::error::AppError;
use stockpile_core::models::Stock;

/// Schema statements, executed one at a time by [`StockRepository::migrate`].
const MIGRATIONS: &[&str] = &[r#"CREATE TABLE IF NOT EXISTS stocks (
        ticker TEXT PRIMARY KEY,
        target_from TEXT NOT NULL,
        target_to TEXT NOT NULL,
        company TEXT NOT NULL,
        action TEXT NOT NULL,
        brokerage TEXT NOT NULL,
        rating_from TEXT NOT NULL,
        rating_to TEXT NOT NULL,
        time TIMESTAMPTZ NOT NULL
    )"#];

/// Column list shared by the insert and select statements.
const STOCK_COLUMNS: &str =
    "ticker, target_from, target_to, company, action, brokerage, rating_from, rating_to, time";

const COLUMNS_PER_ROW: usize = 9;

/// PostgreSQL caps a statement at 65535 bind parameters.
const MAX_ROWS_PER_STATEMENT: usize = u16::MAX as usize / COLUMNS_PER_ROW;

#[derive(sqlx::FromRow)]
struct StockRow {
    ticker: String,
    target_from: String,
    target_to: String,
    company: String,
    action: String,
    brokerage: String,
    rating_from: String,
    rating_to: String,
    time: DateTime<Utc>,
}

impl From<StockRow> for Stock {
    fn from(row: StockRow) -> Self {
        Stock {
            ticker: row.ticker,
            target_from: row.target_from,
            target_to: row.target_to,
            company: row.company,
            action: row.action,
            brokerage: row.brokerage,
            rating_from: row.rating_from,
            rating_to: row.rating_to,
            time: row.time,
        }
    }
}

/// Repository for stock ratings.
///
/// # Examples
///
/// ```no_run
/// use sqlx::postgres::PgPoolOptions;
/// use stockpile_db::StockRepository;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = PgPoolOptions::new()
///     .max_connections(5)
///     .connect("postgresql://root@localhost:26257/stockpile")
///     .await?;
///
/// let repo = StockRepository::new(pool);
/// repo.migrate().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct StockRepository {
    pool: Pool<Postgres>,
    statement_timeout: Duration,
}

impl StockRepository {
    pub fn new(pool: PgPool) -> Self {
        Self::with_config(pool, &DbConfig::default())
    }

    pub fn with_config(pool: PgPool, config: &DbConfig) -> Self {
        Self {
            pool,
            statement_timeout: config.statement_timeout,
        }
    }

    /// Creates the `stocks` table if it does not exist.
    pub async fn migrate(&self) -> Result<(), AppError> {
        for migration in MIGRATIONS {
            sqlx::query(migration)
                .execute(&self.pool)
                .await
                .map_err(AppError::DatabaseError)?;
        }
        tracing::info!("Schema up to date");
        Ok(())
    }

    /// Inserts or updates every stock in `stocks`, keyed by ticker.
    ///
    /// Rows sharing a ticker are collapsed to the last occurrence first, since
    /// one statement may not touch the same row twice. Batches larger than the
    /// bind-parameter limit are split across statements in one transaction.
    ///
    /// Returns the number of rows written.
    pub async fn upsert_batch(&self, stocks: &[Stock]) -> Result<u64, AppError> {
        let rows = dedup_last_wins(stocks);
        if rows.is_empty() {
            return Ok(0);
        }

        // Waiting for a pooled connection is not part of the statement budget.
        let mut tx = self.pool.begin().await.map_err(AppError::DatabaseError)?;

        let write = async {
            let mut written = 0;
            for chunk in rows.chunks(MAX_ROWS_PER_STATEMENT) {
                let result = build_upsert(chunk).build().execute(&mut *tx).await?;
                written += result.rows_affected();
            }
            tx.commit().await?;
            Ok::<u64, sqlx::Error>(written)
        };

        match tokio::time::timeout(self.statement_timeout, write).await {
            Ok(result) => result.map_err(AppError::DatabaseError),
            Err(_) => Err(AppError::Timeout(timeout_secs(self.statement_timeout))),
        }
    }

    /// Returns the number of stored stocks.
    pub async fn count(&self) -> Result<i64, AppError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM stocks")
            .fetch_one(&self.pool)
            .await
            .map_err(AppError::DatabaseError)?;
        Ok(count)
    }

    /// Retrieves a stock by ticker.
    pub async fn get(&self, ticker: &str) -> Result<Option<Stock>, AppError> {
        let query = format!("SELECT {} FROM stocks WHERE ticker = $1", STOCK_COLUMNS);
        let row = sqlx::query_as::<_, StockRow>(&query)
            .bind(ticker)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::DatabaseError)?;
        Ok(row.map(Stock::from))
    }

    /// Checks database connectivity by executing a simple query.
    pub async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(AppError::DatabaseError)?;
        Ok(())
    }
}

/// Whole seconds for `AppError::Timeout`, rounded up so sub-second budgets never read as 0.
fn timeout_secs(timeout: Duration) -> u64 {
    let secs = timeout.as_secs();
    if timeout.subsec_nanos() > 0 { secs + 1 } else { secs }
}

/// Keeps the last stock per ticker, in order of first appearance.
fn dedup_last_wins(stocks: &[Stock]) -> Vec<&Stock> {
    let mut index: HashMap<&str, usize> = HashMap::with_capacity(stocks.len());
    let mut rows: Vec<&Stock> = Vec::with_capacity(stocks.len());
    for stock in stocks {
        match index.get(stock.ticker.as_str()) {
            Some(&i) => rows[i] = stock,
            None => {
                index.insert(stock.ticker.as_str(), rows.len());
                rows.push(stock);
            }
        }
    }
    rows
}

fn build_upsert<'a>(rows: &[&'a Stock]) -> QueryBuilder<'a, Postgres> {
    let mut builder = QueryBuilder::new(format!("INSERT INTO stocks ({}) ", STOCK_COLUMNS));
    builder.push_values(rows.iter().copied(), |mut b, stock| {
        b.push_bind(stock.ticker.as_str())
            .push_bind(stock.target_from.as_str())
            .push_bind(stock.target_to.as_str())
            .push_bind(stock.company.as_str())
            .push_bind(stock.action.as_str())
            .push_bind(stock.brokerage.as_str())
            .push_bind(stock.rating_from.as_str())
            .push_bind(stock.rating_to.as_str())
            .push_bind(stock.time);
    });
    builder.push(
        r#" ON CONFLICT (ticker) DO UPDATE SET
            target_from = EXCLUDED.target_from,
            target_to = EXCLUDED.target_to,
            company = EXCLUDED.company,
            action = EXCLUDED.action,
            brokerage = EXCLUDED.brokerage,
            rating_from = EXCLUDED.rating_from,
            rating_to = EXCLUDED.rating_to,
            time = EXCLUDED.time"#,
    );
    builder
}

impl stockpile_core::traits::RecordStore for StockRepository {
    type Item = Stock;

    async fn upsert_batch(&self, items: &[Stock]) -> Result<u64, AppError> {
        StockRepository::upsert_batch(self, items).await
    }
}
