mod config;

use anyhow::Context;
use clap::Parser;
use dotenvy::dotenv;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use stockpile_client::StockApiClient;
use stockpile_core::traits::RecordStore;
use stockpile_core::{
    AppError, DbConfig, HttpConfig, LoggingStore, NoopStore, Stock, SyncConfig, SyncService,
    SyncSummary, TracingReporter,
};
use stockpile_db::StockRepository;

use crate::config::{Command, Config, SyncArgs};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("setting default subscriber failed")?;

    let config = Config::parse();

    let result = match config.command {
        Command::Migrate => migrate(config.database_url.as_deref()).await,
        Command::Sync(args) => sync(config.database_url.as_deref(), args).await,
    };

    if let Some(app_error) = result
        .as_ref()
        .err()
        .and_then(|err| err.downcast_ref::<AppError>())
    {
        if app_error.is_cancelled() {
            eprintln!("\n{}", app_error.user_message());
            std::process::exit(130);
        }
        eprintln!("\nError: {}", app_error.user_message());
        std::process::exit(1);
    }
    result
}

async fn connect(database_url: Option<&str>, db_config: &DbConfig) -> anyhow::Result<PgPool> {
    let database_url = database_url
        .filter(|url| !url.trim().is_empty())
        .context("DATABASE_URL is not set")?;

    info!("Connecting to database...");
    PgPoolOptions::new()
        .max_connections(db_config.max_connections)
        .connect(database_url)
        .await
        .context("Failed to connect to database")
}

async fn migrate(database_url: Option<&str>) -> anyhow::Result<()> {
    let db_config = DbConfig::default();
    let pool = connect(database_url, &db_config).await?;
    let repo = StockRepository::with_config(pool, &db_config);

    repo.migrate().await?;
    info!("Migration complete");
    Ok(())
}

async fn sync(database_url: Option<&str>, args: SyncArgs) -> anyhow::Result<()> {
    let sync_config = SyncConfig::default()
        .with_workers(args.workers)
        .with_batch_size(args.batch_size)
        .with_channel_capacity(args.channel_capacity());
    // Bad knobs should fail before any connection is opened.
    sync_config.validate()?;

    let client =
        StockApiClient::with_config(&args.api_endpoint, &args.authentication, HttpConfig::default())?;
    info!("Syncing ratings from {}", client.endpoint());

    let summary = if args.dry_run {
        info!("Dry run: batches will be discarded");
        run_sync(client, NoopStore::<Stock>::new(), sync_config).await?
    } else {
        let db_config = pool_config_for(&sync_config);
        let pool = connect(database_url, &db_config).await?;
        let repo = StockRepository::with_config(pool, &db_config);
        repo.migrate().await?;
        run_sync(client, repo, sync_config).await?
    };

    print_summary(&summary, args.dry_run);
    Ok(())
}

/// One connection per upsert worker, so no batch waits on the pool.
fn pool_config_for(sync_config: &SyncConfig) -> DbConfig {
    let mut db_config = DbConfig::default();
    let workers = u32::try_from(sync_config.workers).unwrap_or(u32::MAX);
    db_config.max_connections = db_config.max_connections.max(workers);
    db_config
}

/// Runs one sync against `store`, cancelling it on Ctrl+C.
async fn run_sync<S>(
    client: StockApiClient,
    store: S,
    sync_config: SyncConfig,
) -> Result<SyncSummary, AppError>
where
    S: RecordStore<Item = Stock>,
{
    let service = SyncService::with_config(client, LoggingStore::new(store), sync_config);

    let cancel_token = CancellationToken::new();
    let ctrl_c_token = cancel_token.clone();
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping after in-flight batches...");
            ctrl_c_token.cancel();
        }
    });

    let result = service
        .sync_with_progress_cancellable(&TracingReporter, cancel_token)
        .await;
    ctrl_c.abort();
    result
}

fn print_summary(summary: &SyncSummary, dry_run: bool) {
    info!("");
    info!("═══════════════════════════════════════════════════════");
    if dry_run {
        info!("DRY RUN COMPLETE (nothing written)");
    } else {
        info!("SYNC COMPLETE");
    }
    info!("═══════════════════════════════════════════════════════");
    info!("  Pages fetched:       {}", summary.pages);
    info!("  Ratings fetched:     {}", summary.items_fetched);
    info!("  Batches upserted:    {}", summary.batches_upserted);
    info!("  Ratings upserted:    {}", summary.items_upserted);
    if summary.cursor_repeated {
        info!("───────────────────────────────────────────────────────");
        info!("  Stopped early: the API repeated a page cursor");
    }
    info!("═══════════════════════════════════════════════════════");
}
