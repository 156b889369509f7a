use clap::{Args, Parser, Subcommand};

/// CLI configuration parsed from command line arguments and environment variables
#[derive(Parser, Debug)]
#[command(name = "stockpile")]
#[command(
    author,
    version,
    about = "Pages through the stock ratings API and upserts every rating into CockroachDB/PostgreSQL"
)]
#[command(after_help = "Examples:
  stockpile migrate
  stockpile sync
  stockpile sync --workers 10 --batch-size 500
  stockpile sync --dry-run

Variables are read from the environment or a .env file:
  DATABASE_URL, API_ENDPOINT, AUTHENTICATION,
  SYNC_WORKERS, SYNC_BATCH_SIZE, SYNC_CHANNEL_CAPACITY")]
pub struct Config {
    /// PostgreSQL / CockroachDB connection URL
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    pub database_url: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Fetch every page from the ratings API and upsert it
    #[command(after_help = "Examples:
  stockpile sync                       # Defaults: 5 workers, batches of 100
  stockpile sync -w 10 -b 500          # More parallel writers, larger batches
  stockpile sync --dry-run             # Walk the API without touching the database")]
    Sync(SyncArgs),
    /// Create the stocks table if it does not exist
    Migrate,
}

#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Ratings list endpoint
    #[arg(long, env = "API_ENDPOINT")]
    pub api_endpoint: String,

    /// API token, sent as a bearer token
    #[arg(long, env = "AUTHENTICATION", hide_env_values = true, default_value = "")]
    pub authentication: String,

    /// Number of concurrent upsert workers
    #[arg(short, long, env = "SYNC_WORKERS", default_value = "5")]
    pub workers: usize,

    /// Items per upsert batch
    #[arg(short, long, env = "SYNC_BATCH_SIZE", default_value = "100")]
    pub batch_size: usize,

    /// Batches that may wait for a worker; defaults to the worker count
    #[arg(long, env = "SYNC_CHANNEL_CAPACITY")]
    pub channel_capacity: Option<usize>,

    /// Walk the API and batch items without writing them
    #[arg(long)]
    pub dry_run: bool,
}

impl SyncArgs {
    pub fn channel_capacity(&self) -> usize {
        self.channel_capacity.unwrap_or(self.workers)
    }
}
