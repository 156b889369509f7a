use thiserror::Error;

/// Application-wide error types.
///
/// This enum represents every failure the Stockpile crates can surface. It uses
/// `thiserror` for ergonomic error handling and automatic conversion from the
/// underlying library errors.
///
/// # Error Conversion
///
/// Some errors convert automatically from their source types via `#[from]`:
/// - `sqlx::Error` → `AppError::DatabaseError`
/// - `serde_json::Error` → `AppError::SerializationError`
///
/// # Sync engine taxonomy
///
/// The sync engine surfaces exactly one of these per failed run:
/// - configuration problems (worker count, batch size) → [`AppError::ConfigError`]
/// - provider failures → [`AppError::ClientError`], [`AppError::NetworkError`],
///   [`AppError::Timeout`], [`AppError::RateLimitExceeded`], [`AppError::SerializationError`]
/// - store failures → [`AppError::DatabaseError`]
/// - caller-requested cancellation → [`AppError::Cancelled`]
///
/// # Examples
///
/// ```no_run
/// use stockpile_core::error::AppError;
///
/// fn example() -> Result<(), AppError> {
///     Err(AppError::Generic("Something went wrong".to_string()))
/// }
/// ```
#[derive(Error, Debug)]
pub enum AppError {
    /// Database operation failed.
    ///
    /// Wraps every error from SQLx, including connection failures, query
    /// errors, and constraint violations.
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    /// HTTP request to the ratings API failed or returned an unexpected status.
    #[error("API Client error: {0}")]
    ClientError(String),

    /// JSON serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// URL parsing failed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Network or connection error.
    ///
    /// DNS resolution failures, refused connections, or an unreachable host.
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Request timeout.
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    /// Rate limit exceeded.
    #[error("Rate limit exceeded. Please wait and try again.")]
    RateLimitExceeded,

    /// Invalid configuration, such as a zero worker count or batch size.
    ///
    /// Always detected before any work starts.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The run was cancelled by the caller before it could finish.
    #[error("Sync cancelled")]
    Cancelled,

    /// Generic application error for cases not covered by specific variants.
    #[error("Error: {0}")]
    Generic(String),
}

impl AppError {
    /// Returns a user-friendly error message suitable for CLI output.
    pub fn user_message(&self) -> String {
        match self {
            AppError::DatabaseError(e) => {
                if e.to_string().contains("connection") {
                    "Cannot connect to database. Is CockroachDB/PostgreSQL running?\n   Check DATABASE_URL.".to_string()
                } else {
                    format!("Database error: {}", e)
                }
            }
            AppError::ClientError(msg) => {
                if msg.contains("401") || msg.contains("403") {
                    format!(
                        "The ratings API rejected the credentials: {}\n   Check AUTHENTICATION.",
                        msg
                    )
                } else {
                    format!("API error: {}", msg)
                }
            }
            AppError::NetworkError(msg) => {
                format!(
                    "Network error: {}\n   Check your internet connection and API_ENDPOINT.",
                    msg
                )
            }
            AppError::Timeout(secs) => {
                format!(
                    "Request timed out after {} seconds.\n   The API may be overloaded. Try again later.",
                    secs
                )
            }
            AppError::RateLimitExceeded => {
                "Too many requests. Please wait a moment and try again.".to_string()
            }
            AppError::ConfigError(msg) => {
                format!(
                    "Configuration error: {}\n   Check SYNC_WORKERS and SYNC_BATCH_SIZE.",
                    msg
                )
            }
            AppError::Cancelled => {
                "Sync cancelled. Batches already written were kept; re-running is safe."
                    .to_string()
            }
            _ => self.to_string(),
        }
    }

    /// Returns true if this error is transient and the request may be retried.
    ///
    /// Only the HTTP client consults this; the sync engine never retries.
    ///
    /// # Examples
    ///
    /// ```
    /// use stockpile_core::error::AppError;
    ///
    /// let err = AppError::NetworkError("connection reset".to_string());
    /// assert!(err.is_retryable());
    ///
    /// let err = AppError::ConfigError("workers must be > 0".to_string());
    /// assert!(!err.is_retryable());
    /// ```
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AppError::NetworkError(_) | AppError::Timeout(_) | AppError::RateLimitExceeded
        )
    }

    /// Returns true if this error is the caller-requested cancellation marker.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, AppError::Cancelled)
    }
}
