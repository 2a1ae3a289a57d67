use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Upstream fetch error at offset {offset}: {reason}")]
    UpstreamFetch { offset: usize, reason: String },

    #[error("Upstream returned no markets")]
    EmptyFetch,

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Database migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Oracle error: {0}")]
    Oracle(String),

    #[error("Parse error for market {market_id}: {reason}")]
    Parse { market_id: String, reason: String },

    #[error("Object store error: {0}")]
    ObjectStore(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;
