use crate::error::{AppError, Result};

pub const POLYMARKET_API_URL: &str = "https://gamma-api.polymarket.com/markets";
pub const ORACLE_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const ORACLE_MODEL: &str = "gemini-2.5-flash-lite";

/// Records requested per upstream page. A shorter page means end of data.
pub const API_PAGE_LIMIT: usize = 100;

/// Hard cap on pages per run, so at most `API_PAGE_LIMIT * MAX_PAGES` markets.
pub const MAX_PAGES: usize = 5;

/// Per-request timeout for upstream, oracle and object-store calls (seconds).
pub const HTTP_TIMEOUT_SECS: u64 = 30;

/// Snapshots older than this are purged after every write.
pub const SNAPSHOT_RETENTION_DAYS: i64 = 30;

/// Object-store key of the published feed.
pub const FEED_KEY: &str = "markets.json";

/// Category assigned when the oracle cannot produce one.
pub const FALLBACK_CATEGORY: &str = "Uncategorized";

/// Categories the statement oracle may choose from.
pub const CATEGORIES: &[&str] = &[
    "Politics",
    "Sports",
    "Crypto",
    "Economics",
    "Business",
    "Entertainment",
    "Geopolitics",
    "Technology",
    "Science",
    "Pop Culture",
    "Legal",
    "Conspiracy",
];

/// Trending score weights and cutoffs.
pub mod trending {
    pub const MOMENTUM_CAP: f64 = 40.0;
    pub const MOMENTUM_HOUR_WEIGHT: f64 = 3.0;
    pub const MOMENTUM_SCALE: f64 = 2.0;
    pub const ENTROPY_WEIGHT: f64 = 20.0;
    pub const CROSSING_THRESHOLDS: &[f64] = &[25.0, 50.0, 75.0];
    pub const CROSSING_BONUS: f64 = 20.0;
    /// (minimum volume, bonus), checked top-down.
    pub const VOLUME_TIERS: &[(f64, f64)] = &[(1_000_000.0, 10.0), (100_000.0, 5.0), (10_000.0, 2.0)];
    pub const SUSTAINED_MIN_WEEKLY_MOVE: f64 = 5.0;
    pub const SUSTAINED_BONUS: f64 = 10.0;
    pub const EXTREME_HIGH: f64 = 90.0;
    pub const EXTREME_LOW: f64 = 10.0;
    pub const EXTREME_PENALTY: f64 = 0.5;
    pub const TRENDING_MIN_SCORE: f64 = 15.0;
    /// Below this many trending markets the feed is backfilled...
    pub const MIN_TRENDING: usize = 3;
    /// ...up to this many markets in total.
    pub const BACKFILL_TOTAL: usize = 5;
}

/// How the published feed is selected and ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedMode {
    /// Trending selection, ordered by trending score.
    Trending,
    /// Every processed market, ordered by volume.
    Volume,
}

impl std::str::FromStr for FeedMode {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "trending" => Ok(FeedMode::Trending),
            "volume" => Ok(FeedMode::Volume),
            other => Err(AppError::Config(format!(
                "FEED_MODE must be 'trending' or 'volume', got '{other}'"
            ))),
        }
    }
}

/// Which markets enter the pipeline after parsing.
#[derive(Debug, Clone, Copy)]
pub struct Eligibility {
    /// Minimum leading-outcome probability, 0–100 (MIN_PROBABILITY).
    pub min_probability: f64,
    /// Market must end within (0, N] days (MAX_DAYS_TO_END).
    pub max_days_to_end: f64,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub api_url: String,
    pub log_level: String,
    pub db_path: String,
    pub api_port: u16,
    /// Timer trigger period; 0 disables the timer (RUN_INTERVAL_SECS).
    pub run_interval_secs: u64,
    pub google_api_key: String,
    pub oracle_model: String,
    pub oracle_api_url: String,
    /// Local object-store root, used when OBJECT_STORE_URL is unset.
    pub output_dir: String,
    pub object_store_url: Option<String>,
    pub object_store_token: Option<String>,
    pub feed_mode: FeedMode,
    pub eligibility: Eligibility,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            api_url: std::env::var("POLYMARKET_API_URL")
                .unwrap_or_else(|_| POLYMARKET_API_URL.to_string()),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            db_path: std::env::var("DB_PATH").unwrap_or_else(|_| "digest.db".to_string()),
            api_port: std::env::var("API_PORT")
                .unwrap_or_else(|_| "8787".to_string())
                .parse::<u16>()
                .map_err(|_| AppError::Config("API_PORT must be a valid port number".to_string()))?,
            run_interval_secs: std::env::var("RUN_INTERVAL_SECS")
                .unwrap_or_else(|_| "900".to_string())
                .parse::<u64>()
                .unwrap_or(900),
            google_api_key: std::env::var("GOOGLE_API_KEY").map_err(|_| {
                AppError::Config("GOOGLE_API_KEY must be set for the statement oracle".to_string())
            })?,
            oracle_model: std::env::var("ORACLE_MODEL")
                .unwrap_or_else(|_| ORACLE_MODEL.to_string()),
            oracle_api_url: std::env::var("ORACLE_API_URL")
                .unwrap_or_else(|_| ORACLE_API_URL.to_string()),
            output_dir: std::env::var("OUTPUT_DIR").unwrap_or_else(|_| "public".to_string()),
            object_store_url: non_empty_var("OBJECT_STORE_URL"),
            object_store_token: non_empty_var("OBJECT_STORE_TOKEN"),
            feed_mode: std::env::var("FEED_MODE")
                .unwrap_or_else(|_| "trending".to_string())
                .parse()?,
            eligibility: Eligibility {
                min_probability: std::env::var("MIN_PROBABILITY")
                    .unwrap_or_else(|_| "55".to_string())
                    .parse::<f64>()
                    .unwrap_or(55.0),
                max_days_to_end: std::env::var("MAX_DAYS_TO_END")
                    .unwrap_or_else(|_| "90".to_string())
                    .parse::<f64>()
                    .unwrap_or(90.0),
            },
        })
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feed_mode_parses_case_insensitively() {
        assert_eq!("Trending".parse::<FeedMode>().unwrap(), FeedMode::Trending);
        assert_eq!(" volume ".parse::<FeedMode>().unwrap(), FeedMode::Volume);
        assert!("newest".parse::<FeedMode>().is_err());
    }
}
