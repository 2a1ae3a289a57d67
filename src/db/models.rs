/// Database row types matching `migrations/0001_init.sql`.
use serde::{Deserialize, Serialize};

#[derive(Debug, sqlx::FromRow)]
pub struct SnapshotRow {
    pub markets_json: String,
}

/// One element of `snapshots.markets_json`: only what price deltas need.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotEntry {
    pub id: String,
    pub outcome_prices: Vec<String>,
}

#[derive(Debug, sqlx::FromRow)]
pub struct RedundancyRow {
    pub market_id: String,
    pub redundant_of: Option<String>,
    pub reason: String,
}

#[derive(Debug, sqlx::FromRow)]
pub struct StatementRow {
    pub market_id: String,
    pub statement: String,
    pub category: String,
    pub most_likely_outcome: String,
}
