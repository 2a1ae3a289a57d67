//! Persistent per-market caches for the two oracle-backed stages.
//! Each exposes point lookup, a full load for a run, and a grouped upsert.

use std::collections::HashMap;

use crate::db::models::{RedundancyRow, StatementRow};
use crate::error::Result;
use crate::types::Statement;

/// Marker stored in `redundancy_cache.redundant_of` for dropped markets.
const REDUNDANT_MARKER: &str = "redundant";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedundancyDecision {
    pub redundant: bool,
    pub reason: String,
}

impl RedundancyDecision {
    pub fn unique(reason: impl Into<String>) -> Self {
        Self { redundant: false, reason: reason.into() }
    }

    pub fn redundant(reason: impl Into<String>) -> Self {
        Self { redundant: true, reason: reason.into() }
    }
}

impl From<RedundancyRow> for RedundancyDecision {
    fn from(row: RedundancyRow) -> Self {
        Self { redundant: row.redundant_of.is_some(), reason: row.reason }
    }
}

#[derive(Clone)]
pub struct RedundancyCache {
    pool: sqlx::SqlitePool,
}

impl RedundancyCache {
    pub fn new(pool: sqlx::SqlitePool) -> Self {
        Self { pool }
    }

    #[cfg(test)]
    pub async fn get(&self, market_id: &str) -> Result<Option<RedundancyDecision>> {
        let row: Option<RedundancyRow> = sqlx::query_as(
            "SELECT market_id, redundant_of, reason FROM redundancy_cache WHERE market_id = ?",
        )
        .bind(market_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(RedundancyDecision::from))
    }

    pub async fn load_all(&self) -> Result<HashMap<String, RedundancyDecision>> {
        let rows: Vec<RedundancyRow> =
            sqlx::query_as("SELECT market_id, redundant_of, reason FROM redundancy_cache")
                .fetch_all(&self.pool)
                .await?;
        Ok(rows
            .into_iter()
            .map(|row| (row.market_id.clone(), RedundancyDecision::from(row)))
            .collect())
    }

    pub async fn batch_upsert(&self, entries: &[(String, RedundancyDecision)]) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }
        let mut tx = self.pool.begin().await?;
        for (market_id, decision) in entries {
            sqlx::query(
                "INSERT OR REPLACE INTO redundancy_cache (market_id, redundant_of, reason) VALUES (?, ?, ?)",
            )
            .bind(market_id)
            .bind(decision.redundant.then_some(REDUNDANT_MARKER))
            .bind(&decision.reason)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }
}

/// A generated statement and the outcome it was written for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedStatement {
    pub statement: Statement,
    pub outcome: String,
}

impl From<StatementRow> for CachedStatement {
    fn from(row: StatementRow) -> Self {
        Self {
            statement: Statement { statement: row.statement, category: row.category },
            outcome: row.most_likely_outcome,
        }
    }
}

#[derive(Clone)]
pub struct StatementCache {
    pool: sqlx::SqlitePool,
}

impl StatementCache {
    pub fn new(pool: sqlx::SqlitePool) -> Self {
        Self { pool }
    }

    #[cfg(test)]
    pub async fn get(&self, market_id: &str) -> Result<Option<CachedStatement>> {
        let row: Option<StatementRow> = sqlx::query_as(
            "SELECT market_id, statement, category, most_likely_outcome FROM statement_cache WHERE market_id = ?",
        )
        .bind(market_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(CachedStatement::from))
    }

    pub async fn load_all(&self) -> Result<HashMap<String, CachedStatement>> {
        let rows: Vec<StatementRow> = sqlx::query_as(
            "SELECT market_id, statement, category, most_likely_outcome FROM statement_cache",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|row| (row.market_id.clone(), CachedStatement::from(row)))
            .collect())
    }

    pub async fn batch_upsert(&self, entries: &[(String, CachedStatement)]) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }
        let mut tx = self.pool.begin().await?;
        for (market_id, cached) in entries {
            sqlx::query(
                r#"
                INSERT OR REPLACE INTO statement_cache (market_id, statement, category, most_likely_outcome)
                VALUES (?, ?, ?, ?)
                "#,
            )
            .bind(market_id)
            .bind(&cached.statement.statement)
            .bind(&cached.statement.category)
            .bind(&cached.outcome)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }
}
