use std::collections::HashMap;

use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use tracing::{debug, info, warn};

use crate::config::SNAPSHOT_RETENTION_DAYS;
use crate::db::models::{SnapshotEntry, SnapshotRow};
use crate::error::Result;
use crate::history::{pick_snapshots, HistoricalPrices, Horizon};
use crate::types::RawMarket;

const KEY_FORMAT: &str = "%Y-%m-%d_%H-%M";

/// Minute-resolution snapshot key. Lexicographic order equals time order.
pub fn snapshot_key(at: DateTime<Utc>) -> String {
    at.format(KEY_FORMAT).to_string()
}

pub fn parse_snapshot_key(key: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(key, KEY_FORMAT)
        .ok()
        .map(|dt| dt.and_utc())
}

/// Persists one price snapshot per run and answers horizon lookups.
#[derive(Clone)]
pub struct SnapshotStore {
    pool: sqlx::SqlitePool,
}

impl SnapshotStore {
    pub fn new(pool: sqlx::SqlitePool) -> Self {
        Self { pool }
    }

    /// Store `{id, outcomePrices}` for every fetched market under the current
    /// minute, then drop snapshots past retention.
    pub async fn write(&self, now: DateTime<Utc>, markets: &[RawMarket]) -> Result<()> {
        let entries: Vec<SnapshotEntry> = markets
            .iter()
            .map(|m| SnapshotEntry {
                id: m.id.clone(),
                outcome_prices: m.outcome_prices.clone(),
            })
            .collect();
        let key = snapshot_key(now);
        let json = serde_json::to_string(&entries)?;

        sqlx::query("INSERT OR REPLACE INTO snapshots (timestamp, markets_json) VALUES (?, ?)")
            .bind(&key)
            .bind(&json)
            .execute(&self.pool)
            .await?;
        info!("Saved snapshot {key} ({} markets)", entries.len());

        let purged = self.purge(now).await?;
        if purged > 0 {
            info!("Purged {purged} snapshots older than {SNAPSHOT_RETENTION_DAYS} days");
        }
        Ok(())
    }

    pub async fn purge(&self, now: DateTime<Utc>) -> Result<u64> {
        let cutoff = snapshot_key(now - Duration::days(SNAPSHOT_RETENTION_DAYS));
        let result = sqlx::query("DELETE FROM snapshots WHERE timestamp < ?")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Load, for each horizon, the closest snapshot at least that old.
    pub async fn load_history(&self, now: DateTime<Utc>) -> Result<HistoricalPrices> {
        let keys: Vec<String> =
            sqlx::query_scalar("SELECT timestamp FROM snapshots ORDER BY timestamp DESC")
                .fetch_all(&self.pool)
                .await?;

        let dated: Vec<(DateTime<Utc>, &str)> = keys
            .iter()
            .filter_map(|k| match parse_snapshot_key(k) {
                Some(ts) => Some((ts, k.as_str())),
                None => {
                    warn!("Ignoring snapshot with malformed key {k:?}");
                    None
                }
            })
            .collect();
        let stamps: Vec<DateTime<Utc>> = dated.iter().map(|(ts, _)| *ts).collect();
        let picks = pick_snapshots(now, &stamps);

        let mut history = HistoricalPrices::default();
        let mut decoded: HashMap<usize, HashMap<String, Vec<String>>> = HashMap::new();
        for (horizon, pick) in Horizon::ALL.into_iter().zip(picks) {
            let Some(pos) = pick else { continue };
            if !decoded.contains_key(&pos) {
                let prices = self.load_prices(dated[pos].1).await?;
                decoded.insert(pos, prices);
            }
            if let Some(prices) = decoded.get(&pos) {
                debug!("{horizon} snapshot: {}", dated[pos].1);
                history.set(horizon, prices.clone());
            }
        }

        let loaded = history.loaded();
        if !loaded.is_empty() {
            let names: Vec<String> = loaded.iter().map(|h| h.to_string()).collect();
            info!("Loaded snapshots: {}", names.join(", "));
        }
        Ok(history)
    }

    async fn load_prices(&self, key: &str) -> Result<HashMap<String, Vec<String>>> {
        let row: SnapshotRow =
            sqlx::query_as("SELECT markets_json FROM snapshots WHERE timestamp = ?")
                .bind(key)
                .fetch_one(&self.pool)
                .await?;
        let entries: Vec<SnapshotEntry> = serde_json::from_str(&row.markets_json)?;
        Ok(entries.into_iter().map(|e| (e.id, e.outcome_prices)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;
    use chrono::TimeZone;

    fn raw(id: &str, first_price: &str) -> RawMarket {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "question": "q",
            "outcomes": ["Yes", "No"],
            "outcomePrices": [first_price, "0.5"],
        }))
        .unwrap()
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 30).unwrap()
    }

    #[test]
    fn key_round_trips_at_minute_resolution() {
        let key = snapshot_key(t0());
        assert_eq!(key, "2026-03-01_00-00");
        assert_eq!(parse_snapshot_key(&key), Some(Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap()));
        assert!(parse_snapshot_key("yesterday").is_none());
    }

    #[tokio::test]
    async fn stores_only_ids_and_prices() {
        let store = SnapshotStore::new(test_pool().await);
        store.write(t0(), &[raw("a", "0.4")]).await.unwrap();

        let json: String = sqlx::query_scalar("SELECT markets_json FROM snapshots")
            .fetch_one(&store.pool)
            .await
            .unwrap();
        let v: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(v, serde_json::json!([{"id": "a", "outcomePrices": ["0.4", "0.5"]}]));
    }

    #[tokio::test]
    async fn same_minute_write_replaces() {
        let store = SnapshotStore::new(test_pool().await);
        store.write(t0(), &[raw("a", "0.4")]).await.unwrap();
        store.write(t0() + Duration::seconds(20), &[raw("a", "0.6")]).await.unwrap();

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM snapshots")
            .fetch_one(&store.pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn write_purges_expired_snapshots() {
        let store = SnapshotStore::new(test_pool().await);
        store.write(t0(), &[raw("a", "0.4")]).await.unwrap();
        store.write(t0() + Duration::days(29), &[raw("a", "0.5")]).await.unwrap();
        store.write(t0() + Duration::days(31), &[raw("a", "0.6")]).await.unwrap();

        let keys: Vec<String> = sqlx::query_scalar("SELECT timestamp FROM snapshots ORDER BY timestamp")
            .fetch_all(&store.pool)
            .await
            .unwrap();
        assert_eq!(keys, vec!["2026-03-30_00-00", "2026-04-01_00-00"]);
    }

    #[tokio::test]
    async fn history_uses_closest_qualifying_snapshot() {
        let store = SnapshotStore::new(test_pool().await);
        let now = t0() + Duration::days(8);
        store.write(now - Duration::days(8), &[raw("a", "0.10")]).await.unwrap();
        store.write(now - Duration::days(2), &[raw("a", "0.30")]).await.unwrap();
        store.write(now - Duration::minutes(90), &[raw("a", "0.45")]).await.unwrap();
        store.write(now - Duration::minutes(70), &[raw("a", "0.50")]).await.unwrap();
        store.write(now, &[raw("a", "0.60")]).await.unwrap();

        let history = store.load_history(now).await.unwrap();
        let changes = history.price_changes("a", &["0.60".to_string(), "0.40".to_string()]);
        assert_eq!(changes.hour1, Some(10.0));
        assert_eq!(changes.hours24, Some(30.0));
        assert_eq!(changes.days7, Some(50.0));
        assert_eq!(history.price_changes("missing", &["0.6".to_string()]).hour1, None);
    }

    #[tokio::test]
    async fn empty_store_yields_no_history() {
        let store = SnapshotStore::new(test_pool().await);
        let history = store.load_history(t0()).await.unwrap();
        assert!(history.loaded().is_empty());
    }
}
