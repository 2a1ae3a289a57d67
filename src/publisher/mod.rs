pub mod store;

use chrono::{DateTime, SecondsFormat, Utc};
use tracing::info;

use crate::config::{FeedMode, FEED_KEY};
use crate::error::Result;
use crate::scorer::select_trending;
use crate::types::{DerivedMarket, FeedDocument};

pub use store::{HttpObjectStore, LocalObjectStore, ObjectStore};

/// Choose and order the markets that make it into the feed.
pub fn rank(markets: Vec<DerivedMarket>, mode: FeedMode) -> Vec<DerivedMarket> {
    match mode {
        FeedMode::Trending => select_trending(markets, |m| &m.trending_score),
        FeedMode::Volume => {
            let mut markets = markets;
            markets.sort_by(|a, b| b.volume.total_cmp(&a.volume));
            markets
        }
    }
}

pub fn build_document(markets: Vec<DerivedMarket>, now: DateTime<Utc>) -> FeedDocument {
    FeedDocument {
        last_updated: now.to_rfc3339_opts(SecondsFormat::Secs, true),
        market_count: markets.len(),
        markets,
    }
}

/// Overwrite the well-known feed key with `doc`.
pub async fn publish(store: &dyn ObjectStore, doc: &FeedDocument) -> Result<()> {
    let body = serde_json::to_vec(doc)?;
    store.put(FEED_KEY, body, "application/json").await?;
    info!("Published {FEED_KEY} with {} markets", doc.market_count);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    use crate::publisher::store::tests::MemoryObjectStore;
    use crate::types::{PriceChanges, TrendingScore};

    fn derived(id: &str, volume: f64, score: f64) -> DerivedMarket {
        DerivedMarket {
            id: id.to_string(),
            question: format!("{id}?"),
            slug: None,
            end_date_iso: None,
            volume,
            liquidity: 0.0,
            outcomes: vec![],
            outcome_prices: vec![],
            neg_risk_market_id: None,
            event_title: None,
            event_slug: None,
            most_likely_outcome: "Yes".to_string(),
            current_probability: 60.0,
            display_probability: 60,
            statement: format!("{id}."),
            category: "Politics".to_string(),
            price_changes: PriceChanges::default(),
            trending_score: TrendingScore { score, is_trending: score >= 15.0, reasons: vec![] },
        }
    }

    fn ids(markets: &[DerivedMarket]) -> Vec<&str> {
        markets.iter().map(|m| m.id.as_str()).collect()
    }

    #[test]
    fn volume_mode_keeps_all_sorted_by_volume() {
        let out = rank(
            vec![derived("a", 10.0, 90.0), derived("b", 30.0, 1.0), derived("c", 20.0, 2.0)],
            FeedMode::Volume,
        );
        assert_eq!(ids(&out), vec!["b", "c", "a"]);
    }

    #[test]
    fn trending_mode_selects_by_score() {
        let out = rank(
            vec![derived("a", 10.0, 20.0), derived("b", 30.0, 1.0), derived("c", 20.0, 40.0)],
            FeedMode::Trending,
        );
        assert_eq!(ids(&out), vec!["c", "a", "b"]);
    }

    #[test]
    fn document_timestamp_has_no_fraction() {
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 8, 5, 9).unwrap()
            + chrono::Duration::milliseconds(789);
        let doc = build_document(vec![derived("a", 1.0, 1.0)], now);
        assert_eq!(doc.last_updated, "2026-10-19T08:05:09Z");
        assert_eq!(doc.market_count, 1);
    }

    #[tokio::test]
    async fn publish_writes_feed_key_as_json() {
        let store = MemoryObjectStore::default();
        let doc = build_document(vec![derived("a", 1.0, 1.0)], Utc::now());
        publish(&store, &doc).await.unwrap();

        let objects = store.objects.lock().unwrap();
        let (body, content_type) = &objects[FEED_KEY];
        assert_eq!(content_type, "application/json");
        let v: serde_json::Value = serde_json::from_slice(body).unwrap();
        assert_eq!(v["marketCount"], 1);
        assert_eq!(v["markets"][0]["id"], "a");
        assert!(v["lastUpdated"].is_string());
    }
}
