use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use crate::classifier::Classifier;
use crate::config::{Eligibility, FeedMode};
use crate::db::SnapshotStore;
use crate::dedup::{collapse_groups, SemanticDeduper};
use crate::error::{AppError, Result};
use crate::fetcher::{fetch_markets, FetchSettings};
use crate::history::HistoricalPrices;
use crate::market::select_eligible;
use crate::publisher::{build_document, publish, rank, ObjectStore};
use crate::scorer;
use crate::types::DerivedMarket;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub fetched: usize,
    pub eligible: usize,
    pub published: usize,
    pub trending: usize,
}

/// fetch → snapshot → structural dedup → semantic dedup → classify → score → publish.
pub struct Pipeline {
    http: reqwest::Client,
    fetch: FetchSettings,
    eligibility: Eligibility,
    feed_mode: FeedMode,
    snapshots: SnapshotStore,
    semantic: SemanticDeduper,
    classifier: Classifier,
    store: Arc<dyn ObjectStore>,
}

impl Pipeline {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        http: reqwest::Client,
        fetch: FetchSettings,
        eligibility: Eligibility,
        feed_mode: FeedMode,
        snapshots: SnapshotStore,
        semantic: SemanticDeduper,
        classifier: Classifier,
        store: Arc<dyn ObjectStore>,
    ) -> Self {
        Self { http, fetch, eligibility, feed_mode, snapshots, semantic, classifier, store }
    }

    pub async fn run_once(&self) -> Result<RunSummary> {
        self.run_at(Utc::now()).await
    }

    async fn run_at(&self, now: DateTime<Utc>) -> Result<RunSummary> {
        let raw = fetch_markets(&self.http, &self.fetch).await;
        let fetched = raw.len();
        info!("Fetched {fetched} markets");
        if raw.is_empty() {
            return Err(AppError::EmptyFetch);
        }

        if let Err(e) = self.snapshots.write(now, &raw).await {
            warn!("Error saving snapshot: {e}");
        }
        let history = match self.snapshots.load_history(now).await {
            Ok(h) => h,
            Err(e) => {
                warn!("Error loading snapshots: {e}");
                HistoricalPrices::default()
            }
        };

        let (markets, stats) = select_eligible(raw, &self.eligibility, now);
        let eligible = markets.len();
        info!(
            "[FILTER] {fetched} → {eligible} markets (unparseable={} inactive={} end_date={} no={} low_prob={})",
            stats.unparseable,
            stats.inactive,
            stats.end_date,
            stats.negative_outcome,
            stats.low_probability,
        );

        let markets = collapse_groups(markets);
        info!("After related dedup: {} markets", markets.len());

        let markets = self.semantic.dedupe(markets).await;
        info!("After semantic dedup: {} markets", markets.len());

        let derived: Vec<DerivedMarket> = self
            .classifier
            .classify(markets)
            .await
            .into_iter()
            .map(|(market, statement)| {
                let changes = history.price_changes(&market.id, &market.outcome_prices);
                let trending = scorer::score(market.probability, &changes, market.volume);
                DerivedMarket::new(market, statement, changes, trending)
            })
            .collect();

        let ranked = rank(derived, self.feed_mode);
        let trending = ranked.iter().filter(|m| m.trending_score.is_trending).count();
        let doc = build_document(ranked, Utc::now());
        publish(self.store.as_ref(), &doc).await?;

        let summary = RunSummary { fetched, eligible, published: doc.market_count, trending };
        info!(
            fetched = summary.fetched,
            eligible = summary.eligible,
            published = summary.published,
            trending = summary.trending,
            "Run complete: {} markets published ({} trending)",
            summary.published,
            summary.trending,
        );
        Ok(summary)
    }
}

/// Run the pipeline immediately and then every `period`.
pub async fn run_on_interval(pipeline: Arc<Pipeline>, period: Duration) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        info!("Scheduled run triggered");
        if let Err(e) = pipeline.run_once().await {
            error!("Scheduled run failed: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    use chrono::TimeZone;

    use crate::classifier::ClassifierConfig;
    use crate::config::FEED_KEY;
    use crate::db::{test_pool, RedundancyCache, StatementCache};
    use crate::fetcher::http_client;
    use crate::fetcher::tests::{spawn_upstream, Upstream};
    use crate::oracle::mock::MockOracle;
    use crate::publisher::store::tests::MemoryObjectStore;
    use crate::types::FeedDocument;

    const RULES: Eligibility = Eligibility { min_probability: 55.0, max_days_to_end: 365_000.0 };

    struct Harness {
        pipeline: Pipeline,
        oracle: Arc<MockOracle>,
        store: Arc<MemoryObjectStore>,
        pool: sqlx::SqlitePool,
    }

    async fn harness(url: String, oracle: MockOracle) -> Harness {
        let pool = test_pool().await;
        let oracle = Arc::new(oracle);
        let store = Arc::new(MemoryObjectStore::default());
        let pipeline = Pipeline::new(
            http_client().unwrap(),
            FetchSettings::new(url),
            RULES,
            FeedMode::Trending,
            SnapshotStore::new(pool.clone()),
            SemanticDeduper::new(RedundancyCache::new(pool.clone()), oracle.clone()),
            Classifier::new(StatementCache::new(pool.clone()), oracle.clone(), ClassifierConfig::default()),
            store.clone(),
        );
        Harness { pipeline, oracle, store, pool }
    }

    fn published(store: &MemoryObjectStore) -> FeedDocument {
        let objects = store.objects.lock().unwrap();
        serde_json::from_slice(&objects[FEED_KEY].0).unwrap()
    }

    async fn count(pool: &sqlx::SqlitePool, table: &str) -> i64 {
        sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(pool)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn full_run_publishes_backfilled_feed() {
        let up = Upstream { total: 7, fail_at_offset: None, requests: Arc::new(AtomicUsize::new(0)) };
        let url = spawn_upstream(up).await;
        let h = harness(url, MockOracle::with_verdict(&["m6"], &[])).await;
        *h.oracle.statements.lock().unwrap() = Some(vec![]);

        let now = Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0).unwrap();
        let summary = h.pipeline.run_at(now).await.unwrap();
        assert_eq!(summary.fetched, 7);
        assert_eq!(summary.eligible, 7);

        // Every market scores round(H(0.7)·20) = 18 with no history, so all
        // six survivors are trending and all are kept.
        let doc = published(&h.store);
        assert_eq!(doc.market_count, 6);
        assert_eq!(summary.published, 6);
        assert!(doc.markets.iter().all(|m| m.trending_score.score == 18.0));
        assert!(doc.markets.iter().all(|m| m.price_changes.hour1.is_none()));
        assert!(doc.markets.iter().all(|m| m.statement.starts_with("Will event")
            && !m.statement.ends_with('?')));
        assert!(doc.markets.iter().all(|m| m.id != "m6"));

        assert_eq!(count(&h.pool, "snapshots").await, 1);
        assert_eq!(count(&h.pool, "redundancy_cache").await, 7);
        assert_eq!(h.oracle.redundancy_calls(), 1);
    }

    #[tokio::test]
    async fn second_run_sees_price_history_and_reuses_caches() {
        let up = Upstream { total: 3, fail_at_offset: None, requests: Arc::new(AtomicUsize::new(0)) };
        let url = spawn_upstream(up).await;
        let h = harness(url, MockOracle::with_verdict(&[], &[])).await;
        *h.oracle.statements.lock().unwrap() = Some(vec![
            crate::types::Statement { statement: "E0 will happen.".into(), category: "Science".into() },
            crate::types::Statement { statement: "E1 will happen.".into(), category: "Science".into() },
            crate::types::Statement { statement: "E2 will happen.".into(), category: "Science".into() },
        ]);

        let t0 = Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0).unwrap();
        h.pipeline.run_at(t0).await.unwrap();
        h.pipeline.run_at(t0 + chrono::Duration::hours(2)).await.unwrap();

        assert_eq!(h.oracle.redundancy_calls(), 1);
        assert_eq!(h.oracle.statement_calls(), 1);
        let doc = published(&h.store);
        assert_eq!(doc.market_count, 3);
        assert!(doc.markets.iter().all(|m| m.price_changes.hour1 == Some(0.0)));
        assert!(doc.markets.iter().all(|m| m.price_changes.hours24.is_none()));
        assert_eq!(doc.markets[0].category, "Science");
    }

    #[tokio::test]
    async fn empty_fetch_aborts_without_side_effects() {
        let up = Upstream { total: 0, fail_at_offset: None, requests: Arc::new(AtomicUsize::new(0)) };
        let url = spawn_upstream(up).await;
        let h = harness(url, MockOracle::default()).await;

        let err = h.pipeline.run_at(Utc::now()).await.unwrap_err();
        assert!(matches!(err, AppError::EmptyFetch));
        assert_eq!(count(&h.pool, "snapshots").await, 0);
        assert_eq!(*h.store.puts.lock().unwrap(), 0);
        assert_eq!(h.oracle.redundancy_calls(), 0);
    }
}
