use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::{info, warn};

use crate::db::{RedundancyCache, RedundancyDecision};
use crate::oracle::{MarketDigest, Oracle};
use crate::types::Market;

/// Removes markets the oracle judges logically implied by another market.
/// Decisions are sticky: a market is evaluated once, ever.
pub struct SemanticDeduper {
    cache: RedundancyCache,
    oracle: Arc<dyn Oracle>,
}

impl SemanticDeduper {
    pub fn new(cache: RedundancyCache, oracle: Arc<dyn Oracle>) -> Self {
        Self { cache, oracle }
    }

    pub async fn dedupe(&self, markets: Vec<Market>) -> Vec<Market> {
        let known = match self.cache.load_all().await {
            Ok(k) => k,
            Err(e) => {
                warn!("Redundancy cache unavailable, treating all markets as new: {e}");
                HashMap::new()
            }
        };

        let mut survivors = Vec::new();
        let mut fresh = Vec::new();
        let mut cached_redundant = 0usize;
        for market in markets {
            match known.get(&market.id) {
                Some(d) if d.redundant => cached_redundant += 1,
                Some(_) => survivors.push(market),
                None => fresh.push(market),
            }
        }
        info!(
            "Redundancy cache: {} kept, {cached_redundant} dropped, {} new",
            survivors.len(),
            fresh.len()
        );

        if fresh.is_empty() {
            return survivors;
        }

        let decisions = self.evaluate(&survivors, &fresh).await;
        // Persist before filtering so a later failure in the run keeps this progress.
        if let Err(e) = self.cache.batch_upsert(&decisions).await {
            warn!("Failed to save redundancy decisions: {e}");
        }

        let mut newly_redundant = 0usize;
        for (market, (_, decision)) in fresh.into_iter().zip(&decisions) {
            if decision.redundant {
                newly_redundant += 1;
            } else {
                survivors.push(market);
            }
        }
        info!("Semantic dedup removed {newly_redundant} new markets, {} remain", survivors.len());
        survivors
    }

    /// One decision per `fresh` market, in order. Oracle failure marks every
    /// market not redundant.
    async fn evaluate(
        &self,
        reference: &[Market],
        fresh: &[Market],
    ) -> Vec<(String, RedundancyDecision)> {
        let reference: Vec<MarketDigest> = reference.iter().map(MarketDigest::from).collect();
        let candidates: Vec<MarketDigest> = fresh.iter().map(MarketDigest::from).collect();
        info!("Checking {} new markets for redundancy...", candidates.len());

        match self.oracle.find_redundant(&reference, &candidates).await {
            Ok(verdict) => {
                let redundant: HashSet<&str> =
                    verdict.redundant_market_ids.iter().map(String::as_str).collect();
                fresh
                    .iter()
                    .enumerate()
                    .map(|(i, m)| {
                        let decision = if redundant.contains(m.id.as_str()) {
                            let reason = verdict
                                .reasoning
                                .get(i)
                                .filter(|r| !r.is_empty())
                                .cloned()
                                .unwrap_or_else(|| "redundant".to_string());
                            RedundancyDecision::redundant(reason)
                        } else {
                            RedundancyDecision::unique("not redundant")
                        };
                        (m.id.clone(), decision)
                    })
                    .collect()
            }
            Err(e) => {
                warn!("Redundancy oracle failed, keeping all {} new markets: {e}", fresh.len());
                fresh
                    .iter()
                    .map(|m| (m.id.clone(), RedundancyDecision::unique(format!("error: {e}"))))
                    .collect()
            }
        }
    }
}
