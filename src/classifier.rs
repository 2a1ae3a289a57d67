use std::collections::HashMap;
use std::sync::Arc;

use tracing::{info, warn};

use crate::config::{CATEGORIES, FALLBACK_CATEGORY};
use crate::db::{CachedStatement, StatementCache};
use crate::oracle::{Oracle, StatementRequest};
use crate::types::{Market, Statement};

/// Category vocabulary handed to the classifier.
#[derive(Debug, Clone, Copy)]
pub struct ClassifierConfig {
    pub categories: &'static [&'static str],
    pub fallback_category: &'static str,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self { categories: CATEGORIES, fallback_category: FALLBACK_CATEGORY }
    }
}

/// Attaches a declarative statement and a category to each market, reusing
/// cached statements while the market's leading outcome is unchanged.
pub struct Classifier {
    cache: StatementCache,
    oracle: Arc<dyn Oracle>,
    config: ClassifierConfig,
}

impl Classifier {
    pub fn new(cache: StatementCache, oracle: Arc<dyn Oracle>, config: ClassifierConfig) -> Self {
        Self { cache, oracle, config }
    }

    pub async fn classify(&self, markets: Vec<Market>) -> Vec<(Market, Statement)> {
        let known = match self.cache.load_all().await {
            Ok(k) => k,
            Err(e) => {
                warn!("Statement cache unavailable, regenerating all: {e}");
                HashMap::new()
            }
        };

        let mut statements: Vec<Option<Statement>> = markets
            .iter()
            .map(|m| {
                known
                    .get(&m.id)
                    .filter(|c| c.outcome == m.most_likely_outcome)
                    .map(|c| c.statement.clone())
            })
            .collect();

        let pending: Vec<usize> = statements
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_none())
            .map(|(i, _)| i)
            .collect();

        if !pending.is_empty() {
            info!("Generating {} statements via oracle...", pending.len());
            let requests: Vec<StatementRequest> =
                pending.iter().map(|&i| StatementRequest::from(&markets[i])).collect();

            let generated = match self.oracle.generate_statements(&requests, self.config.categories).await {
                Ok(mut out) => {
                    if out.len() < requests.len() {
                        warn!(
                            "Oracle returned {} of {} statements, filling the rest from questions",
                            out.len(),
                            requests.len()
                        );
                    }
                    out.truncate(requests.len());
                    out
                }
                Err(e) => {
                    warn!("Statement oracle failed, using question text: {e}");
                    Vec::new()
                }
            };

            let mut fresh = Vec::with_capacity(generated.len());
            for (slot, &idx) in pending.iter().enumerate() {
                let market = &markets[idx];
                let statement = match generated.get(slot) {
                    Some(s) => {
                        fresh.push((
                            market.id.clone(),
                            CachedStatement {
                                statement: s.clone(),
                                outcome: market.most_likely_outcome.clone(),
                            },
                        ));
                        s.clone()
                    }
                    None => self.fallback(market),
                };
                statements[idx] = Some(statement);
            }

            if let Err(e) = self.cache.batch_upsert(&fresh).await {
                warn!("Failed to save statements: {e}");
            }
        }

        markets
            .into_iter()
            .zip(statements)
            .map(|(m, s)| {
                let statement = s.unwrap_or_else(|| self.fallback(&m));
                (m, statement)
            })
            .collect()
    }

    fn fallback(&self, market: &Market) -> Statement {
        Statement {
            statement: fallback_statement(&market.question),
            category: self.config.fallback_category.to_string(),
        }
    }
}

/// The question text with one trailing question mark removed.
pub fn fallback_statement(question: &str) -> String {
    let trimmed = question.trim_end();
    trimmed.strip_suffix('?').unwrap_or(trimmed).to_string()
}
