//! The external text-classification capability used by semantic dedup and
//! statement generation. Callers treat every call as fallible.

pub mod gemini;
pub mod prompts;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::{Market, Statement};

pub use gemini::GeminiOracle;

/// A market as shown to the redundancy check.
#[derive(Debug, Clone)]
pub struct MarketDigest {
    pub id: String,
    pub question: String,
    pub probability: f64,
}

impl From<&Market> for MarketDigest {
    fn from(m: &Market) -> Self {
        Self { id: m.id.clone(), question: m.question.clone(), probability: m.probability }
    }
}

/// Redundancy verdict. `reasoning` is aligned with the candidate order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RedundancyVerdict {
    pub redundant_market_ids: Vec<String>,
    pub reasoning: Vec<String>,
}

/// One market to turn into a declarative statement.
#[derive(Debug, Clone)]
pub struct StatementRequest {
    pub question: String,
    pub outcome: String,
    pub probability: f64,
    /// Containing event title, only when present and different from the question.
    pub event_title: Option<String>,
}

impl From<&Market> for StatementRequest {
    fn from(m: &Market) -> Self {
        Self {
            question: m.question.clone(),
            outcome: m.most_likely_outcome.clone(),
            probability: m.probability,
            event_title: m.event_title.clone().filter(|t| *t != m.question),
        }
    }
}

#[async_trait]
pub trait Oracle: Send + Sync {
    /// Which `candidates` are logically implied by another listed market.
    /// `reference` markets are context only and are never judged.
    async fn find_redundant(
        &self,
        reference: &[MarketDigest],
        candidates: &[MarketDigest],
    ) -> Result<RedundancyVerdict>;

    /// One statement per request, in request order. May return fewer.
    async fn generate_statements(
        &self,
        requests: &[StatementRequest],
        categories: &[&str],
    ) -> Result<Vec<Statement>>;
}
