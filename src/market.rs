use chrono::{DateTime, NaiveDate, Utc};
use tracing::debug;

use crate::config::Eligibility;
use crate::error::{AppError, Result};
use crate::types::{Market, RawMarket};

/// Outcome label that marks the affirmative side of a binary market.
pub const AFFIRMATIVE_OUTCOME: &str = "Yes";
const NEGATIVE_OUTCOME: &str = "No";

/// Returns `(label, price × 100)` of the highest-priced outcome.
/// `None` when the arrays are empty, differ in length, contain an unparseable
/// price, or every price is zero.
pub fn most_likely_outcome(outcomes: &[String], prices: &[String]) -> Option<(String, f64)> {
    if outcomes.is_empty() || outcomes.len() != prices.len() {
        return None;
    }

    let mut best: Option<(usize, f64)> = None;
    for (idx, raw) in prices.iter().enumerate() {
        let prob = raw.trim().parse::<f64>().ok().filter(|p| p.is_finite())? * 100.0;
        if prob > best.map_or(0.0, |(_, p)| p) {
            best = Some((idx, prob));
        }
    }

    best.map(|(idx, prob)| (outcomes[idx].clone(), prob))
}

/// First outcome's price × 100; the reference price for price-change deltas.
pub fn reference_price(prices: &[String]) -> Option<f64> {
    prices
        .first()
        .and_then(|p| p.trim().parse::<f64>().ok())
        .filter(|p| p.is_finite())
        .map(|p| p * 100.0)
}

impl Market {
    /// Resolve the leading outcome of an upstream record.
    pub fn from_raw(raw: RawMarket) -> Result<Self> {
        let (most_likely_outcome, probability) =
            most_likely_outcome(&raw.outcomes, &raw.outcome_prices).ok_or_else(|| {
                AppError::Parse {
                    market_id: raw.id.clone(),
                    reason: format!(
                        "unusable outcomes {:?} / prices {:?}",
                        raw.outcomes, raw.outcome_prices
                    ),
                }
            })?;

        let event = raw.events.as_ref().and_then(|e| e.first()).cloned().unwrap_or_default();

        Ok(Self {
            id: raw.id,
            question: raw.question,
            slug: raw.slug,
            end_date_iso: raw.end_date_iso,
            active: raw.active,
            closed: raw.closed,
            volume: raw.volume.unwrap_or(0.0),
            liquidity: raw.liquidity.unwrap_or(0.0),
            outcomes: raw.outcomes,
            outcome_prices: raw.outcome_prices,
            group_id: raw.neg_risk_market_id.filter(|g| !g.is_empty()),
            event_title: event.title.filter(|t| !t.is_empty()),
            event_slug: event.slug.filter(|s| !s.is_empty()),
            most_likely_outcome,
            probability,
        })
    }
}

#[derive(Debug, Default)]
pub struct FilterStats {
    pub unparseable: usize,
    pub inactive: usize,
    pub end_date: usize,
    pub negative_outcome: usize,
    pub low_probability: usize,
}

/// Parse every upstream record and keep the ones worth showing.
pub fn select_eligible(
    raw: Vec<RawMarket>,
    rules: &Eligibility,
    now: DateTime<Utc>,
) -> (Vec<Market>, FilterStats) {
    let mut stats = FilterStats::default();
    let mut kept = Vec::with_capacity(raw.len());

    for item in raw {
        let market = match Market::from_raw(item) {
            Ok(m) => m,
            Err(e) => {
                debug!("Skipping market: {e}");
                stats.unparseable += 1;
                continue;
            }
        };

        if !market.active || market.closed {
            stats.inactive += 1;
            continue;
        }

        let days_left = market
            .end_date_iso
            .as_deref()
            .and_then(parse_end_date)
            .map(|end| (end - now).num_seconds() as f64 / 86_400.0);
        match days_left {
            Some(d) if d > 0.0 && d <= rules.max_days_to_end => {}
            _ => {
                stats.end_date += 1;
                continue;
            }
        }

        if market.most_likely_outcome == NEGATIVE_OUTCOME {
            stats.negative_outcome += 1;
            continue;
        }

        if market.probability < rules.min_probability {
            stats.low_probability += 1;
            continue;
        }

        kept.push(market);
    }

    (kept, stats)
}

/// RFC 3339 timestamp, or a bare `YYYY-MM-DD` taken as midnight UTC.
pub fn parse_end_date(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}
