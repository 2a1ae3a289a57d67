use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

// ---------------------------------------------------------------------------
// Upstream record
// ---------------------------------------------------------------------------

/// One market as returned by the upstream listing endpoint. Only the fields the
/// pipeline reads are decoded; the upstream encodes several of them loosely.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawMarket {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub end_date_iso: Option<String>,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub active: bool,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub closed: bool,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub volume: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub liquidity: Option<f64>,
    #[serde(default, deserialize_with = "string_list")]
    pub outcomes: Vec<String>,
    #[serde(default, deserialize_with = "string_list")]
    pub outcome_prices: Vec<String>,
    #[serde(default, rename = "negRiskMarketID")]
    pub neg_risk_market_id: Option<String>,
    #[serde(default)]
    pub events: Option<Vec<RawEvent>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawEvent {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
}

/// Accepts `"123"` or `123`.
fn string_or_number<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    match Value::deserialize(d)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!("expected string or number id, got {other}"))),
    }
}

/// Accepts numbers, numeric strings and null.
fn lenient_f64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

fn lenient_bool<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::Bool(b) => b,
        Value::String(s) => s.eq_ignore_ascii_case("true"),
        _ => false,
    })
}

/// Accepts a JSON array or a string holding a JSON-encoded array. Anything
/// unparseable decodes to an empty list, which the outcome resolver rejects.
fn string_list<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
    let items = match Value::deserialize(d)? {
        Value::Array(items) => items,
        Value::String(s) => serde_json::from_str::<Vec<Value>>(&s).unwrap_or_default(),
        _ => Vec::new(),
    };
    Ok(items
        .into_iter()
        .map(|v| match v {
            Value::String(s) => s,
            other => other.to_string(),
        })
        .collect())
}

// ---------------------------------------------------------------------------
// Parsed market
// ---------------------------------------------------------------------------

/// A market whose outcome arrays resolved cleanly. Built fresh every run.
#[derive(Debug, Clone)]
pub struct Market {
    pub id: String,
    pub question: String,
    pub slug: Option<String>,
    pub end_date_iso: Option<String>,
    pub active: bool,
    pub closed: bool,
    pub volume: f64,
    pub liquidity: f64,
    pub outcomes: Vec<String>,
    pub outcome_prices: Vec<String>,
    /// Redundancy-group id; markets sharing one are exclusive framings of one event.
    pub group_id: Option<String>,
    pub event_title: Option<String>,
    pub event_slug: Option<String>,
    pub most_likely_outcome: String,
    /// Leading outcome price × 100.
    pub probability: f64,
}

// ---------------------------------------------------------------------------
// Derived output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceChanges {
    pub hour1: Option<f64>,
    pub hours24: Option<f64>,
    pub days7: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendingScore {
    pub score: f64,
    pub is_trending: bool,
    pub reasons: Vec<String>,
}

/// Statement and category attached to a market by the classifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statement {
    pub statement: String,
    pub category: String,
}

/// One entry of the published feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedMarket {
    pub id: String,
    pub question: String,
    pub slug: Option<String>,
    pub end_date_iso: Option<String>,
    pub volume: f64,
    pub liquidity: f64,
    pub outcomes: Vec<String>,
    pub outcome_prices: Vec<String>,
    #[serde(rename = "negRiskMarketID")]
    pub neg_risk_market_id: Option<String>,
    pub event_title: Option<String>,
    pub event_slug: Option<String>,
    pub most_likely_outcome: String,
    pub current_probability: f64,
    pub display_probability: i64,
    pub statement: String,
    pub category: String,
    pub price_changes: PriceChanges,
    pub trending_score: TrendingScore,
}

impl DerivedMarket {
    pub fn new(
        market: Market,
        statement: Statement,
        price_changes: PriceChanges,
        trending_score: TrendingScore,
    ) -> Self {
        Self {
            display_probability: market.probability.round() as i64,
            current_probability: market.probability,
            id: market.id,
            question: market.question,
            slug: market.slug,
            end_date_iso: market.end_date_iso,
            volume: market.volume,
            liquidity: market.liquidity,
            outcomes: market.outcomes,
            outcome_prices: market.outcome_prices,
            neg_risk_market_id: market.group_id,
            event_title: market.event_title,
            event_slug: market.event_slug,
            most_likely_outcome: market.most_likely_outcome,
            statement: statement.statement,
            category: statement.category,
            price_changes,
            trending_score,
        }
    }
}

/// The document written to the object store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedDocument {
    pub last_updated: String,
    pub market_count: usize,
    pub markets: Vec<DerivedMarket>,
}
