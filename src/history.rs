//! Horizon selection over stored snapshots and the per-market price deltas
//! derived from them.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};

use crate::market::reference_price;
use crate::types::PriceChanges;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Horizon {
    Hour1,
    Hours24,
    Days7,
}

impl Horizon {
    pub const ALL: [Horizon; 3] = [Horizon::Hour1, Horizon::Hours24, Horizon::Days7];

    /// A snapshot qualifies for this horizon once it is at least this old.
    pub fn min_age(self) -> Duration {
        match self {
            Horizon::Hour1 => Duration::minutes(60),
            Horizon::Hours24 => Duration::minutes(1_440),
            Horizon::Days7 => Duration::minutes(10_080),
        }
    }

    fn index(self) -> usize {
        match self {
            Horizon::Hour1 => 0,
            Horizon::Hours24 => 1,
            Horizon::Days7 => 2,
        }
    }
}

impl std::fmt::Display for Horizon {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Horizon::Hour1 => "hour1",
            Horizon::Hours24 => "hours24",
            Horizon::Days7 => "days7",
        };
        write!(f, "{s}")
    }
}

/// For each horizon, the position in `newest_first` of the most recent
/// snapshot that is at least that horizon's minimum age. This is the closest
/// qualifying snapshot, not the oldest one available.
pub fn pick_snapshots(now: DateTime<Utc>, newest_first: &[DateTime<Utc>]) -> [Option<usize>; 3] {
    let mut picks = [None; 3];

    for (pos, ts) in newest_first.iter().enumerate() {
        let age = now - *ts;
        for horizon in Horizon::ALL {
            let slot = &mut picks[horizon.index()];
            if slot.is_none() && age > Duration::zero() && age >= horizon.min_age() {
                *slot = Some(pos);
            }
        }
        if picks.iter().all(Option::is_some) {
            break;
        }
    }

    picks
}

/// Historical outcome prices per horizon, keyed by market id.
#[derive(Debug, Default)]
pub struct HistoricalPrices {
    by_horizon: [Option<HashMap<String, Vec<String>>>; 3],
}

impl HistoricalPrices {
    pub fn set(&mut self, horizon: Horizon, prices: HashMap<String, Vec<String>>) {
        self.by_horizon[horizon.index()] = Some(prices);
    }

    pub fn loaded(&self) -> Vec<Horizon> {
        Horizon::ALL
            .into_iter()
            .filter(|h| self.by_horizon[h.index()].is_some())
            .collect()
    }

    /// Null for a horizon with no snapshot, a market missing from it, or a
    /// price on either side that does not parse.
    pub fn price_changes(&self, market_id: &str, current_prices: &[String]) -> PriceChanges {
        let Some(current) = reference_price(current_prices) else {
            return PriceChanges::default();
        };

        let delta = |horizon: Horizon| {
            let past = self.by_horizon[horizon.index()]
                .as_ref()?
                .get(market_id)
                .and_then(|prices| reference_price(prices))?;
            Some(round2(current - past))
        };

        PriceChanges {
            hour1: delta(Horizon::Hour1),
            hours24: delta(Horizon::Hours24),
            days7: delta(Horizon::Days7),
        }
    }
}

/// Two decimals, halves rounded toward positive infinity.
pub fn round2(x: f64) -> f64 {
    (x * 100.0 + 0.5).floor() / 100.0
}
