use crate::config::trending::*;
use crate::types::{PriceChanges, TrendingScore};

/// Newsworthiness of a market from its probability (0–100), recent price
/// deltas and volume. Pure and deterministic.
///
/// Components: momentum (0–40), entropy bonus (0–20), threshold crossing
/// over 24h (0/20), volume tier (0–10), sustained same-direction trend (0/10).
/// The sum is halved for probabilities above 90 or below 10.
pub fn score(probability: f64, changes: &PriceChanges, volume: f64) -> TrendingScore {
    let mut total = 0.0;
    let mut reasons = Vec::new();

    let h1 = changes.hour1.unwrap_or(0.0);
    let h24 = changes.hours24.unwrap_or(0.0);

    total += (((h1.abs() * MOMENTUM_HOUR_WEIGHT) + h24.abs()) * MOMENTUM_SCALE).min(MOMENTUM_CAP);
    if h1.abs() >= 1.0 {
        reasons.push(format!("{h1:+.1}% in 1h"));
    }
    if h24.abs() >= 3.0 {
        reasons.push(format!("{h24:+.1}% in 24h"));
    }

    total += binary_entropy(probability / 100.0) * ENTROPY_WEIGHT;
    if (40.0..=60.0).contains(&probability) {
        reasons.push("high uncertainty".to_string());
    }

    if let Some(threshold) = crossed_threshold(probability, changes.hours24) {
        total += CROSSING_BONUS;
        reasons.push(format!("crossed {threshold:.0}%"));
    }

    if let Some(&(_, bonus)) = VOLUME_TIERS.iter().find(|(min, _)| volume >= *min) {
        total += bonus;
        if bonus >= VOLUME_TIERS[0].1 {
            reasons.push("high volume".to_string());
        }
    }

    if is_sustained(changes) {
        total += SUSTAINED_BONUS;
        reasons.push("sustained trend".to_string());
    }

    if probability > EXTREME_HIGH || probability < EXTREME_LOW {
        total *= EXTREME_PENALTY;
        reasons.push("extreme odds".to_string());
    }

    let score = (total + 0.5).floor();
    TrendingScore { score, is_trending: score >= TRENDING_MIN_SCORE, reasons }
}

/// H(p) in bits; 0 at the certain ends.
pub fn binary_entropy(p: f64) -> f64 {
    if p <= 0.0 || p >= 1.0 {
        return 0.0;
    }
    -p * p.log2() - (1.0 - p) * (1.0 - p).log2()
}

/// First threshold lying between the 24h-ago probability and now (inclusive).
/// A missing or zero 24h delta crosses nothing.
fn crossed_threshold(probability: f64, hours24: Option<f64>) -> Option<f64> {
    let delta = hours24.filter(|d| *d != 0.0)?;
    let previous = probability - delta;
    let (lo, hi) = (previous.min(probability), previous.max(probability));
    CROSSING_THRESHOLDS.iter().copied().find(|t| lo <= *t && *t <= hi)
}

fn is_sustained(changes: &PriceChanges) -> bool {
    let (Some(h1), Some(h24), Some(d7)) = (changes.hour1, changes.hours24, changes.days7) else {
        return false;
    };
    if h1 == 0.0 || h24 == 0.0 || d7 == 0.0 {
        return false;
    }
    let same_sign = (h1 > 0.0) == (h24 > 0.0) && (h24 > 0.0) == (d7 > 0.0);
    same_sign && d7.abs() >= SUSTAINED_MIN_WEEKLY_MOVE
}

/// Keep every trending item; with fewer than `MIN_TRENDING`, backfill with
/// the best non-trending items up to `BACKFILL_TOTAL`. Output is ordered by
/// score, highest first; equal scores keep input order.
pub fn select_trending<T>(mut items: Vec<T>, score_of: impl Fn(&T) -> &TrendingScore) -> Vec<T> {
    items.sort_by(|a, b| score_of(b).score.total_cmp(&score_of(a).score));

    let (trending, rest): (Vec<T>, Vec<T>) = items.into_iter().partition(|i| score_of(i).is_trending);
    if trending.len() >= MIN_TRENDING {
        return trending;
    }

    let room = BACKFILL_TOTAL.saturating_sub(trending.len());
    let mut selected = trending;
    selected.extend(rest.into_iter().take(room));
    selected.sort_by(|a, b| score_of(b).score.total_cmp(&score_of(a).score));
    selected
}
