use std::collections::HashMap;

use crate::market::AFFIRMATIVE_OUTCOME;
use crate::types::Market;

/// Collapse each redundancy group to one market.
///
/// Within a group, the highest-probability market whose leading outcome is
/// "Yes" wins; if none leads with "Yes", the highest-volume member wins. On a
/// tie the later member wins. Ungrouped markets pass through untouched.
/// Group survivors come first (in order of first appearance), then standalone
/// markets.
pub fn collapse_groups(markets: Vec<Market>) -> Vec<Market> {
    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Vec<Market>> = HashMap::new();
    let mut standalone = Vec::new();

    for market in markets {
        match market.group_id.clone() {
            Some(group) => {
                if !groups.contains_key(&group) {
                    order.push(group.clone());
                }
                groups.entry(group).or_default().push(market);
            }
            None => standalone.push(market),
        }
    }

    let mut survivors: Vec<Market> = order
        .iter()
        .filter_map(|g| groups.remove(g))
        .filter_map(pick_survivor)
        .collect();
    survivors.extend(standalone);
    survivors
}

fn pick_survivor(members: Vec<Market>) -> Option<Market> {
    let affirmative = members
        .iter()
        .enumerate()
        .filter(|(_, m)| m.most_likely_outcome == AFFIRMATIVE_OUTCOME)
        .fold(None::<(usize, f64)>, |best, (i, m)| match best {
            Some((_, p)) if p > m.probability => best,
            _ => Some((i, m.probability)),
        });

    let winner = match affirmative {
        Some((i, _)) => i,
        None => members
            .iter()
            .enumerate()
            .fold(None::<(usize, f64)>, |best, (i, m)| match best {
                Some((_, v)) if v > m.volume => best,
                _ => Some((i, m.volume)),
            })?
            .0,
    };

    members.into_iter().nth(winner)
}
