use super::{MarketDigest, StatementRequest};

pub fn build_redundancy_prompt(reference: &[MarketDigest], candidates: &[MarketDigest]) -> String {
    let mut prompt = String::from(
        r#"Identify REDUNDANT predictions that should be removed.

A prediction is REDUNDANT if another prediction logically implies it: if one is true, the other MUST also be true.

Examples of redundancy:
- "Gold above $4,000" makes "Gold above $3,200" redundant (higher implies lower)
- "Bitcoin hits $200k" makes "Bitcoin hits $150k" redundant
- "BTC reaches $100k by June" makes "BTC reaches $100k by December" redundant (earlier implies later)

NOT redundant (keep both):
- Different subjects: "Gold above $4000" vs "Silver above $50"
- Different directions: "Gold above $3000" vs "Gold below $4000"
- Unrelated: "Trump wins election" vs "Republicans win House"

Return IDs of predictions to REMOVE, and one reasoning line per prediction checked, in order. When in doubt, keep both.

"#,
    );

    if reference.is_empty() {
        prompt.push_str("PREDICTIONS TO CHECK:\n");
    } else {
        prompt.push_str("EXISTING PREDICTIONS (for reference, never remove these):\n");
        push_digests(&mut prompt, reference);
        prompt.push_str("\nNEW PREDICTIONS TO CHECK:\n");
    }
    push_digests(&mut prompt, candidates);
    prompt
}

fn push_digests(prompt: &mut String, markets: &[MarketDigest]) {
    for m in markets {
        prompt.push_str(&format!("- [{}] {} ({:.1}%)\n", m.id, m.question, m.probability));
    }
}

pub fn build_statement_prompt(requests: &[StatementRequest], categories: &[&str]) -> String {
    let markets = requests
        .iter()
        .enumerate()
        .map(|(i, r)| {
            let event = r
                .event_title
                .as_ref()
                .map(|t| format!("\n   Event: {t}"))
                .unwrap_or_default();
            format!(
                "{}. Question: {}{}\n   Outcome: {} ({:.1}%)",
                i + 1,
                r.question,
                event,
                r.outcome,
                r.probability
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        r#"Convert each prediction market question into a concise declarative statement and classify its category.

Rules:
- State the most likely outcome as a short affirmative sentence: "[subject] will [verb]"
- When an Event title is provided, incorporate its key details into the statement
- Be concise: remove filler words, unnecessary dates, and verbose phrases
- Remove question marks, preserve capitalization (GDP, Q1, AI) and symbols
- Return exactly one entry per market, in the same order

Categories:
- {}

Examples:
- "Will Trump win the 2024 presidential election?" -> "Trump will win 2024 election." Category: "Politics"
- "Will Bitcoin reach $150k by end of year?" -> "Bitcoin will hit $150k." Category: "Crypto"

Markets to convert:
{}
"#,
        categories.join(", "),
        markets
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn digest(id: &str, q: &str, p: f64) -> MarketDigest {
        MarketDigest { id: id.to_string(), question: q.to_string(), probability: p }
    }

    #[test]
    fn redundancy_prompt_separates_reference_from_candidates() {
        let prompt = build_redundancy_prompt(
            &[digest("1", "Gold above $4,000?", 61.0)],
            &[digest("2", "Gold above $3,200?", 88.24)],
        );
        let reference_at = prompt.find("[1] Gold above $4,000? (61.0%)").unwrap();
        let header_at = prompt.find("NEW PREDICTIONS TO CHECK").unwrap();
        let candidate_at = prompt.find("[2] Gold above $3,200? (88.2%)").unwrap();
        assert!(reference_at < header_at && header_at < candidate_at);
    }

    #[test]
    fn redundancy_prompt_without_reference() {
        let prompt = build_redundancy_prompt(&[], &[digest("7", "X?", 70.0)]);
        assert!(prompt.contains("PREDICTIONS TO CHECK:\n- [7] X? (70.0%)"));
        assert!(!prompt.contains("EXISTING"));
    }

    #[test]
    fn statement_prompt_numbers_markets_and_lists_categories() {
        let requests = vec![
            StatementRequest {
                question: "Who will win?".to_string(),
                outcome: "Alice".to_string(),
                probability: 64.0,
                event_title: Some("Mayor race".to_string()),
            },
            StatementRequest {
                question: "Rain tomorrow?".to_string(),
                outcome: "Yes".to_string(),
                probability: 70.0,
                event_title: None,
            },
        ];
        let prompt = build_statement_prompt(&requests, &["Politics", "Science"]);
        assert!(prompt.contains("- Politics, Science"));
        assert!(prompt.contains("1. Question: Who will win?\n   Event: Mayor race\n   Outcome: Alice (64.0%)"));
        assert!(prompt.contains("2. Question: Rain tomorrow?\n   Outcome: Yes (70.0%)"));
    }
}
