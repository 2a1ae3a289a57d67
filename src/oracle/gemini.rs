use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::prompts::{build_redundancy_prompt, build_statement_prompt};
use super::{MarketDigest, Oracle, RedundancyVerdict, StatementRequest};
use crate::error::{AppError, Result};
use crate::types::Statement;

const REDUNDANCY_TEMPERATURE: f64 = 0.1;
const STATEMENT_TEMPERATURE: f64 = 0.3;

/// Oracle backed by the Gemini `generateContent` endpoint in JSON mode.
#[derive(Debug, Clone)]
pub struct GeminiOracle {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

impl GeminiOracle {
    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key: api_key.into(),
        }
    }

    /// Send one prompt with a strict response schema and decode the JSON text
    /// of the first candidate.
    async fn generate<T: DeserializeOwned>(
        &self,
        prompt: String,
        temperature: f64,
        schema: serde_json::Value,
    ) -> Result<T> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "temperature": temperature,
                "responseMimeType": "application/json",
                "responseSchema": schema,
            },
        });

        let resp = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Oracle(format!("request failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(AppError::Oracle(format!("Gemini API error: {status}")));
        }

        let parsed: GenerateResponse = resp
            .json()
            .await
            .map_err(|e| AppError::Oracle(format!("undecodable response: {e}")))?;

        let text = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|c| c.parts.into_iter().next())
            .and_then(|p| p.text)
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| AppError::Oracle("empty response from Gemini".to_string()))?;
        debug!("Gemini returned {} bytes", text.len());

        serde_json::from_str(&text).map_err(|e| AppError::Oracle(format!("malformed JSON: {e}")))
    }
}

#[async_trait]
impl Oracle for GeminiOracle {
    async fn find_redundant(
        &self,
        reference: &[MarketDigest],
        candidates: &[MarketDigest],
    ) -> Result<RedundancyVerdict> {
        let schema = json!({
            "type": "object",
            "properties": {
                "redundant_market_ids": { "type": "array", "items": { "type": "string" } },
                "reasoning": { "type": "array", "items": { "type": "string" } },
            },
            "required": ["redundant_market_ids", "reasoning"],
        });
        self.generate(
            build_redundancy_prompt(reference, candidates),
            REDUNDANCY_TEMPERATURE,
            schema,
        )
        .await
    }

    async fn generate_statements(
        &self,
        requests: &[StatementRequest],
        categories: &[&str],
    ) -> Result<Vec<Statement>> {
        let schema = json!({
            "type": "array",
            "items": {
                "type": "object",
                "properties": {
                    "statement": { "type": "string" },
                    "category": { "type": "string" },
                },
                "required": ["statement", "category"],
            },
        });
        self.generate(
            build_statement_prompt(requests, categories),
            STATEMENT_TEMPERATURE,
            schema,
        )
        .await
    }
}
