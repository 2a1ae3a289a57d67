use std::time::Duration;

use tracing::{debug, error, info};

use crate::config::{API_PAGE_LIMIT, HTTP_TIMEOUT_SECS, MAX_PAGES};
use crate::error::{AppError, Result};
use crate::types::RawMarket;

#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub api_url: String,
    pub page_limit: usize,
    pub max_pages: usize,
}

impl FetchSettings {
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            page_limit: API_PAGE_LIMIT,
            max_pages: MAX_PAGES,
        }
    }
}

pub fn http_client() -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
        .build()?)
}

/// Fetch active, open, non-archived markets page by page.
/// Stops on a short page, after `max_pages`, or at the first failed request;
/// whatever was fetched before a failure is returned. Never errors.
pub async fn fetch_markets(client: &reqwest::Client, settings: &FetchSettings) -> Vec<RawMarket> {
    let mut markets = Vec::new();

    for page in 0..settings.max_pages {
        let offset = page * settings.page_limit;
        let items = match fetch_page(client, settings, offset).await {
            Ok(items) => items,
            Err(e) => {
                error!("Fetch stopped at page {}: {e}", page + 1);
                break;
            }
        };

        let page_len = items.len();
        for item in items {
            match serde_json::from_value::<RawMarket>(item) {
                Ok(m) => markets.push(m),
                Err(e) => debug!("Undecodable market record skipped: {e}"),
            }
        }
        info!(
            "Fetched page {}: {page_len} markets (total: {})",
            page + 1,
            markets.len()
        );

        if page_len < settings.page_limit {
            break;
        }
    }

    markets
}

async fn fetch_page(
    client: &reqwest::Client,
    settings: &FetchSettings,
    offset: usize,
) -> Result<Vec<serde_json::Value>> {
    let limit = settings.page_limit.to_string();
    let offset_str = offset.to_string();
    let resp = client
        .get(&settings.api_url)
        .query(&[
            ("limit", limit.as_str()),
            ("offset", offset_str.as_str()),
            ("active", "true"),
            ("closed", "false"),
            ("archived", "false"),
        ])
        .send()
        .await
        .map_err(|e| AppError::UpstreamFetch { offset, reason: e.to_string() })?;

    let status = resp.status();
    if !status.is_success() {
        return Err(AppError::UpstreamFetch { offset, reason: format!("status {status}") });
    }

    let body: serde_json::Value = resp
        .json()
        .await
        .map_err(|e| AppError::UpstreamFetch { offset, reason: e.to_string() })?;

    match body {
        serde_json::Value::Array(items) => Ok(items),
        _ => Err(AppError::UpstreamFetch {
            offset,
            reason: "response was not an array".to_string(),
        }),
    }
}
