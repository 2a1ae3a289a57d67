mod api;
mod classifier;
mod config;
mod db;
mod dedup;
mod error;
mod fetcher;
mod history;
mod market;
mod oracle;
mod pipeline;
mod publisher;
mod scorer;
mod types;

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::api::routes::{router, ApiState};
use crate::classifier::{Classifier, ClassifierConfig};
use crate::config::Config;
use crate::db::{RedundancyCache, SnapshotStore, StatementCache};
use crate::dedup::SemanticDeduper;
use crate::error::Result;
use crate::fetcher::{http_client, FetchSettings};
use crate::oracle::{GeminiOracle, Oracle};
use crate::pipeline::{run_on_interval, Pipeline};
use crate::publisher::{HttpObjectStore, LocalObjectStore, ObjectStore};

#[tokio::main]
async fn main() {
    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .init();

    if let Err(e) = run(cfg).await {
        error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run(cfg: Config) -> Result<()> {
    // --- Database setup ---
    let pool = db::connect(&cfg.db_path).await?;
    info!("Database ready at {}", cfg.db_path);

    let http = http_client()?;

    let oracle: Arc<dyn Oracle> = Arc::new(GeminiOracle::new(
        http.clone(),
        cfg.oracle_api_url.clone(),
        cfg.oracle_model.clone(),
        cfg.google_api_key.clone(),
    ));
    info!("Oracle model: {}", cfg.oracle_model);

    let store: Arc<dyn ObjectStore> = match &cfg.object_store_url {
        Some(url) => {
            info!("Publishing to object store at {url}");
            Arc::new(HttpObjectStore::new(http.clone(), url.clone(), cfg.object_store_token.clone()))
        }
        None => {
            info!("Publishing to local directory {}", cfg.output_dir);
            Arc::new(LocalObjectStore::new(&cfg.output_dir))
        }
    };

    let pipeline = Arc::new(Pipeline::new(
        http,
        FetchSettings::new(cfg.api_url.clone()),
        cfg.eligibility,
        cfg.feed_mode,
        SnapshotStore::new(pool.clone()),
        SemanticDeduper::new(RedundancyCache::new(pool.clone()), Arc::clone(&oracle)),
        Classifier::new(StatementCache::new(pool), oracle, ClassifierConfig::default()),
        store,
    ));

    // --- Scheduled runs ---
    if cfg.run_interval_secs > 0 {
        let scheduled = Arc::clone(&pipeline);
        let period = Duration::from_secs(cfg.run_interval_secs);
        tokio::spawn(async move { run_on_interval(scheduled, period).await });
        info!("Scheduled runs every {}s", cfg.run_interval_secs);
    } else {
        warn!("RUN_INTERVAL_SECS=0: scheduled runs disabled, use /run to trigger");
    }

    // --- Trigger surface ---
    let app = router(ApiState { pipeline });
    let bind_addr = format!("0.0.0.0:{}", cfg.api_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("HTTP API listening on {bind_addr}");

    axum::serve(listener, app).await?;

    Ok(())
}
