use std::path::PathBuf;

use async_trait::async_trait;
use tracing::debug;

use crate::error::{AppError, Result};

/// Destination for the published feed. `put` fully replaces any prior value.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(&self, key: &str, body: Vec<u8>, content_type: &str) -> Result<()>;
}

/// Objects as files under a root directory.
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn put(&self, key: &str, body: Vec<u8>, _content_type: &str) -> Result<()> {
        tokio::fs::create_dir_all(&self.root).await?;
        let target = self.root.join(key);
        let staging = self.root.join(format!(".{key}.tmp"));
        // Rename is atomic, so readers see either the old or the new document.
        tokio::fs::write(&staging, &body).await?;
        tokio::fs::rename(&staging, &target).await?;
        debug!("Wrote {} bytes to {}", body.len(), target.display());
        Ok(())
    }
}

/// Objects PUT to `<base_url>/<key>` (S3-compatible or similar endpoint).
#[derive(Debug, Clone)]
pub struct HttpObjectStore {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl HttpObjectStore {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
        }
    }
}

#[async_trait]
impl ObjectStore for HttpObjectStore {
    async fn put(&self, key: &str, body: Vec<u8>, content_type: &str) -> Result<()> {
        let url = format!("{}/{key}", self.base_url);
        let mut req = self
            .client
            .put(&url)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(body);
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }

        let resp = req.send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(AppError::ObjectStore(format!("PUT {url} returned {status}")));
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use axum::body::Bytes;
    use axum::extract::{Path, State};
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::put;
    use axum::Router;

    use crate::fetcher::http_client;

    /// Keeps the last value per key in memory.
    #[derive(Default)]
    pub(crate) struct MemoryObjectStore {
        pub objects: Mutex<HashMap<String, (Vec<u8>, String)>>,
        pub puts: Mutex<usize>,
    }

    #[async_trait]
    impl ObjectStore for MemoryObjectStore {
        async fn put(&self, key: &str, body: Vec<u8>, content_type: &str) -> Result<()> {
            *self.puts.lock().unwrap() += 1;
            self.objects
                .lock()
                .unwrap()
                .insert(key.to_string(), (body, content_type.to_string()));
            Ok(())
        }
    }

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("digest-{name}-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    #[tokio::test]
    async fn local_store_overwrites_whole_object() {
        let dir = scratch_dir("local");
        let store = LocalObjectStore::new(&dir);
        store.put("markets.json", b"{\"first\":true}".to_vec(), "application/json").await.unwrap();
        store.put("markets.json", b"{}".to_vec(), "application/json").await.unwrap();

        let written = std::fs::read_to_string(dir.join("markets.json")).unwrap();
        assert_eq!(written, "{}");
        assert!(!dir.join(".markets.json.tmp").exists());
        let _ = std::fs::remove_dir_all(&dir);
    }

    type Received = Arc<Mutex<Vec<(String, String, Option<String>, Vec<u8>)>>>;

    async fn spawn_bucket(received: Received, status: StatusCode) -> String {
        let app = Router::new()
            .route(
                "/bucket/:key",
                put(
                    move |State(received): State<Received>,
                          Path(key): Path<String>,
                          headers: HeaderMap,
                          body: Bytes| async move {
                        let header = |name: &str| {
                            headers.get(name).and_then(|v| v.to_str().ok()).map(str::to_string)
                        };
                        received.lock().unwrap().push((
                            key,
                            header("content-type").unwrap_or_default(),
                            header("authorization"),
                            body.to_vec(),
                        ));
                        status
                    },
                ),
            )
            .with_state(received);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}/bucket/")
    }

    #[tokio::test]
    async fn http_store_puts_with_content_type_and_token() {
        let received: Received = Arc::default();
        let base = spawn_bucket(received.clone(), StatusCode::OK).await;
        let store = HttpObjectStore::new(http_client().unwrap(), base, Some("secret".to_string()));

        store.put("markets.json", b"[]".to_vec(), "application/json").await.unwrap();

        let got = received.lock().unwrap();
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].0, "markets.json");
        assert_eq!(got[0].1, "application/json");
        assert_eq!(got[0].2.as_deref(), Some("Bearer secret"));
        assert_eq!(got[0].3, b"[]");
    }

    #[tokio::test]
    async fn http_store_reports_rejection() {
        let received: Received = Arc::default();
        let base = spawn_bucket(received, StatusCode::FORBIDDEN).await;
        let store = HttpObjectStore::new(http_client().unwrap(), base, None);
        let err = store.put("markets.json", vec![], "application/json").await.unwrap_err();
        assert!(matches!(err, AppError::ObjectStore(ref m) if m.contains("403")));
    }
}
