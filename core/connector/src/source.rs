//! FILENAME: core/connector/src/source.rs
//! PURPOSE: Where configuration bundles come from.
//! CONTEXT: The host only sees `ConfigSource`. The HTTP source talks to the
//! integration endpoint, the file source reads a saved response (offline use
//! and the console binary), and the static source serves tests.

use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::bundle::{decode_bundles, decode_bundles_str, ConfigBundle};
use crate::error::SourceError;

#[async_trait]
pub trait ConfigSource: Send + Sync {
    /// All active configurations for the owner record.
    async fn fetch_all(&self, owner_id: &str) -> Result<Vec<ConfigBundle>, SourceError>;

    /// One configuration. Defaults to picking it out of `fetch_all`.
    async fn fetch_one(&self, config_id: &str, owner_id: &str) -> Result<ConfigBundle, SourceError> {
        self.fetch_all(owner_id)
            .await?
            .into_iter()
            .find(|bundle| bundle.config_id == config_id)
            .ok_or_else(|| SourceError::NotFound(config_id.to_string()))
    }
}

// ============================================================================
// HTTP
// ============================================================================

/// `GET {base}/configs?recordId=..` and `GET {base}/configs/{id}?recordId=..`.
pub struct HttpConfigSource {
    client: reqwest::Client,
    base_url: String,
}

impl HttpConfigSource {
    pub fn new(base_url: impl Into<String>) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        HttpConfigSource {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_json(&self, url: String, owner_id: &str) -> Result<Value, SourceError> {
        let response = self
            .client
            .get(&url)
            .query(&[("recordId", owner_id)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                status: status.as_u16(),
                url,
            });
        }
        Ok(response.json::<Value>().await?)
    }
}

#[async_trait]
impl ConfigSource for HttpConfigSource {
    async fn fetch_all(&self, owner_id: &str) -> Result<Vec<ConfigBundle>, SourceError> {
        let body = self.get_json(format!("{}/configs", self.base_url), owner_id).await?;
        decode_bundles(body)
    }

    async fn fetch_one(&self, config_id: &str, owner_id: &str) -> Result<ConfigBundle, SourceError> {
        let body = self
            .get_json(format!("{}/configs/{}", self.base_url, config_id), owner_id)
            .await?;
        decode_bundles(body)?
            .into_iter()
            .next()
            .ok_or_else(|| SourceError::NotFound(config_id.to_string()))
    }
}

// ============================================================================
// FILE
// ============================================================================

/// A JSON file holding the same body the HTTP endpoint returns. The owner id
/// is ignored.
pub struct FileConfigSource {
    path: PathBuf,
}

impl FileConfigSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileConfigSource { path: path.into() }
    }
}

#[async_trait]
impl ConfigSource for FileConfigSource {
    async fn fetch_all(&self, _owner_id: &str) -> Result<Vec<ConfigBundle>, SourceError> {
        let text = tokio::fs::read_to_string(&self.path).await?;
        decode_bundles_str(&text)
    }
}

// ============================================================================
// STATIC
// ============================================================================

/// In-memory bundles. The next response can be swapped or turned into an error.
#[derive(Default)]
pub struct StaticConfigSource {
    bundles: Mutex<Vec<ConfigBundle>>,
    failure: Mutex<Option<String>>,
}

impl StaticConfigSource {
    pub fn new(bundles: Vec<ConfigBundle>) -> Self {
        StaticConfigSource {
            bundles: Mutex::new(bundles),
            failure: Mutex::new(None),
        }
    }

    pub fn set_bundles(&self, bundles: Vec<ConfigBundle>) {
        if let Ok(mut guard) = self.bundles.lock() {
            *guard = bundles;
        }
    }

    /// Makes every fetch fail with `message` until cleared with `None`.
    pub fn set_failure(&self, message: Option<String>) {
        if let Ok(mut guard) = self.failure.lock() {
            *guard = message;
        }
    }
}

#[async_trait]
impl ConfigSource for StaticConfigSource {
    async fn fetch_all(&self, _owner_id: &str) -> Result<Vec<ConfigBundle>, SourceError> {
        if let Some(message) = self.failure.lock().ok().and_then(|g| g.clone()) {
            return Err(SourceError::Malformed(message));
        }
        self.bundles
            .lock()
            .map(|guard| guard.clone())
            .map_err(|e| SourceError::Malformed(e.to_string()))
    }
}
