//! Credential storage.
//!
//! Platform keys and OAuth tokens live in a single flat JSON object. Clients
//! read what they need at construction time; the Etsy client writes rotated
//! tokens back through [`SecretStore::set`] followed by
//! [`SecretStore::persist`].

use std::collections::BTreeMap;
use std::path::PathBuf;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::SecretError;

pub const ETSY_KEY_STRING: &str = "ETSY_KEY_STRING";
pub const ETSY_ACCESS_TOKEN: &str = "ETSY_ACCESS_TOKEN";
pub const ETSY_REFRESH_TOKEN: &str = "ETSY_REFRESH_TOKEN";
pub const ETSY_SHOP_ID: &str = "ETSY_SHOP_ID";
pub const SHOPIFY_SHOP_URL: &str = "SHOPIFY_SHOP_URL";
pub const SHOPIFY_API_VERSION: &str = "SHOPIFY_API_VERSION";
pub const SHOPIFY_ACCESS_TOKEN: &str = "SHOPIFY_ACCESS_TOKEN";
pub const JUDGE_ME_PRIVATE_KEY: &str = "JUDGE_ME_PRIVATE_KEY";
pub const STAMPED_IO_API_KEY: &str = "STAMPED_IO_API_KEY";
pub const STAMPED_IO_API_PUB_KEY: &str = "STAMPED_IO_API_PUB_KEY";
pub const STAMPED_IO_STORE_HASH: &str = "STAMPED_IO_STORE_HASH";

#[async_trait]
pub trait SecretStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<String, SecretError>;

    /// Update a value in memory. Call [`SecretStore::persist`] to save it.
    async fn set(&self, key: &str, value: String) -> Result<(), SecretError>;

    async fn persist(&self) -> Result<(), SecretError>;
}

/// Secrets kept in a JSON file, e.g. `{"ETSY_KEY_STRING": "..."}`.
pub struct FileSecretStore {
    path: PathBuf,
    values: Mutex<BTreeMap<String, String>>,
}

impl FileSecretStore {
    pub async fn load(path: impl Into<PathBuf>) -> Result<Self, SecretError> {
        let path = path.into();
        let raw = tokio::fs::read_to_string(&path)
            .await
            .map_err(|source| SecretError::Read {
                path: path.clone(),
                source,
            })?;
        let values: BTreeMap<String, String> =
            serde_json::from_str(&raw).map_err(|source| SecretError::Parse {
                path: path.clone(),
                source,
            })?;
        info!(path = %path.display(), keys = values.len(), "loaded secrets");
        Ok(Self {
            path,
            values: Mutex::new(values),
        })
    }
}

#[async_trait]
impl SecretStore for FileSecretStore {
    async fn get(&self, key: &str) -> Result<String, SecretError> {
        self.values
            .lock()
            .await
            .get(key)
            .cloned()
            .ok_or_else(|| SecretError::Missing(key.to_string()))
    }

    async fn set(&self, key: &str, value: String) -> Result<(), SecretError> {
        self.values.lock().await.insert(key.to_string(), value);
        Ok(())
    }

    /// Written to a sibling temp file, then renamed over the original.
    async fn persist(&self) -> Result<(), SecretError> {
        let body = {
            let values = self.values.lock().await;
            serde_json::to_string_pretty(&*values).map_err(|source| SecretError::Parse {
                path: self.path.clone(),
                source,
            })?
        };
        let tmp = self.path.with_extension("json.tmp");
        let write_err = |source| SecretError::Write {
            path: self.path.clone(),
            source,
        };
        tokio::fs::write(&tmp, body).await.map_err(write_err)?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(write_err)?;
        debug!(path = %self.path.display(), "persisted secrets");
        Ok(())
    }
}

/// In-process store, for tests and one-off runs.
#[derive(Default)]
pub struct MemorySecretStore {
    values: Mutex<BTreeMap<String, String>>,
    persisted: Mutex<Option<BTreeMap<String, String>>>,
}

impl MemorySecretStore {
    pub fn new<K, V>(values: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            values: Mutex::new(
                values
                    .into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
            persisted: Mutex::new(None),
        }
    }

    /// Snapshot taken by the most recent `persist`.
    pub async fn persisted(&self) -> Option<BTreeMap<String, String>> {
        self.persisted.lock().await.clone()
    }
}

#[async_trait]
impl SecretStore for MemorySecretStore {
    async fn get(&self, key: &str) -> Result<String, SecretError> {
        self.values
            .lock()
            .await
            .get(key)
            .cloned()
            .ok_or_else(|| SecretError::Missing(key.to_string()))
    }

    async fn set(&self, key: &str, value: String) -> Result<(), SecretError> {
        self.values.lock().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn persist(&self) -> Result<(), SecretError> {
        let snapshot = self.values.lock().await.clone();
        *self.persisted.lock().await = Some(snapshot);
        Ok(())
    }
}
