//! Webhook subscription management: the Notion API side, a local JSON
//! cache of what was created, and the manager the CLI drives.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};

use relay_core::RelayError;

use crate::client::NotionClient;
use crate::error::SourceError;

const MASK: &str = "********";

#[derive(Debug, thiserror::Error)]
pub enum SubscriptionError {
    #[error(transparent)]
    Api(#[from] SourceError),

    #[error("cache I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("cache is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("subscription {0} not found")]
    NotFound(String),

    #[error("invalid target URL: {0}")]
    InvalidUrl(String),
}

impl From<SubscriptionError> for RelayError {
    fn from(err: SubscriptionError) -> Self {
        match err {
            SubscriptionError::Api(e) => e.into(),
            SubscriptionError::InvalidUrl(msg) => RelayError::Config(msg),
            other => RelayError::Connection(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    #[default]
    Active,
    Expired,
    #[serde(other)]
    Unknown,
}

/// A registered webhook target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: String,
    #[serde(alias = "target_url")]
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
    #[serde(default)]
    pub status: SubscriptionStatus,
    #[serde(default, alias = "created_time")]
    pub created_at: Option<String>,
}

impl Subscription {
    /// Copy safe for printing: the secret is masked.
    pub fn redacted(&self) -> Self {
        Self {
            secret: self.secret.as_ref().map(|_| MASK.to_string()),
            ..self.clone()
        }
    }
}

/// A fresh random webhook secret (32 bytes, hex-encoded).
pub fn generate_secret() -> String {
    hex::encode(rand::random::<[u8; 32]>())
}

/// The source system's subscription endpoints.
#[async_trait]
pub trait SubscriptionApi: Send + Sync {
    async fn create(&self, target_url: &str, secret: &str) -> Result<Subscription, SourceError>;
    async fn list(&self) -> Result<Vec<Subscription>, SourceError>;
    async fn delete(&self, id: &str) -> Result<(), SourceError>;
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ListResponse {
    Paged { results: Vec<Subscription> },
    Bare(Vec<Subscription>),
}

fn parse_subscription(value: Value) -> Result<Subscription, SourceError> {
    serde_json::from_value(value).map_err(|e| SourceError::Parse(format!("subscription: {e}")))
}

#[async_trait]
impl SubscriptionApi for NotionClient {
    async fn create(&self, target_url: &str, secret: &str) -> Result<Subscription, SourceError> {
        let body = json!({
            "url": target_url,
            "secret": secret,
            "event_types": [
                "page.created",
                "page.updated",
                "page.properties_updated",
                "page.content_updated",
            ],
        });
        let value = self
            .send(self.request(reqwest::Method::POST, "webhooks").json(&body))
            .await?;
        parse_subscription(value)
    }

    async fn list(&self) -> Result<Vec<Subscription>, SourceError> {
        let value = self.send(self.request(reqwest::Method::GET, "webhooks")).await?;
        let list: ListResponse = serde_json::from_value(value)
            .map_err(|e| SourceError::Parse(format!("subscription list: {e}")))?;
        Ok(match list {
            ListResponse::Paged { results } => results,
            ListResponse::Bare(items) => items,
        })
    }

    async fn delete(&self, id: &str) -> Result<(), SourceError> {
        self.send(self.request(reqwest::Method::DELETE, &format!("webhooks/{id}")))
            .await?;
        Ok(())
    }
}

// ── Local cache ───────────────────────────────────────────────

/// JSON file mirroring the subscriptions this installation knows about.
#[derive(Debug, Clone)]
pub struct SubscriptionCache {
    path: PathBuf,
}

impl SubscriptionCache {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join("subscriptions.json"),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Vec<Subscription>, SubscriptionError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let data = std::fs::read_to_string(&self.path)?;
        if data.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str(&data)?)
    }

    pub fn save(&self, subs: &[Subscription]) -> Result<(), SubscriptionError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(subs)?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }

    pub fn upsert(&self, sub: Subscription) -> Result<(), SubscriptionError> {
        let mut subs = self.load()?;
        match subs.iter_mut().find(|s| s.id == sub.id) {
            Some(existing) => *existing = sub,
            None => subs.push(sub),
        }
        self.save(&subs)
    }

    /// Remove an entry. Returns whether it was cached.
    pub fn remove(&self, id: &str) -> Result<bool, SubscriptionError> {
        let mut subs = self.load()?;
        let before = subs.len();
        subs.retain(|s| s.id != id);
        let removed = subs.len() != before;
        if removed {
            self.save(&subs)?;
        }
        Ok(removed)
    }

    /// Replace the cache with `remote`, keeping locally known secrets.
    pub fn sync(&self, remote: &[Subscription]) -> Result<Vec<Subscription>, SubscriptionError> {
        let cached = self.load()?;
        let merged: Vec<Subscription> = remote
            .iter()
            .map(|r| {
                let mut sub = r.clone();
                if sub.secret.is_none() {
                    sub.secret = cached
                        .iter()
                        .find(|c| c.id == r.id)
                        .and_then(|c| c.secret.clone());
                }
                sub
            })
            .collect();
        self.save(&merged)?;
        Ok(merged)
    }
}

// ── Manager ───────────────────────────────────────────────────

/// Outcome of deleting one subscription during `delete_all`.
#[derive(Debug)]
pub struct DeleteOutcome {
    pub id: String,
    pub result: Result<(), SubscriptionError>,
}

pub struct SubscriptionManager {
    api: Arc<dyn SubscriptionApi>,
    cache: SubscriptionCache,
}

impl SubscriptionManager {
    pub fn new(api: Arc<dyn SubscriptionApi>, cache: SubscriptionCache) -> Self {
        Self { api, cache }
    }

    pub fn cache(&self) -> &SubscriptionCache {
        &self.cache
    }

    /// Register `target_url`. A random secret is generated when none is given.
    pub async fn create(
        &self,
        target_url: &str,
        secret: Option<String>,
    ) -> Result<Subscription, SubscriptionError> {
        let target_url = target_url.trim();
        if !(target_url.starts_with("https://") || target_url.starts_with("http://")) {
            return Err(SubscriptionError::InvalidUrl(target_url.to_string()));
        }
        let secret = secret
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(generate_secret);

        let mut sub = self.api.create(target_url, &secret).await?;
        if sub.secret.is_none() {
            sub.secret = Some(secret);
        }
        self.cache.upsert(sub.clone())?;
        info!(id = %sub.id, url = %sub.url, "subscription created");
        Ok(sub)
    }

    /// Remote subscriptions; the cache is refreshed as a side effect.
    pub async fn list(&self) -> Result<Vec<Subscription>, SubscriptionError> {
        let remote = self.api.list().await?;
        self.cache.sync(&remote)
    }

    pub async fn delete(&self, id: &str) -> Result<(), SubscriptionError> {
        self.api.delete(id).await?;
        if !self.cache.remove(id)? {
            warn!(id, "deleted subscription was not in the local cache");
        }
        info!(id, "subscription deleted");
        Ok(())
    }

    /// Delete every remote subscription, continuing past failures.
    pub async fn delete_all(&self) -> Result<Vec<DeleteOutcome>, SubscriptionError> {
        let subs = self.api.list().await?;
        let mut outcomes = Vec::with_capacity(subs.len());
        for sub in subs {
            let result = self.delete(&sub.id).await;
            if let Err(e) = &result {
                warn!(id = %sub.id, error = %e, "failed to delete subscription");
            }
            outcomes.push(DeleteOutcome { id: sub.id, result });
        }
        Ok(outcomes)
    }

    /// Details for one subscription: remote first, cache as fallback.
    pub async fn info(&self, id: &str) -> Result<Subscription, SubscriptionError> {
        let cached = self.cache.load()?.into_iter().find(|s| s.id == id);
        match self.api.list().await {
            Ok(remote) => match remote.into_iter().find(|s| s.id == id) {
                Some(mut sub) => {
                    if sub.secret.is_none() {
                        sub.secret = cached.and_then(|c| c.secret);
                    }
                    Ok(sub)
                }
                None => Err(SubscriptionError::NotFound(id.to_string())),
            },
            Err(e) => {
                warn!(id, error = %e, "could not reach API; using cached entry");
                cached.ok_or_else(|| SubscriptionError::NotFound(id.to_string()))
            }
        }
    }

    pub fn cached(&self) -> Result<Vec<Subscription>, SubscriptionError> {
        self.cache.load()
    }
}
