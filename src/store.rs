// src/store.rs
//! Durable store boundary: team subscriptions and "already checked" marks.
//!
//! Production backend is the Upstash Redis REST API (bearer token over
//! HTTPS). For local runs without credentials, subscriptions can come from
//! a TOML file and dedup is disabled.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use tracing::warn;

/// Redis set holding ids the store has already seen.
const CHECKED_SET_KEY: &str = "checked_stories";
/// Redis hash: team id -> JSON array of keywords.
const SUBSCRIPTIONS_HASH_KEY: &str = "team_keywords";

pub const ENV_SUBSCRIPTIONS_PATH: &str = "SUBSCRIPTIONS_PATH";
pub const DEFAULT_SUBSCRIPTIONS_PATH: &str = "config/subscriptions.toml";

#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    async fn get_all_subscriptions(&self) -> Result<BTreeMap<String, Vec<String>>>;
}

#[async_trait]
pub trait DedupStore: Send + Sync {
    /// Whether a prior run already evaluated this story. The pipeline only
    /// reads; writing the mark belongs to the store's own lifecycle.
    async fn was_already_checked(&self, id: u64) -> Result<bool>;
}

/// Upstash Redis REST wrapper. Every command is a GET against
/// `{base}/{command}/{args...}` returning `{"result": ...}` or
/// `{"error": "..."}`.
pub struct UpstashStore {
    base_url: String,
    token: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct UpstashResponse<T> {
    result: Option<T>,
    error: Option<String>,
}

impl UpstashStore {
    pub fn new(base_url: String, token: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap_or_default();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            client,
        }
    }

    /// Reads `UPSTASH_REDIS_REST_URL` / `UPSTASH_REDIS_REST_TOKEN`.
    /// Returns `None` when either is unset.
    pub fn from_env() -> Option<Self> {
        let url = std::env::var("UPSTASH_REDIS_REST_URL").ok()?;
        let token = std::env::var("UPSTASH_REDIS_REST_TOKEN").ok()?;
        Some(Self::new(url, token))
    }

    async fn command<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}/{}", self.base_url, path);
        let resp: UpstashResponse<T> = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await
            .context("upstash get()")?
            .error_for_status()
            .context("upstash non-2xx")?
            .json()
            .await
            .context("upstash json")?;

        if let Some(err) = resp.error {
            return Err(anyhow!("upstash command error: {err}"));
        }
        resp.result
            .ok_or_else(|| anyhow!("upstash response missing result"))
    }
}

#[async_trait]
impl DedupStore for UpstashStore {
    async fn was_already_checked(&self, id: u64) -> Result<bool> {
        let n: u8 = self
            .command(&format!("sismember/{CHECKED_SET_KEY}/{id}"))
            .await?;
        Ok(n == 1)
    }
}

#[async_trait]
impl SubscriptionStore for UpstashStore {
    async fn get_all_subscriptions(&self) -> Result<BTreeMap<String, Vec<String>>> {
        // HGETALL returns a flat [field, value, field, value, ...] array.
        let flat: Vec<String> = self
            .command(&format!("hgetall/{SUBSCRIPTIONS_HASH_KEY}"))
            .await?;

        let mut subs = BTreeMap::new();
        for pair in flat.chunks_exact(2) {
            let team_id = pair[0].clone();
            subs.insert(team_id, parse_keyword_value(&pair[1]));
        }
        Ok(subs)
    }
}

/// Keyword hash values are JSON arrays; tolerate a bare comma-separated
/// string as well (hand-edited entries).
fn parse_keyword_value(raw: &str) -> Vec<String> {
    if let Ok(list) = serde_json::from_str::<Vec<String>>(raw) {
        return clean_keywords(list);
    }
    clean_keywords(raw.split(',').map(str::to_string).collect())
}

fn clean_keywords(items: Vec<String>) -> Vec<String> {
    items
        .into_iter()
        .map(|kw| kw.trim().to_string())
        .filter(|kw| !kw.is_empty())
        .collect()
}

/// Fixed in-memory subscriptions (local runs, tests).
pub struct StaticSubscriptions {
    subs: BTreeMap<String, Vec<String>>,
}

impl StaticSubscriptions {
    pub fn new(subs: BTreeMap<String, Vec<String>>) -> Self {
        Self { subs }
    }
}

#[async_trait]
impl SubscriptionStore for StaticSubscriptions {
    async fn get_all_subscriptions(&self) -> Result<BTreeMap<String, Vec<String>>> {
        Ok(self.subs.clone())
    }
}

/// Dedup disabled: every candidate is treated as unseen. Only for local
/// runs without a durable store; repeated runs will re-notify.
pub struct NoDedup;

#[async_trait]
impl DedupStore for NoDedup {
    async fn was_already_checked(&self, _id: u64) -> Result<bool> {
        Ok(false)
    }
}

/// Load subscriptions from a TOML file:
///
/// ```toml
/// [teams]
/// team-a = ["rust", "database"]
/// ```
pub fn load_subscriptions_from_path(path: &Path) -> Result<BTreeMap<String, Vec<String>>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading subscriptions from {}", path.display()))?;
    parse_subscriptions_toml(&content)
}

/// Env override first, then the default path; an absent file yields an
/// empty mapping (nothing to notify).
pub fn load_subscriptions_default() -> Result<BTreeMap<String, Vec<String>>> {
    let path = std::env::var(ENV_SUBSCRIPTIONS_PATH)
        .unwrap_or_else(|_| DEFAULT_SUBSCRIPTIONS_PATH.to_string());
    let path = Path::new(&path);
    if !path.exists() {
        warn!(path = %path.display(), "no subscriptions file, starting with empty mapping");
        return Ok(BTreeMap::new());
    }
    load_subscriptions_from_path(path)
}

fn parse_subscriptions_toml(s: &str) -> Result<BTreeMap<String, Vec<String>>> {
    #[derive(Deserialize)]
    struct SubsFile {
        teams: BTreeMap<String, Vec<String>>,
    }
    let parsed: SubsFile = toml::from_str(s).context("parsing subscriptions toml")?;
    Ok(parsed
        .teams
        .into_iter()
        .map(|(team, kws)| (team, clean_keywords(kws)))
        .collect())
}
