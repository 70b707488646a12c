// src/hn.rs
//! Hacker News feed client: ranked candidate ids + single-item lookup.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_HN_API_BASE: &str = "https://hacker-news.firebaseio.com/v0";

/// One item from the HN item endpoint. Fields are optional because the API
/// omits them freely (deleted items often carry nothing but `id` and
/// `deleted`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Story {
    pub id: u64,
    pub title: Option<String>,
    pub url: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub deleted: Option<bool>,
    pub by: Option<String>,
    pub score: Option<i64>,
    pub time: Option<u64>,
}

impl Story {
    /// A candidate only reaches the scanner when it is a live, linkable
    /// story: not deleted, `type == "story"`, url present and non-empty.
    pub fn is_eligible(&self) -> bool {
        if self.deleted.unwrap_or(false) {
            return false;
        }
        if self.kind.as_deref() != Some("story") {
            return false;
        }
        self.url.as_deref().is_some_and(|u| !u.is_empty())
    }
}

#[async_trait]
pub trait FeedClient: Send + Sync {
    /// Ranked candidate ids, at most `limit` of them.
    async fn list_top_candidates(&self, limit: usize) -> Result<Vec<u64>>;

    /// Full item record. `Ok(None)` means the feed knows no such item
    /// (the endpoint returns literal `null`), which the pipeline treats
    /// as a skip, not a failure.
    async fn get_story(&self, id: u64) -> Result<Option<Story>>;

    fn source_name(&self) -> &'static str;
}

pub struct HnClient {
    base_url: String,
    client: reqwest::Client,
}

impl HnClient {
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();
        Self { base_url, client }
    }

    pub fn from_env() -> Self {
        let base = std::env::var("HN_API_BASE").unwrap_or_else(|_| DEFAULT_HN_API_BASE.to_string());
        Self::new(base)
    }
}

#[async_trait]
impl FeedClient for HnClient {
    async fn list_top_candidates(&self, limit: usize) -> Result<Vec<u64>> {
        let url = format!("{}/topstories.json", self.base_url);
        let ids: Vec<u64> = self
            .client
            .get(&url)
            .send()
            .await
            .context("hn topstories get()")?
            .error_for_status()
            .context("hn topstories non-2xx")?
            .json()
            .await
            .context("hn topstories json")?;
        Ok(ids.into_iter().take(limit).collect())
    }

    async fn get_story(&self, id: u64) -> Result<Option<Story>> {
        let url = format!("{}/item/{}.json", self.base_url, id);
        let story: Option<Story> = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("hn item {id} get()"))?
            .error_for_status()
            .with_context(|| format!("hn item {id} non-2xx"))?
            .json()
            .await
            .with_context(|| format!("hn item {id} json"))?;
        Ok(story)
    }

    fn source_name(&self) -> &'static str {
        "Hacker News"
    }
}
