pub mod slack;

use anyhow::Result;
use async_trait::async_trait;

use crate::hn::Story;

/// One outbound send per (story, team) match. No batching, no retry;
/// failures go back to the caller.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, story: &Story, team_id: &str) -> Result<()>;
}
