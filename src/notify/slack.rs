use anyhow::{anyhow, Context, Result};
use reqwest::Client;

use super::Notifier;
use crate::hn::Story;

const CHAT_POST_MESSAGE_URL: &str = "https://slack.com/api/chat.postMessage";

pub struct SlackNotifier {
    bot_token: Option<String>,
    api_url: String,
    client: Client,
}

impl SlackNotifier {
    pub fn from_env() -> Self {
        Self {
            bot_token: std::env::var("SLACK_BOT_TOKEN").ok(),
            api_url: CHAT_POST_MESSAGE_URL.to_string(),
            client: Client::new(),
        }
    }

    /// Optional builder for tests/tools
    pub fn new(token: String) -> Self {
        Self {
            bot_token: Some(token),
            api_url: CHAT_POST_MESSAGE_URL.to_string(),
            client: Client::new(),
        }
    }

    pub fn with_api_url(mut self, url: String) -> Self {
        self.api_url = url;
        self
    }
}

#[async_trait::async_trait]
impl Notifier for SlackNotifier {
    async fn notify(&self, story: &Story, team_id: &str) -> Result<()> {
        let Some(token) = &self.bot_token else {
            tracing::debug!("Slack disabled (no SLACK_BOT_TOKEN)");
            return Ok(());
        };

        let title = story.title.as_deref().unwrap_or("(untitled)");
        let text = format!(
            "*New story match:* <https://news.ycombinator.com/item?id={}|{}>\n{}",
            story.id,
            title,
            story.url.as_deref().unwrap_or_default()
        );
        // The team identifier doubles as the destination channel id.
        let body = serde_json::json!({ "channel": team_id, "text": text });

        let resp: serde_json::Value = self
            .client
            .post(&self.api_url)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .context("slack post")?
            .error_for_status()
            .context("slack non-2xx")?
            .json()
            .await
            .context("slack response json")?;

        // chat.postMessage reports failures in-band with a 200.
        if resp.get("ok").and_then(|v| v.as_bool()) != Some(true) {
            let detail = resp
                .get("error")
                .and_then(|v| v.as_str())
                .unwrap_or("unknown_error");
            return Err(anyhow!("slack rejected message: {detail}"));
        }
        Ok(())
    }
}
