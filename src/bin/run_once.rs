//! One-shot local run: file subscriptions, no dedup, Slack only if
//! SLACK_BOT_TOKEN is set. Prints the run report as JSON.

use std::sync::Arc;

use hn_keyword_notifier::config::AppConfig;
use hn_keyword_notifier::hn::HnClient;
use hn_keyword_notifier::notify::slack::SlackNotifier;
use hn_keyword_notifier::pipeline::Pipeline;
use hn_keyword_notifier::store::{load_subscriptions_default, NoDedup, StaticSubscriptions};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt().with_target(false).init();

    let cfg = AppConfig::from_env();
    let subs = load_subscriptions_default()?;

    let pipeline = Pipeline::new(
        Arc::new(HnClient::from_env()),
        Arc::new(StaticSubscriptions::new(subs)),
        Arc::new(NoDedup),
        Arc::new(SlackNotifier::from_env()),
    );

    let report = pipeline.run_once(cfg.candidate_limit).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
