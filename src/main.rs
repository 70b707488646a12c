//! Hacker News Keyword Notifier — Binary Entrypoint
//! Boots the Axum HTTP server, wires the pipeline collaborators, and
//! optionally spawns the in-process cron scheduler.
//!
//! See `README.md` for quickstart.

use std::sync::Arc;

use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use hn_keyword_notifier::api::{self, AppState};
use hn_keyword_notifier::config::AppConfig;
use hn_keyword_notifier::hn::HnClient;
use hn_keyword_notifier::metrics::Metrics;
use hn_keyword_notifier::notify::slack::SlackNotifier;
use hn_keyword_notifier::pipeline::Pipeline;
use hn_keyword_notifier::scheduler::{spawn_cron_scheduler, CronSchedulerCfg};
use hn_keyword_notifier::store::{
    load_subscriptions_default, DedupStore, NoDedup, StaticSubscriptions, SubscriptionStore,
    UpstashStore,
};

/// Enable compact tracing logs in development only.
/// Activation requires BOTH:
///   - dev environment (debug build OR SHUTTLE_ENV in {local, development, dev})
///   - NOTIFIER_DEV_LOG=1
fn enable_dev_tracing() {
    let dev_flag = std::env::var("NOTIFIER_DEV_LOG")
        .ok()
        .is_some_and(|v| v == "1");

    let is_dev_env = cfg!(debug_assertions)
        || matches!(
            std::env::var("SHUTTLE_ENV")
                .unwrap_or_default()
                .to_ascii_lowercase()
                .as_str(),
            "local" | "development" | "dev"
        );

    if !(dev_flag && is_dev_env) {
        return;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("hn_keyword_notifier=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    // Initialize dev tracing early (no-op in production).
    enable_dev_tracing();

    let cfg = AppConfig::from_env();
    let metrics = Metrics::init(cfg.candidate_limit);

    let feed = Arc::new(HnClient::from_env());
    let notifier = Arc::new(SlackNotifier::from_env());

    // Upstash backs both subscriptions and dedup marks in production.
    // Without credentials, fall back to file subscriptions and no dedup.
    let (subscriptions, dedup): (Arc<dyn SubscriptionStore>, Arc<dyn DedupStore>) =
        match UpstashStore::from_env() {
            Some(store) => {
                let store = Arc::new(store);
                let subscriptions: Arc<dyn SubscriptionStore> = store.clone();
                let dedup: Arc<dyn DedupStore> = store;
                (subscriptions, dedup)
            }
            None => {
                tracing::warn!(
                    "Upstash credentials not set; using file subscriptions, dedup disabled"
                );
                let subs =
                    load_subscriptions_default().expect("Failed to load subscriptions config");
                let subscriptions: Arc<dyn SubscriptionStore> =
                    Arc::new(StaticSubscriptions::new(subs));
                let dedup: Arc<dyn DedupStore> = Arc::new(NoDedup);
                (subscriptions, dedup)
            }
        };

    let pipeline = Arc::new(Pipeline::new(feed, subscriptions, dedup, notifier));

    if let Some(interval_secs) = cfg.cron_interval_secs {
        spawn_cron_scheduler(
            pipeline.clone(),
            CronSchedulerCfg {
                interval_secs,
                candidate_limit: cfg.candidate_limit,
            },
        );
    }

    let state = AppState {
        pipeline,
        candidate_limit: cfg.candidate_limit,
    };
    let router = api::create_router(state).merge(metrics.router());

    Ok(router.into())
}
