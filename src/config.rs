// src/config.rs
//! Process-wide run parameters, resolved once at startup from the
//! environment and passed explicitly into the collaborators.

// --- env defaults & names ---
pub const DEFAULT_CANDIDATE_LIMIT: usize = 30;

pub const ENV_CANDIDATE_LIMIT: &str = "CANDIDATE_LIMIT";
pub const ENV_CRON_INTERVAL_SECS: &str = "CRON_INTERVAL_SECS";

#[derive(Debug, Clone, Copy)]
pub struct AppConfig {
    /// How many ranked candidate ids one run requests from the feed.
    pub candidate_limit: usize,
    /// In-process scheduler cadence; `None` (or 0) leaves triggering to an
    /// external caller hitting `POST /cron`.
    pub cron_interval_secs: Option<u64>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let candidate_limit = std::env::var(ENV_CANDIDATE_LIMIT)
            .ok()
            .and_then(|s| s.trim().parse::<usize>().ok())
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_CANDIDATE_LIMIT);

        let cron_interval_secs = std::env::var(ENV_CRON_INTERVAL_SECS)
            .ok()
            .and_then(|s| s.trim().parse::<u64>().ok())
            .filter(|n| *n > 0);

        Self {
            candidate_limit,
            cron_interval_secs,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            candidate_limit: DEFAULT_CANDIDATE_LIMIT,
            cron_interval_secs: None,
        }
    }
}
