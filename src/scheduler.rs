// src/scheduler.rs
//! In-process cron trigger: a tokio interval loop invoking the pipeline.
//! Deployments with an external scheduler hit `POST /cron` instead.

use metrics::counter;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::pipeline::Pipeline;

#[derive(Clone, Copy, Debug)]
pub struct CronSchedulerCfg {
    pub interval_secs: u64,
    pub candidate_limit: usize,
}

pub fn spawn_cron_scheduler(pipeline: Arc<Pipeline>, cfg: CronSchedulerCfg) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(cfg.interval_secs));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;

            match pipeline.run_once(cfg.candidate_limit).await {
                Ok(report) => {
                    counter!("cron_ticks_total").increment(1);
                    info!(
                        target: "cron",
                        summary = %report.summary,
                        matched = report.results.len(),
                        delivery_errors = report.errors.len(),
                        "cron tick"
                    );
                }
                Err(e) => {
                    // A failed run is this tick's problem only; keep ticking.
                    counter!("cron_failed_runs_total").increment(1);
                    warn!(target: "cron", error = ?e, "cron run failed");
                }
            }
        }
    })
}
