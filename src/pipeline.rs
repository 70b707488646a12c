// src/pipeline.rs
//! Match-and-dispatch pipeline: fetch ranked candidates, gate out stories a
//! prior run already evaluated, scan the rest against the compiled team
//! subscriptions, and fan out one notification per (story, team) match.
//!
//! One call to [`Pipeline::run_once`] is one run. Only the candidate-list
//! fetch is run-fatal; every per-story and per-team failure is converted to
//! data on the report.

use anyhow::{Context, Result};
use futures::future::join_all;
use metrics::{counter, describe_counter};
use once_cell::sync::OnceCell;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::dedup::DedupGate;
use crate::hn::FeedClient;
use crate::notify::Notifier;
use crate::scanner::TeamScanner;
use crate::store::{DedupStore, SubscriptionStore};

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("pipeline_runs_total", "Completed pipeline runs.");
        describe_counter!(
            "pipeline_candidates_total",
            "Candidate ids returned by the feed."
        );
        describe_counter!(
            "pipeline_processed_total",
            "Stories that reached the scanner."
        );
        describe_counter!(
            "pipeline_matches_total",
            "(story, team) keyword matches found."
        );
        describe_counter!(
            "pipeline_delivery_errors_total",
            "Failed notification sends."
        );
        describe_counter!(
            "pipeline_store_errors_total",
            "Dedup store failures handled fail-open."
        );
    });
}

/// A failed notification send, kept as data rather than control flow.
#[derive(Debug, Clone, Serialize)]
pub struct DeliveryError {
    pub story_id: u64,
    pub team_id: String,
    pub error: String,
}

/// Sole output of one run. Immutable once returned.
#[derive(Debug, Serialize)]
pub struct RunReport {
    pub summary: String,
    /// Story id -> matched teams; only stories with at least one match.
    pub results: BTreeMap<u64, BTreeSet<String>>,
    pub errors: Vec<DeliveryError>,
    /// Dedup store failures handled fail-open during this run.
    pub store_errors: Vec<String>,
    pub total_stories: usize,
    pub processed_stories: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HarnessStatus {
    Pass,
    Fail,
}

/// Output of the scanner-verification harness.
#[derive(Debug, Serialize)]
pub struct HarnessReport {
    pub status: HarnessStatus,
    pub mismatches: BTreeMap<u64, String>,
}

pub struct Pipeline {
    feed: Arc<dyn FeedClient>,
    subscriptions: Arc<dyn SubscriptionStore>,
    gate: DedupGate,
    notifier: Arc<dyn Notifier>,
}

impl Pipeline {
    pub fn new(
        feed: Arc<dyn FeedClient>,
        subscriptions: Arc<dyn SubscriptionStore>,
        dedup: Arc<dyn DedupStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            feed,
            subscriptions,
            gate: DedupGate::new(dedup),
            notifier,
        }
    }

    /// One full pass over up to `candidate_limit` ranked candidates.
    pub async fn run_once(&self, candidate_limit: usize) -> Result<RunReport> {
        ensure_metrics_described();
        let started = std::time::Instant::now();

        let candidate_ids = self
            .feed
            .list_top_candidates(candidate_limit)
            .await
            .context("listing top candidates")?;
        counter!("pipeline_candidates_total").increment(candidate_ids.len() as u64);

        // Subscriptions load once per run; the scanner compiled from them is
        // reused for every story so scanning semantics cannot drift mid-run.
        let subscriptions = self
            .subscriptions
            .get_all_subscriptions()
            .await
            .context("loading team subscriptions")?;
        let scanner = TeamScanner::compile(&subscriptions).context("compiling team scanner")?;

        let mut results: BTreeMap<u64, BTreeSet<String>> = BTreeMap::new();
        let mut errors: Vec<DeliveryError> = Vec::new();
        let mut store_errors: Vec<String> = Vec::new();
        let mut processed = 0usize;

        for &story_id in &candidate_ids {
            let answer = self.gate.check(story_id).await;
            if let Some(err) = answer.store_error {
                store_errors.push(err);
            }
            if answer.already_checked {
                debug!(story_id, "already checked, skipping");
                continue;
            }

            let story = match self.feed.get_story(story_id).await {
                Ok(Some(story)) => story,
                Ok(None) => {
                    info!(story_id, "story not found, skipping");
                    continue;
                }
                Err(e) => {
                    // Same path as not-found: a skip, not a run failure.
                    warn!(story_id, error = ?e, "story fetch failed, skipping");
                    continue;
                }
            };

            if !story.is_eligible() {
                debug!(
                    story_id,
                    "skipping: deleted, not a story, or missing url"
                );
                continue;
            }

            processed += 1;
            debug!(story_id, "checking story for keywords");
            let matched = scanner.match_teams(&story);
            counter!("pipeline_matches_total").increment(matched.len() as u64);
            if matched.is_empty() {
                continue;
            }
            results.insert(story_id, matched.clone());

            // Fire every matched team's send together and gather the
            // outcomes; one failure never cancels a sibling send.
            let sends = matched.iter().map(|team_id| {
                let notifier = Arc::clone(&self.notifier);
                let story = story.clone();
                let team_id = team_id.clone();
                async move {
                    info!(story_id = story.id, team_id = %team_id, "sending story to team");
                    let outcome = notifier.notify(&story, &team_id).await;
                    (team_id, outcome)
                }
            });
            for (team_id, outcome) in join_all(sends).await {
                if let Err(e) = outcome {
                    warn!(story_id, team_id = %team_id, error = ?e, "notification failed");
                    errors.push(DeliveryError {
                        story_id,
                        team_id,
                        error: format!("{e:#}"),
                    });
                }
            }
        }

        counter!("pipeline_runs_total").increment(1);
        counter!("pipeline_processed_total").increment(processed as u64);
        counter!("pipeline_delivery_errors_total").increment(errors.len() as u64);
        counter!("pipeline_store_errors_total").increment(store_errors.len() as u64);

        let report = RunReport {
            summary: format!(
                "Processed {} new stories from {}",
                processed,
                self.feed.source_name()
            ),
            results,
            errors,
            store_errors,
            total_stories: candidate_ids.len(),
            processed_stories: processed,
        };
        info!(
            total = report.total_stories,
            processed = report.processed_stories,
            matched = report.results.len(),
            delivery_errors = report.errors.len(),
            store_errors = report.store_errors.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "pipeline run complete"
        );
        Ok(report)
    }

    /// Verification harness: fetch + scan only, compared against expected
    /// match sets. No dedup, no dispatch. Mismatches come back as
    /// descriptions, never as errors.
    pub async fn run_test(
        &self,
        candidate_ids: &[u64],
        fake_subscriptions: &BTreeMap<String, Vec<String>>,
        expected: &BTreeMap<u64, BTreeSet<String>>,
    ) -> Result<HarnessReport> {
        let scanner =
            TeamScanner::compile(fake_subscriptions).context("compiling harness scanner")?;

        let mut mismatches: BTreeMap<u64, String> = BTreeMap::new();
        for &story_id in candidate_ids {
            debug!(story_id, "harness checking story");
            let story = match self.feed.get_story(story_id).await {
                Ok(Some(story)) => story,
                Ok(None) => {
                    mismatches.insert(story_id, "story not found".to_string());
                    continue;
                }
                Err(e) => {
                    mismatches.insert(story_id, format!("story fetch failed: {e:#}"));
                    continue;
                }
            };
            if story.deleted.unwrap_or(false) {
                continue;
            }

            let actual = scanner.match_teams(&story);
            let want = expected.get(&story_id).cloned().unwrap_or_default();
            if actual != want {
                mismatches.insert(
                    story_id,
                    format!("interested teams don't match; expected {want:?}, actual {actual:?}"),
                );
            }
        }

        let status = if mismatches.is_empty() {
            HarnessStatus::Pass
        } else {
            HarnessStatus::Fail
        };
        Ok(HarnessReport { status, mismatches })
    }
}
