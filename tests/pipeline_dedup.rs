// tests/pipeline_dedup.rs
//
// Dedup gate behavior inside a run: seen candidates are never fetched,
// marks persisted by the external store suppress re-delivery across runs,
// and a broken store fails open without dropping candidates.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use hn_keyword_notifier::hn::{FeedClient, Story};
use hn_keyword_notifier::notify::Notifier;
use hn_keyword_notifier::pipeline::Pipeline;
use hn_keyword_notifier::store::{DedupStore, StaticSubscriptions};

fn story(id: u64, title: &str) -> Story {
    Story {
        id,
        title: Some(title.to_string()),
        url: Some(format!("https://example.test/{id}")),
        kind: Some("story".to_string()),
        ..Story::default()
    }
}

struct FakeFeed {
    candidates: Vec<u64>,
    stories: HashMap<u64, Story>,
    detail_calls: Mutex<Vec<u64>>,
}

#[async_trait]
impl FeedClient for FakeFeed {
    async fn list_top_candidates(&self, limit: usize) -> Result<Vec<u64>> {
        Ok(self.candidates.iter().copied().take(limit).collect())
    }

    async fn get_story(&self, id: u64) -> Result<Option<Story>> {
        self.detail_calls.lock().push(id);
        Ok(self.stories.get(&id).cloned())
    }

    fn source_name(&self) -> &'static str {
        "Hacker News"
    }
}

#[derive(Default)]
struct RecordingSink {
    sent: Mutex<Vec<(u64, String)>>,
}

#[async_trait]
impl Notifier for RecordingSink {
    async fn notify(&self, story: &Story, team_id: &str) -> Result<()> {
        self.sent.lock().push((story.id, team_id.to_string()));
        Ok(())
    }
}

struct SetDedup(HashSet<u64>);

#[async_trait]
impl DedupStore for SetDedup {
    async fn was_already_checked(&self, id: u64) -> Result<bool> {
        Ok(self.0.contains(&id))
    }
}

/// Emulates an external store that writes the "checked" mark at ingestion
/// time: the first query for an id marks it, later queries report it seen.
#[derive(Default)]
struct MarkOnReadDedup {
    seen: Mutex<HashSet<u64>>,
}

#[async_trait]
impl DedupStore for MarkOnReadDedup {
    async fn was_already_checked(&self, id: u64) -> Result<bool> {
        Ok(!self.seen.lock().insert(id))
    }
}

struct BrokenDedup;

#[async_trait]
impl DedupStore for BrokenDedup {
    async fn was_already_checked(&self, _id: u64) -> Result<bool> {
        Err(anyhow!("store timeout"))
    }
}

fn subs_one(team: &str, kw: &str) -> BTreeMap<String, Vec<String>> {
    BTreeMap::from([(team.to_string(), vec![kw.to_string()])])
}

#[tokio::test]
async fn seen_candidate_is_never_fetched_and_not_processed() {
    let feed = Arc::new(FakeFeed {
        candidates: vec![42, 43],
        stories: HashMap::from([(42, story(42, "rust story")), (43, story(43, "rust story"))]),
        detail_calls: Mutex::new(Vec::new()),
    });
    let pipeline = Pipeline::new(
        feed.clone(),
        Arc::new(StaticSubscriptions::new(subs_one("team-a", "rust"))),
        Arc::new(SetDedup(HashSet::from([42]))),
        Arc::new(RecordingSink::default()),
    );

    let report = pipeline.run_once(30).await.expect("run_once");

    // 42 was gated out before any detail fetch
    assert_eq!(*feed.detail_calls.lock(), vec![43]);
    assert_eq!(report.total_stories, 2);
    assert_eq!(report.processed_stories, 1);
    assert!(!report.results.contains_key(&42));
}

#[tokio::test]
async fn persisted_marks_make_a_second_run_idempotent() {
    let feed = Arc::new(FakeFeed {
        candidates: vec![1, 2],
        stories: HashMap::from([(1, story(1, "rust one")), (2, story(2, "rust two"))]),
        detail_calls: Mutex::new(Vec::new()),
    });
    let sink = Arc::new(RecordingSink::default());
    let pipeline = Pipeline::new(
        feed,
        Arc::new(StaticSubscriptions::new(subs_one("team-a", "rust"))),
        Arc::new(MarkOnReadDedup::default()),
        sink.clone(),
    );

    let first = pipeline.run_once(30).await.expect("first run");
    assert_eq!(first.processed_stories, 2);
    assert_eq!(sink.sent.lock().len(), 2);

    let second = pipeline.run_once(30).await.expect("second run");
    assert_eq!(second.processed_stories, 0);
    assert!(second.results.is_empty());
    // no duplicate deliveries
    assert_eq!(sink.sent.lock().len(), 2);
}

#[tokio::test]
async fn store_failure_fails_open_and_is_surfaced() {
    let feed = Arc::new(FakeFeed {
        candidates: vec![7],
        stories: HashMap::from([(7, story(7, "rust story"))]),
        detail_calls: Mutex::new(Vec::new()),
    });
    let sink = Arc::new(RecordingSink::default());
    let pipeline = Pipeline::new(
        feed,
        Arc::new(StaticSubscriptions::new(subs_one("team-a", "rust"))),
        Arc::new(BrokenDedup),
        sink.clone(),
    );

    let report = pipeline.run_once(30).await.expect("run_once");

    // candidate is not silently dropped
    assert_eq!(report.processed_stories, 1);
    assert_eq!(sink.sent.lock().len(), 1);
    // and the store trouble is visible on the report
    assert_eq!(report.store_errors.len(), 1);
    assert!(report.store_errors[0].contains("store timeout"));
}
