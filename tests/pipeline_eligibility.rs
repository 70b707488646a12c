// tests/pipeline_eligibility.rs
//
// Ineligible content (deleted, non-story, missing url) is filtered before
// the scanner: never processed, never matched, never dispatched.

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use hn_keyword_notifier::hn::{FeedClient, Story};
use hn_keyword_notifier::notify::Notifier;
use hn_keyword_notifier::pipeline::Pipeline;
use hn_keyword_notifier::store::{NoDedup, StaticSubscriptions};

struct FakeFeed {
    candidates: Vec<u64>,
    stories: HashMap<u64, Story>,
}

#[async_trait]
impl FeedClient for FakeFeed {
    async fn list_top_candidates(&self, limit: usize) -> Result<Vec<u64>> {
        Ok(self.candidates.iter().copied().take(limit).collect())
    }

    async fn get_story(&self, id: u64) -> Result<Option<Story>> {
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

#[tokio::test]
async fn ineligible_stories_never_reach_the_scanner() {
    // every title would match the subscription if it were scanned
    let deleted = Story {
        id: 1,
        title: Some("rust post".to_string()),
        url: Some("https://example.test/1".to_string()),
        kind: Some("story".to_string()),
        deleted: Some(true),
        ..Story::default()
    };
    let job = Story {
        id: 2,
        title: Some("rust post".to_string()),
        url: Some("https://example.test/2".to_string()),
        kind: Some("job".to_string()),
        ..Story::default()
    };
    let unlinked = Story {
        id: 3,
        title: Some("rust post".to_string()),
        url: None,
        kind: Some("story".to_string()),
        ..Story::default()
    };
    let eligible = Story {
        id: 4,
        title: Some("rust post".to_string()),
        url: Some("https://example.test/4".to_string()),
        kind: Some("story".to_string()),
        ..Story::default()
    };

    let feed = FakeFeed {
        candidates: vec![1, 2, 3, 4],
        stories: HashMap::from([
            (1, deleted),
            (2, job),
            (3, unlinked),
            (4, eligible),
        ]),
    };
    let sink = Arc::new(RecordingSink::default());
    let pipeline = Pipeline::new(
        Arc::new(feed),
        Arc::new(StaticSubscriptions::new(BTreeMap::from([(
            "team-a".to_string(),
            vec!["rust".to_string()],
        )]))),
        Arc::new(NoDedup),
        sink.clone(),
    );

    let report = pipeline.run_once(30).await.expect("run_once");

    assert_eq!(report.total_stories, 4);
    assert_eq!(report.processed_stories, 1);
    assert_eq!(report.results.len(), 1);
    assert!(report.results.contains_key(&4));
    assert_eq!(*sink.sent.lock(), vec![(4, "team-a".to_string())]);
    // skips are not failures
    assert!(report.errors.is_empty());
    assert!(report.store_errors.is_empty());
}
