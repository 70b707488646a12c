// src/dedup.rs
//! Dedup gate over the external store. Store failures fail OPEN: the
//! candidate is treated as unseen so nothing is silently dropped, and the
//! error is handed back for the run report.

use std::sync::Arc;
use tracing::warn;

use crate::store::DedupStore;

pub struct DedupGate {
    store: Arc<dyn DedupStore>,
}

#[derive(Debug)]
pub struct GateAnswer {
    pub already_checked: bool,
    pub store_error: Option<String>,
}

impl DedupGate {
    pub fn new(store: Arc<dyn DedupStore>) -> Self {
        Self { store }
    }

    pub async fn check(&self, id: u64) -> GateAnswer {
        match self.store.was_already_checked(id).await {
            Ok(seen) => GateAnswer {
                already_checked: seen,
                store_error: None,
            },
            Err(e) => {
                warn!(story_id = id, error = ?e, "dedup store unavailable, treating as unseen");
                GateAnswer {
                    already_checked: false,
                    store_error: Some(format!("dedup check for story {id}: {e:#}")),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use async_trait::async_trait;

    struct FixedStore(Result<bool, ()>);

    #[async_trait]
    impl DedupStore for FixedStore {
        async fn was_already_checked(&self, _id: u64) -> anyhow::Result<bool> {
            match self.0 {
                Ok(b) => Ok(b),
                Err(()) => Err(anyhow!("connection refused")),
            }
        }
    }

    #[tokio::test]
    async fn seen_id_is_reported_checked() {
        let gate = DedupGate::new(Arc::new(FixedStore(Ok(true))));
        let answer = gate.check(42).await;
        assert!(answer.already_checked);
        assert!(answer.store_error.is_none());
    }

    #[tokio::test]
    async fn store_failure_fails_open_and_carries_error() {
        let gate = DedupGate::new(Arc::new(FixedStore(Err(()))));
        let answer = gate.check(42).await;
        assert!(!answer.already_checked);
        let err = answer.store_error.unwrap();
        assert!(err.contains("42"));
        assert!(err.contains("connection refused"));
    }
}
