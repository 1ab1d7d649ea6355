use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{RankingStore, StoreError};
use crate::ranking::{RankingListItem, RankingRun};

#[derive(Default)]
struct Inner {
    runs: HashMap<String, Arc<RankingRun>>,
    latest: HashMap<String, String>,
}

/// Process-local store. A single lock covers arena and index so `put` is atomic.
#[derive(Default)]
pub struct MemoryRankingStore {
    inner: RwLock<Inner>,
}

impl MemoryRankingStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RankingStore for MemoryRankingStore {
    async fn latest_for_job(&self, job_id: &str) -> Result<Option<Arc<RankingRun>>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .latest
            .get(job_id)
            .and_then(|ranking_id| inner.runs.get(ranking_id))
            .cloned())
    }

    async fn get(&self, ranking_id: &str) -> Result<Option<Arc<RankingRun>>, StoreError> {
        Ok(self.inner.read().await.runs.get(ranking_id).cloned())
    }

    async fn put(&self, run: Arc<RankingRun>) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        inner
            .latest
            .insert(run.job_id.clone(), run.ranking_id.clone());
        inner.runs.insert(run.ranking_id.clone(), run);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<RankingListItem>, StoreError> {
        let inner = self.inner.read().await;
        let mut items: Vec<RankingListItem> = inner
            .runs
            .values()
            .map(|run| RankingListItem::from(run.as_ref()))
            .collect();
        items.sort_by(|a, b| {
            b.ranked_at
                .cmp(&a.ranked_at)
                .then_with(|| b.ranking_id.cmp(&a.ranking_id))
        });
        Ok(items)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
