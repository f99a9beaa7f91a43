use super::{DeploymentRecord, StateStore};
use crate::error::{DeployError, Result};
use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::Mutex;

#[derive(Default)]
struct Inner {
    records: BTreeMap<String, Vec<DeploymentRecord>>,
    lock: Option<String>,
}

/// Non-durable store for dry runs and tests.
#[derive(Default)]
pub struct MemoryStateStore {
    inner: Mutex<Inner>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn get(&self, name: &str) -> Result<Option<DeploymentRecord>> {
        let inner = self.inner.lock().await;
        Ok(inner.records.get(name).and_then(|h| h.last()).cloned())
    }

    async fn put(&self, record: &DeploymentRecord) -> Result<()> {
        let mut inner = self.inner.lock().await;
        inner
            .records
            .entry(record.name.clone())
            .or_default()
            .push(record.clone());
        Ok(())
    }

    async fn all(&self) -> Result<Vec<DeploymentRecord>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .records
            .values()
            .filter_map(|h| h.last().cloned())
            .collect())
    }

    async fn history(&self, name: &str) -> Result<Vec<DeploymentRecord>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .records
            .get(name)
            .map(|h| h.iter().rev().cloned().collect())
            .unwrap_or_default())
    }

    async fn acquire_lock(&self, run_id: &str) -> Result<()> {
        let mut inner = self.inner.lock().await;
        match &inner.lock {
            Some(holder) if holder != run_id => Err(DeployError::StoreLocked {
                holder: holder.clone(),
            }),
            _ => {
                inner.lock = Some(run_id.to_string());
                Ok(())
            }
        }
    }

    async fn release_lock(&self, run_id: &str) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if inner.lock.as_deref() == Some(run_id) {
            inner.lock = None;
        }
        Ok(())
    }

    async fn break_lock(&self) -> Result<Option<String>> {
        let mut inner = self.inner.lock().await;
        Ok(inner.lock.take())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ConstructorArg;

    #[tokio::test]
    async fn test_put_supersedes() {
        let store = MemoryStateStore::new();
        store
            .put(&DeploymentRecord::new("HotDog", "0x01", vec![], None))
            .await
            .unwrap();
        store
            .put(&DeploymentRecord::new(
                "HotDog",
                "0x02",
                vec![ConstructorArg::Uint(1)],
                None,
            ))
            .await
            .unwrap();

        assert_eq!(store.get("HotDog").await.unwrap().unwrap().address, "0x02");
        assert_eq!(store.all().await.unwrap().len(), 1);
        let history = store.history("HotDog").await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].address, "0x02");
    }

    #[tokio::test]
    async fn test_lock_is_exclusive() {
        let store = MemoryStateStore::new();
        store.acquire_lock("run-a").await.unwrap();
        assert!(matches!(
            store.acquire_lock("run-b").await,
            Err(DeployError::StoreLocked { holder }) if holder == "run-a"
        ));
        store.release_lock("run-b").await.unwrap();
        assert!(store.acquire_lock("run-b").await.is_err());
        store.release_lock("run-a").await.unwrap();
        store.acquire_lock("run-b").await.unwrap();
        assert_eq!(store.break_lock().await.unwrap().as_deref(), Some("run-b"));
    }
}
