//! Store maintenance sweeps over service instance records

use crate::backend::KvStore;
use crate::error::Result;
use crate::records::INSTANCE_PREFIX;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PurgeReport {
    /// Records left in place
    pub valid: usize,
    /// Keys that were removed
    pub removed: Vec<String>,
}

/// Delete instance records that are empty or not valid JSON
pub async fn purge_corrupt_instances(store: &dyn KvStore) -> Result<PurgeReport> {
    let mut report = PurgeReport::default();

    for (key, raw) in store.scan_prefix(INSTANCE_PREFIX).await? {
        let corrupt = raw.trim().is_empty()
            || serde_json::from_str::<serde_json::Value>(&raw).is_err();
        if corrupt {
            store.delete(&key).await?;
            tracing::info!(key = %key, "Removed corrupt instance record");
            report.removed.push(key);
        } else {
            report.valid += 1;
        }
    }

    tracing::info!(
        valid = report.valid,
        removed = report.removed.len(),
        "Instance purge complete"
    );
    Ok(report)
}

/// Delete every instance record, returning how many were removed
pub async fn clear_instances(store: &dyn KvStore) -> Result<usize> {
    let mut removed = 0;
    for (key, _) in store.scan_prefix(INSTANCE_PREFIX).await? {
        if store.delete(&key).await? {
            removed += 1;
        }
    }
    tracing::info!(removed, "Cleared instance records");
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;

    async fn seeded() -> MemoryStore {
        let store = MemoryStore::new();
        store
            .set("service_instance:ok", r#"{"id":"ok"}"#.to_string())
            .await
            .unwrap();
        store
            .set("service_instance:empty", "  ".to_string())
            .await
            .unwrap();
        store
            .set("service_instance:bad", "{not json".to_string())
            .await
            .unwrap();
        store.set("stack:keep", "{not json".to_string()).await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_purge_removes_only_corrupt_instances() {
        let store = seeded().await;
        let report = purge_corrupt_instances(&store).await.unwrap();

        assert_eq!(report.valid, 1);
        assert_eq!(
            report.removed,
            vec!["service_instance:bad", "service_instance:empty"]
        );
        assert!(store.get("service_instance:ok").await.unwrap().is_some());
        assert!(store.get("stack:keep").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_clear_instances() {
        let store = seeded().await;
        assert_eq!(clear_instances(&store).await.unwrap(), 3);
        assert_eq!(store.len().await, 1);
        assert_eq!(clear_instances(&store).await.unwrap(), 0);
    }
}
