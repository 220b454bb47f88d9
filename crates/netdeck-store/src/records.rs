//! Typed access to stack, instance and task-history records

use crate::backend::KvStore;
use crate::error::{Result, StoreError};
use chrono::{DateTime, Utc};
use netdeck_core::{ServiceInstance, ServiceStack};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const STACK_PREFIX: &str = "stack:";
pub const INSTANCE_PREFIX: &str = "service_instance:";
pub const TASK_HISTORY_PREFIX: &str = "task_history:";

pub fn stack_key(id: &str) -> String {
    format!("{}{}", STACK_PREFIX, id)
}

pub fn instance_key(id: &str) -> String {
    format!("{}{}", INSTANCE_PREFIX, id)
}

pub fn task_history_key(instance_id: &str) -> String {
    format!("{}{}", TASK_HISTORY_PREFIX, instance_id)
}

/// What a submitted task was for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    Deploy,
    Remove,
    Show,
}

impl std::fmt::Display for TaskKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskKind::Deploy => write!(f, "deploy"),
            TaskKind::Remove => write!(f, "remove"),
            TaskKind::Show => write!(f, "show"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub task_id: String,
    pub kind: TaskKind,
    pub submitted_at: DateTime<Utc>,
}

impl TaskRecord {
    pub fn new(task_id: impl Into<String>, kind: TaskKind) -> Self {
        Self {
            task_id: task_id.into(),
            kind,
            submitted_at: Utc::now(),
        }
    }
}

/// Record repository over a [`KvStore`]
///
/// Writes surface backend failures directly. Listings log the failure and
/// return an empty result; records that no longer deserialize are skipped.
#[derive(Clone)]
pub struct Records {
    store: Arc<dyn KvStore>,
}

impl Records {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn KvStore> {
        &self.store
    }

    async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.store.get(key).await? {
            Some(raw) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|e| StoreError::Corrupt {
                    key: key.to_string(),
                    message: e.to_string(),
                }),
            None => Ok(None),
        }
    }

    async fn put_json<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let raw = serde_json::to_string(value)?;
        self.store.set(key, raw).await
    }

    async fn list_json<T: DeserializeOwned>(&self, prefix: &str) -> Vec<T> {
        let entries = match self.store.scan_prefix(prefix).await {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(prefix, error = %e, "Listing failed, returning empty result");
                return Vec::new();
            }
        };

        entries
            .into_iter()
            .filter_map(|(key, raw)| match serde_json::from_str(&raw) {
                Ok(value) => Some(value),
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "Skipping unreadable record");
                    None
                }
            })
            .collect()
    }

    // stacks

    pub async fn get_stack(&self, id: &str) -> Result<Option<ServiceStack>> {
        self.get_json(&stack_key(id)).await
    }

    pub async fn put_stack(&self, stack: &ServiceStack) -> Result<()> {
        self.put_json(&stack_key(&stack.id), stack).await
    }

    pub async fn delete_stack(&self, id: &str) -> Result<bool> {
        self.store.delete(&stack_key(id)).await
    }

    /// All stacks, oldest first
    pub async fn list_stacks(&self) -> Vec<ServiceStack> {
        let mut stacks: Vec<ServiceStack> = self.list_json(STACK_PREFIX).await;
        stacks.sort_by_key(|s| s.created_at);
        stacks
    }

    // instances

    pub async fn get_instance(&self, id: &str) -> Result<Option<ServiceInstance>> {
        self.get_json(&instance_key(id)).await
    }

    pub async fn put_instance(&self, instance: &ServiceInstance) -> Result<()> {
        self.put_json(&instance_key(&instance.id), instance).await
    }

    pub async fn delete_instance(&self, id: &str) -> Result<bool> {
        self.store.delete(&instance_key(id)).await
    }

    /// All instances, oldest first
    pub async fn list_instances(&self) -> Vec<ServiceInstance> {
        let mut instances: Vec<ServiceInstance> = self.list_json(INSTANCE_PREFIX).await;
        instances.sort_by_key(|i| i.created_at);
        instances
    }

    pub async fn list_instances_for_stack(&self, stack_id: &str) -> Vec<ServiceInstance> {
        self.list_instances()
            .await
            .into_iter()
            .filter(|i| i.stack_id.as_deref() == Some(stack_id))
            .collect()
    }

    // task history

    pub async fn task_history(&self, instance_id: &str) -> Result<Vec<TaskRecord>> {
        Ok(self
            .get_json(&task_history_key(instance_id))
            .await?
            .unwrap_or_default())
    }

    pub async fn append_task(&self, instance_id: &str, record: TaskRecord) -> Result<()> {
        let mut history = self.task_history(instance_id).await?;
        tracing::debug!(
            instance = %instance_id,
            task_id = %record.task_id,
            kind = %record.kind,
            "Recording task"
        );
        history.push(record);
        self.put_json(&task_history_key(instance_id), &history).await
    }

    pub async fn delete_task_history(&self, instance_id: &str) -> Result<bool> {
        self.store.delete(&task_history_key(instance_id)).await
    }
}
