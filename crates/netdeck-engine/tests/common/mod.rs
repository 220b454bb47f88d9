use async_trait::async_trait;
use netdeck_core::{ResolvedDevice, TeraRenderer};
use netdeck_engine::Engine;
use netdeck_inventory::StaticResolver;
use netdeck_store::{KvStore, MemoryStore, Records, StoreError};
use netdeck_task::{
    ConnectionParams, PollPolicy, TaskApi, TaskError, TaskHandle, TaskSnapshot, TaskStatus,
};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// How a fake task ends once it has been seen running
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(dead_code)]
pub enum Outcome {
    Finish,
    FailStatus,
    ReportErrors,
    Hang,
    Reject,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Submission {
    Config { host: String, lines: Vec<String> },
    Show { host: String, command: String },
}

struct FakeTask {
    outcome: Outcome,
    result: Value,
    polls: usize,
}

#[derive(Default)]
struct Inner {
    config_outcomes: HashMap<String, Outcome>,
    show_outcomes: HashMap<String, Outcome>,
    live_configs: HashMap<String, String>,
    submissions: Vec<Submission>,
    tasks: HashMap<String, FakeTask>,
    next_id: usize,
    status_reads: usize,
}

/// In-memory task API. Every task reports `running` on its first status
/// read and its configured outcome from the second read on.
#[derive(Default)]
pub struct FakeTaskApi {
    inner: Mutex<Inner>,
}

#[allow(dead_code)]
impl FakeTaskApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_config_outcome(&self, host: &str, outcome: Outcome) {
        let mut inner = self.inner.lock().unwrap();
        inner.config_outcomes.insert(host.to_string(), outcome);
    }

    pub fn set_show_outcome(&self, host: &str, outcome: Outcome) {
        let mut inner = self.inner.lock().unwrap();
        inner.show_outcomes.insert(host.to_string(), outcome);
    }

    pub fn set_live_config(&self, host: &str, config: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner
            .live_configs
            .insert(host.to_string(), config.to_string());
    }

    /// Register a task that reports `outcome` on its next status read
    pub fn seed_task(&self, task_id: &str, outcome: Outcome) {
        let mut inner = self.inner.lock().unwrap();
        inner.tasks.insert(
            task_id.to_string(),
            FakeTask {
                outcome,
                result: Value::Null,
                polls: 1,
            },
        );
    }

    pub fn submissions(&self) -> Vec<Submission> {
        self.inner.lock().unwrap().submissions.clone()
    }

    /// Hosts that received a config push, in submission order
    pub fn config_hosts(&self) -> Vec<String> {
        self.submissions()
            .into_iter()
            .filter_map(|s| match s {
                Submission::Config { host, .. } => Some(host),
                Submission::Show { .. } => None,
            })
            .collect()
    }

    pub fn config_pushes(&self) -> Vec<Vec<String>> {
        self.submissions()
            .into_iter()
            .filter_map(|s| match s {
                Submission::Config { lines, .. } => Some(lines),
                Submission::Show { .. } => None,
            })
            .collect()
    }

    pub fn show_commands(&self) -> Vec<String> {
        self.submissions()
            .into_iter()
            .filter_map(|s| match s {
                Submission::Show { command, .. } => Some(command),
                Submission::Config { .. } => None,
            })
            .collect()
    }

    pub fn status_reads(&self) -> usize {
        self.inner.lock().unwrap().status_reads
    }

    fn start(&self, submission: Submission, outcome: Outcome, result: Value) -> Result<TaskHandle, TaskError> {
        let mut inner = self.inner.lock().unwrap();
        if outcome == Outcome::Reject {
            return Err(TaskError::Dispatch("rejected by fake task API".to_string()));
        }
        inner.submissions.push(submission);
        inner.next_id += 1;
        let id = format!("task-{}", inner.next_id);
        inner.tasks.insert(
            id.clone(),
            FakeTask {
                outcome,
                result,
                polls: 0,
            },
        );
        Ok(TaskHandle::new(id))
    }
}

#[async_trait]
impl TaskApi for FakeTaskApi {
    async fn submit_config_push(
        &self,
        connection: &ConnectionParams,
        lines: &[String],
    ) -> Result<TaskHandle, TaskError> {
        let outcome = {
            let inner = self.inner.lock().unwrap();
            inner
                .config_outcomes
                .get(&connection.host)
                .copied()
                .unwrap_or(Outcome::Finish)
        };
        self.start(
            Submission::Config {
                host: connection.host.clone(),
                lines: lines.to_vec(),
            },
            outcome,
            json!({"changes": lines}),
        )
    }

    async fn submit_show(
        &self,
        connection: &ConnectionParams,
        command: &str,
    ) -> Result<TaskHandle, TaskError> {
        let (outcome, live) = {
            let inner = self.inner.lock().unwrap();
            (
                inner
                    .show_outcomes
                    .get(&connection.host)
                    .copied()
                    .unwrap_or(Outcome::Finish),
                inner
                    .live_configs
                    .get(&connection.host)
                    .cloned()
                    .unwrap_or_default(),
            )
        };
        let mut result = serde_json::Map::new();
        result.insert(command.to_string(), Value::String(live));
        self.start(
            Submission::Show {
                host: connection.host.clone(),
                command: command.to_string(),
            },
            outcome,
            Value::Object(result),
        )
    }

    async fn get_status(&self, task_id: &str) -> Result<TaskSnapshot, TaskError> {
        let mut inner = self.inner.lock().unwrap();
        inner.status_reads += 1;
        let task = inner
            .tasks
            .get_mut(task_id)
            .ok_or_else(|| TaskError::Api {
                status: 404,
                message: format!("no task {}", task_id),
            })?;
        task.polls += 1;

        if task.polls == 1 {
            return Ok(TaskSnapshot::new(task_id, TaskStatus::Running));
        }
        let snapshot = match task.outcome {
            Outcome::Finish => {
                TaskSnapshot::new(task_id, TaskStatus::Finished).with_result(task.result.clone())
            }
            Outcome::FailStatus => TaskSnapshot::new(task_id, TaskStatus::Failed),
            Outcome::ReportErrors => TaskSnapshot::new(task_id, TaskStatus::Finished)
                .with_errors(["device rejected command"]),
            Outcome::Hang | Outcome::Reject => TaskSnapshot::new(task_id, TaskStatus::Running),
        };
        Ok(snapshot)
    }
}

/// Store whose every call fails
#[allow(dead_code)]
pub struct DownStore;

#[async_trait]
impl KvStore for DownStore {
    async fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
        Err(StoreError::Unavailable("store offline".to_string()))
    }

    async fn set(&self, _key: &str, _value: String) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("store offline".to_string()))
    }

    async fn scan_prefix(&self, _prefix: &str) -> Result<Vec<(String, String)>, StoreError> {
        Err(StoreError::Unavailable("store offline".to_string()))
    }

    async fn delete(&self, _key: &str) -> Result<bool, StoreError> {
        Err(StoreError::Unavailable("store offline".to_string()))
    }
}

/// Memory store that fails one chosen write to a stack record
#[allow(dead_code)]
#[derive(Default)]
pub struct FlakyStore {
    inner: MemoryStore,
    stack_writes: AtomicUsize,
    fail_at: AtomicUsize,
}

#[allow(dead_code)]
impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the `nth` stack write from now on, counting from 1
    pub fn fail_stack_write(&self, nth: usize) {
        self.stack_writes.store(0, Ordering::SeqCst);
        self.fail_at.store(nth, Ordering::SeqCst);
    }
}

#[async_trait]
impl KvStore for FlakyStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: String) -> Result<(), StoreError> {
        if key.starts_with("stack:") {
            let n = self.stack_writes.fetch_add(1, Ordering::SeqCst) + 1;
            if n == self.fail_at.load(Ordering::SeqCst) {
                return Err(StoreError::Unavailable("write dropped".to_string()));
            }
        }
        self.inner.set(key, value).await
    }

    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<(String, String)>, StoreError> {
        self.inner.scan_prefix(prefix).await
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        self.inner.delete(key).await
    }
}

pub const VLAN_TEMPLATE: &str = "vlan {{ vlan_id }}\n name {{ vlan_name | default(value=\"users\") }}\n";

pub fn default_templates() -> Vec<(&'static str, &'static str)> {
    vec![
        ("vlan.j2", VLAN_TEMPLATE),
        ("vlan_delete.j2", "no vlan {{ vlan_id }}\n"),
        ("vlan_check.j2", "vlan {{ vlan_id }}\n"),
        ("base.j2", "hostname {{ hostname | default(value=\"edge\") }}\n"),
        (
            "interface.j2",
            "int {{ interface }}\n desc {{ description }}\n",
        ),
    ]
}

pub fn default_resolver() -> StaticResolver {
    [
        ResolvedDevice::new("sw1", "cisco_ios", "10.0.0.1"),
        ResolvedDevice::new("sw2", "cisco_ios", "10.0.0.2"),
        ResolvedDevice::new("sw3", "cisco_ios", "10.0.0.3"),
        ResolvedDevice::new("mx1", "juniper_junos", "10.0.1.1"),
    ]
    .into_iter()
    .collect()
}

pub struct Harness {
    pub engine: Engine,
    pub api: Arc<FakeTaskApi>,
    pub store: MemoryStore,
    pub records: Records,
}

impl Harness {
    pub fn new() -> Self {
        let store = MemoryStore::new();
        let records = Records::new(Arc::new(store.clone()));
        let api = FakeTaskApi::new();
        let renderer = TeraRenderer::from_templates(default_templates()).unwrap();
        let engine = Engine::new(
            records.clone(),
            Arc::new(renderer),
            Arc::new(default_resolver()),
            api.clone(),
            PollPolicy::default(),
        );
        Self {
            engine,
            api,
            store,
            records,
        }
    }

    #[allow(dead_code)]
    pub fn with_store(store: Arc<dyn KvStore>) -> Self {
        let mut harness = Self::new();
        let records = Records::new(store);
        let renderer = TeraRenderer::from_templates(default_templates()).unwrap();
        harness.engine = Engine::new(
            records.clone(),
            Arc::new(renderer),
            Arc::new(default_resolver()),
            harness.api.clone(),
            PollPolicy::default(),
        );
        harness.records = records;
        harness
    }
}
