//! Bounded-wait task polling

use crate::api::TaskApi;
use crate::error::{Result, TaskError};
use crate::model::{TaskHandle, TaskSnapshot};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

pub const DEFAULT_MAX_WAIT: Duration = Duration::from_secs(60);
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub max_wait: Duration,
    pub interval: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            max_wait: DEFAULT_MAX_WAIT,
            interval: DEFAULT_INTERVAL,
        }
    }
}

impl PollPolicy {
    pub fn new(max_wait: Duration, interval: Duration) -> Self {
        Self { max_wait, interval }
    }
}

#[derive(Clone)]
pub struct TaskPoller {
    api: Arc<dyn TaskApi>,
    policy: PollPolicy,
}

impl TaskPoller {
    pub fn new(api: Arc<dyn TaskApi>, policy: PollPolicy) -> Self {
        Self { api, policy }
    }

    pub fn policy(&self) -> PollPolicy {
        self.policy
    }

    /// Single status read, no waiting
    pub async fn check(&self, handle: &TaskHandle) -> Result<TaskSnapshot> {
        self.api.get_status(&handle.id).await
    }

    /// Poll with the configured policy
    pub async fn poll(&self, handle: &TaskHandle) -> Result<TaskSnapshot> {
        self.poll_with(handle, self.policy.max_wait, self.policy.interval)
            .await
    }

    /// Poll until finished or failed, or [`TaskError::Timeout`] once
    /// `max_wait` has elapsed. The handle stays valid after a timeout.
    pub async fn poll_with(
        &self,
        handle: &TaskHandle,
        max_wait: Duration,
        interval: Duration,
    ) -> Result<TaskSnapshot> {
        let started = Instant::now();
        loop {
            let snapshot = self.api.get_status(&handle.id).await?;
            if snapshot.status.is_terminal() {
                tracing::debug!(
                    task_id = %handle.id,
                    status = %snapshot.status,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Task reached terminal status"
                );
                return Ok(snapshot);
            }

            let waited = started.elapsed();
            if waited >= max_wait {
                tracing::warn!(task_id = %handle.id, ?waited, "Task poll timed out");
                return Err(TaskError::Timeout {
                    task_id: handle.id.clone(),
                    waited,
                });
            }
            tokio::time::sleep(interval.min(max_wait - waited)).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::ConnectionParams;
    use crate::model::TaskStatus;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Replays a status script; the last entry repeats
    struct ScriptedApi {
        script: Mutex<VecDeque<TaskStatus>>,
        calls: AtomicUsize,
    }

    impl ScriptedApi {
        fn new(script: &[TaskStatus]) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.iter().copied().collect()),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl TaskApi for ScriptedApi {
        async fn submit_config_push(
            &self,
            _connection: &ConnectionParams,
            _lines: &[String],
        ) -> Result<TaskHandle> {
            Ok(TaskHandle::new("t1"))
        }

        async fn submit_show(
            &self,
            _connection: &ConnectionParams,
            _command: &str,
        ) -> Result<TaskHandle> {
            Ok(TaskHandle::new("t1"))
        }

        async fn get_status(&self, task_id: &str) -> Result<TaskSnapshot> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut script = self.script.lock().unwrap();
            let status = if script.len() > 1 {
                script.pop_front().unwrap()
            } else {
                *script.front().unwrap()
            };
            Ok(TaskSnapshot::new(task_id, status))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_until_finished() {
        let api = ScriptedApi::new(&[TaskStatus::Queued, TaskStatus::Running, TaskStatus::Finished]);
        let poller = TaskPoller::new(api.clone(), PollPolicy::default());

        let started = Instant::now();
        let snap = poller.poll(&TaskHandle::new("t1")).await.unwrap();

        assert_eq!(snap.status, TaskStatus::Finished);
        assert_eq!(api.calls.load(Ordering::SeqCst), 3);
        assert!(started.elapsed() >= Duration::from_secs(4));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_returns_failed_status() {
        let api = ScriptedApi::new(&[TaskStatus::Running, TaskStatus::Failed]);
        let poller = TaskPoller::new(api, PollPolicy::default());
        let snap = poller.poll(&TaskHandle::new("t1")).await.unwrap();
        assert_eq!(snap.status, TaskStatus::Failed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_times_out_within_budget() {
        let api = ScriptedApi::new(&[TaskStatus::Running]);
        let poller = TaskPoller::new(api.clone(), PollPolicy::default());

        let started = Instant::now();
        let err = poller.poll(&TaskHandle::new("t1")).await.unwrap_err();

        match err {
            TaskError::Timeout { task_id, waited } => {
                assert_eq!(task_id, "t1");
                assert!(waited >= DEFAULT_MAX_WAIT);
            }
            other => panic!("expected timeout, got {:?}", other),
        }
        assert!(started.elapsed() < DEFAULT_MAX_WAIT + DEFAULT_INTERVAL);
        // one read at t=0 and one after each 2s interval up to 60s
        assert_eq!(api.calls.load(Ordering::SeqCst), 31);
    }

    #[tokio::test]
    async fn test_check_is_single_read() {
        let api = ScriptedApi::new(&[TaskStatus::Running]);
        let poller = TaskPoller::new(api.clone(), PollPolicy::default());
        let snap = poller.check(&TaskHandle::new("t1")).await.unwrap();
        assert_eq!(snap.status, TaskStatus::Running);
        assert_eq!(api.calls.load(Ordering::SeqCst), 1);
    }
}
