//! Task submission

use crate::api::TaskApi;
use crate::error::Result;
use crate::model::{PushSpec, TaskHandle};
use std::sync::Arc;

/// Submits one push or show command per call; never retries
#[derive(Clone)]
pub struct TaskDispatcher {
    api: Arc<dyn TaskApi>,
}

impl TaskDispatcher {
    pub fn new(api: Arc<dyn TaskApi>) -> Self {
        Self { api }
    }

    pub fn api(&self) -> &Arc<dyn TaskApi> {
        &self.api
    }

    pub async fn submit(&self, spec: &PushSpec) -> Result<TaskHandle> {
        let connection = spec.connection();
        let handle = match spec {
            PushSpec::Config { connection, lines } => {
                self.api.submit_config_push(connection, lines).await
            }
            PushSpec::Show {
                connection,
                command,
            } => self.api.submit_show(connection, command).await,
        }
        .inspect_err(|e| {
            tracing::warn!(host = %connection.host, error = %e, "Task submission rejected");
        })?;

        tracing::info!(
            host = %connection.host,
            device_type = %connection.device_type,
            task_id = %handle.id,
            "Task submitted"
        );
        Ok(handle)
    }
}
