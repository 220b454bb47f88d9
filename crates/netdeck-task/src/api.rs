//! Task API contract

use crate::connection::ConnectionParams;
use crate::error::Result;
use crate::model::{TaskHandle, TaskSnapshot};
use async_trait::async_trait;

/// Remote task-execution service
///
/// Submissions return immediately with a handle; progress is observed with
/// [`TaskApi::get_status`].
#[async_trait]
pub trait TaskApi: Send + Sync {
    async fn submit_config_push(
        &self,
        connection: &ConnectionParams,
        lines: &[String],
    ) -> Result<TaskHandle>;

    async fn submit_show(&self, connection: &ConnectionParams, command: &str)
    -> Result<TaskHandle>;

    async fn get_status(&self, task_id: &str) -> Result<TaskSnapshot>;
}
