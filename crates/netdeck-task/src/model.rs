//! Task handles, status snapshots and push requests

use crate::connection::ConnectionParams;
use crate::error::{Result, TaskError};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskHandle {
    pub id: String,
}

impl TaskHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

impl std::fmt::Display for TaskHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Queued,
    Running,
    Finished,
    Failed,
}

impl TaskStatus {
    /// Map a task API status word; anything unrecognised is still in flight
    pub fn parse(status: &str) -> Self {
        match status.trim().to_ascii_lowercase().as_str() {
            "queued" => TaskStatus::Queued,
            "finished" => TaskStatus::Finished,
            "failed" | "stopped" | "canceled" | "cancelled" => TaskStatus::Failed,
            _ => TaskStatus::Running,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Finished | TaskStatus::Failed)
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskStatus::Queued => write!(f, "queued"),
            TaskStatus::Running => write!(f, "running"),
            TaskStatus::Finished => write!(f, "finished"),
            TaskStatus::Failed => write!(f, "failed"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSnapshot {
    pub id: String,
    pub status: TaskStatus,
    #[serde(default)]
    pub result: Value,
    #[serde(default)]
    pub errors: Vec<String>,
}

impl TaskSnapshot {
    pub fn new(id: impl Into<String>, status: TaskStatus) -> Self {
        Self {
            id: id.into(),
            status,
            result: Value::Null,
            errors: Vec::new(),
        }
    }

    pub fn with_result(mut self, result: Value) -> Self {
        self.result = result;
        self
    }

    pub fn with_errors<I, S>(mut self, errors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.errors = errors.into_iter().map(Into::into).collect();
        self
    }

    /// Finished with no reported errors
    pub fn succeeded(&self) -> bool {
        self.status == TaskStatus::Finished && self.errors.is_empty()
    }

    /// Turn a failed status or reported errors into [`TaskError::Failed`]
    pub fn into_success(self) -> Result<Self> {
        if self.succeeded() {
            return Ok(self);
        }
        let errors = if self.errors.is_empty() {
            vec![format!("task ended with status {}", self.status)]
        } else {
            self.errors
        };
        Err(TaskError::Failed {
            task_id: self.id,
            errors,
        })
    }

    /// Parse a task API envelope (`{"status": .., "data": {..}}`) or a bare
    /// task object
    pub fn from_response(body: &Value) -> Result<Self> {
        let data = body.get("data").unwrap_or(body);
        let id = task_id_from(data).ok_or_else(|| {
            TaskError::InvalidResponse("task response has no task_id".to_string())
        })?;
        let status = data
            .get("task_status")
            .and_then(Value::as_str)
            .map(TaskStatus::parse)
            .unwrap_or(TaskStatus::Queued);

        Ok(Self {
            id,
            status,
            result: data.get("task_result").cloned().unwrap_or(Value::Null),
            errors: error_list(data.get("task_errors")),
        })
    }
}

fn task_id_from(data: &Value) -> Option<String> {
    match data.get("task_id")? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn error_list(errors: Option<&Value>) -> Vec<String> {
    match errors {
        Some(Value::Array(items)) => items
            .iter()
            .map(|e| match e {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .filter(|e| !e.is_empty())
            .collect(),
        Some(Value::String(s)) if !s.trim().is_empty() => vec![s.clone()],
        Some(Value::Object(map)) if !map.is_empty() => vec![Value::Object(map.clone()).to_string()],
        _ => Vec::new(),
    }
}

/// Extract the task handle from a submission response
pub fn handle_from_response(body: &Value) -> Result<TaskHandle> {
    let data = body.get("data").unwrap_or(body);
    task_id_from(data)
        .map(TaskHandle::new)
        .ok_or_else(|| TaskError::Dispatch(format!("no task_id in response: {}", body)))
}

/// One unit of work for the task API
#[derive(Debug, Clone, PartialEq)]
pub enum PushSpec {
    Config {
        connection: ConnectionParams,
        lines: Vec<String>,
    },
    Show {
        connection: ConnectionParams,
        command: String,
    },
}

impl PushSpec {
    pub fn connection(&self) -> &ConnectionParams {
        match self {
            PushSpec::Config { connection, .. } | PushSpec::Show { connection, .. } => connection,
        }
    }
}
