//! Task API error types

use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TaskError {
    #[error("task API rejected request: {0}")]
    Dispatch(String),

    #[error("task {task_id} did not finish within {waited:?}")]
    Timeout { task_id: String, waited: Duration },

    #[error("task {task_id} failed: {}", errors.join("; "))]
    Failed { task_id: String, errors: Vec<String> },

    #[error("task API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("unexpected task API response: {0}")]
    InvalidResponse(String),

    #[error("invalid task API configuration: {0}")]
    InvalidConfig(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, TaskError>;
