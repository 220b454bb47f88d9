use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("KDL parse error: {0}")]
    KdlParse(#[from] kdl::KdlError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {path}\nreason: {message}")]
    Io { path: PathBuf, message: String },

    #[error("invalid stack: {0}")]
    InvalidStack(String),

    #[error("template '{template}' failed to render: {message}")]
    TemplateRender { template: String, message: String },

    #[error("template directory could not be loaded: {0}")]
    TemplateLoad(String),

    #[error("already exists: {}", .0.display())]
    AlreadyExists(PathBuf),
}

pub type Result<T> = std::result::Result<T, CoreError>;
