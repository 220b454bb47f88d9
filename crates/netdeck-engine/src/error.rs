//! Engine error types

use netdeck_core::CoreError;
use netdeck_inventory::InventoryError;
use netdeck_store::StoreError;
use netdeck_task::TaskError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("stack not found: {0}")]
    StackNotFound(String),

    #[error("service instance not found: {0}")]
    InstanceNotFound(String),

    #[error("stack {0} is already deploying")]
    AlreadyDeploying(String),

    #[error("service '{service}' depends on '{dependency}', which was not deployed earlier in this run")]
    UnmetDependency { service: String, dependency: String },

    #[error("task result for {task_id} contains no configuration output")]
    NoLiveConfig { task_id: String },

    #[error("device resolution failed: {0}")]
    Resolution(#[from] InventoryError),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Task(#[from] TaskError),

    #[error("persistence error: {0}")]
    Persistence(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, EngineError>;
