//! Inventory error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum InventoryError {
    #[error("device not found in inventory: {0}")]
    NotFound(String),

    #[error("inventory API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("invalid inventory configuration: {0}")]
    InvalidConfig(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, InventoryError>;
