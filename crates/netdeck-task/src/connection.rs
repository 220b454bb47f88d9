//! Credentials and device connection parameters

use netdeck_core::ResolvedDevice;
use serde::{Deserialize, Serialize};

/// Which login the task API should use for a device
#[derive(Clone, Default, PartialEq, Eq)]
pub enum Credentials {
    /// Let the task API apply its configured defaults
    #[default]
    Default,
    Override { username: String, password: String },
}

impl Credentials {
    pub fn override_with(username: impl Into<String>, password: impl Into<String>) -> Self {
        Credentials::Override {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Override only when both halves are present
    pub fn from_parts(username: Option<String>, password: Option<String>) -> Self {
        match (username, password) {
            (Some(username), Some(password)) => Credentials::Override { username, password },
            _ => Credentials::Default,
        }
    }

    pub fn is_override(&self) -> bool {
        matches!(self, Credentials::Override { .. })
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credentials::Default => write!(f, "Default"),
            Credentials::Override { username, .. } => f
                .debug_struct("Override")
                .field("username", username)
                .field("password", &"<redacted>")
                .finish(),
        }
    }
}

/// `connection_args` of a task request
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionParams {
    pub device_type: String,
    pub host: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl ConnectionParams {
    pub fn build(device: &ResolvedDevice, credentials: &Credentials) -> Self {
        let (username, password) = match credentials {
            Credentials::Default => (None, None),
            Credentials::Override { username, password } => {
                (Some(username.clone()), Some(password.clone()))
            }
        };
        Self {
            device_type: device.platform.clone(),
            host: device.host.clone(),
            username,
            password,
        }
    }
}

impl std::fmt::Debug for ConnectionParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionParams")
            .field("device_type", &self.device_type)
            .field("host", &self.host)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}
