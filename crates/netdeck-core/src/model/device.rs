//! Resolved device

use serde::{Deserialize, Serialize};

/// A device name resolved to its connection target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedDevice {
    /// Inventory name
    pub name: String,
    /// Driver platform type (e.g. "cisco_ios", "juniper_junos")
    pub platform: String,
    /// Management address
    pub host: String,
}

impl ResolvedDevice {
    pub fn new(
        name: impl Into<String>,
        platform: impl Into<String>,
        host: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            platform: platform.into(),
            host: host.into(),
        }
    }

    pub fn family(&self) -> DeviceFamily {
        DeviceFamily::from_platform(&self.platform)
    }
}

/// Vendor family, used to pick how live configuration is fetched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceFamily {
    /// Juniper devices dump configuration in set format
    Juniper,
    /// Everything else exposes a running configuration
    Other,
}

impl DeviceFamily {
    pub fn from_platform(platform: &str) -> Self {
        let platform = platform.to_ascii_lowercase();
        if platform.contains("junos") || platform.contains("juniper") {
            Self::Juniper
        } else {
            Self::Other
        }
    }
}
