//! Device name resolution

use crate::error::{InventoryError, Result};
use async_trait::async_trait;
use netdeck_core::ResolvedDevice;
use std::collections::HashMap;

/// Resolves a device name to the parameters needed to connect to it
#[async_trait]
pub trait DeviceResolver: Send + Sync {
    /// Returns [`InventoryError::NotFound`] for unknown devices
    async fn resolve(&self, name: &str) -> Result<ResolvedDevice>;
}

/// Fixed name -> device table
#[derive(Debug, Clone, Default)]
pub struct StaticResolver {
    devices: HashMap<String, ResolvedDevice>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_device(mut self, device: ResolvedDevice) -> Self {
        self.insert(device);
        self
    }

    pub fn insert(&mut self, device: ResolvedDevice) {
        self.devices.insert(device.name.clone(), device);
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

impl FromIterator<ResolvedDevice> for StaticResolver {
    fn from_iter<I: IntoIterator<Item = ResolvedDevice>>(iter: I) -> Self {
        let mut resolver = Self::new();
        for device in iter {
            resolver.insert(device);
        }
        resolver
    }
}

#[async_trait]
impl DeviceResolver for StaticResolver {
    async fn resolve(&self, name: &str) -> Result<ResolvedDevice> {
        self.devices
            .get(name)
            .cloned()
            .ok_or_else(|| InventoryError::NotFound(name.to_string()))
    }
}
