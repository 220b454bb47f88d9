//! netdeck inventory
//!
//! Resolves device names to connection parameters. The NetBox client also
//! serves the device pickers (names and summaries) and keeps its results in
//! an injected [`DeviceCache`].

pub mod cache;
pub mod error;
pub mod netbox;
pub mod platform;
pub mod resolver;

pub use cache::DeviceCache;
pub use error::{InventoryError, Result};
pub use netbox::{
    DeviceQuery, DeviceSummary, NetboxClient, NetboxConfig, NetboxDevice, device_names,
    device_summaries,
};
pub use platform::device_type_for_platform;
pub use resolver::{DeviceResolver, StaticResolver};
