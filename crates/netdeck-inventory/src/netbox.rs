//! NetBox REST client
//!
//! Device listing (brief format, manufacturer filter, `next`-link
//! pagination) and name resolution against `/api/dcim/devices/`.

use crate::cache::DeviceCache;
use crate::error::{InventoryError, Result};
use crate::platform::{device_type_for_platform, host_from_address};
use crate::resolver::DeviceResolver;
use async_trait::async_trait;
use netdeck_core::ResolvedDevice;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

const DEVICES_PATH: &str = "/api/dcim/devices/";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub const DEFAULT_MANUFACTURER_IDS: [u32; 4] = [7, 1, 5, 3];
pub const DEFAULT_PAGE_SIZE: u32 = 1000;

#[derive(Debug, Clone)]
pub struct NetboxConfig {
    pub base_url: String,
    pub token: Option<String>,
    pub verify_ssl: bool,
}

impl NetboxConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: None,
            verify_ssl: true,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_verify_ssl(mut self, verify: bool) -> Self {
        self.verify_ssl = verify;
        self
    }
}

/// Filter for a device listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceQuery {
    pub brief: bool,
    pub limit: u32,
    pub manufacturer_ids: Vec<u32>,
}

impl Default for DeviceQuery {
    fn default() -> Self {
        Self {
            brief: true,
            limit: DEFAULT_PAGE_SIZE,
            manufacturer_ids: DEFAULT_MANUFACTURER_IDS.to_vec(),
        }
    }
}

impl DeviceQuery {
    /// Query string parameters in request order
    pub fn params(&self) -> Vec<(String, String)> {
        let mut params = Vec::new();
        if self.brief {
            params.push(("brief".to_string(), "true".to_string()));
        }
        if self.limit > 0 {
            params.push(("limit".to_string(), self.limit.to_string()));
        }
        for id in &self.manufacturer_ids {
            params.push(("manufacturer_id".to_string(), id.to_string()));
        }
        params
    }

    /// Canonical cache key; manufacturer order does not matter
    pub fn signature(&self) -> String {
        let mut ids = self.manufacturer_ids.clone();
        ids.sort_unstable();
        ids.dedup();
        let ids: Vec<String> = ids.iter().map(u32::to_string).collect();
        format!(
            "devices;brief={};limit={};manufacturer_id={}",
            self.brief,
            self.limit,
            ids.join(",")
        )
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NetboxRef {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NetboxIp {
    #[serde(default)]
    pub address: Option<String>,
}

/// Device record as returned by `/api/dcim/devices/`
///
/// Brief responses only carry `id`, `url`, `display`, `name` and
/// `description`; the remaining fields appear on full responses.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NetboxDevice {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub display: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub platform: Option<NetboxRef>,
    #[serde(default)]
    pub primary_ip: Option<NetboxIp>,
}

impl NetboxDevice {
    /// Connection parameters for this record
    pub fn to_resolved(&self, requested_name: &str) -> ResolvedDevice {
        let name = self
            .name
            .clone()
            .unwrap_or_else(|| requested_name.to_string());
        let platform = self
            .platform
            .as_ref()
            .and_then(|p| p.slug.as_deref().or(p.name.as_deref()));
        let host = self
            .primary_ip
            .as_ref()
            .and_then(|ip| ip.address.as_deref())
            .map(|a| host_from_address(a).to_string())
            .unwrap_or_else(|| name.clone());

        ResolvedDevice::new(name, device_type_for_platform(platform), host)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DevicePage {
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub results: Vec<NetboxDevice>,
}

/// Listing row for device pickers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceSummary {
    pub name: String,
    pub id: Option<i64>,
    pub display: String,
    pub url: String,
}

/// Sorted, non-empty device names
pub fn device_names(devices: &[NetboxDevice]) -> Vec<String> {
    let mut names: Vec<String> = devices
        .iter()
        .filter_map(|d| d.name.clone())
        .filter(|n| !n.is_empty())
        .collect();
    names.sort();
    names
}

/// Summaries deduplicated by name (first wins) and sorted by name
pub fn device_summaries(devices: &[NetboxDevice]) -> Vec<DeviceSummary> {
    let mut seen = HashSet::new();
    let mut summaries: Vec<DeviceSummary> = devices
        .iter()
        .filter_map(|d| {
            let name = d.name.clone().filter(|n| !n.is_empty())?;
            if !seen.insert(name.clone()) {
                return None;
            }
            Some(DeviceSummary {
                display: d.display.clone().unwrap_or_else(|| name.clone()),
                id: d.id,
                url: d.url.clone().unwrap_or_default(),
                name,
            })
        })
        .collect();
    summaries.sort_by(|a, b| a.name.cmp(&b.name));
    summaries
}

pub struct NetboxClient {
    client: reqwest::Client,
    base_url: String,
    cache: Arc<DeviceCache<Vec<NetboxDevice>>>,
}

impl NetboxClient {
    pub fn new(config: NetboxConfig, cache: Arc<DeviceCache<Vec<NetboxDevice>>>) -> Result<Self> {
        if config.base_url.trim().is_empty() {
            return Err(InventoryError::InvalidConfig(
                "NetBox base URL is empty".to_string(),
            ));
        }

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(token) = &config.token {
            let value = HeaderValue::from_str(&format!("Token {}", token))
                .map_err(|e| InventoryError::InvalidConfig(format!("invalid token: {}", e)))?;
            headers.insert(AUTHORIZATION, value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .danger_accept_invalid_certs(!config.verify_ssl)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            cache,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn devices_url(&self) -> String {
        format!("{}{}", self.base_url, DEVICES_PATH)
    }

    async fn get_page(&self, request: reqwest::RequestBuilder) -> Result<DevicePage> {
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(InventoryError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response.json().await?)
    }

    /// Fetch every page of a device listing, bypassing the cache
    pub async fn fetch_devices(&self, query: &DeviceQuery) -> Result<Vec<NetboxDevice>> {
        let first = self
            .client
            .get(self.devices_url())
            .query(&query.params());
        let mut page = self.get_page(first).await?;
        tracing::info!(
            fetched = page.results.len(),
            total = page.count,
            "Fetched devices from NetBox"
        );

        let mut devices = std::mem::take(&mut page.results);
        while let Some(next) = page.next.take() {
            tracing::debug!(next = %next, "Fetching next page");
            page = self.get_page(self.client.get(&next)).await?;
            devices.append(&mut page.results);
        }

        tracing::info!(total = devices.len(), "Total devices fetched");
        Ok(devices)
    }

    /// Device listing; failures are logged and yield an empty list
    pub async fn get_devices(&self, query: &DeviceQuery) -> Vec<NetboxDevice> {
        let signature = query.signature();
        if let Some(devices) = self.cache.get(&signature).await {
            tracing::debug!(signature = %signature, "Device listing served from cache");
            return devices;
        }

        match self.fetch_devices(query).await {
            Ok(devices) => {
                self.cache.put(signature, devices.clone()).await;
                devices
            }
            Err(e) => {
                tracing::error!(error = %e, "Error fetching devices from NetBox");
                Vec::new()
            }
        }
    }

    pub async fn get_device_names(&self, query: &DeviceQuery) -> Vec<String> {
        device_names(&self.get_devices(query).await)
    }

    pub async fn get_devices_with_details(&self, query: &DeviceQuery) -> Vec<DeviceSummary> {
        let query = DeviceQuery {
            brief: true,
            ..query.clone()
        };
        device_summaries(&self.get_devices(&query).await)
    }
}

#[async_trait]
impl DeviceResolver for NetboxClient {
    async fn resolve(&self, name: &str) -> Result<ResolvedDevice> {
        let signature = format!("device;name={}", name);
        let cached = self.cache.get(&signature).await;

        let devices = match cached {
            Some(devices) => devices,
            None => {
                let request = self
                    .client
                    .get(self.devices_url())
                    .query(&[("name", name), ("limit", "1")]);
                let devices = self.get_page(request).await?.results;
                if !devices.is_empty() {
                    self.cache.put(signature, devices.clone()).await;
                }
                devices
            }
        };

        let device = devices
            .first()
            .ok_or_else(|| InventoryError::NotFound(name.to_string()))?
            .to_resolved(name);
        tracing::debug!(
            device = %device.name,
            host = %device.host,
            platform = %device.platform,
            "Resolved device"
        );
        Ok(device)
    }
}
