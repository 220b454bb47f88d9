//! Wires settings into the store, clients and engine

use anyhow::Context as _;
use netdeck_config::Settings;
use netdeck_core::{TemplateRenderer, TeraRenderer};
use netdeck_engine::Engine;
use netdeck_inventory::{
    DeviceCache, DeviceQuery, DeviceResolver, NetboxClient, NetboxConfig, StaticResolver,
};
use netdeck_store::{FileStore, KvStore, Records};
use netdeck_task::{NetpalmClient, NetpalmConfig, PollPolicy};
use std::sync::Arc;

pub struct Context {
    pub settings: Settings,
    store: Arc<dyn KvStore>,
    records: Records,
}

impl Context {
    pub fn load() -> anyhow::Result<Self> {
        let settings = Settings::load().context("failed to load settings")?;
        let state_dir = settings.state_dir();
        tracing::debug!(state_dir = %state_dir.display(), "Using record store");

        let store: Arc<dyn KvStore> = Arc::new(FileStore::new(&state_dir));
        let records = Records::new(store.clone());
        Ok(Self {
            settings,
            store,
            records,
        })
    }

    pub fn store(&self) -> &dyn KvStore {
        self.store.as_ref()
    }

    pub fn records(&self) -> &Records {
        &self.records
    }

    pub fn device_query(&self) -> DeviceQuery {
        DeviceQuery {
            brief: true,
            limit: self.settings.netbox.page_size,
            manufacturer_ids: self.settings.netbox.manufacturer_ids.clone(),
        }
    }

    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy::new(
            self.settings.poll.max_wait(),
            self.settings.poll.interval(),
        )
    }

    pub fn netpalm(&self) -> anyhow::Result<NetpalmClient> {
        let netpalm = &self.settings.netpalm;
        let mut config = NetpalmConfig::new(&netpalm.url)
            .with_library(&netpalm.library)
            .with_verify_ssl(self.settings.verify_ssl);
        config.queue_strategy = netpalm.queue_strategy.clone();
        if let Some(key) = &netpalm.api_key {
            config = config.with_api_key(key);
        }
        Ok(NetpalmClient::new(config)?)
    }

    pub fn netbox(&self) -> anyhow::Result<NetboxClient> {
        let netbox = &self.settings.netbox;
        let url = netbox
            .url
            .as_deref()
            .context("NetBox URL is not configured (set NETBOX_URL)")?;
        let mut config = NetboxConfig::new(url).with_verify_ssl(self.settings.verify_ssl);
        if let Some(token) = &netbox.token {
            config = config.with_token(token);
        }
        let cache = Arc::new(DeviceCache::new(netbox.cache_ttl()));
        Ok(NetboxClient::new(config, cache)?)
    }

    /// Renderer over the template directory
    pub fn renderer(&self) -> anyhow::Result<TeraRenderer> {
        let dir = &self.settings.template_dir;
        TeraRenderer::from_dir(dir)
            .with_context(|| format!("failed to load templates from {}", dir.display()))
    }

    /// Engine over the configured collaborators
    ///
    /// A missing template directory or NetBox URL only fails the operations
    /// that need them, so record-only commands keep working.
    pub fn engine(&self) -> anyhow::Result<Engine> {
        let renderer: Arc<dyn TemplateRenderer> = match self.renderer() {
            Ok(renderer) => Arc::new(renderer),
            Err(e) => {
                tracing::warn!(error = %format!("{:#}", e), "Templates unavailable");
                Arc::new(TeraRenderer::from_templates(Vec::<(String, String)>::new())?)
            }
        };

        let resolver: Arc<dyn DeviceResolver> = match self.netbox() {
            Ok(client) => Arc::new(client),
            Err(e) => {
                tracing::warn!(error = %e, "Device inventory unavailable");
                Arc::new(StaticResolver::new())
            }
        };

        Ok(Engine::new(
            self.records.clone(),
            renderer,
            resolver,
            Arc::new(self.netpalm()?),
            self.poll_policy(),
        ))
    }
}
