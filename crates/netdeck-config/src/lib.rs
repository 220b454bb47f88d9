//! netdeck settings
//!
//! Settings come from a YAML file found by [`find_settings_file`], with
//! environment variables layered on top. A missing file means defaults.

pub mod error;

pub use error::*;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_PATH_ENV: &str = "NETDECK_CONFIG_PATH";
pub const NETPALM_API_URL_ENV: &str = "NETPALM_API_URL";
pub const NETPALM_API_KEY_ENV: &str = "NETPALM_API_KEY";
pub const NETBOX_URL_ENV: &str = "NETBOX_URL";
pub const NETBOX_TOKEN_ENV: &str = "NETBOX_TOKEN";
pub const VERIFY_SSL_ENV: &str = "VERIFY_SSL";
pub const TEMPLATE_DIR_ENV: &str = "NETDECK_TEMPLATE_DIR";
pub const STATE_DIR_ENV: &str = "NETDECK_STATE_DIR";

const CANDIDATES: [&str; 2] = ["netdeck.local.yaml", "netdeck.yaml"];
const GLOBAL_FILE: &str = "config.yaml";
const APP_DIR: &str = "netdeck";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetpalmSettings {
    pub url: String,
    pub api_key: Option<String>,
    pub library: String,
    pub queue_strategy: String,
}

impl Default for NetpalmSettings {
    fn default() -> Self {
        Self {
            url: "http://netpalm-controller:9000".to_string(),
            api_key: None,
            library: "netmiko".to_string(),
            queue_strategy: "fifo".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetboxSettings {
    pub url: Option<String>,
    pub token: Option<String>,
    pub manufacturer_ids: Vec<u32>,
    pub page_size: u32,
    /// Seconds a device listing stays cached
    pub cache_ttl: u64,
}

impl Default for NetboxSettings {
    fn default() -> Self {
        Self {
            url: None,
            token: None,
            manufacturer_ids: vec![7, 1, 5, 3],
            page_size: 1000,
            cache_ttl: 300,
        }
    }
}

impl NetboxSettings {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl)
    }
}

/// Task polling budget, in seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollSettings {
    pub max_wait: u64,
    pub interval: u64,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            max_wait: 60,
            interval: 2,
        }
    }
}

impl PollSettings {
    pub fn max_wait(&self) -> Duration {
        Duration::from_secs(self.max_wait)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub netpalm: NetpalmSettings,
    pub netbox: NetboxSettings,
    pub verify_ssl: bool,
    pub template_dir: PathBuf,
    pub state_dir: Option<PathBuf>,
    pub poll: PollSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            netpalm: NetpalmSettings::default(),
            netbox: NetboxSettings::default(),
            verify_ssl: false,
            template_dir: PathBuf::from("templates"),
            state_dir: None,
            poll: PollSettings::default(),
        }
    }
}

impl Settings {
    /// Discover the settings file and apply environment overrides
    pub fn load() -> Result<Self> {
        let mut settings = match find_settings_file()? {
            Some(path) => {
                tracing::debug!(path = %path.display(), "Loading settings");
                Self::from_file(&path)?
            }
            None => Self::default(),
        };
        settings.apply_overrides(|name| std::env::var(name).ok())?;
        Ok(settings)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_yaml(content: &str) -> std::result::Result<Self, serde_yaml::Error> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content)
    }

    /// Layer variables from `lookup` over the current values
    ///
    /// Empty values are treated as unset.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(url) = get(NETPALM_API_URL_ENV) {
            self.netpalm.url = url;
        }
        if let Some(key) = get(NETPALM_API_KEY_ENV) {
            self.netpalm.api_key = Some(key);
        }
        if let Some(url) = get(NETBOX_URL_ENV) {
            self.netbox.url = Some(url);
        }
        if let Some(token) = get(NETBOX_TOKEN_ENV) {
            self.netbox.token = Some(token);
        }
        if let Some(value) = get(VERIFY_SSL_ENV) {
            self.verify_ssl = parse_flag(VERIFY_SSL_ENV, &value)?;
        }
        if let Some(dir) = get(TEMPLATE_DIR_ENV) {
            self.template_dir = PathBuf::from(dir);
        }
        if let Some(dir) = get(STATE_DIR_ENV) {
            self.state_dir = Some(PathBuf::from(dir));
        }
        Ok(())
    }

    /// Where the record store lives
    ///
    /// Falls back to the platform data directory, then `./.netdeck`.
    pub fn state_dir(&self) -> PathBuf {
        if let Some(dir) = &self.state_dir {
            return dir.clone();
        }
        dirs::data_dir()
            .map(|d| d.join(APP_DIR))
            .unwrap_or_else(|| PathBuf::from(".netdeck"))
    }
}

fn parse_flag(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidEnv {
            name: name.to_string(),
            value: value.to_string(),
        }),
    }
}

/// Find the settings file
///
/// Search order:
/// 1. `NETDECK_CONFIG_PATH`
/// 2. `./netdeck.local.yaml`, then `./netdeck.yaml`
/// 3. `~/.config/netdeck/config.yaml`
pub fn find_settings_file() -> Result<Option<PathBuf>> {
    if let Ok(config_path) = std::env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(config_path);
        if path.exists() {
            return Ok(Some(path));
        }
        tracing::warn!(path = %path.display(), "{} points at a missing file", CONFIG_PATH_ENV);
    }

    let current_dir = std::env::current_dir()?;
    for filename in &CANDIDATES {
        let path = current_dir.join(filename);
        if path.exists() {
            return Ok(Some(path));
        }
    }

    if let Some(config_dir) = dirs::config_dir() {
        let global = config_dir.join(APP_DIR).join(GLOBAL_FILE);
        if global.exists() {
            return Ok(Some(global));
        }
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::collections::HashMap;
    use std::fs;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.netpalm.library, "netmiko");
        assert_eq!(settings.netpalm.queue_strategy, "fifo");
        assert!(settings.netpalm.api_key.is_none());
        assert_eq!(settings.netbox.manufacturer_ids, vec![7, 1, 5, 3]);
        assert_eq!(settings.netbox.page_size, 1000);
        assert_eq!(settings.netbox.cache_ttl(), Duration::from_secs(300));
        assert_eq!(settings.poll.max_wait(), Duration::from_secs(60));
        assert_eq!(settings.poll.interval(), Duration::from_secs(2));
        assert!(!settings.verify_ssl);
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = r#"
netpalm:
  url: http://palm:9000
  library: napalm
netbox:
  url: https://netbox.example.net
  manufacturer_ids: [1, 2]
poll:
  max_wait: 120
"#;
        let settings = Settings::from_yaml(yaml).unwrap();
        assert_eq!(settings.netpalm.url, "http://palm:9000");
        assert_eq!(settings.netpalm.library, "napalm");
        assert_eq!(settings.netpalm.queue_strategy, "fifo");
        assert_eq!(
            settings.netbox.url.as_deref(),
            Some("https://netbox.example.net")
        );
        assert_eq!(settings.netbox.manufacturer_ids, vec![1, 2]);
        assert_eq!(settings.poll.max_wait, 120);
        assert_eq!(settings.poll.interval, 2);
    }

    #[test]
    fn test_empty_file_is_default() {
        assert_eq!(Settings::from_yaml("  \n").unwrap(), Settings::default());
    }

    #[test]
    fn test_invalid_yaml_reports_path() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("netdeck.yaml");
        fs::write(&path, "poll: [not, a, map]").unwrap();

        let err = Settings::from_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("netdeck.yaml"));
    }

    #[test]
    fn test_env_overrides_file_values() {
        let mut settings = Settings::from_yaml("netpalm:\n  url: http://from-file:9000\n").unwrap();
        settings
            .apply_overrides(lookup(&[
                (NETPALM_API_URL_ENV, "http://from-env:9000"),
                (NETPALM_API_KEY_ENV, "secret"),
                (NETBOX_URL_ENV, "https://nb"),
                (NETBOX_TOKEN_ENV, "tok"),
                (VERIFY_SSL_ENV, "TRUE"),
                (TEMPLATE_DIR_ENV, "/srv/templates"),
                (STATE_DIR_ENV, "/var/lib/netdeck"),
            ]))
            .unwrap();

        assert_eq!(settings.netpalm.url, "http://from-env:9000");
        assert_eq!(settings.netpalm.api_key.as_deref(), Some("secret"));
        assert_eq!(settings.netbox.url.as_deref(), Some("https://nb"));
        assert_eq!(settings.netbox.token.as_deref(), Some("tok"));
        assert!(settings.verify_ssl);
        assert_eq!(settings.template_dir, PathBuf::from("/srv/templates"));
        assert_eq!(settings.state_dir(), PathBuf::from("/var/lib/netdeck"));
    }

    #[test]
    fn test_empty_env_values_are_ignored() {
        let mut settings = Settings::default();
        settings
            .apply_overrides(lookup(&[(NETPALM_API_KEY_ENV, ""), (NETBOX_TOKEN_ENV, " ")]))
            .unwrap();
        assert!(settings.netpalm.api_key.is_none());
        assert!(settings.netbox.token.is_none());
    }

    #[test]
    fn test_bad_verify_ssl_flag() {
        let mut settings = Settings::default();
        let err = settings
            .apply_overrides(lookup(&[(VERIFY_SSL_ENV, "maybe")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { .. }));
    }

    #[test]
    #[serial]
    fn test_find_settings_file_local_priority() {
        let temp_dir = tempfile::tempdir().unwrap();
        let original_dir = std::env::current_dir().unwrap();

        fs::write(temp_dir.path().join("netdeck.yaml"), "verify_ssl: false").unwrap();
        fs::write(temp_dir.path().join("netdeck.local.yaml"), "verify_ssl: true").unwrap();

        std::env::set_current_dir(&temp_dir).unwrap();
        let result = temp_env::with_var_unset(CONFIG_PATH_ENV, find_settings_file);
        std::env::set_current_dir(original_dir).unwrap();

        assert!(result.unwrap().unwrap().ends_with("netdeck.local.yaml"));
    }

    #[test]
    #[serial]
    fn test_find_settings_file_env_var() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config_path = temp_dir.path().join("custom.yaml");
        fs::write(&config_path, "verify_ssl: true").unwrap();

        let result = temp_env::with_var(CONFIG_PATH_ENV, Some(&config_path), find_settings_file);
        assert_eq!(result.unwrap(), Some(config_path));
    }

    #[cfg(target_os = "linux")]
    #[test]
    #[serial]
    fn test_find_settings_file_global_then_none() {
        let work_dir = tempfile::tempdir().unwrap();
        let config_home = tempfile::tempdir().unwrap();
        let original_dir = std::env::current_dir().unwrap();
        std::env::set_current_dir(&work_dir).unwrap();

        let env = [
            (CONFIG_PATH_ENV, None),
            ("XDG_CONFIG_HOME", Some(config_home.path().as_os_str())),
        ];
        let missing = temp_env::with_vars(env, find_settings_file);

        let global = config_home.path().join(APP_DIR);
        fs::create_dir_all(&global).unwrap();
        fs::write(global.join(GLOBAL_FILE), "verify_ssl: true").unwrap();
        let found = temp_env::with_vars(env, find_settings_file);

        std::env::set_current_dir(original_dir).unwrap();

        assert_eq!(missing.unwrap(), None);
        assert!(found.unwrap().unwrap().ends_with("netdeck/config.yaml"));
    }

    #[test]
    #[serial]
    fn test_load_applies_environment() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config_path = temp_dir.path().join("settings.yaml");
        fs::write(&config_path, "netpalm:\n  library: auto\n").unwrap();

        let settings = temp_env::with_vars(
            [
                (CONFIG_PATH_ENV, Some(config_path.to_str().unwrap())),
                (NETPALM_API_KEY_ENV, Some("from-env")),
                (VERIFY_SSL_ENV, None),
            ],
            Settings::load,
        )
        .unwrap();

        assert_eq!(settings.netpalm.library, "auto");
        assert_eq!(settings.netpalm.api_key.as_deref(), Some("from-env"));
    }
}
