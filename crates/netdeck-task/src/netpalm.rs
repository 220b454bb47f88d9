//! netpalm REST client
//!
//! Implements [`TaskApi`] over `/setconfig/{library}`, `/getconfig/{library}`
//! and `/task/{id}`, and exposes the read-only queue and worker endpoints
//! for pass-through use.

use crate::api::TaskApi;
use crate::connection::ConnectionParams;
use crate::error::{Result, TaskError};
use crate::model::{TaskHandle, TaskSnapshot, handle_from_response};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use serde_json::{Value, json};
use std::time::Duration;

const API_KEY_HEADER: &str = "x-api-key";
const READ_TIMEOUT: Duration = Duration::from_secs(5);
const SUBMIT_TIMEOUT: Duration = Duration::from_secs(30);

pub const DEFAULT_LIBRARY: &str = "netmiko";
pub const DEFAULT_QUEUE_STRATEGY: &str = "fifo";
/// Library selector that routes to the library-less endpoint
pub const AUTO_LIBRARY: &str = "auto";

#[derive(Debug, Clone)]
pub struct NetpalmConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub library: String,
    pub queue_strategy: String,
    pub verify_ssl: bool,
}

impl NetpalmConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: None,
            library: DEFAULT_LIBRARY.to_string(),
            queue_strategy: DEFAULT_QUEUE_STRATEGY.to_string(),
            verify_ssl: true,
        }
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_library(mut self, library: impl Into<String>) -> Self {
        self.library = library.into();
        self
    }

    pub fn with_verify_ssl(mut self, verify: bool) -> Self {
        self.verify_ssl = verify;
        self
    }
}

/// `/setconfig/netmiko`, or `/setconfig` for the `auto` library
pub fn library_endpoint(operation: &str, library: &str) -> String {
    if library.is_empty() || library == AUTO_LIBRARY {
        format!("/{}", operation)
    } else {
        format!("/{}/{}", operation, library)
    }
}

pub struct NetpalmClient {
    client: reqwest::Client,
    base_url: String,
    library: String,
    queue_strategy: String,
}

impl NetpalmClient {
    pub fn new(config: NetpalmConfig) -> Result<Self> {
        if config.base_url.trim().is_empty() {
            return Err(TaskError::InvalidConfig(
                "netpalm API URL is empty".to_string(),
            ));
        }

        let mut headers = HeaderMap::new();
        if let Some(key) = &config.api_key {
            let value = HeaderValue::from_str(key)
                .map_err(|e| TaskError::InvalidConfig(format!("invalid API key: {}", e)))?;
            headers.insert(API_KEY_HEADER, value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .danger_accept_invalid_certs(!config.verify_ssl)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            library: config.library,
            queue_strategy: config.queue_strategy,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn setconfig_payload(&self, connection: &ConnectionParams, lines: &[String]) -> Value {
        json!({
            "library": self.library,
            "connection_args": connection,
            "config": lines,
            "queue_strategy": self.queue_strategy,
        })
    }

    pub fn getconfig_payload(&self, connection: &ConnectionParams, command: &str) -> Value {
        json!({
            "library": self.library,
            "connection_args": connection,
            "command": command,
            "queue_strategy": self.queue_strategy,
        })
    }

    async fn read(&self, response: reqwest::Response) -> Result<Value> {
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(TaskError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response.json().await?)
    }

    async fn get_json(&self, path: &str) -> Result<Value> {
        let response = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .timeout(READ_TIMEOUT)
            .send()
            .await?;
        self.read(response).await
    }

    async fn post_json(&self, path: &str, body: &Value) -> Result<Value> {
        let response = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .json(body)
            .timeout(SUBMIT_TIMEOUT)
            .send()
            .await?;
        self.read(response).await
    }

    /// POST a submission; any failure becomes a dispatch error
    async fn submit(&self, path: &str, body: &Value) -> Result<TaskHandle> {
        let response = self.post_json(path, body).await.map_err(|e| match e {
            TaskError::Api { status, message } => {
                TaskError::Dispatch(format!("{} returned {}: {}", path, status, message))
            }
            TaskError::Http(e) => TaskError::Dispatch(format!("{}: {}", path, e)),
            other => other,
        })?;
        handle_from_response(&response)
    }

    pub async fn list_task_queue(&self) -> Result<Value> {
        self.get_json("/taskqueue/").await
    }

    pub async fn get_task(&self, task_id: &str) -> Result<Value> {
        self.get_json(&format!("/task/{}", task_id)).await
    }

    pub async fn list_workers(&self) -> Result<Value> {
        self.get_json("/workers/").await
    }

    pub async fn getconfig(&self, library: &str, payload: &Value) -> Result<Value> {
        self.post_json(&library_endpoint("getconfig", library), payload)
            .await
    }

    pub async fn setconfig(&self, library: &str, payload: &Value) -> Result<Value> {
        self.post_json(&library_endpoint("setconfig", library), payload)
            .await
    }

    pub async fn setconfig_dry_run(&self, payload: &Value) -> Result<Value> {
        self.post_json("/setconfig/dry-run", payload).await
    }
}

#[async_trait]
impl TaskApi for NetpalmClient {
    async fn submit_config_push(
        &self,
        connection: &ConnectionParams,
        lines: &[String],
    ) -> Result<TaskHandle> {
        let body = self.setconfig_payload(connection, lines);
        self.submit(&library_endpoint("setconfig", &self.library), &body)
            .await
    }

    async fn submit_show(
        &self,
        connection: &ConnectionParams,
        command: &str,
    ) -> Result<TaskHandle> {
        let body = self.getconfig_payload(connection, command);
        self.submit(&library_endpoint("getconfig", &self.library), &body)
            .await
    }

    async fn get_status(&self, task_id: &str) -> Result<TaskSnapshot> {
        let body = self.get_task(task_id).await?;
        TaskSnapshot::from_response(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::Credentials;
    use netdeck_core::ResolvedDevice;

    fn client() -> NetpalmClient {
        NetpalmClient::new(NetpalmConfig::new("http://127.0.0.1:9/").with_api_key("k")).unwrap()
    }

    fn connection(credentials: &Credentials) -> ConnectionParams {
        ConnectionParams::build(
            &ResolvedDevice::new("sw1", "cisco_ios", "10.0.0.1"),
            credentials,
        )
    }

    #[test]
    fn test_library_endpoint() {
        assert_eq!(library_endpoint("setconfig", "netmiko"), "/setconfig/netmiko");
        assert_eq!(library_endpoint("getconfig", "napalm"), "/getconfig/napalm");
        assert_eq!(library_endpoint("getconfig", "auto"), "/getconfig");
    }

    #[test]
    fn test_setconfig_payload() {
        let client = client();
        assert_eq!(client.base_url(), "http://127.0.0.1:9");

        let lines = vec!["vlan 100".to_string(), " name users".to_string()];
        let payload = client.setconfig_payload(
            &connection(&Credentials::override_with("admin", "pw")),
            &lines,
        );
        assert_eq!(
            payload,
            json!({
                "library": "netmiko",
                "connection_args": {
                    "device_type": "cisco_ios",
                    "host": "10.0.0.1",
                    "username": "admin",
                    "password": "pw"
                },
                "config": ["vlan 100", " name users"],
                "queue_strategy": "fifo"
            })
        );
    }

    #[test]
    fn test_getconfig_payload() {
        let payload =
            client().getconfig_payload(&connection(&Credentials::Default), "show running-config");
        assert_eq!(payload["command"], "show running-config");
        assert!(payload["connection_args"].get("username").is_none());
    }

    #[test]
    fn test_empty_url_rejected() {
        assert!(matches!(
            NetpalmClient::new(NetpalmConfig::new("")),
            Err(TaskError::InvalidConfig(_))
        ));
    }

    #[tokio::test]
    async fn test_unreachable_submit_is_dispatch_error() {
        let err = client()
            .submit_config_push(&connection(&Credentials::Default), &["vlan 1".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(err, TaskError::Dispatch(_)));
    }
}
