//! Deployed service instance

use super::{ResolvedDevice, ServiceDefinition, ValidationStatus, Variables};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// State of one service-on-device record
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstanceState {
    #[default]
    Pending,
    Deploying,
    Deployed,
    Failed,
    /// Reverse template push in flight
    Deleting,
}

impl std::fmt::Display for InstanceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InstanceState::Pending => write!(f, "pending"),
            InstanceState::Deploying => write!(f, "deploying"),
            InstanceState::Deployed => write!(f, "deployed"),
            InstanceState::Failed => write!(f, "failed"),
            InstanceState::Deleting => write!(f, "deleting"),
        }
    }
}

/// The deployed record for one service on one resolved device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceInstance {
    pub id: String,
    pub name: String,
    pub template: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reverse_template: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation_template: Option<String>,
    /// Configuration exactly as it was pushed
    pub rendered_config: String,
    pub device: ResolvedDevice,
    #[serde(default)]
    pub variables: Variables,
    pub state: InstanceState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub validation_status: ValidationStatus,
    /// Expected lines missing at the last completed comparison
    #[serde(default)]
    pub validation_errors: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_validated_at: Option<DateTime<Utc>>,
}

impl ServiceInstance {
    pub fn from_definition(
        definition: &ServiceDefinition,
        device: ResolvedDevice,
        rendered_config: impl Into<String>,
        variables: Variables,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: definition.name.clone(),
            template: definition.template.clone(),
            reverse_template: definition.reverse_template.clone(),
            validation_template: definition.validation_template.clone(),
            rendered_config: rendered_config.into(),
            device,
            variables,
            state: InstanceState::Pending,
            task_id: None,
            stack_id: None,
            created_at: now,
            updated_at: now,
            validation_status: ValidationStatus::Unknown,
            validation_errors: Vec::new(),
            last_validated_at: None,
        }
    }

    pub fn with_stack(mut self, stack_id: Option<&str>) -> Self {
        self.stack_id = stack_id.map(str::to_string);
        self
    }

    pub fn with_task(mut self, task_id: impl Into<String>) -> Self {
        self.task_id = Some(task_id.into());
        self
    }

    pub fn with_state(mut self, state: InstanceState) -> Self {
        self.state = state;
        self
    }

    pub fn set_state(&mut self, state: InstanceState) {
        self.state = state;
        self.updated_at = Utc::now();
    }

    /// Record a completed drift comparison
    pub fn record_validation(&mut self, missing: Vec<String>) {
        self.validation_status = if missing.is_empty() {
            ValidationStatus::Valid
        } else {
            ValidationStatus::DriftDetected
        };
        self.validation_errors = missing;
        let now = Utc::now();
        self.last_validated_at = Some(now);
        self.updated_at = now;
    }

    /// Rendered configuration split into push lines
    pub fn config_lines(&self) -> Vec<String> {
        config_lines(&self.rendered_config)
    }
}

/// Split rendered configuration into the lines pushed to a device
pub fn config_lines(rendered: &str) -> Vec<String> {
    rendered
        .lines()
        .map(str::trim_end)
        .filter(|l| !l.trim().is_empty())
        .map(str::to_string)
        .collect()
}
