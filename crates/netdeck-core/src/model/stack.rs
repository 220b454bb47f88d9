//! Service stack

use super::{ServiceDefinition, ValidationStatus, Variables};
use crate::error::{CoreError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Deploy state of a stack
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StackState {
    #[default]
    Pending,
    Deploying,
    Deployed,
    Failed,
}

impl std::fmt::Display for StackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StackState::Pending => write!(f, "pending"),
            StackState::Deploying => write!(f, "deploying"),
            StackState::Deployed => write!(f, "deployed"),
            StackState::Failed => write!(f, "failed"),
        }
    }
}

/// A failure recorded against one service during a deploy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentError {
    pub service: String,
    pub error: String,
}

/// User-supplied stack definition (create/update input)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StackSpec {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub services: Vec<ServiceDefinition>,
    #[serde(default)]
    pub variables: Variables,
}

impl StackSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_service(mut self, service: ServiceDefinition) -> Self {
        self.services.push(service);
        self
    }

    pub fn with_variable(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.variables.insert(key.into(), value);
        self
    }

    /// Structural checks on the definitions
    ///
    /// Dependencies are checked again at deploy time against the services
    /// deployed in that run.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(CoreError::InvalidStack("stack name is empty".to_string()));
        }

        let mut names = HashSet::new();
        for service in &self.services {
            if service.name.trim().is_empty() {
                return Err(CoreError::InvalidStack(format!(
                    "stack '{}' has a service without a name",
                    self.name
                )));
            }
            if !names.insert(service.name.as_str()) {
                return Err(CoreError::InvalidStack(format!(
                    "duplicate service name '{}'",
                    service.name
                )));
            }
            if service.template.trim().is_empty() {
                return Err(CoreError::InvalidStack(format!(
                    "service '{}' has no template",
                    service.name
                )));
            }
            if service.devices.is_empty() {
                return Err(CoreError::InvalidStack(format!(
                    "service '{}' targets no devices",
                    service.name
                )));
            }
        }

        for service in &self.services {
            for dep in &service.depends_on {
                if dep == &service.name {
                    return Err(CoreError::InvalidStack(format!(
                        "service '{}' depends on itself",
                        service.name
                    )));
                }
                if !names.contains(dep.as_str()) {
                    return Err(CoreError::InvalidStack(format!(
                        "service '{}' depends on unknown service '{}'",
                        service.name, dep
                    )));
                }
            }
        }

        Ok(())
    }
}

/// A persisted stack record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceStack {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Definitions in declaration order
    pub services: Vec<ServiceDefinition>,
    /// Shared variables; per-service keys override on merge
    #[serde(default)]
    pub variables: Variables,
    pub state: StackState,
    /// Instance ids created by the last deploy
    #[serde(default)]
    pub deployed_services: Vec<String>,
    #[serde(default)]
    pub deployment_errors: Vec<DeploymentError>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub validation_status: ValidationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_validated_at: Option<DateTime<Utc>>,
}

impl ServiceStack {
    /// Build a new pending stack from a validated spec
    pub fn from_spec(spec: StackSpec) -> Result<Self> {
        spec.validate()?;
        let now = Utc::now();
        Ok(Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: spec.name,
            description: spec.description,
            services: spec.services,
            variables: spec.variables,
            state: StackState::Pending,
            deployed_services: Vec::new(),
            deployment_errors: Vec::new(),
            created_at: now,
            updated_at: now,
            validation_status: ValidationStatus::Unknown,
            last_validated_at: None,
        })
    }

    /// Replace the definition part of the record, keeping id and history
    pub fn apply_spec(&mut self, spec: StackSpec) -> Result<()> {
        spec.validate()?;
        self.name = spec.name;
        self.description = spec.description;
        self.services = spec.services;
        self.variables = spec.variables;
        self.touch();
        Ok(())
    }

    /// Definitions sorted by order key; ties keep declaration order
    pub fn ordered_services(&self) -> Vec<&ServiceDefinition> {
        let mut ordered: Vec<&ServiceDefinition> = self.services.iter().collect();
        // sort_by_key is stable
        ordered.sort_by_key(|s| s.order);
        ordered
    }

    pub fn is_deploying(&self) -> bool {
        self.state == StackState::Deploying
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn svc(name: &str, order: i64) -> ServiceDefinition {
        ServiceDefinition::new(name, "vlan.j2")
            .with_devices(["sw1"])
            .with_order(order)
    }

    #[test]
    fn test_ordered_services_sorts_by_order_key() {
        let spec = StackSpec::new("core")
            .with_service(svc("second", 2))
            .with_service(svc("first", 1));
        let stack = ServiceStack::from_spec(spec).unwrap();

        let names: Vec<&str> = stack
            .ordered_services()
            .iter()
            .map(|s| s.name.as_str())
            .collect();
        assert_eq!(names, vec!["first", "second"]);
    }

    #[test]
    fn test_ordered_services_ties_keep_declaration_order() {
        let spec = StackSpec::new("core")
            .with_service(svc("b", 0))
            .with_service(svc("a", 0))
            .with_service(svc("c", -1));
        let stack = ServiceStack::from_spec(spec).unwrap();

        let names: Vec<&str> = stack
            .ordered_services()
            .iter()
            .map(|s| s.name.as_str())
            .collect();
        assert_eq!(names, vec!["c", "b", "a"]);
    }

    #[test]
    fn test_validate_rejects_duplicate_names() {
        let spec = StackSpec::new("core")
            .with_service(svc("a", 0))
            .with_service(svc("a", 1));
        assert!(matches!(spec.validate(), Err(CoreError::InvalidStack(_))));
    }

    #[test]
    fn test_validate_rejects_unknown_dependency() {
        let spec = StackSpec::new("core").with_service(svc("a", 0).with_dependency("ghost"));
        let err = spec.validate().unwrap_err();
        assert!(err.to_string().contains("ghost"));
    }

    #[test]
    fn test_validate_rejects_self_dependency() {
        let spec = StackSpec::new("core").with_service(svc("a", 0).with_dependency("a"));
        assert!(spec.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_service_without_devices() {
        let spec = StackSpec::new("core").with_service(ServiceDefinition::new("a", "vlan.j2"));
        assert!(spec.validate().is_err());
    }

    #[test]
    fn test_new_stack_is_pending() {
        let stack = ServiceStack::from_spec(StackSpec::new("core").with_service(svc("a", 0))).unwrap();
        assert_eq!(stack.state, StackState::Pending);
        assert!(stack.deployed_services.is_empty());
        assert_eq!(stack.validation_status, ValidationStatus::Unknown);
        assert!(!stack.id.is_empty());
    }

    #[test]
    fn test_apply_spec_keeps_identity() {
        let mut stack =
            ServiceStack::from_spec(StackSpec::new("core").with_service(svc("a", 0))).unwrap();
        let id = stack.id.clone();
        stack
            .apply_spec(StackSpec::new("core-v2").with_service(svc("b", 0)))
            .unwrap();
        assert_eq!(stack.id, id);
        assert_eq!(stack.name, "core-v2");
        assert_eq!(stack.services[0].name, "b");
    }
}
