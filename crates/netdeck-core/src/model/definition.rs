//! Service definition

use super::Variables;
use serde::{Deserialize, Serialize};

/// One service inside a stack
///
/// KDL form:
/// ```kdl
/// service "vlan-create" template="vlan.j2" order=0 {
///     reverse_template "vlan_delete.j2"
///     devices "sw1" "sw2"
///     depends_on "base-config"
///     variables {
///         vlan_id 100
///     }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceDefinition {
    pub name: String,
    pub template: String,
    /// Template that removes the configuration again
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reverse_template: Option<String>,
    /// Template rendering the lines expected on the device after deploy
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation_template: Option<String>,
    #[serde(default)]
    pub variables: Variables,
    #[serde(default)]
    pub devices: Vec<String>,
    /// Deploy order; lower goes first, ties keep declaration order
    #[serde(default)]
    pub order: i64,
    #[serde(default)]
    pub depends_on: Vec<String>,
}

impl ServiceDefinition {
    pub fn new(name: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            template: template.into(),
            reverse_template: None,
            validation_template: None,
            variables: Variables::new(),
            devices: Vec::new(),
            order: 0,
            depends_on: Vec::new(),
        }
    }

    pub fn with_devices<I, S>(mut self, devices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.devices = devices.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_order(mut self, order: i64) -> Self {
        self.order = order;
        self
    }

    pub fn with_dependency(mut self, name: impl Into<String>) -> Self {
        self.depends_on.push(name.into());
        self
    }

    pub fn with_variable(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.variables.insert(key.into(), value);
        self
    }

    pub fn with_reverse_template(mut self, template: impl Into<String>) -> Self {
        self.reverse_template = Some(template.into());
        self
    }

    pub fn with_validation_template(mut self, template: impl Into<String>) -> Self {
        self.validation_template = Some(template.into());
        self
    }
}
