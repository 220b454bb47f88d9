//! Data model
//!
//! Stacks bundle service definitions; a deploy turns each definition into one
//! [`ServiceInstance`] per target device.

mod definition;
mod device;
mod instance;
mod stack;

pub use definition::ServiceDefinition;
pub use device::{DeviceFamily, ResolvedDevice};
pub use instance::{InstanceState, ServiceInstance, config_lines};
pub use stack::{DeploymentError, ServiceStack, StackSpec, StackState};

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Template variables
pub type Variables = HashMap<String, serde_json::Value>;

/// Merge shared variables with service-specific ones. Service keys win.
pub fn merge_variables(shared: &Variables, specific: &Variables) -> Variables {
    let mut merged = shared.clone();
    merged.extend(specific.iter().map(|(k, v)| (k.clone(), v.clone())));
    merged
}

/// Outcome of the most recent drift comparison
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationStatus {
    /// No comparison has completed yet
    #[default]
    Unknown,
    /// Every expected line was found on the device
    Valid,
    /// At least one expected line is missing
    DriftDetected,
    /// The comparison could not complete
    Error,
}

impl std::fmt::Display for ValidationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationStatus::Unknown => write!(f, "unknown"),
            ValidationStatus::Valid => write!(f, "valid"),
            ValidationStatus::DriftDetected => write!(f, "drift_detected"),
            ValidationStatus::Error => write!(f, "error"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_merge_variables_service_wins() {
        let shared: Variables = [
            ("vlan_id".to_string(), json!(100)),
            ("site".to_string(), json!("lon1")),
        ]
        .into_iter()
        .collect();
        let specific: Variables = [("vlan_id".to_string(), json!(200))].into_iter().collect();

        let merged = merge_variables(&shared, &specific);
        assert_eq!(merged["vlan_id"], json!(200));
        assert_eq!(merged["site"], json!("lon1"));
    }

    #[test]
    fn test_validation_status_serde() {
        let s = serde_json::to_string(&ValidationStatus::DriftDetected).unwrap();
        assert_eq!(s, "\"drift_detected\"");
        assert_eq!(ValidationStatus::default(), ValidationStatus::Unknown);
    }
}
