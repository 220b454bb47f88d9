//! Stack orchestration
//!
//! Deploys the services of a stack in order, device by device, stopping at
//! the first failure. A service only starts once every dependency it names
//! has been deployed earlier in the same run.

use crate::error::{EngineError, Result};
use crate::instance::InstanceManager;
use netdeck_core::{
    DeploymentError, ServiceDefinition, ServiceStack, StackSpec, StackState, ValidationStatus,
    merge_variables,
};
use netdeck_store::Records;
use netdeck_task::Credentials;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployOutcome {
    pub stack_id: String,
    pub deployed_ids: Vec<String>,
    pub failed: Vec<DeploymentError>,
}

impl DeployOutcome {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Validation result of one instance within a stack
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceCheck {
    pub instance_id: String,
    pub status: ValidationStatus,
    #[serde(default)]
    pub missing: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackValidation {
    pub stack_id: String,
    pub status: ValidationStatus,
    pub instances: Vec<InstanceCheck>,
}

/// Holds a stack id in the in-flight set until dropped
struct DeployClaim<'a> {
    in_flight: &'a Mutex<HashSet<String>>,
    stack_id: String,
}

impl Drop for DeployClaim<'_> {
    fn drop(&mut self) {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        in_flight.remove(&self.stack_id);
    }
}

pub struct StackOrchestrator {
    records: Records,
    instances: Arc<InstanceManager>,
    in_flight: Mutex<HashSet<String>>,
}

impl StackOrchestrator {
    pub fn new(instances: Arc<InstanceManager>) -> Self {
        Self {
            records: instances.records().clone(),
            instances,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    pub fn instances(&self) -> &Arc<InstanceManager> {
        &self.instances
    }

    // CRUD

    #[tracing::instrument(skip(self, spec), fields(stack = %spec.name))]
    pub async fn create(&self, spec: StackSpec) -> Result<ServiceStack> {
        let stack = ServiceStack::from_spec(spec)?;
        self.records.put_stack(&stack).await?;
        tracing::info!(id = %stack.id, services = stack.services.len(), "Stack created");
        Ok(stack)
    }

    pub async fn get(&self, id: &str) -> Result<ServiceStack> {
        self.records
            .get_stack(id)
            .await?
            .ok_or_else(|| EngineError::StackNotFound(id.to_string()))
    }

    pub async fn list(&self) -> Vec<ServiceStack> {
        self.records.list_stacks().await
    }

    /// Replace a stack's definitions, keeping its id and deploy history
    pub async fn update(&self, id: &str, spec: StackSpec) -> Result<ServiceStack> {
        let mut stack = self.get(id).await?;
        if stack.is_deploying() {
            return Err(EngineError::AlreadyDeploying(id.to_string()));
        }
        stack.apply_spec(spec)?;
        self.records.put_stack(&stack).await?;
        tracing::info!(stack = %id, "Stack updated");
        Ok(stack)
    }

    /// Delete the stack record; its service instances stay until deleted
    /// individually
    pub async fn delete(&self, id: &str) -> Result<()> {
        let stack = self.get(id).await?;
        if stack.is_deploying() {
            return Err(EngineError::AlreadyDeploying(id.to_string()));
        }
        self.records.delete_stack(id).await?;
        tracing::info!(stack = %id, "Stack deleted");
        Ok(())
    }

    // deploy

    fn claim(&self, stack_id: &str) -> Result<DeployClaim<'_>> {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        if !in_flight.insert(stack_id.to_string()) {
            return Err(EngineError::AlreadyDeploying(stack_id.to_string()));
        }
        Ok(DeployClaim {
            in_flight: &self.in_flight,
            stack_id: stack_id.to_string(),
        })
    }

    /// Deploy every service of a stack
    ///
    /// Service failures are reported in the outcome and on the stack record.
    /// An `Err` means the run could not start or its result could not be
    /// persisted.
    #[tracing::instrument(skip(self, credentials))]
    pub async fn deploy(&self, stack_id: &str, credentials: &Credentials) -> Result<DeployOutcome> {
        let _claim = self.claim(stack_id)?;

        let mut stack = self.get(stack_id).await?;
        if stack.is_deploying() {
            return Err(EngineError::AlreadyDeploying(stack_id.to_string()));
        }

        stack.state = StackState::Deploying;
        stack.deployed_services.clear();
        stack.deployment_errors.clear();
        stack.touch();
        self.records.put_stack(&stack).await?;

        let services: Vec<ServiceDefinition> =
            stack.ordered_services().into_iter().cloned().collect();
        tracing::info!(services = services.len(), "Deploying stack");

        let mut deployed_names: HashSet<String> = HashSet::new();
        let mut deployed_ids: Vec<String> = Vec::new();
        let mut failure: Option<DeploymentError> = None;

        for service in &services {
            if let Some(dependency) = service
                .depends_on
                .iter()
                .find(|d| !deployed_names.contains(d.as_str()))
            {
                let error = EngineError::UnmetDependency {
                    service: service.name.clone(),
                    dependency: dependency.clone(),
                };
                tracing::warn!(service = %service.name, error = %error, "Service not started");
                failure = Some(DeploymentError {
                    service: service.name.clone(),
                    error: error.to_string(),
                });
                break;
            }

            let variables = merge_variables(&stack.variables, &service.variables);
            let rollout = self
                .instances
                .roll_out(service, variables, Some(&stack.id), credentials)
                .await;
            deployed_ids.extend(rollout.instance_ids());

            if let Some(error) = rollout.error {
                failure = Some(DeploymentError {
                    service: service.name.clone(),
                    error: error.to_string(),
                });
                break;
            }
            deployed_names.insert(service.name.clone());
        }

        stack.deployed_services = deployed_ids.clone();
        stack.state = if failure.is_some() {
            StackState::Failed
        } else {
            StackState::Deployed
        };
        stack.deployment_errors = failure.iter().cloned().collect();
        stack.touch();
        if let Err(e) = self.records.put_stack(&stack).await {
            let error = EngineError::from(e);
            self.record_aborted(stack, &error).await;
            return Err(error);
        }

        match &failure {
            Some(f) => tracing::warn!(
                deployed = deployed_ids.len(),
                service = %f.service,
                error = %f.error,
                "Stack deploy failed"
            ),
            None => tracing::info!(deployed = deployed_ids.len(), "Stack deployed"),
        }

        Ok(DeployOutcome {
            stack_id: stack.id,
            deployed_ids,
            failed: failure.into_iter().collect(),
        })
    }

    /// Best-effort write of `failed` after a run could not persist its result
    async fn record_aborted(&self, mut stack: ServiceStack, error: &EngineError) {
        stack.state = StackState::Failed;
        stack.deployment_errors.push(DeploymentError {
            service: stack.name.clone(),
            error: error.to_string(),
        });
        stack.touch();
        if let Err(e) = self.records.put_stack(&stack).await {
            tracing::error!(stack = %stack.id, error = %e, "Could not record failed deploy");
        }
    }

    /// Clear a `deploying` state left behind by an interrupted run
    ///
    /// The stack is marked `failed` so it can be deployed, updated or
    /// deleted again. A run still in flight in this process is not touched.
    pub async fn reset(&self, id: &str) -> Result<ServiceStack> {
        let _claim = self.claim(id)?;
        let mut stack = self.get(id).await?;
        if !stack.is_deploying() {
            return Ok(stack);
        }

        stack.state = StackState::Failed;
        stack.deployment_errors.push(DeploymentError {
            service: stack.name.clone(),
            error: "deploy interrupted before completion".to_string(),
        });
        stack.touch();
        self.records.put_stack(&stack).await?;
        tracing::warn!(stack = %id, "Stale deploy state cleared");
        Ok(stack)
    }

    // validation

    /// Validate every instance from the stack's last deploy
    ///
    /// The stack is `valid` only when every comparison completed clean. Any
    /// comparison that could not complete (including a missing instance
    /// record) makes it `error`; otherwise any drift makes it
    /// `drift_detected`. The deploy state is left alone.
    #[tracing::instrument(skip(self, credentials))]
    pub async fn validate(
        &self,
        stack_id: &str,
        credentials: &Credentials,
    ) -> Result<StackValidation> {
        let stack = self.get(stack_id).await?;

        let mut checks = Vec::with_capacity(stack.deployed_services.len());
        for instance_id in &stack.deployed_services {
            let check = match self.instances.validate(instance_id, credentials).await {
                Ok(report) => InstanceCheck {
                    instance_id: instance_id.clone(),
                    status: if report.valid {
                        ValidationStatus::Valid
                    } else {
                        ValidationStatus::DriftDetected
                    },
                    missing: report.missing,
                    error: None,
                },
                Err(e) => {
                    tracing::warn!(instance = %instance_id, error = %e, "Instance validation failed");
                    InstanceCheck {
                        instance_id: instance_id.clone(),
                        status: ValidationStatus::Error,
                        missing: Vec::new(),
                        error: Some(e.to_string()),
                    }
                }
            };
            checks.push(check);
        }

        let status = aggregate_status(&checks);

        // re-read so a concurrent deploy's writes are not overwritten
        let mut current = self.get(stack_id).await?;
        current.validation_status = status;
        current.last_validated_at = Some(chrono::Utc::now());
        current.touch();
        self.records.put_stack(&current).await?;

        tracing::info!(status = %status, instances = checks.len(), "Stack validated");
        Ok(StackValidation {
            stack_id: stack_id.to_string(),
            status,
            instances: checks,
        })
    }
}

fn aggregate_status(checks: &[InstanceCheck]) -> ValidationStatus {
    if checks.is_empty() {
        ValidationStatus::Unknown
    } else if checks.iter().any(|c| c.status == ValidationStatus::Error) {
        ValidationStatus::Error
    } else if checks
        .iter()
        .any(|c| c.status == ValidationStatus::DriftDetected)
    {
        ValidationStatus::DriftDetected
    } else {
        ValidationStatus::Valid
    }
}
