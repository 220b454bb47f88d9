//! Service instance lifecycle
//!
//! One [`ServiceInstance`] per service per device. This module owns pushing
//! rendered configuration to devices, polling the resulting tasks, removal
//! through reverse templates and drift validation of a single instance.

use crate::drift::{DriftComparator, DriftReport, live_config_text, show_config_command};
use crate::error::{EngineError, Result};
use netdeck_core::{
    InstanceState, ServiceDefinition, ServiceInstance, TemplateRenderer, Variables, config_lines,
    merge_variables,
};
use netdeck_inventory::DeviceResolver;
use netdeck_store::{Records, TaskKind, TaskRecord};
use netdeck_task::{
    ConnectionParams, Credentials, PollPolicy, PushSpec, TaskApi, TaskDispatcher, TaskHandle,
    TaskPoller, TaskStatus,
};
use std::sync::Arc;

/// Result of pushing one service definition to all of its devices
///
/// Devices are handled in declaration order and the first failure stops the
/// rollout; `instances` holds what was deployed before it. The instance whose
/// push failed is stored as `failed` and is not part of `instances`.
#[derive(Debug)]
pub struct ServiceRollout {
    pub instances: Vec<ServiceInstance>,
    pub error: Option<EngineError>,
}

impl ServiceRollout {
    pub fn instance_ids(&self) -> Vec<String> {
        self.instances.iter().map(|i| i.id.clone()).collect()
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

pub struct InstanceManager {
    records: Records,
    renderer: Arc<dyn TemplateRenderer>,
    resolver: Arc<dyn DeviceResolver>,
    dispatcher: TaskDispatcher,
    poller: TaskPoller,
    comparator: DriftComparator,
}

impl InstanceManager {
    pub fn new(
        records: Records,
        renderer: Arc<dyn TemplateRenderer>,
        resolver: Arc<dyn DeviceResolver>,
        api: Arc<dyn TaskApi>,
        policy: PollPolicy,
    ) -> Self {
        Self {
            comparator: DriftComparator::new(renderer.clone()),
            dispatcher: TaskDispatcher::new(api.clone()),
            poller: TaskPoller::new(api, policy),
            records,
            renderer,
            resolver,
        }
    }

    pub fn records(&self) -> &Records {
        &self.records
    }

    pub fn renderer(&self) -> &Arc<dyn TemplateRenderer> {
        &self.renderer
    }

    // reads

    pub async fn get(&self, id: &str) -> Result<ServiceInstance> {
        self.records
            .get_instance(id)
            .await?
            .ok_or_else(|| EngineError::InstanceNotFound(id.to_string()))
    }

    pub async fn list(&self) -> Vec<ServiceInstance> {
        self.records.list_instances().await
    }

    pub async fn list_for_stack(&self, stack_id: &str) -> Vec<ServiceInstance> {
        self.records.list_instances_for_stack(stack_id).await
    }

    pub async fn task_history(&self, id: &str) -> Result<Vec<TaskRecord>> {
        Ok(self.records.task_history(id).await?)
    }

    // deploy

    /// Deploy a standalone service definition, failing on the first device
    /// error
    pub async fn create(
        &self,
        definition: &ServiceDefinition,
        credentials: &Credentials,
    ) -> Result<Vec<ServiceInstance>> {
        let rollout = self
            .roll_out(definition, definition.variables.clone(), None, credentials)
            .await;
        match rollout.error {
            Some(e) => Err(e),
            None => Ok(rollout.instances),
        }
    }

    /// Render once, then push to each device in order
    pub async fn roll_out(
        &self,
        definition: &ServiceDefinition,
        variables: Variables,
        stack_id: Option<&str>,
        credentials: &Credentials,
    ) -> ServiceRollout {
        let rendered = match self.renderer.render(&definition.template, &variables) {
            Ok(rendered) => rendered,
            Err(e) => {
                tracing::warn!(service = %definition.name, error = %e, "Render failed");
                return ServiceRollout {
                    instances: Vec::new(),
                    error: Some(e.into()),
                };
            }
        };
        let lines = config_lines(&rendered);

        let mut instances = Vec::with_capacity(definition.devices.len());
        for device_name in &definition.devices {
            let result = self
                .deploy_to_device(
                    definition,
                    &rendered,
                    &lines,
                    device_name,
                    &variables,
                    stack_id,
                    credentials,
                )
                .await;

            match result {
                Ok(instance) => instances.push(instance),
                Err(e) => {
                    tracing::warn!(
                        service = %definition.name,
                        device = %device_name,
                        error = %e,
                        "Device push failed, stopping rollout"
                    );
                    return ServiceRollout {
                        instances,
                        error: Some(e),
                    };
                }
            }
        }

        tracing::info!(
            service = %definition.name,
            devices = instances.len(),
            "Service rolled out"
        );
        ServiceRollout {
            instances,
            error: None,
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn deploy_to_device(
        &self,
        definition: &ServiceDefinition,
        rendered: &str,
        lines: &[String],
        device_name: &str,
        variables: &Variables,
        stack_id: Option<&str>,
        credentials: &Credentials,
    ) -> Result<ServiceInstance> {
        let device = self.resolver.resolve(device_name).await?;
        let spec = PushSpec::Config {
            connection: ConnectionParams::build(&device, credentials),
            lines: lines.to_vec(),
        };
        let handle = self.dispatcher.submit(&spec).await?;

        // a push that fails or times out leaves a `failed` record holding the task
        let mut instance =
            ServiceInstance::from_definition(definition, device, rendered, variables.clone())
                .with_stack(stack_id)
                .with_task(handle.id.clone())
                .with_state(InstanceState::Deploying);
        self.records.put_instance(&instance).await?;
        self.records
            .append_task(&instance.id, TaskRecord::new(&handle.id, TaskKind::Deploy))
            .await?;

        if let Err(e) = self.poller.poll(&handle).await.and_then(|s| s.into_success()) {
            return Err(self.mark_failed(instance, e.into()).await);
        }
        instance.set_state(InstanceState::Deployed);
        self.records.put_instance(&instance).await?;

        tracing::info!(
            instance = %instance.id,
            service = %instance.name,
            device = %instance.device.name,
            "Service instance deployed"
        );
        Ok(instance)
    }

    // status

    /// One non-blocking poll of the stored task
    pub async fn check_status(&self, id: &str) -> Result<ServiceInstance> {
        let mut instance = self.get(id).await?;
        let Some(task_id) = instance.task_id.clone() else {
            return Ok(instance);
        };

        let snapshot = self.poller.check(&TaskHandle::new(task_id)).await?;
        let next = if snapshot.succeeded() {
            InstanceState::Deployed
        } else if snapshot.status == TaskStatus::Failed || !snapshot.errors.is_empty() {
            InstanceState::Failed
        } else {
            return Ok(instance);
        };

        if instance.state != next {
            tracing::info!(instance = %id, from = %instance.state, to = %next, "Instance state changed");
            instance.set_state(next);
            self.records.put_instance(&instance).await?;
        }
        Ok(instance)
    }

    // changes to a deployed instance

    /// Re-render with merged variables and push the result
    pub async fn update(
        &self,
        id: &str,
        variables: Variables,
        credentials: &Credentials,
    ) -> Result<ServiceInstance> {
        let instance = self.get(id).await?;
        let merged = merge_variables(&instance.variables, &variables);
        let rendered = self.renderer.render(&instance.template, &merged)?;

        let mut instance = self
            .push_tracked(instance, config_lines(&rendered), credentials)
            .await?;
        instance.rendered_config = rendered;
        instance.variables = merged;
        self.records.put_instance(&instance).await?;
        Ok(instance)
    }

    /// Push the stored rendered config again
    pub async fn redeploy(&self, id: &str, credentials: &Credentials) -> Result<ServiceInstance> {
        let instance = self.get(id).await?;
        let lines = instance.config_lines();
        self.push_tracked(instance, lines, credentials).await
    }

    /// Push to an existing instance's device, tracking the state on the record
    async fn push_tracked(
        &self,
        mut instance: ServiceInstance,
        lines: Vec<String>,
        credentials: &Credentials,
    ) -> Result<ServiceInstance> {
        let spec = PushSpec::Config {
            connection: ConnectionParams::build(&instance.device, credentials),
            lines,
        };

        instance.set_state(InstanceState::Deploying);
        self.records.put_instance(&instance).await?;

        let outcome = self.submit_recorded(&instance.id, &spec, TaskKind::Deploy).await;
        let handle = match outcome {
            Ok(handle) => handle,
            Err(e) => return Err(self.mark_failed(instance, e).await),
        };
        instance.task_id = Some(handle.id.clone());

        match self.poller.poll(&handle).await.and_then(|s| s.into_success()) {
            Ok(_) => {
                instance.set_state(InstanceState::Deployed);
                self.records.put_instance(&instance).await?;
                Ok(instance)
            }
            Err(e) => Err(self.mark_failed(instance, e.into()).await),
        }
    }

    async fn mark_failed(&self, mut instance: ServiceInstance, error: EngineError) -> EngineError {
        instance.set_state(InstanceState::Failed);
        if let Err(e) = self.records.put_instance(&instance).await {
            tracing::error!(instance = %instance.id, error = %e, "Could not record failed state");
        }
        error
    }

    async fn submit_recorded(
        &self,
        instance_id: &str,
        spec: &PushSpec,
        kind: TaskKind,
    ) -> Result<TaskHandle> {
        let handle = self.dispatcher.submit(spec).await?;
        self.records
            .append_task(instance_id, TaskRecord::new(&handle.id, kind))
            .await?;
        Ok(handle)
    }

    // removal

    /// Remove an instance, pushing its reverse template first when it has one
    ///
    /// If the removal push fails or times out the record is kept with its
    /// previous state so teardown can be retried.
    pub async fn delete(&self, id: &str, credentials: &Credentials) -> Result<()> {
        let mut instance = self.get(id).await?;

        if let Some(reverse) = instance.reverse_template.clone() {
            let rendered = self.renderer.render(&reverse, &instance.variables)?;
            let spec = PushSpec::Config {
                connection: ConnectionParams::build(&instance.device, credentials),
                lines: config_lines(&rendered),
            };

            let previous = instance.state;
            instance.set_state(InstanceState::Deleting);
            self.records.put_instance(&instance).await?;

            let removal = match self.submit_recorded(id, &spec, TaskKind::Remove).await {
                Ok(handle) => self
                    .poller
                    .poll(&handle)
                    .await
                    .and_then(|s| s.into_success())
                    .map_err(EngineError::from),
                Err(e) => Err(e),
            };

            if let Err(e) = removal {
                tracing::warn!(instance = %id, error = %e, "Removal push failed, keeping record");
                instance.set_state(previous);
                self.records.put_instance(&instance).await?;
                return Err(e);
            }
        }

        self.records.delete_instance(id).await?;
        self.records.delete_task_history(id).await?;
        tracing::info!(instance = %id, service = %instance.name, "Service instance deleted");
        Ok(())
    }

    // validation

    /// Fetch live configuration and compare it with the expected config
    ///
    /// Only a completed comparison is written back; collaborator failures
    /// leave the record untouched.
    pub async fn validate(&self, id: &str, credentials: &Credentials) -> Result<DriftReport> {
        let instance = self.get(id).await?;
        let expected = self.comparator.expected_config(&instance)?;

        let command = show_config_command(instance.device.family());
        let spec = PushSpec::Show {
            connection: ConnectionParams::build(&instance.device, credentials),
            command: command.to_string(),
        };
        let handle = self.submit_recorded(id, &spec, TaskKind::Show).await?;
        let snapshot = self.poller.poll(&handle).await?.into_success()?;

        let live = live_config_text(&snapshot.result, command).ok_or_else(|| {
            EngineError::NoLiveConfig {
                task_id: handle.id.clone(),
            }
        })?;
        let live_lines: Vec<&str> = live.lines().collect();
        let report = self.comparator.compare(&instance, &expected, &live_lines);

        // re-read so concurrent changes to the record are not overwritten
        let mut current = self.get(id).await?;
        current.record_validation(report.missing.clone());
        self.records.put_instance(&current).await?;

        tracing::info!(
            instance = %id,
            valid = report.valid,
            missing = report.missing.len(),
            "Instance validated"
        );
        Ok(report)
    }

    /// Alias of [`InstanceManager::validate`]
    pub async fn health_check(&self, id: &str, credentials: &Credentials) -> Result<DriftReport> {
        self.validate(id, credentials).await
    }
}
