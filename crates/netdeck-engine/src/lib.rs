//! netdeck engine
//!
//! Stack orchestration on top of the collaborator traits: device
//! resolution, template rendering, the task API and the record store.

pub mod drift;
pub mod error;
pub mod instance;
pub mod orchestrator;

pub use drift::{DriftComparator, DriftReport, compare_config, normalize_line};
pub use error::{EngineError, Result};
pub use instance::{InstanceManager, ServiceRollout};
pub use orchestrator::{DeployOutcome, InstanceCheck, StackOrchestrator, StackValidation};

use netdeck_core::TemplateRenderer;
use netdeck_inventory::DeviceResolver;
use netdeck_store::Records;
use netdeck_task::{PollPolicy, TaskApi};
use std::sync::Arc;

/// Instance manager and stack orchestrator sharing one set of collaborators
pub struct Engine {
    pub instances: Arc<InstanceManager>,
    pub stacks: StackOrchestrator,
}

impl Engine {
    pub fn new(
        records: Records,
        renderer: Arc<dyn TemplateRenderer>,
        resolver: Arc<dyn DeviceResolver>,
        api: Arc<dyn TaskApi>,
        policy: PollPolicy,
    ) -> Self {
        let instances = Arc::new(InstanceManager::new(
            records, renderer, resolver, api, policy,
        ));
        let stacks = StackOrchestrator::new(instances.clone());
        Self { instances, stacks }
    }
}
