//! Collaborator seams: where definitions come from and where reports go

use async_trait::async_trait;
use flow_resolver::DependencyMap;

use crate::{
    errors::FlowError,
    types::{ActionDefinition, FlowDefinition, RunReport},
};

/// Read-only source of flow and action definitions
#[async_trait]
pub trait DefinitionStore: Send + Sync {
    /// Look up a flow; `FlowError::NotFound` when absent
    async fn flow(&self, id: &str) -> Result<FlowDefinition, FlowError>;

    /// Look up a reusable action; `FlowError::NotFound` when absent
    async fn action(&self, id: &str) -> Result<ActionDefinition, FlowError>;

    /// Ids of every stored flow, in store order
    async fn flow_ids(&self) -> Result<Vec<String>, FlowError>;

    /// Every flow's declared dependencies, in store order
    async fn flow_dependencies(&self) -> Result<DependencyMap, FlowError>;

    /// Every action's declared dependencies, in store order
    async fn action_dependencies(&self) -> Result<DependencyMap, FlowError>;
}

/// Persistence for finalized run reports and their artifacts
#[async_trait]
pub trait ReportStore: Send + Sync {
    /// Persist a report under its flow id and run id
    async fn save(&self, report: &RunReport) -> Result<(), FlowError>;

    /// Load one report; `FlowError::NotFound` when absent
    async fn load(&self, flow_id: &str, run_id: &str) -> Result<RunReport, FlowError>;

    /// Reports of a flow, newest first
    async fn list(&self, flow_id: &str) -> Result<Vec<RunReport>, FlowError>;

    /// Delete a report and its artifacts; `false` when nothing was stored
    async fn delete(&self, flow_id: &str, run_id: &str) -> Result<bool, FlowError>;

    /// Location of a run's artifacts
    async fn artifact_dir(&self, flow_id: &str, run_id: &str) -> Result<String, FlowError>;

    /// Store one artifact and return its location
    async fn save_artifact(
        &self,
        flow_id: &str,
        run_id: &str,
        name: &str,
        bytes: &[u8],
    ) -> Result<String, FlowError>;
}
