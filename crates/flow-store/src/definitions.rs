//! Flow and action definition sources

use std::fs;
use std::path::{Path, PathBuf};

use action_flow::{ActionDefinition, DefinitionStore, FlowDefinition, FlowError};
use async_trait::async_trait;
use flow_resolver::DependencyMap;
use indexmap::IndexMap;
use parking_lot::RwLock;
use tracing::{debug, info};

use crate::errors::{StoreErrKind, StoreError};
use crate::fs::{layout, reader};

#[derive(Debug, Default, Clone)]
struct Catalog {
    flows: IndexMap<String, FlowDefinition>,
    actions: IndexMap<String, ActionDefinition>,
}

impl Catalog {
    fn insert_flow(&mut self, flow: FlowDefinition) -> Result<(), StoreError> {
        if self.flows.contains_key(&flow.id) {
            return Err(StoreErrKind::Duplicate {
                kind: "flow",
                id: flow.id,
            }
            .into());
        }
        self.flows.insert(flow.id.clone(), flow);
        Ok(())
    }

    fn insert_action(&mut self, action: ActionDefinition) -> Result<(), StoreError> {
        if self.actions.contains_key(&action.id) {
            return Err(StoreErrKind::Duplicate {
                kind: "action",
                id: action.id,
            }
            .into());
        }
        self.actions.insert(action.id.clone(), action);
        Ok(())
    }

    fn flow(&self, id: &str) -> Result<FlowDefinition, FlowError> {
        self.flows
            .get(id)
            .cloned()
            .ok_or_else(|| FlowError::flow_not_found(id))
    }

    fn action(&self, id: &str) -> Result<ActionDefinition, FlowError> {
        self.actions
            .get(id)
            .cloned()
            .ok_or_else(|| FlowError::action_not_found(id))
    }

    fn flow_dependencies(&self) -> DependencyMap {
        self.flows
            .iter()
            .map(|(id, flow)| (id.clone(), flow.dependencies.clone()))
            .collect()
    }

    fn action_dependencies(&self) -> DependencyMap {
        self.actions
            .iter()
            .map(|(id, action)| (id.clone(), action.dependencies.clone()))
            .collect()
    }
}

/// Definitions loaded from `<root>/flows` and `<root>/actions`.
///
/// Each directory holds one definition per `.json`, `.yaml` or `.yml` file;
/// store order follows file names.
#[derive(Debug)]
pub struct FsDefinitionStore {
    root: PathBuf,
    catalog: RwLock<Catalog>,
}

impl FsDefinitionStore {
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        let catalog = load_catalog(&root)?;
        info!(
            root = %root.display(),
            flows = catalog.flows.len(),
            actions = catalog.actions.len(),
            "definitions loaded"
        );
        Ok(Self {
            root,
            catalog: RwLock::new(catalog),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Re-read every definition file; the previous catalog stays on error
    pub fn reload(&self) -> Result<(), StoreError> {
        let catalog = load_catalog(&self.root)?;
        *self.catalog.write() = catalog;
        Ok(())
    }
}

fn load_catalog(root: &Path) -> Result<Catalog, StoreError> {
    let mut catalog = Catalog::default();
    for path in definition_files(&root.join(layout::FLOWS_DIR))? {
        debug!(path = %path.display(), "loading flow");
        catalog.insert_flow(reader::read_definition(&path)?)?;
    }
    for path in definition_files(&root.join(layout::ACTIONS_DIR))? {
        debug!(path = %path.display(), "loading action");
        catalog.insert_action(reader::read_definition(&path)?)?;
    }
    Ok(catalog)
}

fn definition_files(dir: &Path) -> Result<Vec<PathBuf>, StoreError> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && reader::Format::from_path(&path).is_some() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

#[async_trait]
impl DefinitionStore for FsDefinitionStore {
    async fn flow(&self, id: &str) -> Result<FlowDefinition, FlowError> {
        self.catalog.read().flow(id)
    }

    async fn action(&self, id: &str) -> Result<ActionDefinition, FlowError> {
        self.catalog.read().action(id)
    }

    async fn flow_ids(&self) -> Result<Vec<String>, FlowError> {
        Ok(self.catalog.read().flows.keys().cloned().collect())
    }

    async fn flow_dependencies(&self) -> Result<DependencyMap, FlowError> {
        Ok(self.catalog.read().flow_dependencies())
    }

    async fn action_dependencies(&self) -> Result<DependencyMap, FlowError> {
        Ok(self.catalog.read().action_dependencies())
    }
}

/// Definitions held in memory, in insertion order
#[derive(Debug, Default)]
pub struct InMemoryDefinitionStore {
    catalog: RwLock<Catalog>,
}

impl InMemoryDefinitionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a flow
    pub fn put_flow(&self, flow: FlowDefinition) {
        self.catalog.write().flows.insert(flow.id.clone(), flow);
    }

    /// Insert or replace an action
    pub fn put_action(&self, action: ActionDefinition) {
        self.catalog.write().actions.insert(action.id.clone(), action);
    }

    pub fn with_flow(self, flow: FlowDefinition) -> Self {
        self.put_flow(flow);
        self
    }

    pub fn with_action(self, action: ActionDefinition) -> Self {
        self.put_action(action);
        self
    }
}

#[async_trait]
impl DefinitionStore for InMemoryDefinitionStore {
    async fn flow(&self, id: &str) -> Result<FlowDefinition, FlowError> {
        self.catalog.read().flow(id)
    }

    async fn action(&self, id: &str) -> Result<ActionDefinition, FlowError> {
        self.catalog.read().action(id)
    }

    async fn flow_ids(&self) -> Result<Vec<String>, FlowError> {
        Ok(self.catalog.read().flows.keys().cloned().collect())
    }

    async fn flow_dependencies(&self) -> Result<DependencyMap, FlowError> {
        Ok(self.catalog.read().flow_dependencies())
    }

    async fn action_dependencies(&self) -> Result<DependencyMap, FlowError> {
        Ok(self.catalog.read().action_dependencies())
    }
}
