//! Command implementations behind the `flowrun` binary

use action_flow::{DefinitionStore, ReportStore, RunReport, RunnerConfig};
use anyhow::{anyhow, bail, Context, Result};
use flow_resolver::{
    build_graph, execution_order, ordered_dependencies, DependencyResolver, DependencyValidation,
    ItemKind,
};
use flow_variables::{Interpolator, VariableContext};
use serde::Serialize;
use serde_json::Value;

/// Validation outcome for one stored flow or action
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationEntry {
    pub kind: ItemKind,
    pub id: String,
    #[serde(flatten)]
    pub validation: DependencyValidation,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationSummary {
    pub entries: Vec<ValidationEntry>,
}

impl ValidationSummary {
    pub fn is_valid(&self) -> bool {
        self.entries.iter().all(|entry| entry.validation.valid)
    }

    pub fn error_count(&self) -> usize {
        self.entries
            .iter()
            .map(|entry| entry.validation.errors.len())
            .sum()
    }
}

/// One line of the stored-flow listing
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowSummary {
    pub id: String,
    pub name: String,
    pub steps: usize,
    pub dependencies: Vec<String>,
}

/// Every stored flow, in store order
pub async fn list_flows(definitions: &dyn DefinitionStore) -> Result<Vec<FlowSummary>> {
    let ids = definitions
        .flow_ids()
        .await
        .context("Failed to read flow ids")?;
    let mut flows = Vec::with_capacity(ids.len());
    for id in ids {
        let flow = definitions.flow(&id).await?;
        flows.push(FlowSummary {
            name: flow.display_name().to_string(),
            steps: flow.steps.len(),
            dependencies: flow.dependencies,
            id,
        });
    }
    Ok(flows)
}

/// Check the dependencies of every stored flow and action
pub async fn validate_definitions(
    definitions: &dyn DefinitionStore,
    resolver: &DependencyResolver,
) -> Result<ValidationSummary> {
    let mut summary = ValidationSummary::default();

    let flows = definitions
        .flow_dependencies()
        .await
        .context("Failed to read flow dependencies")?;
    for (id, deps) in &flows {
        summary.entries.push(ValidationEntry {
            kind: ItemKind::Flow,
            id: id.clone(),
            validation: resolver.validate(id, deps, &flows, ItemKind::Flow),
        });
    }

    let actions = definitions
        .action_dependencies()
        .await
        .context("Failed to read action dependencies")?;
    for (id, deps) in &actions {
        summary.entries.push(ValidationEntry {
            kind: ItemKind::Action,
            id: id.clone(),
            validation: resolver.validate(id, deps, &actions, ItemKind::Action),
        });
    }

    Ok(summary)
}

/// Execution order of one flow's dependency closure (ending with the flow),
/// or of every stored flow when `flow_id` is `None`
pub async fn flow_order(
    definitions: &dyn DefinitionStore,
    flow_id: Option<&str>,
) -> Result<Vec<String>> {
    let flows = definitions
        .flow_dependencies()
        .await
        .context("Failed to read flow dependencies")?;

    match flow_id {
        Some(id) => {
            let mut order = ordered_dependencies(&flows, id)?;
            order.push(id.to_string());
            Ok(order)
        }
        None => Ok(execution_order(&build_graph(&flows))?),
    }
}

/// Parse a `NAME=VALUE` pair; the value is read as JSON when it parses,
/// otherwise kept as a string
pub fn parse_variable(raw: &str) -> Result<(String, Value)> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| anyhow!("Expected NAME=VALUE, got '{}'", raw))?;
    let name = name.trim();
    if name.is_empty() {
        bail!("Variable name is empty in '{}'", raw);
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((name.to_string(), value))
}

/// Expand a template with the configured variables plus `extra`
pub fn interpolate(
    config: &RunnerConfig,
    template: &str,
    extra: Vec<(String, Value)>,
    seed: Option<u64>,
) -> String {
    let mut context = VariableContext::new();
    context.base_url = config.base_url.clone();
    context.credentials = config.credentials.clone();
    context.custom = config.variables.clone();
    context.custom.extend(extra);

    let interpolator = match seed.or(config.generator_seed) {
        Some(seed) => Interpolator::seeded(context, seed),
        None => Interpolator::new(context),
    };
    interpolator.interpolate_string(template)
}

pub async fn list_reports(reports: &dyn ReportStore, flow_id: &str) -> Result<Vec<RunReport>> {
    reports
        .list(flow_id)
        .await
        .with_context(|| format!("Failed to list reports for '{}'", flow_id))
}

pub async fn show_report(
    reports: &dyn ReportStore,
    flow_id: &str,
    run_id: &str,
) -> Result<RunReport> {
    Ok(reports.load(flow_id, run_id).await?)
}

pub async fn delete_report(reports: &dyn ReportStore, flow_id: &str, run_id: &str) -> Result<()> {
    if !reports.delete(flow_id, run_id).await? {
        bail!("Report '{}/{}' not found", flow_id, run_id);
    }
    Ok(())
}
