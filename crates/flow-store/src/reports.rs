//! Run report persistence

use std::fs;
use std::path::{Path, PathBuf};

use action_flow::{FlowError, ReportStore, RunReport};
use async_trait::async_trait;
use dashmap::DashMap;
use tracing::{debug, warn};

use crate::errors::StoreError;
use crate::fs::{layout, reader, writer};

/// Reports as `<root>/<flow_id>/<run_id>/report.json`, artifacts beside them
#[derive(Debug, Clone)]
pub struct FsReportStore {
    root: PathBuf,
}

impl FsReportStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn read_report(&self, flow_id: &str, run_id: &str) -> Result<RunReport, StoreError> {
        let path = layout::report_path(&self.root, flow_id, run_id);
        if !path.exists() {
            return Err(StoreError::not_found("Report", format!("{flow_id}/{run_id}")));
        }
        reader::read_json(&path)
    }
}

#[async_trait]
impl ReportStore for FsReportStore {
    async fn save(&self, report: &RunReport) -> Result<(), FlowError> {
        let path = layout::report_path(&self.root, &report.flow_id, report.run_id.as_str());
        let path = writer::write_json(path, report).map_err(StoreError::from)?;
        debug!(path = %path.display(), "report saved");
        Ok(())
    }

    async fn load(&self, flow_id: &str, run_id: &str) -> Result<RunReport, FlowError> {
        Ok(self.read_report(flow_id, run_id)?)
    }

    async fn list(&self, flow_id: &str) -> Result<Vec<RunReport>, FlowError> {
        let dir = layout::flow_dir(&self.root, flow_id);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut reports = Vec::new();
        for entry in fs::read_dir(&dir).map_err(StoreError::from)? {
            let entry = entry.map_err(StoreError::from)?;
            let path = entry.path().join(layout::REPORT_FILE);
            if !path.is_file() {
                continue;
            }
            match reader::read_json::<RunReport>(&path) {
                Ok(report) => reports.push(report),
                Err(err) => warn!(path = %path.display(), error = %err, "skipping unreadable report"),
            }
        }
        reports.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        Ok(reports)
    }

    async fn delete(&self, flow_id: &str, run_id: &str) -> Result<bool, FlowError> {
        let dir = layout::run_dir(&self.root, flow_id, run_id);
        Ok(writer::remove_dir(&dir).map_err(StoreError::from)?)
    }

    async fn artifact_dir(&self, flow_id: &str, run_id: &str) -> Result<String, FlowError> {
        Ok(layout::run_dir(&self.root, flow_id, run_id)
            .display()
            .to_string())
    }

    async fn save_artifact(
        &self,
        flow_id: &str,
        run_id: &str,
        name: &str,
        bytes: &[u8],
    ) -> Result<String, FlowError> {
        let path = layout::artifact_path(&self.root, flow_id, run_id, name);
        let path = writer::write_atomic(path, bytes).map_err(StoreError::from)?;
        Ok(path.display().to_string())
    }
}

/// Process-local report store keyed by `(flow_id, run_id)`
#[derive(Debug, Default)]
pub struct InMemoryReportStore {
    reports: DashMap<(String, String), RunReport>,
    artifacts: DashMap<String, Vec<u8>>,
}

impl InMemoryReportStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.reports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }

    /// Bytes stored at an artifact location
    pub fn artifact(&self, location: &str) -> Option<Vec<u8>> {
        self.artifacts.get(location).map(|bytes| bytes.clone())
    }

    fn location(flow_id: &str, run_id: &str) -> String {
        format!("mem://{flow_id}/{run_id}")
    }
}

#[async_trait]
impl ReportStore for InMemoryReportStore {
    async fn save(&self, report: &RunReport) -> Result<(), FlowError> {
        self.reports.insert(
            (report.flow_id.clone(), report.run_id.as_str().to_string()),
            report.clone(),
        );
        Ok(())
    }

    async fn load(&self, flow_id: &str, run_id: &str) -> Result<RunReport, FlowError> {
        self.reports
            .get(&(flow_id.to_string(), run_id.to_string()))
            .map(|entry| entry.value().clone())
            .ok_or_else(|| FlowError::report_not_found(format!("{flow_id}/{run_id}")))
    }

    async fn list(&self, flow_id: &str) -> Result<Vec<RunReport>, FlowError> {
        let mut reports: Vec<RunReport> = self
            .reports
            .iter()
            .filter(|entry| entry.key().0 == flow_id)
            .map(|entry| entry.value().clone())
            .collect();
        reports.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        Ok(reports)
    }

    async fn delete(&self, flow_id: &str, run_id: &str) -> Result<bool, FlowError> {
        let removed = self
            .reports
            .remove(&(flow_id.to_string(), run_id.to_string()))
            .is_some();
        let prefix = format!("{}/", Self::location(flow_id, run_id));
        self.artifacts.retain(|location, _| !location.starts_with(&prefix));
        Ok(removed)
    }

    async fn artifact_dir(&self, flow_id: &str, run_id: &str) -> Result<String, FlowError> {
        Ok(Self::location(flow_id, run_id))
    }

    async fn save_artifact(
        &self,
        flow_id: &str,
        run_id: &str,
        name: &str,
        bytes: &[u8],
    ) -> Result<String, FlowError> {
        let location = format!("{}/{name}", Self::location(flow_id, run_id));
        self.artifacts.insert(location.clone(), bytes.to_vec());
        Ok(location)
    }
}
