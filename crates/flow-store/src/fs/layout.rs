use std::path::{Path, PathBuf};

pub const REPORT_FILE: &str = "report.json";
pub const FLOWS_DIR: &str = "flows";
pub const ACTIONS_DIR: &str = "actions";

/// `<root>/<flow_id>`
pub fn flow_dir(root: &Path, flow_id: &str) -> PathBuf {
    root.join(sanitize(flow_id))
}

/// `<root>/<flow_id>/<run_id>`
pub fn run_dir(root: &Path, flow_id: &str, run_id: &str) -> PathBuf {
    flow_dir(root, flow_id).join(sanitize(run_id))
}

/// `<root>/<flow_id>/<run_id>/report.json`
pub fn report_path(root: &Path, flow_id: &str, run_id: &str) -> PathBuf {
    run_dir(root, flow_id, run_id).join(REPORT_FILE)
}

/// `<root>/<flow_id>/<run_id>/<name>`
pub fn artifact_path(root: &Path, flow_id: &str, run_id: &str, name: &str) -> PathBuf {
    run_dir(root, flow_id, run_id).join(sanitize(name))
}

/// Map an id or file name onto a single safe path component
pub fn sanitize(component: &str) -> String {
    let cleaned: String = component
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() || cleaned.starts_with('.') {
        format!("_{cleaned}")
    } else {
        cleaned
    }
}
