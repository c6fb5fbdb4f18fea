use crate::error::{ReportError, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineDiag {
    pub base_url: String,
    pub reachable: bool,
    pub timeout_seconds: u64,
    #[serde(default)]
    pub engine_version: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Fields of interest from an engine job page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobPage {
    pub status: Option<String>,
    pub controller_state: Option<String>,
    pub downloaded_count: Option<u64>,
}

impl JobPage {
    /// Status description, falling back to the controller state.
    pub fn require_status(&self, job_id: &str) -> Result<String> {
        self.status
            .clone()
            .or_else(|| self.controller_state.clone())
            .ok_or_else(|| {
                ReportError::InvalidState(format!("engine reports no status for job {job_id}"))
            })
    }

    /// A page without a readable count is an engine fault, not zero progress.
    pub fn require_downloaded_count(&self, job_id: &str) -> Result<u64> {
        self.downloaded_count.ok_or_else(|| {
            ReportError::InvalidState(format!(
                "engine reports no downloaded count for job {job_id}"
            ))
        })
    }
}
