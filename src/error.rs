//! Error taxonomy for report aggregation and rendering.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ReportError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReportError {
    /// Unknown crawl job or batch job identifier.
    #[error("not found: {0}")]
    NotFound(String),

    /// Crawl engine or document store unreachable, or timed out.
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("template unavailable: {0}")]
    TemplateUnavailable(String),

    #[error("render failed: {0}")]
    RenderFailed(String),

    /// A record that cannot be reported on as stored.
    #[error("invalid state: {0}")]
    InvalidState(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    UpstreamUnavailable,
    TemplateUnavailable,
    RenderFailed,
    InvalidState,
}

impl ReportError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ReportError::NotFound(_) => ErrorKind::NotFound,
            ReportError::UpstreamUnavailable(_) => ErrorKind::UpstreamUnavailable,
            ReportError::TemplateUnavailable(_) => ErrorKind::TemplateUnavailable,
            ReportError::RenderFailed(_) => ErrorKind::RenderFailed,
            ReportError::InvalidState(_) => ErrorKind::InvalidState,
        }
    }
}

impl From<rusqlite::Error> for ReportError {
    fn from(e: rusqlite::Error) -> Self {
        match e {
            rusqlite::Error::QueryReturnedNoRows => ReportError::NotFound(e.to_string()),
            other => ReportError::UpstreamUnavailable(format!("database: {other}")),
        }
    }
}

impl From<reqwest::Error> for ReportError {
    fn from(e: reqwest::Error) -> Self {
        if e.status() == Some(reqwest::StatusCode::NOT_FOUND) {
            return ReportError::NotFound(e.to_string());
        }
        ReportError::UpstreamUnavailable(format!("crawl engine: {e}"))
    }
}

impl From<spreadsheet_ods::OdsError> for ReportError {
    fn from(e: spreadsheet_ods::OdsError) -> Self {
        ReportError::RenderFailed(e.to_string())
    }
}
