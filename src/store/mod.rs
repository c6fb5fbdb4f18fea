//! Read-side collaborators: the job registry and the classification store.
//!
//! Nothing in this crate mutates job or document records; implementations
//! must tolerate concurrent readers.

pub mod sqlite;

use crate::error::{ReportError, Result};
use crate::report::{CrawlSince, ValidationStatistics};
use serde::{Deserialize, Serialize};
use time::PrimitiveDateTime;

pub use sqlite::SqliteStore;

/// Where the report for a crawl job gets its entry URL and status from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobSource {
    /// Still known to the crawl engine; query live progress by job id.
    Live,
    /// Completed; reconstruct the entry URL from the saved configuration.
    Archived { config_url: String },
}

impl JobSource {
    /// The one place the stored job URL is interpreted. Only the exact empty
    /// string means the engine still holds the job; anything else names a
    /// saved configuration.
    pub fn from_stored_url(job_url: &str) -> Self {
        if job_url.is_empty() {
            JobSource::Live
        } else {
            JobSource::Archived {
                config_url: job_url.trim().to_string(),
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlJobRecord {
    pub id: String,
    /// Domain the crawl was started for.
    pub crawl_url: String,
    pub source: JobSource,
    pub start_time: PrimitiveDateTime,
    pub finish_time: Option<PrimitiveDateTime>,
    pub status: String,
}

impl CrawlJobRecord {
    /// A record must either carry a live status or have finished.
    pub fn check(&self) -> Result<()> {
        if self.status.trim().is_empty() && self.finish_time.is_none() {
            return Err(ReportError::InvalidState(format!(
                "crawl job {} has neither a status nor a finish time",
                self.id
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchJob {
    pub id: String,
    /// Member crawl jobs in declared order.
    pub crawl_jobs: Vec<String>,
    pub crawl_since: CrawlSince,
    pub finished: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentClass {
    ValidPdf,
    InvalidPdf,
    Odf,
    /// Legacy binary Microsoft Office formats.
    Office,
    Ooxml,
}

impl DocumentClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentClass::ValidPdf => "valid_pdf",
            DocumentClass::InvalidPdf => "invalid_pdf",
            DocumentClass::Odf => "odf",
            DocumentClass::Office => "office",
            DocumentClass::Ooxml => "ooxml",
        }
    }
}

pub trait JobRegistry: Send + Sync {
    fn crawl_job(&self, id: &str) -> Result<CrawlJobRecord>;
    fn batch_job(&self, id: &str) -> Result<BatchJob>;
    fn crawl_url(&self, id: &str) -> Result<String>;
}

pub trait ClassificationStore: Send + Sync {
    fn count(&self, job_id: &str, class: DocumentClass, since: CrawlSince) -> Result<u64>;

    fn files(&self, job_id: &str, class: DocumentClass, since: CrawlSince) -> Result<Vec<String>>;

    /// All PDFs with a validation verdict, counted independently of the
    /// valid/invalid split.
    fn pdf_total(&self, job_id: &str, since: CrawlSince) -> Result<u64>;

    /// Link to the fuller invalid-PDF report for a job, if one is published.
    fn invalid_report_url(&self, job_id: &str, invalid_count: u64) -> Option<String>;

    fn validation_statistics(&self, job_id: &str, since: CrawlSince) -> Result<ValidationStatistics> {
        let valid_count = self.count(job_id, DocumentClass::ValidPdf, since)?;
        let invalid_count = self.count(job_id, DocumentClass::InvalidPdf, since)?;
        Ok(ValidationStatistics {
            valid_count,
            invalid_count,
            invalid_report_url: self.invalid_report_url(job_id, invalid_count),
        })
    }
}
