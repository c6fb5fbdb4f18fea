use crate::error::{ErrorKind, ReportError};
use crate::util::format_report_time;
use serde::{Deserialize, Serialize};
use time::PrimitiveDateTime;

/// Lower time bound applied to every classification query of one request.
///
/// Built once from the enclosing batch and passed by value to each store
/// call, so all categories of a report share the same cutoff.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrawlSince(Option<PrimitiveDateTime>);

impl CrawlSince {
    pub fn new(t: Option<PrimitiveDateTime>) -> Self {
        Self(t)
    }

    pub fn unbounded() -> Self {
        Self(None)
    }

    pub fn at(t: PrimitiveDateTime) -> Self {
        Self(Some(t))
    }

    pub fn time(&self) -> Option<PrimitiveDateTime> {
        self.0
    }

    /// Summary-sheet rendering: formatted time plus zone label, or empty.
    pub fn label(&self, zone: &str) -> String {
        match self.0 {
            Some(t) => format!("{} {}", format_report_time(t), zone),
            None => String::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationStatistics {
    #[serde(rename = "numberOfValidPDFs")]
    pub valid_count: u64,
    #[serde(rename = "numberOfInvalidPDFs")]
    pub invalid_count: u64,
    #[serde(rename = "invalidPDFReportURL")]
    pub invalid_report_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobReport {
    pub id: String,
    pub url: String,
    pub status: String,
    pub downloaded_count: u64,
    pub pdf_statistics: ValidationStatistics,
    #[serde(rename = "numberOfODFDocuments")]
    pub odf_count: u64,
    #[serde(rename = "numberOfOfficeDocuments")]
    pub office_count: u64,
    #[serde(rename = "numberOfOoxmlDocuments")]
    pub ooxml_count: u64,
    pub start_time: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finish_time: Option<String>,
}

impl JobReport {
    /// Valid PDF plus ODF.
    pub fn compliant_total(&self) -> u64 {
        self.pdf_statistics.valid_count + self.odf_count
    }

    /// Legacy Office plus invalid PDF plus OOXML.
    pub fn non_compliant_total(&self) -> u64 {
        self.office_count + self.pdf_statistics.invalid_count + self.ooxml_count
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentList {
    pub source_url: String,
    pub document_urls: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureDetail {
    pub kind: ErrorKind,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberFailure {
    pub crawl_job_id: String,
    pub error: FailureDetail,
}

/// One entry of a batch response: the member's value, or why it is missing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum MemberOutcome<T> {
    Ready(T),
    Failed(MemberFailure),
}

impl<T> MemberOutcome<T> {
    pub fn from_result(crawl_job_id: &str, res: Result<T, ReportError>) -> Self {
        match res {
            Ok(v) => MemberOutcome::Ready(v),
            Err(e) => MemberOutcome::Failed(MemberFailure {
                crawl_job_id: crawl_job_id.to_string(),
                error: FailureDetail {
                    kind: e.kind(),
                    message: e.to_string(),
                },
            }),
        }
    }

    pub fn ready(&self) -> Option<&T> {
        match self {
            MemberOutcome::Ready(v) => Some(v),
            MemberOutcome::Failed(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&MemberFailure> {
        match self {
            MemberOutcome::Ready(_) => None,
            MemberOutcome::Failed(f) => Some(f),
        }
    }
}
