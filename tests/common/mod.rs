#![allow(dead_code)]

use crawl_report::{
    engine::{CrawlEngine, EngineDiag},
    error::{ReportError, Result},
    report::CrawlSince,
    store::{BatchJob, ClassificationStore, CrawlJobRecord, DocumentClass, JobRegistry, JobSource},
};
use std::collections::HashMap;
use std::sync::Mutex;
use time::macros::datetime;

pub const ARCHIVED_CONFIG_URL: &str = "http://example.org/config";

pub fn seed_config(seeds: &[&str]) -> String {
    format!(
        r#"<beans><bean id="seeds"><property name="textSource"><bean><property name="value"><value>
# URLS HERE
{}
</value></property></bean></property></bean></beans>"#,
        seeds.join("\n")
    )
}

pub fn live_record(id: &str) -> CrawlJobRecord {
    CrawlJobRecord {
        id: id.to_string(),
        crawl_url: format!("{id}.example.org"),
        source: JobSource::Live,
        start_time: datetime!(2023-03-01 08:30:00),
        finish_time: None,
        status: "running".into(),
    }
}

pub fn archived_record(id: &str, config_url: &str) -> CrawlJobRecord {
    CrawlJobRecord {
        id: id.to_string(),
        crawl_url: format!("{id}.example.org"),
        source: JobSource::Archived {
            config_url: config_url.to_string(),
        },
        start_time: datetime!(2023-01-02 10:00:00),
        finish_time: Some(datetime!(2023-01-05 18:45:10)),
        status: "finished".into(),
    }
}

#[derive(Default)]
pub struct FakeRegistry {
    pub jobs: HashMap<String, CrawlJobRecord>,
    pub batches: HashMap<String, BatchJob>,
}

impl FakeRegistry {
    pub fn with_job(mut self, record: CrawlJobRecord) -> Self {
        self.jobs.insert(record.id.clone(), record);
        self
    }

    pub fn with_batch(mut self, id: &str, members: &[&str], since: CrawlSince) -> Self {
        self.batches.insert(
            id.to_string(),
            BatchJob {
                id: id.to_string(),
                crawl_jobs: members.iter().map(|m| m.to_string()).collect(),
                crawl_since: since,
                finished: false,
            },
        );
        self
    }
}

impl JobRegistry for FakeRegistry {
    fn crawl_job(&self, id: &str) -> Result<CrawlJobRecord> {
        self.jobs
            .get(id)
            .cloned()
            .ok_or_else(|| ReportError::NotFound(format!("crawl job {id}")))
    }

    fn batch_job(&self, id: &str) -> Result<BatchJob> {
        self.batches
            .get(id)
            .cloned()
            .ok_or_else(|| ReportError::NotFound(format!("batch job {id}")))
    }

    fn crawl_url(&self, id: &str) -> Result<String> {
        Ok(self.crawl_job(id)?.crawl_url)
    }
}

#[derive(Default)]
pub struct FakeStore {
    pub counts: HashMap<(String, DocumentClass), u64>,
    pub files: HashMap<(String, DocumentClass), Vec<String>>,
    /// Classified PDF totals, kept apart from the per-class counts.
    pub pdf_totals: HashMap<String, u64>,
    pub report_url: Option<String>,
    pub unreachable: bool,
    pub seen: Mutex<Vec<CrawlSince>>,
}

impl FakeStore {
    pub fn with_count(mut self, job: &str, class: DocumentClass, n: u64) -> Self {
        self.counts.insert((job.to_string(), class), n);
        self
    }

    pub fn with_files(mut self, job: &str, class: DocumentClass, urls: &[&str]) -> Self {
        self.files.insert(
            (job.to_string(), class),
            urls.iter().map(|u| u.to_string()).collect(),
        );
        self
    }

    pub fn with_pdf_total(mut self, job: &str, n: u64) -> Self {
        self.pdf_totals.insert(job.to_string(), n);
        self
    }

    pub fn seen(&self) -> Vec<CrawlSince> {
        self.seen.lock().unwrap().clone()
    }

    fn record(&self, since: CrawlSince) -> Result<()> {
        if self.unreachable {
            return Err(ReportError::UpstreamUnavailable("store offline".into()));
        }
        self.seen.lock().unwrap().push(since);
        Ok(())
    }
}

impl ClassificationStore for FakeStore {
    fn count(&self, job_id: &str, class: DocumentClass, since: CrawlSince) -> Result<u64> {
        self.record(since)?;
        Ok(self
            .counts
            .get(&(job_id.to_string(), class))
            .copied()
            .unwrap_or(0))
    }

    fn files(&self, job_id: &str, class: DocumentClass, since: CrawlSince) -> Result<Vec<String>> {
        self.record(since)?;
        Ok(self
            .files
            .get(&(job_id.to_string(), class))
            .cloned()
            .unwrap_or_default())
    }

    fn pdf_total(&self, job_id: &str, since: CrawlSince) -> Result<u64> {
        self.record(since)?;
        Ok(self.pdf_totals.get(job_id).copied().unwrap_or(0))
    }

    fn invalid_report_url(&self, _job_id: &str, invalid_count: u64) -> Option<String> {
        if invalid_count == 0 {
            None
        } else {
            self.report_url.clone()
        }
    }
}

pub struct LiveJob {
    pub urls: Vec<String>,
    pub status: String,
    pub downloaded: u64,
}

#[derive(Default)]
pub struct FakeEngine {
    pub live: HashMap<String, LiveJob>,
    pub configs: HashMap<String, String>,
    pub unreachable: bool,
    pub calls: Mutex<Vec<String>>,
}

impl FakeEngine {
    pub fn with_live(mut self, job: &str, urls: &[&str], status: &str, downloaded: u64) -> Self {
        self.live.insert(
            job.to_string(),
            LiveJob {
                urls: urls.iter().map(|u| u.to_string()).collect(),
                status: status.to_string(),
                downloaded,
            },
        );
        self
    }

    pub fn with_config(mut self, url: &str, blob: String) -> Self {
        self.configs.insert(url.to_string(), blob);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn call(&self, what: String) -> Result<()> {
        self.calls.lock().unwrap().push(what);
        if self.unreachable {
            return Err(ReportError::UpstreamUnavailable("crawl engine: timed out".into()));
        }
        Ok(())
    }

    fn live_job(&self, job_id: &str) -> Result<&LiveJob> {
        self.live
            .get(job_id)
            .ok_or_else(|| ReportError::NotFound(format!("engine job {job_id}")))
    }
}

impl CrawlEngine for FakeEngine {
    fn doctor(&self) -> Result<EngineDiag> {
        Ok(EngineDiag {
            base_url: "fake://engine".into(),
            reachable: !self.unreachable,
            timeout_seconds: 1,
            engine_version: None,
            error: None,
        })
    }

    fn crawl_urls(&self, job_id: &str) -> Result<Vec<String>> {
        self.call(format!("crawl_urls:{job_id}"))?;
        Ok(self.live_job(job_id)?.urls.clone())
    }

    fn status(&self, job_id: &str) -> Result<String> {
        self.call(format!("status:{job_id}"))?;
        Ok(self.live_job(job_id)?.status.clone())
    }

    fn downloaded_count(&self, job_id: &str) -> Result<u64> {
        self.call(format!("downloaded_count:{job_id}"))?;
        Ok(self.live_job(job_id)?.downloaded)
    }

    fn config(&self, url: &str) -> Result<String> {
        self.call(format!("config:{url}"))?;
        self.configs
            .get(url)
            .cloned()
            .ok_or_else(|| ReportError::NotFound(format!("config {url}")))
    }
}
