use crate::{
    engine::{CrawlEngine, xml::compact_status},
    error::{ReportError, Result},
    report::{CrawlSince, JobReport},
    store::{ClassificationStore, CrawlJobRecord, DocumentClass, JobRegistry, JobSource},
    util::format_report_time,
};
use tracing::{debug, info};

/// Status reported for every job reconstructed from its saved configuration.
pub const FINISHED_STATUS: &str = "finished";

/// Merges registry metadata, engine status and document counts into one
/// [`JobReport`].
pub struct ReportAggregator<'a> {
    registry: &'a dyn JobRegistry,
    store: &'a dyn ClassificationStore,
    engine: &'a dyn CrawlEngine,
}

/// Entry URL, status and progress, from whichever branch applies.
struct Progress {
    url: String,
    status: String,
    downloaded_count: u64,
}

impl<'a> ReportAggregator<'a> {
    pub fn new(
        registry: &'a dyn JobRegistry,
        store: &'a dyn ClassificationStore,
        engine: &'a dyn CrawlEngine,
    ) -> Self {
        Self {
            registry,
            store,
            engine,
        }
    }

    pub fn registry(&self) -> &'a dyn JobRegistry {
        self.registry
    }

    pub fn store(&self) -> &'a dyn ClassificationStore {
        self.store
    }

    /// Builds the report for one crawl job. Any failing sub-query fails the
    /// whole report.
    pub fn build_report(&self, job_id: &str, since: CrawlSince) -> Result<JobReport> {
        let record = self.registry.crawl_job(job_id)?;
        record.check()?;

        let progress = match &record.source {
            JobSource::Live => self.live_progress(job_id)?,
            JobSource::Archived { config_url } => self.archived_progress(job_id, config_url)?,
        };

        let report = self.assemble(&record, progress, since)?;
        info!(
            "report job={} status={} downloaded={} valid_pdf={} invalid_pdf={}",
            report.id,
            report.status,
            report.downloaded_count,
            report.pdf_statistics.valid_count,
            report.pdf_statistics.invalid_count
        );
        Ok(report)
    }

    fn live_progress(&self, job_id: &str) -> Result<Progress> {
        debug!("job {job_id}: live branch");
        let url = self
            .engine
            .crawl_urls(job_id)?
            .into_iter()
            .next()
            .ok_or_else(|| {
                ReportError::InvalidState(format!("engine lists no crawl urls for job {job_id}"))
            })?;
        let status = compact_status(&self.engine.status(job_id)?);
        if status.is_empty() {
            return Err(ReportError::InvalidState(format!(
                "engine reports an empty status for job {job_id}"
            )));
        }
        let downloaded_count = self.engine.downloaded_count(job_id)?;
        Ok(Progress {
            url,
            status,
            downloaded_count,
        })
    }

    fn archived_progress(&self, job_id: &str, config_url: &str) -> Result<Progress> {
        debug!("job {job_id}: archived branch config={config_url}");
        if config_url.is_empty() {
            return Err(ReportError::InvalidState(format!(
                "crawl job {job_id} has a blank saved config url"
            )));
        }
        let config = self.engine.config(config_url)?;
        let url = crate::engine::parse_crawl_urls(&config)
            .into_iter()
            .next()
            .ok_or_else(|| {
                ReportError::InvalidState(format!(
                    "saved config for job {job_id} declares no crawl urls"
                ))
            })?;
        Ok(Progress {
            url,
            status: FINISHED_STATUS.to_string(),
            downloaded_count: 0,
        })
    }

    fn assemble(
        &self,
        record: &CrawlJobRecord,
        progress: Progress,
        since: CrawlSince,
    ) -> Result<JobReport> {
        let job_id = record.id.as_str();
        let pdf_statistics = self.store.validation_statistics(job_id, since)?;
        let odf_count = self.store.count(job_id, DocumentClass::Odf, since)?;
        let office_count = self.store.count(job_id, DocumentClass::Office, since)?;
        let ooxml_count = self.store.count(job_id, DocumentClass::Ooxml, since)?;

        Ok(JobReport {
            id: record.id.clone(),
            url: progress.url,
            status: progress.status,
            downloaded_count: progress.downloaded_count,
            pdf_statistics,
            odf_count,
            office_count,
            ooxml_count,
            start_time: format_report_time(record.start_time),
            finish_time: record.finish_time.map(format_report_time),
        })
    }
}
