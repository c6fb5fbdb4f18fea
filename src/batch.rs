//! Batch expansion: one result per member crawl job, in declared order.

use crate::{
    aggregate::ReportAggregator,
    error::{ReportError, Result},
    render::{Listings, SpreadsheetRenderer},
    report::{CrawlSince, DocumentList, JobReport, MemberOutcome},
    store::{BatchJob, DocumentClass},
};
use std::path::PathBuf;
use tracing::{info, warn};

pub struct BatchReporter<'a> {
    aggregator: &'a ReportAggregator<'a>,
    max_parallel_jobs: usize,
}

impl<'a> BatchReporter<'a> {
    pub fn new(aggregator: &'a ReportAggregator<'a>, max_parallel_jobs: usize) -> Self {
        Self {
            aggregator,
            max_parallel_jobs: max_parallel_jobs.max(1),
        }
    }

    fn batch(&self, batch_id: &str) -> Result<BatchJob> {
        let batch = self.aggregator.registry().batch_job(batch_id)?;
        info!(
            "batch {} members={} since={:?} finished={}",
            batch.id,
            batch.crawl_jobs.len(),
            batch.crawl_since.time(),
            batch.finished
        );
        Ok(batch)
    }

    /// Fails only when the batch itself cannot be resolved; member failures
    /// are reported in place.
    pub fn reports(&self, batch_id: &str) -> Result<Vec<MemberOutcome<JobReport>>> {
        let batch = self.batch(batch_id)?;
        let since = batch.crawl_since;
        Ok(self.fan_out(&batch.crawl_jobs, |job_id| {
            self.aggregator.build_report(job_id, since)
        }))
    }

    pub fn document_lists(
        &self,
        batch_id: &str,
        class: DocumentClass,
    ) -> Result<Vec<MemberOutcome<DocumentList>>> {
        let batch = self.batch(batch_id)?;
        let since = batch.crawl_since;
        let registry = self.aggregator.registry();
        let store = self.aggregator.store();
        Ok(self.fan_out(&batch.crawl_jobs, |job_id| {
            Ok(DocumentList {
                source_url: registry.crawl_url(job_id)?,
                document_urls: store.files(job_id, class, since)?,
            })
        }))
    }

    /// Renders the spreadsheet for one crawl job under its batch's cutoff.
    pub fn spreadsheet(
        &self,
        batch_id: &str,
        job_id: &str,
        renderer: &SpreadsheetRenderer,
    ) -> Result<PathBuf> {
        let since = self.batch(batch_id)?.crawl_since;
        let report = self.aggregator.build_report(job_id, since)?;
        let listings = self.listings(job_id, since)?;
        let artifact = renderer.render(&report, since, &listings)?;
        info!("ods report job={job_id} artifact={}", artifact.display());
        Ok(artifact)
    }

    fn listings(&self, job_id: &str, since: CrawlSince) -> Result<Listings> {
        let store = self.aggregator.store();
        Ok(Listings {
            office: store.files(job_id, DocumentClass::Office, since)?,
            invalid_pdf: store.files(job_id, DocumentClass::InvalidPdf, since)?,
            ooxml: store.files(job_id, DocumentClass::Ooxml, since)?,
        })
    }

    fn fan_out<T, F>(&self, job_ids: &[String], f: F) -> Vec<MemberOutcome<T>>
    where
        T: Send,
        F: Fn(&str) -> Result<T> + Sync,
    {
        let mut out = Vec::with_capacity(job_ids.len());
        if self.max_parallel_jobs <= 1 {
            for id in job_ids {
                out.push(outcome(id, f(id.as_str())));
            }
            return out;
        }

        for group in job_ids.chunks(self.max_parallel_jobs) {
            std::thread::scope(|s| {
                let f = &f;
                let handles: Vec<_> = group
                    .iter()
                    .map(|id| (id, s.spawn(move || f(id.as_str()))))
                    .collect();
                for (id, handle) in handles {
                    let res = handle.join().unwrap_or_else(|_| {
                        Err(ReportError::InvalidState(format!(
                            "report worker for job {id} panicked"
                        )))
                    });
                    out.push(outcome(id, res));
                }
            });
        }
        out
    }
}

fn outcome<T>(job_id: &str, res: Result<T>) -> MemberOutcome<T> {
    if let Err(e) = &res {
        warn!("member {job_id} failed: {e}");
    }
    MemberOutcome::from_result(job_id, res)
}
