pub mod heritrix;
pub mod types;
pub mod xml;

use crate::error::Result;

pub use heritrix::HeritrixClient;
pub use types::EngineDiag;
pub use xml::parse_crawl_urls;

/// Status and configuration API of the live crawler.
///
/// Calls are made once per request with a bounded timeout and are not
/// retried here.
pub trait CrawlEngine: Send + Sync {
    fn doctor(&self) -> Result<EngineDiag>;
    /// URLs currently attributed to a running job, entry URL first.
    fn crawl_urls(&self, job_id: &str) -> Result<Vec<String>>;
    /// Raw status description as reported by the engine.
    fn status(&self, job_id: &str) -> Result<String>;
    fn downloaded_count(&self, job_id: &str) -> Result<u64>;
    /// Saved job configuration blob fetched from `url`.
    fn config(&self, url: &str) -> Result<String>;
}
