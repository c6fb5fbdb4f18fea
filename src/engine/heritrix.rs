use super::{CrawlEngine, types::*, xml};
use crate::config::Config;
use crate::error::{ReportError, Result};
use reqwest::blocking::Client;
use reqwest::header::ACCEPT;
use std::time::Duration;
use tracing::debug;

/// Blocking client for a Heritrix-style engine REST API.
pub struct HeritrixClient {
    client: Client,
    base_url: String,
    username: String,
    password: String,
    timeout_seconds: u64,
}

impl HeritrixClient {
    pub fn new(cfg: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(cfg.engine.timeout_seconds))
            .danger_accept_invalid_certs(cfg.engine.accept_invalid_certs)
            .build()
            .map_err(|e| ReportError::UpstreamUnavailable(format!("building http client: {e}")))?;
        Ok(Self {
            client,
            base_url: cfg.engine.base_url.trim_end_matches('/').to_string(),
            username: cfg.engine.username.clone(),
            password: cfg.engine.password.clone(),
            timeout_seconds: cfg.engine.timeout_seconds,
        })
    }

    fn job_url(&self, job_id: &str) -> String {
        format!("{}/engine/job/{}", self.base_url, job_id)
    }

    fn get_text(&self, url: &str) -> Result<String> {
        debug!("engine GET {url}");
        let mut req = self.client.get(url).header(ACCEPT, "application/xml");
        if !self.username.is_empty() {
            req = req.basic_auth(&self.username, Some(&self.password));
        }
        let body = req.send()?.error_for_status()?.text()?;
        Ok(body)
    }

    fn job_page(&self, job_id: &str) -> Result<JobPage> {
        let body = self.get_text(&self.job_url(job_id))?;
        Ok(xml::parse_job_page(&body))
    }
}

impl CrawlEngine for HeritrixClient {
    fn doctor(&self) -> Result<EngineDiag> {
        let url = format!("{}/engine", self.base_url);
        let diag = match self.get_text(&url) {
            Ok(body) => EngineDiag {
                base_url: self.base_url.clone(),
                reachable: true,
                timeout_seconds: self.timeout_seconds,
                engine_version: xml::element_text(&body, "heritrixVersion"),
                error: None,
            },
            Err(e) => EngineDiag {
                base_url: self.base_url.clone(),
                reachable: false,
                timeout_seconds: self.timeout_seconds,
                engine_version: None,
                error: Some(e.to_string()),
            },
        };
        Ok(diag)
    }

    fn crawl_urls(&self, job_id: &str) -> Result<Vec<String>> {
        let url = format!("{}/jobdir/crawler-beans.cxml", self.job_url(job_id));
        let config = self.get_text(&url)?;
        Ok(xml::parse_crawl_urls(&config))
    }

    fn status(&self, job_id: &str) -> Result<String> {
        self.job_page(job_id)?.require_status(job_id)
    }

    fn downloaded_count(&self, job_id: &str) -> Result<u64> {
        self.job_page(job_id)?.require_downloaded_count(job_id)
    }

    fn config(&self, url: &str) -> Result<String> {
        self.get_text(url)
    }
}
