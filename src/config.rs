use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub database: Database,
    #[serde(default)]
    pub engine: Engine,
    #[serde(default)]
    pub report: Report,
    #[serde(default)]
    pub logging: Logging,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config: {}", path.display()))?;
        let cfg: Config = toml::from_str(&raw).with_context(|| "parsing TOML")?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.engine.base_url.trim().is_empty() {
            bail!("engine.base_url must be set");
        }
        if self.engine.timeout_seconds == 0 {
            bail!("engine.timeout_seconds must be > 0");
        }
        if self.report.max_parallel_jobs == 0 {
            bail!("report.max_parallel_jobs must be >= 1");
        }
        if self.report.template_path.trim().is_empty() {
            bail!("report.template_path must be set");
        }
        if self.report.output_dir.trim().is_empty() {
            bail!("report.output_dir must be set");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Database {
    pub path: String,
    pub busy_timeout_ms: u64,
}
impl Default for Database {
    fn default() -> Self {
        Self {
            path: "crawler.sqlite".into(),
            busy_timeout_ms: 5_000,
        }
    }
}
impl Database {
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Engine {
    pub base_url: String,
    pub username: String,
    pub password: String,
    pub timeout_seconds: u64,
    pub accept_invalid_certs: bool,
}
impl Default for Engine {
    fn default() -> Self {
        Self {
            base_url: "https://localhost:8443".into(),
            username: "".into(),
            password: "".into(),
            timeout_seconds: 30,
            accept_invalid_certs: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub template_path: String,
    pub output_dir: String,
    pub timezone_label: String,
    pub max_parallel_jobs: usize,
    /// Prefix for per-job invalid PDF report links; empty disables them.
    pub invalid_report_base_url: String,
}
impl Default for Report {
    fn default() -> Self {
        Self {
            template_path: "templates/sample_report.ods".into(),
            output_dir: "out".into(),
            timezone_label: "GMT".into(),
            max_parallel_jobs: 1,
            invalid_report_base_url: "".into(),
        }
    }
}
impl Report {
    pub fn invalid_report_base_url(&self) -> Option<String> {
        let base = self.invalid_report_base_url.trim();
        (!base.is_empty()).then(|| base.to_string())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Logging {
    pub level: String,
    pub json: bool,
    pub write_to_file: bool,
    pub file_path: String,
}
impl Default for Logging {
    fn default() -> Self {
        Self {
            level: "info".into(),
            json: false,
            write_to_file: false,
            file_path: "".into(),
        }
    }
}
