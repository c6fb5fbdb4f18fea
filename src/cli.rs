use crate::{
    aggregate::ReportAggregator,
    batch::BatchReporter,
    config::Config,
    engine::{CrawlEngine, HeritrixClient},
    render::{self, SpreadsheetRenderer},
    store::{DocumentClass, SqliteStore},
    util::ensure_dir,
};
use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "crawl-report")]
#[command(about = "Crawl progress and document validity reports (JSON + ODS)")]
pub struct Args {
    #[command(subcommand)]
    pub cmd: Command,

    /// Path to config TOML. If omitted, uses ./crawl-report.toml if present.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override log level (trace/debug/info/warn/error).
    #[arg(long)]
    pub log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Check database, template and crawl engine reachability.
    Doctor {},
    /// Per-job reports for every member of a batch.
    Report {
        #[arg(long)]
        batch: String,
    },
    /// Per-job document URL lists of one category for a batch.
    List {
        #[arg(long)]
        batch: String,
        #[arg(long, value_enum)]
        class: ListClass,
    },
    /// Render the spreadsheet report for one crawl job of a batch.
    OdsReport {
        #[arg(long)]
        batch: String,
        #[arg(long)]
        job: String,
    },
    /// Write the default four-sheet report template.
    InitTemplate {
        #[arg(long)]
        path: Option<PathBuf>,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum ListClass {
    Office,
    InvalidPdf,
    Ooxml,
}

impl From<ListClass> for DocumentClass {
    fn from(c: ListClass) -> Self {
        match c {
            ListClass::Office => DocumentClass::Office,
            ListClass::InvalidPdf => DocumentClass::InvalidPdf,
            ListClass::Ooxml => DocumentClass::Ooxml,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Artifact {
    artifact: PathBuf,
    filename: String,
    content_disposition: String,
}

#[derive(Debug, Serialize)]
struct Diagnostics {
    database: String,
    database_ok: bool,
    template: String,
    template_ok: bool,
    engine: crate::engine::EngineDiag,
}

pub fn dispatch(args: Args) -> Result<()> {
    let cfg_path = resolve_config_path(args.config.as_deref())?;
    let cfg = Config::load(&cfg_path)?;
    let _guard = init_logging(&args, &cfg)?;
    info!("config={}", cfg_path.display());

    match &args.cmd {
        Command::Doctor {} => doctor(&cfg),
        Command::InitTemplate { path } => init_template(&cfg, path.as_deref()),
        Command::Report { batch } => {
            let (store, engine) = open_sources(&cfg)?;
            let aggregator = ReportAggregator::new(&store, &store, &engine);
            let reporter = BatchReporter::new(&aggregator, cfg.report.max_parallel_jobs);
            let reports = reporter
                .reports(batch)
                .with_context(|| format!("report for batch job {batch}"))?;
            let failed = reports.iter().filter(|r| r.failure().is_some()).count();
            if failed > 0 {
                warn!("batch {batch}: {failed} of {} members failed", reports.len());
            }
            println!("{}", serde_json::to_string_pretty(&reports)?);
            Ok(())
        }
        Command::List { batch, class } => {
            let (store, engine) = open_sources(&cfg)?;
            let aggregator = ReportAggregator::new(&store, &store, &engine);
            let reporter = BatchReporter::new(&aggregator, cfg.report.max_parallel_jobs);
            let lists = reporter
                .document_lists(batch, (*class).into())
                .with_context(|| format!("{class:?} list for batch job {batch}"))?;
            println!("{}", serde_json::to_string_pretty(&lists)?);
            Ok(())
        }
        Command::OdsReport { batch, job } => {
            let (store, engine) = open_sources(&cfg)?;
            let aggregator = ReportAggregator::new(&store, &store, &engine);
            let reporter = BatchReporter::new(&aggregator, cfg.report.max_parallel_jobs);
            let renderer = SpreadsheetRenderer::from_config(&cfg);
            let path = reporter
                .spreadsheet(batch, job, &renderer)
                .with_context(|| format!("ODS report for job {job}"))?;
            let filename = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let out = Artifact {
                content_disposition: format!("attachment; filename=\"{filename}\""),
                filename,
                artifact: path,
            };
            println!("{}", serde_json::to_string_pretty(&out)?);
            Ok(())
        }
    }
}

fn open_sources(cfg: &Config) -> Result<(SqliteStore, HeritrixClient)> {
    let store = SqliteStore::open(Path::new(&cfg.database.path), cfg.database.busy_timeout())
        .with_context(|| format!("opening database {}", cfg.database.path))?
        .with_invalid_report_base_url(cfg.report.invalid_report_base_url());
    let engine = HeritrixClient::new(cfg)?;
    Ok((store, engine))
}

fn resolve_config_path(user: Option<&Path>) -> Result<PathBuf> {
    if let Some(p) = user {
        return Ok(p.to_path_buf());
    }
    let default = PathBuf::from("crawl-report.toml");
    if default.exists() {
        Ok(default)
    } else {
        Ok(PathBuf::from("crawl-report.example.toml"))
    }
}

fn init_logging(args: &Args, cfg: &Config) -> Result<Option<WorkerGuard>> {
    let level = args
        .log_level
        .as_deref()
        .unwrap_or(cfg.logging.level.as_str());

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // stdout carries the JSON results
    let stderr_layer = if cfg.logging.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed()
    };

    let (file_layer, guard) = if let Some(path) = resolve_log_path(cfg) {
        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        ensure_dir(parent)?;
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("open log file: {}", path.display()))?;
        let (non_blocking, guard) = tracing_appender::non_blocking(file);
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(non_blocking)
            .with_ansi(false)
            .with_target(true)
            .boxed();
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow!("failed to init logging: {e}"))?;

    Ok(guard)
}

fn resolve_log_path(cfg: &Config) -> Option<PathBuf> {
    if !cfg.logging.write_to_file {
        return None;
    }
    if !cfg.logging.file_path.is_empty() {
        return Some(PathBuf::from(&cfg.logging.file_path));
    }
    Some(PathBuf::from(&cfg.report.output_dir).join("crawl-report.log"))
}

fn doctor(cfg: &Config) -> Result<()> {
    let database_ok = match SqliteStore::open(Path::new(&cfg.database.path), cfg.database.busy_timeout()) {
        Ok(_) => true,
        Err(e) => {
            warn!("database check failed: {e}");
            false
        }
    };
    let template = Path::new(&cfg.report.template_path);
    let template_ok = match spreadsheet_ods::read_ods(template) {
        Ok(book) => book.num_sheets() >= render::SHEET_COUNT,
        Err(e) => {
            warn!("template check failed: {e}");
            false
        }
    };
    let engine = HeritrixClient::new(cfg)?.doctor()?;

    let diag = Diagnostics {
        database: cfg.database.path.clone(),
        database_ok,
        template: cfg.report.template_path.clone(),
        template_ok,
        engine,
    };
    println!("{}", serde_json::to_string_pretty(&diag)?);
    Ok(())
}

fn init_template(cfg: &Config, path: Option<&Path>) -> Result<()> {
    let path = path
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(&cfg.report.template_path));
    if path.exists() {
        return Err(anyhow!("template already exists: {}", path.display()));
    }
    render::write_template(&path)
        .with_context(|| format!("writing template {}", path.display()))?;
    info!("template written to {}", path.display());
    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({ "template": path }))?
    );
    Ok(())
}
