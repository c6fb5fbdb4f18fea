use super::{BatchJob, ClassificationStore, CrawlJobRecord, DocumentClass, JobRegistry, JobSource};
use crate::error::{ReportError, Result};
use crate::report::CrawlSince;
use crate::util::{format_stored_time, parse_stored_time};
use rusqlite::{Connection, OpenFlags, OptionalExtension, params};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use time::PrimitiveDateTime;
use tracing::debug;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS crawl_jobs (
      id TEXT PRIMARY KEY,
      crawl_url TEXT NOT NULL,
      job_url TEXT NOT NULL DEFAULT '',
      start_time TEXT NOT NULL,
      finish_time TEXT,
      status TEXT NOT NULL DEFAULT ''
    );

    CREATE TABLE IF NOT EXISTS batch_jobs (
      id TEXT PRIMARY KEY,
      crawl_since TEXT,
      is_finished INTEGER NOT NULL DEFAULT 0
    );

    CREATE TABLE IF NOT EXISTS batch_crawl_jobs (
      batch_id TEXT NOT NULL,
      crawl_job_id TEXT NOT NULL,
      position INTEGER NOT NULL,
      PRIMARY KEY (batch_id, crawl_job_id),
      FOREIGN KEY(batch_id) REFERENCES batch_jobs(id)
    );

    CREATE TABLE IF NOT EXISTS documents (
      crawl_job_id TEXT NOT NULL,
      document_url TEXT NOT NULL,
      document_type TEXT NOT NULL,
      last_modified TEXT NOT NULL,
      is_valid INTEGER
    );

    CREATE INDEX IF NOT EXISTS documents_job_type
      ON documents(crawl_job_id, document_type, last_modified);
";

/// Job registry and classification store over one SQLite database.
pub struct SqliteStore {
    conn: Mutex<Connection>,
    invalid_report_base_url: Option<String>,
}

impl SqliteStore {
    /// Opens an existing database read-only. A missing file is an
    /// unavailable store, never an empty one.
    pub fn open(path: &Path, busy_timeout: Duration) -> Result<Self> {
        if !path.is_file() {
            return Err(ReportError::UpstreamUnavailable(format!(
                "database not found: {}",
                path.display()
            )));
        }
        let flags = OpenFlags::SQLITE_OPEN_READ_ONLY
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = Connection::open_with_flags(path, flags).map_err(|e| {
            ReportError::UpstreamUnavailable(format!("open database {}: {e}", path.display()))
        })?;
        conn.busy_timeout(busy_timeout)?;
        Ok(Self {
            conn: Mutex::new(conn),
            invalid_report_base_url: None,
        })
    }

    /// Creates the database file and its tables if they do not exist yet.
    pub fn bootstrap(path: &Path) -> Result<()> {
        let conn = Connection::open(path).map_err(|e| {
            ReportError::UpstreamUnavailable(format!("create database {}: {e}", path.display()))
        })?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    pub fn with_invalid_report_base_url(mut self, base: Option<String>) -> Self {
        self.invalid_report_base_url = base
            .map(|b| b.trim().trim_end_matches('/').to_string())
            .filter(|b| !b.is_empty());
        self
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| ReportError::UpstreamUnavailable("database lock poisoned".into()))
    }
}

fn class_filter(class: DocumentClass) -> &'static str {
    match class {
        DocumentClass::ValidPdf => "document_type = 'pdf' AND is_valid = 1",
        DocumentClass::InvalidPdf => "document_type = 'pdf' AND is_valid = 0",
        DocumentClass::Odf => "document_type = 'odf'",
        DocumentClass::Office => "document_type = 'office'",
        DocumentClass::Ooxml => "document_type = 'ooxml'",
    }
}

fn since_param(since: CrawlSince) -> Option<String> {
    since.time().map(format_stored_time)
}

/// Stored timestamps may use a `T` separator or fractional seconds, so both
/// sides are normalised by SQLite before comparing.
const SINCE_FILTER: &str = "(?2 IS NULL OR datetime(last_modified) >= datetime(?2))";

fn parse_time(job_id: &str, field: &str, raw: &str) -> Result<PrimitiveDateTime> {
    parse_stored_time(raw).ok_or_else(|| {
        ReportError::InvalidState(format!("crawl job {job_id}: unparseable {field} {raw:?}"))
    })
}

impl JobRegistry for SqliteStore {
    fn crawl_job(&self, id: &str) -> Result<CrawlJobRecord> {
        let conn = self.conn()?;
        let row = conn
            .query_row(
                "SELECT crawl_url, job_url, start_time, finish_time, status
                 FROM crawl_jobs WHERE id = ?1",
                params![id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, Option<String>>(3)?,
                        row.get::<_, String>(4)?,
                    ))
                },
            )
            .optional()?;

        let (crawl_url, job_url, start, finish, status) =
            row.ok_or_else(|| ReportError::NotFound(format!("crawl job {id}")))?;

        let finish_time = match finish.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => Some(parse_time(id, "finish_time", raw)?),
            _ => None,
        };

        Ok(CrawlJobRecord {
            id: id.to_string(),
            crawl_url,
            source: JobSource::from_stored_url(&job_url),
            start_time: parse_time(id, "start_time", &start)?,
            finish_time,
            status,
        })
    }

    fn batch_job(&self, id: &str) -> Result<BatchJob> {
        let conn = self.conn()?;
        let head = conn
            .query_row(
                "SELECT crawl_since, is_finished FROM batch_jobs WHERE id = ?1",
                params![id],
                |row| Ok((row.get::<_, Option<String>>(0)?, row.get::<_, bool>(1)?)),
            )
            .optional()?;
        let (since, finished) = head.ok_or_else(|| ReportError::NotFound(format!("batch job {id}")))?;

        let crawl_since = match since.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => CrawlSince::at(parse_stored_time(raw).ok_or_else(|| {
                ReportError::InvalidState(format!("batch job {id}: unparseable crawl_since {raw:?}"))
            })?),
            _ => CrawlSince::unbounded(),
        };

        let mut statement = conn.prepare(
            "SELECT crawl_job_id FROM batch_crawl_jobs WHERE batch_id = ?1 ORDER BY position, rowid",
        )?;
        let mut rows = statement.query(params![id])?;
        let mut crawl_jobs = Vec::new();
        while let Some(row) = rows.next()? {
            crawl_jobs.push(row.get::<_, String>(0)?);
        }

        Ok(BatchJob {
            id: id.to_string(),
            crawl_jobs,
            crawl_since,
            finished,
        })
    }

    fn crawl_url(&self, id: &str) -> Result<String> {
        let conn = self.conn()?;
        let url = conn
            .query_row(
                "SELECT crawl_url FROM crawl_jobs WHERE id = ?1",
                params![id],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        url.ok_or_else(|| ReportError::NotFound(format!("crawl job {id}")))
    }
}

impl ClassificationStore for SqliteStore {
    fn count(&self, job_id: &str, class: DocumentClass, since: CrawlSince) -> Result<u64> {
        let sql = format!(
            "SELECT COUNT(*) FROM documents
             WHERE crawl_job_id = ?1 AND {} AND {SINCE_FILTER}",
            class_filter(class)
        );
        let conn = self.conn()?;
        let count: i64 = conn.query_row(&sql, params![job_id, since_param(since)], |row| row.get(0))?;
        debug!(job_id, class = class.as_str(), count, "document count");
        Ok(count.max(0) as u64)
    }

    fn files(&self, job_id: &str, class: DocumentClass, since: CrawlSince) -> Result<Vec<String>> {
        let sql = format!(
            "SELECT document_url FROM documents
             WHERE crawl_job_id = ?1 AND {} AND {SINCE_FILTER}
             ORDER BY document_url",
            class_filter(class)
        );
        let conn = self.conn()?;
        let mut statement = conn.prepare(&sql)?;
        let mut rows = statement.query(params![job_id, since_param(since)])?;
        let mut urls = Vec::new();
        while let Some(row) = rows.next()? {
            urls.push(row.get::<_, String>(0)?);
        }
        Ok(urls)
    }

    fn pdf_total(&self, job_id: &str, since: CrawlSince) -> Result<u64> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT COUNT(*) FROM documents
             WHERE crawl_job_id = ?1 AND document_type = 'pdf' AND is_valid IS NOT NULL
               AND {SINCE_FILTER}"
        );
        let count: i64 = conn.query_row(
            &sql,
            params![job_id, since_param(since)],
            |row| row.get(0),
        )?;
        Ok(count.max(0) as u64)
    }

    fn invalid_report_url(&self, job_id: &str, invalid_count: u64) -> Option<String> {
        if invalid_count == 0 {
            return None;
        }
        self.invalid_report_base_url
            .as_ref()
            .map(|base| format!("{base}/{job_id}"))
    }
}
