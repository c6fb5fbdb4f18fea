use anyhow::{Context, Result};
use std::path::Path;
use time::PrimitiveDateTime;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;

/// `dd MMM yyyy HH:mm:ss`, e.g. `01 Jan 2023 00:00:00`.
const REPORT_TIME: &[BorrowedFormatItem<'static>] =
    format_description!("[day] [month repr:short] [year] [hour]:[minute]:[second]");

const STORED_TIME: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

pub fn ensure_dir(p: &Path) -> Result<()> {
    std::fs::create_dir_all(p).with_context(|| format!("create_dir_all {}", p.display()))
}

pub fn format_report_time(t: PrimitiveDateTime) -> String {
    t.format(REPORT_TIME)
        .unwrap_or_else(|_| "01 Jan 1970 00:00:00".to_string())
}

/// Timestamps are stored as `YYYY-MM-DD HH:MM:SS` text so they compare lexically.
pub fn format_stored_time(t: PrimitiveDateTime) -> String {
    t.format(STORED_TIME)
        .unwrap_or_else(|_| "1970-01-01 00:00:00".to_string())
}

pub fn parse_stored_time(raw: &str) -> Option<PrimitiveDateTime> {
    let raw = raw.trim();
    // tolerate an ISO `T` separator and fractional seconds
    let raw = raw.replacen('T', " ", 1);
    let raw = raw.split('.').next().unwrap_or_default();
    PrimitiveDateTime::parse(raw, STORED_TIME).ok()
}
