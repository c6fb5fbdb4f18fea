//! Projection of a [`JobReport`] onto the fixed-layout ODS spreadsheet.
//!
//! Sheet order and cell coordinates are a published contract: sheet 0 is the
//! summary, sheets 1..=3 list legacy Office, invalid PDF and OOXML documents.

use crate::config::Config;
use crate::error::{ReportError, Result};
use crate::report::{CrawlSince, JobReport};
use spreadsheet_ods::{Sheet, Value, WorkBook};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Named summary-sheet cells. [`SummaryField::cell`] is the only place the
/// coordinates are written down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryField {
    CrawlSince,
    ValidPdf,
    Odf,
    CompliantTotal,
    InvalidPdf,
    Office,
    Ooxml,
    NonCompliantTotal,
}

impl SummaryField {
    pub const ALL: [SummaryField; 8] = [
        SummaryField::CrawlSince,
        SummaryField::ValidPdf,
        SummaryField::Odf,
        SummaryField::CompliantTotal,
        SummaryField::InvalidPdf,
        SummaryField::Office,
        SummaryField::Ooxml,
        SummaryField::NonCompliantTotal,
    ];

    /// `(row, col)`, zero based. Values go in column 1, labels in column 0.
    pub const fn cell(self) -> (u32, u32) {
        let row = match self {
            SummaryField::CrawlSince => 0,
            SummaryField::ValidPdf => 1,
            SummaryField::Odf => 2,
            SummaryField::CompliantTotal => 3,
            SummaryField::InvalidPdf => 4,
            SummaryField::Office => 5,
            SummaryField::Ooxml => 6,
            SummaryField::NonCompliantTotal => 7,
        };
        (row, 1)
    }

    pub const fn label(self) -> &'static str {
        match self {
            SummaryField::CrawlSince => "Crawl since",
            SummaryField::ValidPdf => "Valid PDF documents",
            SummaryField::Odf => "ODF documents",
            SummaryField::CompliantTotal => "Total open standard documents",
            SummaryField::InvalidPdf => "Invalid PDF documents",
            SummaryField::Office => "Microsoft Office documents",
            SummaryField::Ooxml => "Office Open XML documents",
            SummaryField::NonCompliantTotal => "Total non open standard documents",
        }
    }
}

/// Listing sheets, by position in the workbook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingSheet {
    Office = 1,
    InvalidPdf = 2,
    Ooxml = 3,
}

impl ListingSheet {
    pub const ALL: [ListingSheet; 3] = [
        ListingSheet::Office,
        ListingSheet::InvalidPdf,
        ListingSheet::Ooxml,
    ];

    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn title(self) -> &'static str {
        match self {
            ListingSheet::Office => "Microsoft Office",
            ListingSheet::InvalidPdf => "Invalid PDF",
            ListingSheet::Ooxml => "OOXML",
        }
    }
}

pub const SHEET_COUNT: usize = 4;
/// Listing rows start below the header row.
pub const FIRST_LISTING_ROW: u32 = 1;

/// Document URLs for the listing sheets, fetched under the report's cutoff.
#[derive(Debug, Clone, Default)]
pub struct Listings {
    pub office: Vec<String>,
    pub invalid_pdf: Vec<String>,
    pub ooxml: Vec<String>,
}

impl Listings {
    fn for_sheet(&self, sheet: ListingSheet) -> &[String] {
        match sheet {
            ListingSheet::Office => &self.office,
            ListingSheet::InvalidPdf => &self.invalid_pdf,
            ListingSheet::Ooxml => &self.ooxml,
        }
    }
}

/// Summary cell values for a report, in layout order.
pub fn summary_values(report: &JobReport, since: CrawlSince, zone: &str) -> Vec<(SummaryField, Value)> {
    SummaryField::ALL
        .iter()
        .map(|&field| {
            let value = match field {
                SummaryField::CrawlSince => Value::from(since.label(zone)),
                SummaryField::ValidPdf => number(report.pdf_statistics.valid_count),
                SummaryField::Odf => number(report.odf_count),
                SummaryField::CompliantTotal => number(report.compliant_total()),
                SummaryField::InvalidPdf => number(report.pdf_statistics.invalid_count),
                SummaryField::Office => number(report.office_count),
                SummaryField::Ooxml => number(report.ooxml_count),
                SummaryField::NonCompliantTotal => number(report.non_compliant_total()),
            };
            (field, value)
        })
        .collect()
}

fn number(n: u64) -> Value {
    Value::from(n as f64)
}

pub struct SpreadsheetRenderer {
    template_path: PathBuf,
    output_dir: PathBuf,
    timezone_label: String,
}

impl SpreadsheetRenderer {
    pub fn new(template_path: &Path, output_dir: &Path, timezone_label: &str) -> Self {
        Self {
            template_path: template_path.to_path_buf(),
            output_dir: output_dir.to_path_buf(),
            timezone_label: timezone_label.to_string(),
        }
    }

    pub fn from_config(cfg: &Config) -> Self {
        Self::new(
            Path::new(&cfg.report.template_path),
            Path::new(&cfg.report.output_dir),
            &cfg.report.timezone_label,
        )
    }

    pub fn template_path(&self) -> &Path {
        &self.template_path
    }

    /// Renders into a fresh, uniquely named artifact and returns its path.
    /// The template is only ever read.
    pub fn render(&self, report: &JobReport, since: CrawlSince, listings: &Listings) -> Result<PathBuf> {
        let mut book = self.open_template()?;

        let summary = book.sheet_mut(0);
        for (field, value) in summary_values(report, since, &self.timezone_label) {
            let (row, col) = field.cell();
            summary.set_value(row, col, value);
        }

        for sheet in ListingSheet::ALL {
            write_listing(book.sheet_mut(sheet.index()), listings.for_sheet(sheet));
        }

        let dest = self.output_dir.join(artifact_name(&report.id));
        publish(&mut book, &dest)?;
        Ok(dest)
    }

    fn open_template(&self) -> Result<WorkBook> {
        if !self.template_path.is_file() {
            return Err(ReportError::TemplateUnavailable(format!(
                "missing template: {}",
                self.template_path.display()
            )));
        }
        let book = spreadsheet_ods::read_ods(&self.template_path).map_err(|e| {
            ReportError::TemplateUnavailable(format!("{}: {e}", self.template_path.display()))
        })?;
        if book.num_sheets() < SHEET_COUNT {
            return Err(ReportError::TemplateUnavailable(format!(
                "{} has {} sheets, expected at least {SHEET_COUNT}",
                self.template_path.display(),
                book.num_sheets()
            )));
        }
        Ok(book)
    }
}

/// One URL per row in column 0, starting below the header. Cells are set
/// individually, so rows past the list and other columns keep their content.
fn write_listing(sheet: &mut Sheet, urls: &[String]) {
    for (i, url) in urls.iter().enumerate() {
        sheet.set_value(FIRST_LISTING_ROW + i as u32, 0, url.as_str());
    }
    debug!("sheet {} rows written={}", sheet.name(), urls.len());
}

fn artifact_name(job_id: &str) -> String {
    let safe: String = job_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    format!("report_{safe}_{}.ods", uuid::Uuid::new_v4().simple())
}

/// Serializes the workbook into a temporary file next to `dest` and renames
/// it into place, so readers never observe a partial artifact.
fn publish(book: &mut WorkBook, dest: &Path) -> Result<()> {
    let dir = dest.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir)
        .map_err(|e| ReportError::RenderFailed(format!("create {}: {e}", dir.display())))?;

    let bytes = spreadsheet_ods::write_ods_buf(book, Vec::new())?;

    let mut tmp = tempfile::Builder::new()
        .prefix(".render-")
        .suffix(".ods.tmp")
        .tempfile_in(dir)
        .map_err(|e| ReportError::RenderFailed(format!("temp file in {}: {e}", dir.display())))?;
    tmp.write_all(&bytes)
        .and_then(|_| tmp.as_file().sync_all())
        .map_err(|e| ReportError::RenderFailed(format!("write {}: {e}", tmp.path().display())))?;
    tmp.persist(dest)
        .map_err(|e| ReportError::RenderFailed(format!("publish {}: {}", dest.display(), e.error)))?;
    Ok(())
}

/// Writes the canonical empty template: labelled summary sheet plus one
/// headed listing sheet per category.
pub fn write_template(path: &Path) -> Result<()> {
    let mut book = WorkBook::new_empty();

    let mut summary = Sheet::new("Summary");
    for field in SummaryField::ALL {
        let (row, _) = field.cell();
        summary.set_value(row, 0, field.label());
    }
    book.push_sheet(summary);

    for listing in ListingSheet::ALL {
        let mut sheet = Sheet::new(listing.title());
        sheet.set_value(0, 0, "URL");
        book.push_sheet(sheet);
    }

    publish(&mut book, path)
}
