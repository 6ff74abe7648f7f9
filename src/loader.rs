use csv::ReaderBuilder;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::error::SourceError;
use crate::types::{CellValue, ReportRow};
use crate::util::{cell_from_field, coerce_number};

/// Upload response as returned by the parsing backend. Every field is
/// optional on the wire; which ones are present depends on the report type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UploadResponse {
    #[serde(default)]
    pub summary: Option<Vec<ReportRow>>,
    #[serde(default)]
    pub all_data: Option<Vec<ReportRow>>,
    #[serde(default)]
    pub plan_percent: Option<CellValue>,
}

/// Validated upload: the row sets plus the report-wide plan percentage.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportData {
    pub summary: Vec<ReportRow>,
    pub all_data: Vec<ReportRow>,
    /// `None` when the response did not carry one.
    pub plan_percent: Option<f64>,
}

impl UploadResponse {
    pub fn into_report_data(self) -> Result<ReportData, SourceError> {
        let summary = self.summary.ok_or(SourceError::MissingField("summary"))?;
        Ok(ReportData {
            summary,
            all_data: self.all_data.unwrap_or_default(),
            plan_percent: self.plan_percent.as_ref().map(coerce_number),
        })
    }
}

/// Maps a raw backend reply (status code + JSON body) to report data.
pub fn parse_response(status: u16, body: &str) -> Result<ReportData, SourceError> {
    if !(200..300).contains(&status) {
        return Err(SourceError::Status(status));
    }
    let response: UploadResponse = serde_json::from_str(body)?;
    response.into_report_data()
}

/// Anything that can hand over a parsed report.
pub trait ReportSource {
    fn fetch(&self) -> Result<ReportData, SourceError>;
}

/// A saved backend response (`.json`).
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ReportSource for JsonFileSource {
    fn fetch(&self) -> Result<ReportData, SourceError> {
        check_file(&self.path, "json")?;
        let body = std::fs::read_to_string(&self.path)?;
        let response: UploadResponse = serde_json::from_str(&body)?;
        let data = response.into_report_data()?;
        info!(
            path = %self.path.display(),
            summary_rows = data.summary.len(),
            all_rows = data.all_data.len(),
            "report loaded"
        );
        Ok(data)
    }
}

/// A CSV export of the summary sheet; the header row gives the column labels.
#[derive(Debug, Clone)]
pub struct CsvFileSource {
    path: PathBuf,
    plan_percent: Option<f64>,
}

impl CsvFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            plan_percent: None,
        }
    }

    /// Report-wide plan percentage, which a CSV export cannot carry.
    pub fn with_plan_percent(mut self, plan_percent: f64) -> Self {
        self.plan_percent = Some(plan_percent);
        self
    }
}

impl ReportSource for CsvFileSource {
    fn fetch(&self) -> Result<ReportData, SourceError> {
        check_file(&self.path, "csv")?;
        let summary = read_csv_rows(&self.path)?;
        Ok(ReportData {
            summary,
            all_data: Vec::new(),
            plan_percent: self.plan_percent,
        })
    }
}

pub fn read_csv_rows(path: &Path) -> Result<Vec<ReportRow>, SourceError> {
    let mut rdr = ReaderBuilder::new().flexible(true).from_path(path)?;
    let headers = rdr.headers()?.clone();
    let mut rows = Vec::new();
    let mut parse_errors = 0usize;

    for result in rdr.records() {
        let record = match result {
            Ok(r) => r,
            Err(_) => {
                parse_errors += 1;
                continue;
            }
        };
        // Short records leave trailing columns empty so all rows share the header's column set.
        let row: ReportRow = headers
            .iter()
            .enumerate()
            .map(|(i, label)| (label.trim(), record.get(i).map(cell_from_field).unwrap_or(CellValue::Empty)))
            .collect();
        rows.push(row);
    }

    if parse_errors > 0 {
        warn!(path = %path.display(), parse_errors, "skipped unreadable CSV records");
    }
    info!(path = %path.display(), rows = rows.len(), "CSV report loaded");
    Ok(rows)
}

/// Picks a source by file extension.
pub fn source_for(path: impl Into<PathBuf>) -> Result<Box<dyn ReportSource>, SourceError> {
    let path = path.into();
    match extension(&path).as_deref() {
        Some("json") => Ok(Box::new(JsonFileSource::new(path))),
        Some("csv") => Ok(Box::new(CsvFileSource::new(path))),
        _ => Err(SourceError::UnsupportedFormat(path.display().to_string())),
    }
}

fn check_file(path: &Path, expected_ext: &str) -> Result<(), SourceError> {
    if !path.is_file() {
        return Err(SourceError::FileNotFound(path.display().to_string()));
    }
    if extension(path).as_deref() != Some(expected_ext) {
        return Err(SourceError::UnsupportedFormat(path.display().to_string()));
    }
    Ok(())
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}
