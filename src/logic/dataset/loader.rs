//! History Loader
//!
//! Reads the chronological event log (`id,date,outcome`; `data` is accepted as
//! the date column), resolves each id to one shared `Vulnerability` and drops
//! vulnerabilities published too recently to have a meaningful outcome window.
//! Row-level failures are logged and skipped; only an unreadable file or a
//! malformed header aborts the load.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use chrono::{DateTime, Utc};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

use super::builder::{build_vulnerability, BuildOptions};
use super::record::{Vulnerability, VulnerabilityEvent};
use crate::logic::config::PipelineConfig;
use crate::logic::error::{Error, Result};
use crate::logic::external_intel::CveSource;
use crate::logic::keywords::KeywordExtractor;
use crate::logic::time::{days_between, parse_observed};

// ============================================================================
// LOAD REPORT
// ============================================================================

/// Why a row did not make it into the dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    TooRecent,
    LookupFailed,
    InvalidRow,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::TooRecent => f.write_str("published too recently"),
            SkipReason::LookupFailed => f.write_str("lookup failed"),
            SkipReason::InvalidRow => f.write_str("invalid row"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadReport {
    pub rows_read: usize,
    pub events: usize,
    pub vulnerabilities: usize,
    pub too_recent: usize,
    pub lookup_failures: usize,
    pub invalid_rows: usize,
}

impl LoadReport {
    fn record_skip(&mut self, reason: SkipReason) {
        match reason {
            SkipReason::TooRecent => self.too_recent += 1,
            SkipReason::LookupFailed => self.lookup_failures += 1,
            SkipReason::InvalidRow => self.invalid_rows += 1,
        }
    }

    pub fn skipped(&self) -> usize {
        self.too_recent + self.lookup_failures + self.invalid_rows
    }
}

// ============================================================================
// LOADER
// ============================================================================

/// Per-id outcome of the first resolution attempt
enum Resolution {
    Ready(Arc<Vulnerability>),
    Rejected(SkipReason),
}

struct LoadedHistory {
    events: Vec<VulnerabilityEvent>,
    report: LoadReport,
}

/// Column positions of the required fields
struct Columns {
    id: usize,
    date: usize,
    outcome: usize,
}

pub struct HistoryLoader<'a, S: CveSource + ?Sized> {
    path: PathBuf,
    source: &'a S,
    extractor: &'a KeywordExtractor,
    config: PipelineConfig,
    options: BuildOptions,
    now: DateTime<Utc>,
    loaded: OnceCell<LoadedHistory>,
}

impl<'a, S: CveSource + ?Sized> HistoryLoader<'a, S> {
    pub fn new(path: &Path, source: &'a S, extractor: &'a KeywordExtractor) -> Self {
        Self {
            path: path.to_path_buf(),
            source,
            extractor,
            config: PipelineConfig::default(),
            options: BuildOptions::default(),
            now: Utc::now(),
            loaded: OnceCell::new(),
        }
    }

    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_options(mut self, options: BuildOptions) -> Self {
        self.options = options;
        self
    }

    /// Load the dataset; later calls return the cached result
    pub fn load(&self) -> Result<&[VulnerabilityEvent]> {
        let loaded = self.loaded.get_or_try_init(|| self.read_history())?;
        Ok(&loaded.events)
    }

    /// Counters from the completed load, if any
    pub fn report(&self) -> Option<&LoadReport> {
        self.loaded.get().map(|l| &l.report)
    }

    fn read_history(&self) -> Result<LoadedHistory> {
        log::info!("Loading vulnerability history from {}", self.path.display());

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_path(&self.path)?;
        let headers = reader.headers()?;
        let columns = find_columns(headers)?;
        let width = headers.len();

        let mut events = Vec::new();
        let mut report = LoadReport::default();
        let mut resolved: HashMap<String, Resolution> = HashMap::new();

        for row in reader.records() {
            report.rows_read += 1;
            let row = match row {
                Ok(row) => row,
                Err(e) => {
                    let err = record_error(e);
                    if !err.is_recoverable() {
                        return Err(err);
                    }
                    log::warn!("Skipping row: {}", err);
                    report.record_skip(SkipReason::InvalidRow);
                    continue;
                }
            };
            let line = row.position().map(|p| p.line()).unwrap_or(0);

            if row.len() != width {
                log::warn!(
                    "Skipping row: {}",
                    Error::InvalidRow {
                        line,
                        reason: format!("{} fields, header has {}", row.len(), width),
                    }
                );
                report.record_skip(SkipReason::InvalidRow);
                continue;
            }

            match self.read_event(&row, line, &columns, &mut resolved) {
                Ok(event) => events.push(event),
                Err(reason) => report.record_skip(reason),
            }
        }

        report.events = events.len();
        report.vulnerabilities = resolved
            .values()
            .filter(|r| matches!(r, Resolution::Ready(_)))
            .count();

        log::info!(
            "Loaded {} events for {} vulnerabilities ({} rows read, {} skipped: {} too recent, {} lookup failures, {} invalid)",
            report.events,
            report.vulnerabilities,
            report.rows_read,
            report.skipped(),
            report.too_recent,
            report.lookup_failures,
            report.invalid_rows
        );
        if report.events < self.config.min_dataset_size {
            log::warn!(
                "Dataset has only {} events (minimum recommended {}); schema and model will be degenerate",
                report.events,
                self.config.min_dataset_size
            );
        }

        Ok(LoadedHistory { events, report })
    }

    fn read_event(
        &self,
        row: &csv::StringRecord,
        line: u64,
        columns: &Columns,
        resolved: &mut HashMap<String, Resolution>,
    ) -> std::result::Result<VulnerabilityEvent, SkipReason> {
        let parsed = parse_row(row, line, columns).map_err(|e| {
            log::warn!("Skipping row: {}", e);
            SkipReason::InvalidRow
        })?;
        let (id, date, outcome) = parsed;

        let resolution = resolved
            .entry(id.clone())
            .or_insert_with(|| self.resolve(&id));

        match resolution {
            Resolution::Ready(details) => Ok(VulnerabilityEvent::new(&id, date, outcome, Arc::clone(details))),
            Resolution::Rejected(reason) => {
                log::warn!("Skipping event for {} (line {}): {}", id, line, reason);
                Err(*reason)
            }
        }
    }

    /// First sighting of an id: fetch, apply the recency filter, build
    fn resolve(&self, id: &str) -> Resolution {
        let record = match self.source.find_by_id(id) {
            Ok(record) => record,
            Err(e) => {
                log::warn!("Ignoring events for {}: {}", id, Error::lookup(id, e.to_string()));
                return Resolution::Rejected(SkipReason::LookupFailed);
            }
        };

        if let Some(published) = record.published() {
            let age = days_between(self.now.naive_utc(), published.naive_utc());
            if age < self.config.min_age_days {
                log::warn!("Ignoring events for {}: published {} days ago", id, age);
                return Resolution::Rejected(SkipReason::TooRecent);
            }
        }

        match build_vulnerability(id, &record, self.extractor, &self.options) {
            Ok(vuln) => Resolution::Ready(Arc::new(vuln)),
            Err(e) => {
                log::warn!("Ignoring events for {}: {}", id, e);
                Resolution::Rejected(SkipReason::LookupFailed)
            }
        }
    }
}

// ============================================================================
// ROW PARSING
// ============================================================================

/// Header names accepted for each column, preferred name first
const ID_COLUMN: &[&str] = &["id"];
const DATE_COLUMN: &[&str] = &["date", "data"];
const OUTCOME_COLUMN: &[&str] = &["outcome"];

fn find_columns(headers: &csv::StringRecord) -> Result<Columns> {
    let position = |names: &[&str]| {
        names
            .iter()
            .find_map(|name| headers.iter().position(|h| h.trim().eq_ignore_ascii_case(name)))
            .ok_or_else(|| {
                Error::Validation(format!("event log is missing the '{}' column", names[0]))
            })
    };

    Ok(Columns {
        id: position(ID_COLUMN)?,
        date: position(DATE_COLUMN)?,
        outcome: position(OUTCOME_COLUMN)?,
    })
}

/// Reader failure on one record: I/O is fatal, anything else is a bad row
fn record_error(err: csv::Error) -> Error {
    if err.is_io_error() {
        return Error::Csv(err);
    }
    let line = err.position().map(|p| p.line()).unwrap_or(0);
    Error::InvalidRow {
        line,
        reason: err.to_string(),
    }
}

fn parse_row(
    row: &csv::StringRecord,
    line: u64,
    columns: &Columns,
) -> Result<(String, chrono::NaiveDateTime, bool)> {
    let invalid = |reason: String| Error::InvalidRow { line, reason };

    let id = row.get(columns.id).unwrap_or("").trim().to_uppercase();
    if id.is_empty() {
        return Err(invalid("empty id".to_string()));
    }

    let raw_date = row.get(columns.date).unwrap_or("");
    let date = parse_observed(raw_date)
        .ok_or_else(|| invalid(format!("unparseable date '{}' for {}", raw_date, id)))?;

    let raw_outcome = row.get(columns.outcome).unwrap_or("");
    let outcome = parse_outcome(raw_outcome)
        .ok_or_else(|| invalid(format!("unparseable outcome '{}' for {}", raw_outcome, id)))?;

    Ok((id, date, outcome))
}

/// Boolean-like outcome strings
pub fn parse_outcome(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "true" | "t" | "yes" | "y" | "1" => Some(true),
        "false" | "f" | "no" | "n" | "0" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_outcome() {
        assert_eq!(parse_outcome("True"), Some(true));
        assert_eq!(parse_outcome(" 1 "), Some(true));
        assert_eq!(parse_outcome("no"), Some(false));
        assert_eq!(parse_outcome("FALSE"), Some(false));
        assert_eq!(parse_outcome("maybe"), None);
        assert_eq!(parse_outcome(""), None);
    }

    #[test]
    fn test_find_columns_any_order_and_case() {
        let headers = csv::StringRecord::from(vec!["Outcome", "ID", "date"]);
        let columns = find_columns(&headers).unwrap();
        assert_eq!((columns.id, columns.date, columns.outcome), (1, 2, 0));
    }

    #[test]
    fn test_find_columns_missing() {
        let headers = csv::StringRecord::from(vec!["id", "day", "outcome"]);
        assert!(matches!(find_columns(&headers), Err(Error::Validation(_))));
    }

    #[test]
    fn test_find_columns_accepts_data_for_date() {
        let headers = csv::StringRecord::from(vec!["id", "data", "outcome"]);
        assert_eq!(find_columns(&headers).unwrap().date, 1);

        // an explicit date column wins
        let headers = csv::StringRecord::from(vec!["data", "id", "date", "outcome"]);
        assert_eq!(find_columns(&headers).unwrap().date, 2);
    }

    #[test]
    fn test_skip_reason_display() {
        assert_eq!(SkipReason::TooRecent.to_string(), "published too recently");
        assert_eq!(SkipReason::InvalidRow.to_string(), "invalid row");
    }
}

#[cfg(test)]
impl<'a, S: CveSource + ?Sized> HistoryLoader<'a, S> {
    /// Reference time for the recency filter (defaults to now)
    pub fn with_reference_time(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }
}
