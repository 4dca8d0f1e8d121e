use std::sync::Arc;

use super::loader::HistoryLoader;
use super::distinct_vulnerabilities;
use crate::logic::config::PipelineConfig;
use crate::logic::error::Error;
use crate::logic::external_intel::{CveRecord, InMemorySource};
use crate::logic::fixtures::{record, reference_time, write_history};
use crate::logic::keywords::KeywordExtractor;

fn extractor() -> KeywordExtractor {
    KeywordExtractor::with_defaults().unwrap()
}

#[test]
fn test_load_shares_one_record_per_id() {
    let source = InMemorySource::new()
        .with("CVE-1", record("Stack based overflow in the packet decoder.", 3.9, 800))
        .with("CVE-2", record("Path traversal in the archive extractor.", 2.8, 900));
    let history = write_history(&[
        ("CVE-1", "2023-03-01", "true"),
        ("CVE-1", "2023-03-05", "false"),
        ("CVE-2", "2023-03-10", "true"),
    ]);
    let extractor = extractor();

    let loader = HistoryLoader::new(history.path(), &source, &extractor)
        .with_reference_time(reference_time());
    let events = loader.load().unwrap();

    assert_eq!(events.len(), 3);
    assert_eq!(
        events.iter().map(|e| e.id.as_str()).collect::<Vec<_>>(),
        vec!["CVE-1", "CVE-1", "CVE-2"]
    );
    assert_eq!(events.iter().map(|e| e.outcome).collect::<Vec<_>>(), vec![true, false, true]);
    assert!(Arc::ptr_eq(&events[0].details, &events[1].details));
    assert!(!Arc::ptr_eq(&events[0].details, &events[2].details));
    assert_eq!(distinct_vulnerabilities(events).len(), 2);

    // one lookup per distinct id
    assert_eq!(source.lookup_count(), 2);

    let report = loader.report().unwrap();
    assert_eq!(report.rows_read, 3);
    assert_eq!(report.vulnerabilities, 2);
    assert_eq!(report.skipped(), 0);
}

#[test]
fn test_load_is_idempotent() {
    let source = InMemorySource::new().with("CVE-1", record("Heap overflow in the parser.", 3.9, 500));
    let history = write_history(&[("CVE-1", "2023-01-01", "1")]);
    let extractor = extractor();
    let loader = HistoryLoader::new(history.path(), &source, &extractor)
        .with_reference_time(reference_time());

    let first = loader.load().unwrap().as_ptr();
    let second = loader.load().unwrap().as_ptr();

    assert_eq!(first, second);
    assert_eq!(source.lookup_count(), 1);
}

#[test]
fn test_recency_filter() {
    let source = InMemorySource::new()
        .with("CVE-OLD", record("Old flaw in the mail server.", 3.9, 400))
        .with("CVE-NEW", record("New flaw in the mail server.", 3.9, 200))
        .with("CVE-EDGE", record("Edge flaw in the mail server.", 3.9, 365))
        .with("CVE-EDGE-1", record("Edge flaw in the mail server.", 3.9, 364));
    let history = write_history(&[
        ("CVE-OLD", "2023-06-01", "true"),
        ("CVE-NEW", "2023-06-01", "true"),
        ("CVE-EDGE", "2023-06-01", "false"),
        ("CVE-EDGE-1", "2023-06-01", "false"),
        ("CVE-NEW", "2023-06-02", "false"),
    ]);
    let extractor = extractor();
    let loader = HistoryLoader::new(history.path(), &source, &extractor)
        .with_reference_time(reference_time());

    let events = loader.load().unwrap();
    let ids: Vec<&str> = events.iter().map(|e| e.id.as_str()).collect();

    assert_eq!(ids, vec!["CVE-OLD", "CVE-EDGE"]);
    assert_eq!(loader.report().unwrap().too_recent, 3);
    // rejected ids are not fetched again
    assert_eq!(source.lookup_count(), 4);
}

#[test]
fn test_recency_window_is_configurable() {
    let source = InMemorySource::new().with("CVE-NEW", record("Fresh flaw in the mail server.", 3.9, 200));
    let history = write_history(&[("CVE-NEW", "2023-06-01", "true")]);
    let extractor = extractor();
    let config = PipelineConfig { min_age_days: 100, ..Default::default() };

    let loader = HistoryLoader::new(history.path(), &source, &extractor)
        .with_config(config)
        .with_reference_time(reference_time());
    assert_eq!(loader.load().unwrap().len(), 1);
}

#[test]
fn test_lookup_failures_and_invalid_rows_are_skipped() {
    let no_cvss = CveRecord::new("Legacy flaw.").with_published("2010-01-01T00:00Z");
    let source = InMemorySource::new()
        .with("CVE-OK", record("Integer overflow in the image loader.", 1.8, 700))
        .with("CVE-NOCVSS", no_cvss);
    let history = write_history(&[
        ("CVE-MISSING", "2023-01-01", "true"),
        ("CVE-NOCVSS", "2023-01-01", "true"),
        ("CVE-OK", "not-a-date", "true"),
        ("CVE-OK", "2023-01-01", "perhaps"),
        ("cve-ok", "2023-01-02", "false"),
    ]);
    let extractor = extractor();
    let loader = HistoryLoader::new(history.path(), &source, &extractor)
        .with_reference_time(reference_time());

    let events = loader.load().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].id, "CVE-OK");

    let report = loader.report().unwrap();
    assert_eq!(report.lookup_failures, 2);
    assert_eq!(report.invalid_rows, 2);
    assert_eq!(report.events, 1);
}

#[test]
fn test_row_with_extra_field_is_skipped() {
    let source = InMemorySource::new()
        .with("CVE-1", record("Heap overflow in the font parser.", 3.9, 700));
    let mut file = tempfile::NamedTempFile::new().unwrap();
    std::io::Write::write_all(
        &mut file,
        b"id,date,outcome\nCVE-1,2023-03-01,true\nCVE-1,2023-03-02,false,extra\nCVE-1,2023-03-03,true\n",
    )
    .unwrap();
    let extractor = extractor();
    let loader = HistoryLoader::new(file.path(), &source, &extractor)
        .with_reference_time(reference_time());

    let events = loader.load().unwrap();
    assert_eq!(events.len(), 2);
    assert!(events.iter().all(|e| e.outcome));

    let report = loader.report().unwrap();
    assert_eq!(report.rows_read, 3);
    assert_eq!(report.invalid_rows, 1);
    assert_eq!(report.skipped(), 1);
}

#[test]
fn test_short_row_is_skipped() {
    let source = InMemorySource::new()
        .with("CVE-1", record("Heap overflow in the font parser.", 3.9, 700));
    let mut file = tempfile::NamedTempFile::new().unwrap();
    std::io::Write::write_all(&mut file, b"id,date,outcome\nCVE-1,2023-03-01\nCVE-1,2023-03-03,true\n")
        .unwrap();
    let extractor = extractor();
    let loader = HistoryLoader::new(file.path(), &source, &extractor)
        .with_reference_time(reference_time());

    assert_eq!(loader.load().unwrap().len(), 1);
    assert_eq!(loader.report().unwrap().invalid_rows, 1);
}

#[test]
fn test_data_header_names_the_date_column() {
    let source = InMemorySource::new()
        .with("CVE-1", record("Heap overflow in the font parser.", 3.9, 700));
    let mut file = tempfile::NamedTempFile::new().unwrap();
    std::io::Write::write_all(&mut file, b"id,data,outcome\nCVE-1,2023-03-01,true\n").unwrap();
    let extractor = extractor();
    let loader = HistoryLoader::new(file.path(), &source, &extractor)
        .with_reference_time(reference_time());

    let events = loader.load().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].date.date().to_string(), "2023-03-01");
}

#[test]
fn test_later_rows_of_rejected_id_count_as_skipped() {
    let source = InMemorySource::new();
    let history = write_history(&[
        ("CVE-GONE", "2023-01-01", "true"),
        ("CVE-GONE", "2023-01-02", "false"),
        ("CVE-GONE", "2023-01-03", "true"),
    ]);
    let extractor = extractor();
    let loader = HistoryLoader::new(history.path(), &source, &extractor)
        .with_reference_time(reference_time());

    assert!(loader.load().unwrap().is_empty());
    let report = loader.report().unwrap();
    assert_eq!(report.lookup_failures, 3);
    assert_eq!(source.lookup_count(), 1);
}

#[test]
fn test_missing_column_is_fatal() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    std::io::Write::write_all(&mut file, b"id,day,outcome\nCVE-1,2023-01-01,true\n").unwrap();
    let source = InMemorySource::new();
    let extractor = extractor();
    let loader = HistoryLoader::new(file.path(), &source, &extractor);

    assert!(matches!(loader.load(), Err(Error::Validation(_))));
    assert!(loader.report().is_none());
}

#[test]
fn test_missing_file_is_fatal() {
    let source = InMemorySource::new();
    let extractor = extractor();
    let loader = HistoryLoader::new(std::path::Path::new("/nonexistent/history.csv"), &source, &extractor);
    assert!(loader.load().is_err());
}
