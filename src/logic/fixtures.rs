//! Shared test fixtures

use std::io::Write;
use std::sync::Arc;
use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::logic::dataset::{CapecEntry, Vulnerability, VulnerabilityEvent};
use crate::logic::external_intel::CveRecord;
use crate::logic::time::parse_observed;

pub fn reference_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

pub fn published_days_ago(days: i64) -> String {
    (reference_time() - Duration::days(days))
        .format("%Y-%m-%dT%H:%MZ")
        .to_string()
}

pub fn record(description: &str, score: f64, days_ago: i64) -> CveRecord {
    CveRecord::new(description)
        .with_cvss(score, "CVSS:3.1/AV:N/AC:L/PR:N/UI:N/S:U/C:H/I:H/A:H")
        .with_references(2)
        .with_published(&published_days_ago(days_ago))
}

/// Event log with an `id,date,outcome` header
pub fn write_history(rows: &[(&str, &str, &str)]) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "id,date,outcome").unwrap();
    for (id, date, outcome) in rows {
        writeln!(file, "{},{},{}", id, date, outcome).unwrap();
    }
    file.flush().unwrap();
    file
}

pub fn vulnerability(id: &str, score: f64, keywords: &[&str], capec: &[&str]) -> Arc<Vulnerability> {
    Arc::new(Vulnerability {
        id: id.to_string(),
        keywords: keywords.iter().map(|k| k.to_string()).collect(),
        capec: capec
            .iter()
            .map(|c| CapecEntry { id: c.to_string(), name: format!("pattern {}", c) })
            .collect(),
        cwe: Default::default(),
        exploitability_score: score,
        cvss_vector: "CVSS:3.1/AV:N".to_string(),
        references_number: 3,
        published_date: Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap(),
        history: serde_json::Value::Null,
        target: None,
    })
}

pub fn event(details: &Arc<Vulnerability>, date: &str, outcome: bool) -> VulnerabilityEvent {
    VulnerabilityEvent::new(&details.id, parse_observed(date).unwrap(), outcome, Arc::clone(details))
}
