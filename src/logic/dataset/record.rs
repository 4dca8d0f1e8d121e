use std::collections::BTreeSet;
use std::sync::Arc;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// CAPEC attack pattern reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapecEntry {
    pub id: String,
    pub name: String,
}

/// Canonical vulnerability record, shared by every event with the same CVE id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vulnerability {
    pub id: String,

    /// Normalized description keywords
    pub keywords: BTreeSet<String>,

    /// Attack patterns in source order
    pub capec: Vec<CapecEntry>,

    /// Weakness ids ("CWE-79", ...)
    pub cwe: BTreeSet<String>,

    /// CVSS v3 exploitability sub-score
    pub exploitability_score: f64,
    pub cvss_vector: String,

    pub references_number: usize,
    pub published_date: DateTime<Utc>,

    /// Provenance blob from the data source, untouched
    pub history: serde_json::Value,

    /// Fixed regression label, bypasses the target function when set
    pub target: Option<f64>,
}

impl Vulnerability {
    pub fn capec_ids(&self) -> impl Iterator<Item = &str> {
        self.capec.iter().map(|c| c.id.as_str())
    }
}

/// One observed outcome for a vulnerability at a point in time
#[derive(Debug, Clone)]
pub struct VulnerabilityEvent {
    pub id: String,
    pub date: NaiveDateTime,
    pub outcome: bool,
    pub details: Arc<Vulnerability>,
}

impl VulnerabilityEvent {
    pub fn new(id: &str, date: NaiveDateTime, outcome: bool, details: Arc<Vulnerability>) -> Self {
        Self {
            id: id.to_string(),
            date,
            outcome,
            details,
        }
    }
}
