//! Feature Vector - schema-aligned numeric input
//!
//! Presence indicators for keywords, CAPEC ids and CWE ids plus the synthetic
//! numeric features. Names absent from the schema are ignored: an unseen
//! feature simply contributes nothing.

use chrono::NaiveDateTime;
use ndarray::Array2;
use serde::{Deserialize, Serialize};

use super::layout::{FeatureSchema, CVSS_EXPLOITABILITY, DAYS_SINCE_PUBLISHED, REFERENCE_COUNT};
use crate::logic::dataset::{Vulnerability, VulnerabilityEvent};
use crate::logic::error::Error;
use crate::logic::time::days_between;

// ============================================================================
// FEATURE VECTOR
// ============================================================================

/// Feature values tagged with the hash of the schema that produced them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub layout_hash: u32,
    pub values: Vec<f64>,
}

impl FeatureVector {
    /// Zeroed vector sized to the schema
    pub fn new(schema: &FeatureSchema) -> Self {
        Self {
            layout_hash: schema.hash(),
            values: vec![0.0; schema.len()],
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Set a feature by name; false when the schema does not know it
    pub fn set_by_name(&mut self, schema: &FeatureSchema, name: &str, value: f64) -> bool {
        match schema.index_of(name) {
            Some(i) if i < self.values.len() => {
                self.values[i] = value;
                true
            }
            _ => false,
        }
    }

    /// Check that this vector was produced with `schema`
    pub fn validate(&self, schema: &FeatureSchema) -> Result<(), Error> {
        schema.validate(self.layout_hash)
    }

    /// JSON form with named values, for logging
    pub fn to_log_entry(&self, schema: &FeatureSchema) -> serde_json::Value {
        serde_json::json!({
            "layout_hash": self.layout_hash,
            "named_values": schema.names().iter()
                .zip(self.values.iter())
                .filter(|(_, v)| **v != 0.0)
                .map(|(name, value)| (name.clone(), *value))
                .collect::<std::collections::BTreeMap<_, _>>(),
        })
    }
}

// ============================================================================
// VECTORIZATION
// ============================================================================

/// Map a vulnerability observed at `observed` onto `schema`
pub fn vectorize(schema: &FeatureSchema, vuln: &Vulnerability, observed: NaiveDateTime) -> FeatureVector {
    let mut vector = FeatureVector::new(schema);

    let present = vuln
        .keywords
        .iter()
        .map(String::as_str)
        .chain(vuln.capec_ids())
        .chain(vuln.cwe.iter().map(String::as_str));
    for name in present {
        vector.set_by_name(schema, name, 1.0);
    }

    vector.set_by_name(
        schema,
        DAYS_SINCE_PUBLISHED,
        days_between(observed, vuln.published_date.naive_utc()) as f64,
    );
    vector.set_by_name(schema, REFERENCE_COUNT, vuln.references_number as f64);
    vector.set_by_name(schema, CVSS_EXPLOITABILITY, vuln.exploitability_score);

    vector
}

/// One row per event, in dataset order
pub fn feature_matrix(schema: &FeatureSchema, events: &[VulnerabilityEvent]) -> Array2<f64> {
    let mut matrix = Array2::<f64>::zeros((events.len(), schema.len()));
    for (mut row, event) in matrix.rows_mut().into_iter().zip(events) {
        let vector = vectorize(schema, &event.details, event.date);
        for (cell, value) in row.iter_mut().zip(vector.values) {
            *cell = value;
        }
    }
    matrix
}
