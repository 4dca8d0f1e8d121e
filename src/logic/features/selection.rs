//! Feature Selection
//!
//! Narrows a schema with two cutoffs: binary features must occur in at least
//! `min_support` distinct vulnerabilities and their column must correlate with
//! the target at `|r| >= min_correlation`. Synthetic features always stay.

use std::collections::HashMap;
use chrono::Duration;
use ndarray::{ArrayView1, Axis};

use super::layout::{build_schema, is_synthetic, FeatureSchema, SchemaOptions};
use super::vector::feature_matrix;
use crate::logic::dataset::{distinct_vulnerabilities, VulnerabilityEvent};
use crate::logic::target::targets;

#[derive(Debug, Clone, Copy)]
pub struct FeatureSelector {
    pub min_support: usize,
    pub min_correlation: f64,
}

impl Default for FeatureSelector {
    fn default() -> Self {
        Self {
            min_support: 1,
            min_correlation: 0.0,
        }
    }
}

impl FeatureSelector {
    pub fn new(min_support: usize, min_correlation: f64) -> Self {
        Self { min_support, min_correlation }
    }

    /// Build the full schema for `events` and reduce it
    pub fn select(&self, events: &[VulnerabilityEvent], window: Duration) -> FeatureSchema {
        let schema = build_schema(events, SchemaOptions::default());
        self.reduce(&schema, events, window)
    }

    pub fn reduce(&self, schema: &FeatureSchema, events: &[VulnerabilityEvent], window: Duration) -> FeatureSchema {
        let support = feature_support(events);
        let x = feature_matrix(schema, events);
        let y = targets(events, window);

        let mask: Vec<bool> = schema
            .names()
            .iter()
            .zip(x.axis_iter(Axis(1)))
            .map(|(name, column)| {
                if is_synthetic(name) {
                    return true;
                }
                let count = support.get(name.as_str()).copied().unwrap_or(0);
                count >= self.min_support && pearson(column, y.view()).abs() >= self.min_correlation
            })
            .collect();

        let reduced = schema.filtered(&mask);
        log::info!(
            "Feature selection kept {} of {} features (min_support={}, min_correlation={})",
            reduced.len(),
            schema.len(),
            self.min_support,
            self.min_correlation
        );
        reduced
    }
}

/// Number of distinct vulnerabilities carrying each binary feature
fn feature_support(events: &[VulnerabilityEvent]) -> HashMap<String, usize> {
    let mut support = HashMap::new();
    for vuln in distinct_vulnerabilities(events) {
        let mut names: Vec<String> = vuln
            .keywords
            .iter()
            .map(|k| k.to_lowercase())
            .chain(vuln.capec_ids().map(str::to_lowercase))
            .chain(vuln.cwe.iter().map(|c| c.to_lowercase()))
            .collect();
        names.sort();
        names.dedup();
        for name in names {
            *support.entry(name).or_insert(0) += 1;
        }
    }
    support
}

/// Pearson correlation; 0 when either side is constant
pub fn pearson(x: ArrayView1<f64>, y: ArrayView1<f64>) -> f64 {
    let n = x.len().min(y.len());
    if n < 2 {
        return 0.0;
    }

    let mean_x = x.iter().take(n).sum::<f64>() / n as f64;
    let mean_y = y.iter().take(n).sum::<f64>() / n as f64;

    let (mut cov, mut var_x, mut var_y) = (0.0, 0.0, 0.0);
    for (a, b) in x.iter().zip(y.iter()).take(n) {
        let dx = a - mean_x;
        let dy = b - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if var_x <= f64::EPSILON || var_y <= f64::EPSILON {
        return 0.0;
    }
    cov / (var_x.sqrt() * var_y.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_pearson() {
        let x = array![1.0, 2.0, 3.0, 4.0];
        let y = array![2.0, 4.0, 6.0, 8.0];
        assert!((pearson(x.view(), y.view()) - 1.0).abs() < 1e-12);

        let neg = array![4.0, 3.0, 2.0, 1.0];
        assert!((pearson(neg.view(), y.view()) + 1.0).abs() < 1e-12);

        let flat = array![1.0, 1.0, 1.0, 1.0];
        assert_eq!(pearson(flat.view(), y.view()), 0.0);
    }
}
