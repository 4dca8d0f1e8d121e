//! Dataset Module - Vulnerability history for training
//!
//! Events are loaded once from the outcome log and kept in file order.
//! Every event holds an `Arc` to the one canonical `Vulnerability` for its id,
//! so features are always computed from a single record per CVE.

pub mod builder;
pub mod loader;
pub mod record;

#[cfg(test)]
mod tests;

pub use builder::{fetch_vulnerability, BuildOptions};
pub use loader::{HistoryLoader, LoadReport};
pub use record::{CapecEntry, Vulnerability, VulnerabilityEvent};

use std::collections::HashSet;
use std::sync::Arc;

/// Distinct vulnerability records in order of first appearance
pub fn distinct_vulnerabilities(events: &[VulnerabilityEvent]) -> Vec<Arc<Vulnerability>> {
    let mut seen = HashSet::new();
    events
        .iter()
        .filter(|e| seen.insert(Arc::as_ptr(&e.details)))
        .map(|e| Arc::clone(&e.details))
        .collect()
}
