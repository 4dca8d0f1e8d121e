//! Target Function
//!
//! Regression label per event: the vulnerability's exploitability score,
//! discounted by the share of positive outcomes among the other events for
//! the same id inside the trailing window `[date - window, date]`.
//! No history in the window leaves the score unscaled; a record-level
//! override bypasses the computation entirely.

use chrono::Duration;
use ndarray::Array1;

use crate::logic::dataset::VulnerabilityEvent;

pub fn target_value(dataset: &[VulnerabilityEvent], event: &VulnerabilityEvent, window: Duration) -> f64 {
    if let Some(target) = event.details.target {
        return target;
    }

    let start = event.date - window;
    let (positive, total) = dataset
        .iter()
        .filter(|item| !std::ptr::eq(*item, event))
        .filter(|item| item.id == event.id)
        .filter(|item| item.date >= start && item.date <= event.date)
        .fold((0usize, 0usize), |(pos, n), item| (pos + item.outcome as usize, n + 1));

    let score = event.details.exploitability_score;
    if total == 0 {
        return score;
    }
    score * (positive as f64 / total as f64)
}

/// Targets for every event, in dataset order
pub fn targets(dataset: &[VulnerabilityEvent], window: Duration) -> Array1<f64> {
    dataset
        .iter()
        .map(|event| target_value(dataset, event, window))
        .collect()
}
