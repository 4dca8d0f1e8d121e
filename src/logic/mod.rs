//! Logic Module - Forecasting pipeline
//!
//! - `external_intel/` - CVE data sources (HTTP client, in-memory)
//! - `keywords/` - RAKE extraction and exception-table normalisation
//! - `dataset/` - record builder and history loader
//! - `features/` - schema, vectorizer, selection
//! - `target` - smoothed regression label
//! - `model/` - regressors, reduction, persistence, cross-validation

pub mod config;
pub mod error;
pub mod time;

pub mod external_intel;
pub mod keywords;
pub mod dataset;
pub mod features;
pub mod target;
pub mod model;

#[cfg(test)]
pub mod fixtures;
