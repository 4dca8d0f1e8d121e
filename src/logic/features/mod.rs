//! Features Module - Feature schema and vectorization
//!
//! `layout` derives the schema from a dataset, `vector` maps a vulnerability
//! at an observation time onto it, `selection` narrows it.

pub mod layout;
pub mod selection;
pub mod vector;


pub use layout::{build_schema, FeatureSchema, SchemaInfo, SchemaOptions};
pub use selection::FeatureSelector;
pub use vector::{feature_matrix, vectorize, FeatureVector};

use chrono::Duration;
use ndarray::{Array1, Array2};

use crate::logic::dataset::VulnerabilityEvent;
use crate::logic::target::targets;

/// Feature matrix and targets, one row per event in dataset order
pub fn training_matrices(
    dataset: &[VulnerabilityEvent],
    schema: &FeatureSchema,
    window: Duration,
) -> (Array2<f64>, Array1<f64>) {
    (feature_matrix(schema, dataset), targets(dataset, window))
}
