//! Model Module - Exploitability regression
//!
//! Backends implement `Regressor`; `ExploitabilityModel` binds one to the
//! feature schema it was trained with and owns persistence. The linear, SVR
//! and PCA stages run on smartcore; the network is trained in-crate.

mod dense;
pub mod estimator;
pub mod exploitability;
pub mod neural;
pub mod persist;
pub mod reduction;
pub mod regressor;
pub mod svr;
pub mod validator;


// Re-export common types
pub use estimator::{Estimator, ModelKind, TrainingParams};
pub use exploitability::ExploitabilityModel;
pub use persist::ModelMetadata;
pub use validator::{PerformanceValidator, ValidationMethod, ValidationReport};
