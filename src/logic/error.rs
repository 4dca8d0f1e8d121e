//! Error handling
//!
//! Loading-time errors (`Lookup`, `InvalidRow`, `Source`) are recoverable per row:
//! the history loader logs them and shrinks the dataset. Everything raised while
//! fitting, predicting, or reading a persisted model is fatal to that operation.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by a CVE data source
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("{0} not found in data source")]
    NotFound(String),

    #[error("HTTP {status} from data source")]
    Status { status: u16 },

    #[error("network error: {0}")]
    Network(String),

    #[error("malformed record: {0}")]
    Parse(String),
}

#[derive(Debug, Error)]
pub enum Error {
    /// Data source has no usable record for this id
    #[error("lookup failed for {id}: {reason}")]
    Lookup { id: String, reason: String },

    #[error(transparent)]
    Source(#[from] SourceError),

    /// Event-log row that cannot be interpreted
    #[error("invalid row at line {line}: {reason}")]
    InvalidRow { line: u64, reason: String },

    /// Precondition violated when fitting or predicting
    #[error("validation error: {0}")]
    Validation(String),

    /// Numerical backend refused to fit, transform or predict
    #[error("model backend error: {0}")]
    Backend(String),

    /// Persisted schema does not hash to the value stored next to it
    #[error("feature schema mismatch: expected hash {expected:08x}, got {actual:08x}")]
    SchemaMismatch { expected: u32, actual: u32 },

    #[error("checksum mismatch for model file {0}")]
    Checksum(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<smartcore::error::Failed> for Error {
    fn from(err: smartcore::error::Failed) -> Self {
        Error::Backend(err.to_string())
    }
}

impl Error {
    pub fn lookup(id: &str, reason: impl Into<String>) -> Self {
        Error::Lookup {
            id: id.to_string(),
            reason: reason.into(),
        }
    }

    /// Whether the history loader may skip the offending row and continue
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::Lookup { .. } | Error::InvalidRow { .. } | Error::Source(_)
        )
    }
}
