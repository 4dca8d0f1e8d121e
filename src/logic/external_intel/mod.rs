//! External Intelligence Module - CVE data sources
//!
//! # Components
//! - `types.rs`: typed CVE record with optional blocks and accessors
//! - `cve_search.rs`: blocking HTTP client for cve-search style APIs
//! - `memory.rs`: in-memory source for offline datasets and tests

pub mod cve_search;
pub mod memory;
pub mod types;

pub use cve_search::CveSearchClient;
pub use memory::InMemorySource;
pub use types::CveRecord;

use crate::logic::error::SourceError;

/// A lookup service returning a raw vulnerability record for an identifier
pub trait CveSource {
    fn find_by_id(&self, id: &str) -> Result<CveRecord, SourceError>;
}
