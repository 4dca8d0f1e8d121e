//! In-memory CVE source
//!
//! Offline stand-in for the HTTP client: records keyed by CVE id, optionally
//! loaded from a JSON object (`{"CVE-...": {record}, ...}`).

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use super::types::CveRecord;
use super::CveSource;
use crate::logic::error::{Result, SourceError};

#[derive(Default)]
pub struct InMemorySource {
    records: HashMap<String, CveRecord>,
    lookups: AtomicU64,
}

impl InMemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: &str, record: CveRecord) {
        self.records.insert(id.trim().to_uppercase(), record);
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let data = fs::read(path)?;
        let raw: HashMap<String, CveRecord> = serde_json::from_slice(&data)?;

        let mut source = Self::new();
        for (id, record) in raw {
            source.insert(&id, record);
        }
        log::info!("Loaded {} offline CVE records from {}", source.len(), path.display());
        Ok(source)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }
}

#[cfg(test)]
impl InMemorySource {
    pub fn with(mut self, id: &str, record: CveRecord) -> Self {
        self.insert(id, record);
        self
    }

    /// Number of `find_by_id` calls served so far
    pub fn lookup_count(&self) -> u64 {
        self.lookups.load(Ordering::Relaxed)
    }
}

impl CveSource for InMemorySource {
    fn find_by_id(&self, id: &str) -> std::result::Result<CveRecord, SourceError> {
        self.lookups.fetch_add(1, Ordering::Relaxed);
        let key = id.trim().to_uppercase();
        self.records
            .get(&key)
            .cloned()
            .ok_or(SourceError::NotFound(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_lookup_is_case_insensitive() {
        let source = InMemorySource::new().with("cve-2019-0001", CveRecord::new("a"));
        assert!(source.find_by_id("CVE-2019-0001").is_ok());
        assert!(matches!(source.find_by_id("CVE-2019-0002"), Err(SourceError::NotFound(_))));
        assert_eq!(source.lookup_count(), 2);
    }

    #[test]
    fn test_from_json_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"CVE-2018-1000": {{"publishedDate": "2018-02-01T10:00Z", "cve": {{"description": {{"description_data": [{{"value": "d"}}]}}}}}}}}"#
        )
        .unwrap();

        let source = InMemorySource::from_json_file(file.path()).unwrap();
        assert_eq!(source.len(), 1);
        let record = source.find_by_id("CVE-2018-1000").unwrap();
        assert_eq!(record.description(), Some("d"));
    }
}
