//! Feature Layout - Dataset-derived feature schema
//!
//! **This file controls the feature schema**
//!
//! A schema is an ordered list of unique, lower-cased feature names:
//! keywords, then CAPEC ids, then CWE ids (each block sorted), then the
//! synthetic numeric features. The same schema must be used for training and
//! prediction; its CRC32 hash travels with persisted models to catch mismatches.

use std::collections::{BTreeSet, HashMap};
use crc32fast::Hasher;
use serde::{Deserialize, Serialize};

use crate::logic::dataset::{distinct_vulnerabilities, VulnerabilityEvent};
use crate::logic::error::Error;

// ============================================================================
// SCHEMA VERSION
// ============================================================================

/// Bumped whenever the meaning of schema positions changes
pub const SCHEMA_VERSION: u8 = 1;

// ============================================================================
// SYNTHETIC FEATURES
// ============================================================================

/// CVSS v3 exploitability sub-score
pub const CVSS_EXPLOITABILITY: &str = "__cvss_expl";
/// Number of references on the record
pub const REFERENCE_COUNT: &str = "__ref_number";
/// Whole days between publication and observation
pub const DAYS_SINCE_PUBLISHED: &str = "__days_diff";

pub const SYNTHETIC_FEATURES: [&str; 3] = [CVSS_EXPLOITABILITY, REFERENCE_COUNT, DAYS_SINCE_PUBLISHED];

pub fn is_synthetic(name: &str) -> bool {
    SYNTHETIC_FEATURES.contains(&name)
}

// ============================================================================
// FEATURE SCHEMA
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct FeatureSchema {
    names: Vec<String>,
    index: HashMap<String, usize>,
}

impl FeatureSchema {
    /// Lower-cases names and drops later duplicates
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut schema = Self::default();
        for name in names {
            let name = name.as_ref().to_lowercase();
            if !schema.index.contains_key(&name) {
                schema.index.insert(name.clone(), schema.names.len());
                schema.names.push(name);
            }
        }
        schema
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Position of a feature (case-insensitive)
    pub fn index_of(&self, name: &str) -> Option<usize> {
        match self.index.get(name) {
            Some(i) => Some(*i),
            None => self.index.get(&name.to_lowercase()).copied(),
        }
    }

    /// Keep the names whose mask entry is true
    pub fn filtered(&self, mask: &[bool]) -> Self {
        Self::new(
            self.names
                .iter()
                .zip(mask.iter())
                .filter(|(_, keep)| **keep)
                .map(|(name, _)| name),
        )
    }

    /// CRC32 over version and ordered names
    pub fn hash(&self) -> u32 {
        let mut hasher = Hasher::new();
        hasher.update(&[SCHEMA_VERSION]);
        for name in &self.names {
            hasher.update(name.as_bytes());
            hasher.update(&[0]);
        }
        hasher.finalize()
    }

    /// Check a stored hash against this schema
    pub fn validate(&self, expected_hash: u32) -> Result<(), Error> {
        let actual = self.hash();
        if actual != expected_hash {
            return Err(Error::SchemaMismatch {
                expected: expected_hash,
                actual,
            });
        }
        Ok(())
    }

    pub fn info(&self) -> SchemaInfo {
        SchemaInfo {
            version: SCHEMA_VERSION,
            hash: self.hash(),
            feature_count: self.len(),
            synthetic: self.names.iter().filter(|n| is_synthetic(n)).count(),
        }
    }
}

#[cfg(test)]
impl FeatureSchema {
    pub fn contains(&self, name: &str) -> bool {
        self.index_of(name).is_some()
    }
}

impl PartialEq for FeatureSchema {
    fn eq(&self, other: &Self) -> bool {
        self.names == other.names
    }
}

impl From<Vec<String>> for FeatureSchema {
    fn from(names: Vec<String>) -> Self {
        Self::new(names)
    }
}

impl From<FeatureSchema> for Vec<String> {
    fn from(schema: FeatureSchema) -> Self {
        schema.names
    }
}

/// Summary for logging
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaInfo {
    pub version: u8,
    pub hash: u32,
    pub feature_count: usize,
    pub synthetic: usize,
}

// ============================================================================
// SCHEMA BUILDER
// ============================================================================

#[derive(Debug, Clone, Copy)]
pub struct SchemaOptions {
    /// Append `__cvss_expl`, `__ref_number`, `__days_diff`
    pub include_base_features: bool,
    /// Add CWE ids after the CAPEC block
    pub include_cwe: bool,
}

impl Default for SchemaOptions {
    fn default() -> Self {
        Self {
            include_base_features: true,
            include_cwe: true,
        }
    }
}

/// Full candidate vocabulary of a dataset, in deterministic order
pub fn build_schema(events: &[VulnerabilityEvent], options: SchemaOptions) -> FeatureSchema {
    let mut keywords = BTreeSet::new();
    let mut capec = BTreeSet::new();
    let mut cwe = BTreeSet::new();

    for vuln in distinct_vulnerabilities(events) {
        keywords.extend(vuln.keywords.iter().map(|k| k.to_lowercase()));
        capec.extend(vuln.capec_ids().map(str::to_lowercase));
        if options.include_cwe {
            cwe.extend(vuln.cwe.iter().map(|c| c.to_lowercase()));
        }
    }

    let synthetic: &[&str] = if options.include_base_features {
        &SYNTHETIC_FEATURES
    } else {
        &[]
    };

    let schema = FeatureSchema::new(
        keywords
            .iter()
            .chain(capec.iter())
            .chain(cwe.iter())
            .map(String::as_str)
            .chain(synthetic.iter().copied()),
    );

    log::debug!(
        "Built schema: {} keywords, {} CAPEC, {} CWE, {} synthetic (hash {:08x})",
        keywords.len(),
        capec.len(),
        cwe.len(),
        synthetic.len(),
        schema.hash()
    );
    schema
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_dedup_case_insensitive() {
        let schema = FeatureSchema::new(["Heap Overflow", "heap overflow", "100"]);
        assert_eq!(schema.names(), &["heap overflow".to_string(), "100".to_string()]);
        assert_eq!(schema.index_of("HEAP OVERFLOW"), Some(0));
        assert_eq!(schema.index_of("missing"), None);
    }

    #[test]
    fn test_hash_consistency() {
        let a = FeatureSchema::new(["a", "b"]);
        let b = FeatureSchema::new(["a", "b"]);
        let c = FeatureSchema::new(["b", "a"]);
        assert_eq!(a.hash(), b.hash());
        assert_ne!(a.hash(), c.hash());
        assert_ne!(a.hash(), 0);
    }

    #[test]
    fn test_validate() {
        let schema = FeatureSchema::new(["a", CVSS_EXPLOITABILITY]);
        assert!(schema.validate(schema.hash()).is_ok());
        assert!(matches!(
            schema.validate(schema.hash() ^ 1),
            Err(Error::SchemaMismatch { .. })
        ));
    }

    #[test]
    fn test_filtered() {
        let schema = FeatureSchema::new(["a", "b", "c"]);
        let kept = schema.filtered(&[true, false, true]);
        assert_eq!(kept.names(), &["a".to_string(), "c".to_string()]);
        assert_eq!(kept.index_of("c"), Some(1));
    }

    #[test]
    fn test_serde_rebuilds_index() {
        let schema = FeatureSchema::new(["x", "y"]);
        let json = serde_json::to_string(&schema).unwrap();
        assert_eq!(json, r#"["x","y"]"#);
        let back: FeatureSchema = serde_json::from_str(&json).unwrap();
        assert_eq!(back, schema);
        assert_eq!(back.index_of("y"), Some(1));
    }

    #[test]
    fn test_info() {
        let schema = FeatureSchema::new(["kw", CVSS_EXPLOITABILITY, REFERENCE_COUNT]);
        let info = schema.info();
        assert_eq!(info.version, SCHEMA_VERSION);
        assert_eq!(info.feature_count, 3);
        assert_eq!(info.synthetic, 2);
    }
}
