//! Vulnerability Record Builder
//!
//! Turns a raw data-source record into the canonical `Vulnerability`.
//! CAPEC and CWE blocks are optional; the CVSS v3 exploitability score and
//! vector are required and their absence fails the whole build.

use std::collections::BTreeSet;

use super::record::{CapecEntry, Vulnerability};
use crate::logic::error::{Error, Result};
use crate::logic::external_intel::{CveRecord, CveSource};
use crate::logic::keywords::KeywordExtractor;

/// Per-category switches and an optional fixed target
#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    pub skip_keywords: bool,
    pub skip_capec: bool,
    pub skip_cwe: bool,
    pub target: Option<f64>,
}

/// Fetch `id` from `source` and build its record
pub fn fetch_vulnerability<S: CveSource + ?Sized>(
    id: &str,
    source: &S,
    extractor: &KeywordExtractor,
    options: &BuildOptions,
) -> Result<Vulnerability> {
    let record = source
        .find_by_id(id)
        .map_err(|e| Error::lookup(id, e.to_string()))?;
    build_vulnerability(id, &record, extractor, options)
}

/// Build from an already fetched record
pub fn build_vulnerability(
    id: &str,
    record: &CveRecord,
    extractor: &KeywordExtractor,
    options: &BuildOptions,
) -> Result<Vulnerability> {
    let exploitability_score = record
        .exploitability_score()
        .ok_or_else(|| Error::lookup(id, "missing CVSS v3 exploitability score"))?;
    let cvss_vector = record
        .cvss_vector()
        .ok_or_else(|| Error::lookup(id, "missing CVSS v3 vector"))?
        .to_string();
    let published_date = record
        .published()
        .ok_or_else(|| Error::lookup(id, "missing or unparseable publication date"))?;

    let keywords: BTreeSet<String> = if options.skip_keywords {
        BTreeSet::new()
    } else {
        match record.description() {
            Some(text) => extractor.extract(text).into_iter().collect(),
            None => {
                log::debug!("{} has no description, no keywords extracted", id);
                BTreeSet::new()
            }
        }
    };

    let capec = if options.skip_capec {
        Vec::new()
    } else {
        record
            .capec_entries()
            .into_iter()
            .map(|(id, name)| CapecEntry { id, name })
            .collect()
    };

    let cwe = if options.skip_cwe {
        BTreeSet::new()
    } else {
        record.weakness_ids().into_iter().collect()
    };

    Ok(Vulnerability {
        id: id.to_string(),
        keywords,
        capec,
        cwe,
        exploitability_score,
        cvss_vector,
        references_number: record.reference_count(),
        published_date,
        history: record.history.clone(),
        target: options.target,
    })
}
