//! CVE Record Types
//!
//! Typed mirror of the legacy NVD JSON layout served by cve-search style APIs.
//! Every nested block is optional; accessors return `Option` instead of failing
//! on a missing key.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::logic::time::parse_published;

// ============================================================================
// RAW RECORD
// ============================================================================

/// Raw vulnerability record as returned by the data source
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CveRecord {
    #[serde(default)]
    pub cve: Option<CveBody>,

    /// CAPEC attack patterns (absent for many records)
    #[serde(default)]
    pub capec: Option<Vec<CapecRef>>,

    #[serde(default)]
    pub impact: Option<Impact>,

    #[serde(rename = "publishedDate", default)]
    pub published_date: Option<String>,

    /// Provenance blob, passed through untouched
    #[serde(default)]
    pub history: serde_json::Value,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CveBody {
    #[serde(default)]
    pub description: Option<DescriptionBlock>,
    #[serde(default)]
    pub problemtype: Option<ProblemType>,
    #[serde(default)]
    pub references: Option<References>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DescriptionBlock {
    #[serde(default)]
    pub description_data: Vec<LangString>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LangString {
    #[serde(default)]
    pub lang: Option<String>,
    #[serde(default)]
    pub value: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProblemType {
    #[serde(default)]
    pub problemtype_data: Vec<ProblemTypeEntry>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProblemTypeEntry {
    #[serde(default)]
    pub description: Vec<LangString>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct References {
    #[serde(default)]
    pub reference_data: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapecRef {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Impact {
    #[serde(rename = "baseMetricV3", default)]
    pub base_metric_v3: Option<BaseMetricV3>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BaseMetricV3 {
    #[serde(rename = "exploitabilityScore", default)]
    pub exploitability_score: Option<f64>,
    #[serde(rename = "cvssV3", default)]
    pub cvss_v3: Option<CvssV3>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CvssV3 {
    #[serde(rename = "vectorString", default)]
    pub vector_string: Option<String>,
}

/// CAPEC ids show up both as `"63"` and `63` depending on the backend
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!("unexpected CAPEC id: {}", other))),
    }
}

// ============================================================================
// ACCESSORS
// ============================================================================

impl CveRecord {
    /// Primary (first) description text
    pub fn description(&self) -> Option<&str> {
        self.cve
            .as_ref()?
            .description
            .as_ref()?
            .description_data
            .first()
            .map(|d| d.value.as_str())
    }

    /// CAPEC (id, name) pairs; empty when the block is absent
    pub fn capec_entries(&self) -> Vec<(String, String)> {
        self.capec
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(|c| (c.id.clone(), c.name.clone()))
            .collect()
    }

    /// Weakness descriptions prefixed with "CWE"
    pub fn weakness_ids(&self) -> Vec<String> {
        let Some(problems) = self.cve.as_ref().and_then(|c| c.problemtype.as_ref()) else {
            return Vec::new();
        };

        problems
            .problemtype_data
            .iter()
            .flat_map(|p| p.description.iter())
            .filter(|d| d.value.starts_with("CWE"))
            .map(|d| d.value.clone())
            .collect()
    }

    pub fn exploitability_score(&self) -> Option<f64> {
        self.impact.as_ref()?.base_metric_v3.as_ref()?.exploitability_score
    }

    pub fn cvss_vector(&self) -> Option<&str> {
        self.impact
            .as_ref()?
            .base_metric_v3
            .as_ref()?
            .cvss_v3
            .as_ref()?
            .vector_string
            .as_deref()
    }

    pub fn reference_count(&self) -> usize {
        self.cve
            .as_ref()
            .and_then(|c| c.references.as_ref())
            .map(|r| r.reference_data.len())
            .unwrap_or(0)
    }

    /// Parsed publication date (UTC)
    pub fn published(&self) -> Option<DateTime<Utc>> {
        self.published_date.as_deref().and_then(parse_published)
    }
}

// ============================================================================
// BUILDER (fixtures)
// ============================================================================

#[cfg(test)]
impl CveRecord {
    pub fn new(description: &str) -> Self {
        Self {
            cve: Some(CveBody {
                description: Some(DescriptionBlock {
                    description_data: vec![LangString {
                        lang: Some("en".to_string()),
                        value: description.to_string(),
                    }],
                }),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    pub fn with_cvss(mut self, exploitability_score: f64, vector: &str) -> Self {
        self.impact = Some(Impact {
            base_metric_v3: Some(BaseMetricV3 {
                exploitability_score: Some(exploitability_score),
                cvss_v3: Some(CvssV3 {
                    vector_string: Some(vector.to_string()),
                }),
            }),
        });
        self
    }

    pub fn with_published(mut self, date: &str) -> Self {
        self.published_date = Some(date.to_string());
        self
    }

    pub fn with_capec(mut self, id: &str, name: &str) -> Self {
        self.capec.get_or_insert_with(Vec::new).push(CapecRef {
            id: id.to_string(),
            name: name.to_string(),
        });
        self
    }

    pub fn with_weakness(mut self, value: &str) -> Self {
        let body = self.cve.get_or_insert_with(CveBody::default);
        let problems = body.problemtype.get_or_insert_with(ProblemType::default);
        if problems.problemtype_data.is_empty() {
            problems.problemtype_data.push(ProblemTypeEntry::default());
        }
        problems.problemtype_data[0].description.push(LangString {
            lang: Some("en".to_string()),
            value: value.to_string(),
        });
        self
    }

    pub fn with_references(mut self, count: usize) -> Self {
        let body = self.cve.get_or_insert_with(CveBody::default);
        body.references = Some(References {
            reference_data: (0..count)
                .map(|i| serde_json::json!({ "url": format!("https://example.org/ref/{}", i) }))
                .collect(),
        });
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NVD_SAMPLE: &str = r#"{
        "cve": {
            "description": {"description_data": [{"lang": "en", "value": "Buffer overflow in the parser."}]},
            "problemtype": {"problemtype_data": [{"description": [
                {"lang": "en", "value": "CWE-787"},
                {"lang": "en", "value": "NVD-CWE-noinfo"}
            ]}]},
            "references": {"reference_data": [{"url": "a"}, {"url": "b"}, {"url": "c"}]}
        },
        "capec": [{"id": "100", "name": "Overflow Buffers"}, {"id": 8, "name": "Buffer Overflow in an API Call"}],
        "impact": {"baseMetricV3": {"exploitabilityScore": 3.9, "cvssV3": {"vectorString": "CVSS:3.1/AV:N/AC:L/PR:N/UI:N/S:U/C:H/I:H/A:H"}}},
        "publishedDate": "2019-03-21T16:01Z",
        "history": [{"seen": "2019-03-22"}]
    }"#;

    #[test]
    fn test_parse_full_record() {
        let record: CveRecord = serde_json::from_str(NVD_SAMPLE).unwrap();
        assert_eq!(record.description(), Some("Buffer overflow in the parser."));
        assert_eq!(record.weakness_ids(), vec!["CWE-787".to_string()]);
        assert_eq!(record.reference_count(), 3);
        assert_eq!(record.exploitability_score(), Some(3.9));
        assert!(record.cvss_vector().unwrap().starts_with("CVSS:3.1"));
        assert_eq!(
            record.capec_entries(),
            vec![
                ("100".to_string(), "Overflow Buffers".to_string()),
                ("8".to_string(), "Buffer Overflow in an API Call".to_string()),
            ]
        );
        assert!(record.published().is_some());
        assert!(record.history.is_array());
    }

    #[test]
    fn test_missing_blocks_are_none() {
        let record: CveRecord = serde_json::from_str(r#"{"publishedDate": "2019-03-21T16:01Z"}"#).unwrap();
        assert_eq!(record.description(), None);
        assert!(record.capec_entries().is_empty());
        assert!(record.weakness_ids().is_empty());
        assert_eq!(record.exploitability_score(), None);
        assert_eq!(record.cvss_vector(), None);
        assert_eq!(record.reference_count(), 0);
    }

    #[test]
    fn test_builder() {
        let record = CveRecord::new("desc")
            .with_cvss(2.8, "CVSS:3.0/AV:L")
            .with_capec("63", "XSS")
            .with_weakness("CWE-79")
            .with_references(2)
            .with_published("2018-01-01T00:00Z");

        assert_eq!(record.description(), Some("desc"));
        assert_eq!(record.exploitability_score(), Some(2.8));
        assert_eq!(record.weakness_ids(), vec!["CWE-79".to_string()]);
        assert_eq!(record.reference_count(), 2);
        assert_eq!(record.capec_entries().len(), 1);
    }
}
