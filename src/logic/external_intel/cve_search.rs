//! cve-search API client
//!
//! Blocking lookups against a cve-search compatible endpoint (`{base}/cve/{id}`).
//! Responses are cached in-process so repeated ids cost one request.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use parking_lot::RwLock;

use super::types::CveRecord;
use super::CveSource;
use crate::logic::config::PipelineConfig;
use crate::logic::error::SourceError;

pub struct CveSearchClient {
    agent: ureq::Agent,
    base_url: String,
    cache: RwLock<HashMap<String, CveRecord>>,
    requests: AtomicU64,
}

impl CveSearchClient {
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(timeout)
            .user_agent(&format!("{}/{}", crate::constants::APP_NAME, crate::constants::APP_VERSION))
            .build();

        Self {
            agent,
            base_url: base_url.trim_end_matches('/').to_string(),
            cache: RwLock::new(HashMap::new()),
            requests: AtomicU64::new(0),
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(&config.cve_api_url, Duration::from_secs(config.http_timeout_secs))
    }

    fn fetch(&self, key: &str) -> Result<CveRecord, SourceError> {
        let url = format!("{}/cve/{}", self.base_url, key);
        let sent = self.requests.fetch_add(1, Ordering::Relaxed) + 1;
        log::debug!("GET {} (request {})", url, sent);

        match self.agent.get(&url).call() {
            Ok(resp) => {
                let body = resp
                    .into_string()
                    .map_err(|e| SourceError::Network(e.to_string()))?;
                parse_body(key, &body)
            }
            Err(ureq::Error::Status(404, _)) => Err(SourceError::NotFound(key.to_string())),
            Err(ureq::Error::Status(status, _)) => Err(SourceError::Status { status }),
            Err(e) => Err(SourceError::Network(e.to_string())),
        }
    }
}

impl CveSource for CveSearchClient {
    fn find_by_id(&self, id: &str) -> Result<CveRecord, SourceError> {
        let key = id.trim().to_uppercase();

        if let Some(hit) = self.cache.read().get(&key) {
            return Ok(hit.clone());
        }

        let record = self.fetch(&key)?;
        self.cache.write().insert(key, record.clone());
        Ok(record)
    }
}

/// cve-search answers unknown ids with `null` (or `{}`) and a 200
fn parse_body(id: &str, body: &str) -> Result<CveRecord, SourceError> {
    let value: serde_json::Value =
        serde_json::from_str(body).map_err(|e| SourceError::Parse(e.to_string()))?;

    let empty = match &value {
        serde_json::Value::Null => true,
        serde_json::Value::Object(map) => map.is_empty(),
        _ => false,
    };
    if empty {
        return Err(SourceError::NotFound(id.to_string()));
    }

    serde_json::from_value(value).map_err(|e| SourceError::Parse(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_body_null_is_not_found() {
        assert!(matches!(parse_body("CVE-1", "null"), Err(SourceError::NotFound(_))));
        assert!(matches!(parse_body("CVE-1", "{}"), Err(SourceError::NotFound(_))));
    }

    #[test]
    fn test_parse_body_garbage() {
        assert!(matches!(parse_body("CVE-1", "<html>"), Err(SourceError::Parse(_))));
    }

    #[test]
    fn test_parse_body_record() {
        let body = r#"{"publishedDate": "2017-01-01T00:00Z", "cve": {"description": {"description_data": [{"value": "x"}]}}}"#;
        let record = parse_body("CVE-1", body).unwrap();
        assert_eq!(record.description(), Some("x"));
    }

    #[test]
    fn test_client_trims_base_url() {
        let client = CveSearchClient::new("https://cve.example.org/api/", Duration::from_secs(1));
        assert_eq!(client.base_url, "https://cve.example.org/api");
        assert_eq!(client.requests.load(Ordering::Relaxed), 0);
        assert!(client.cache.read().is_empty());
    }
}
