//! Pipeline configuration
//!
//! Windows and thresholds used by loading and target computation.
//! `Default` reproduces the built-in constants; `from_env` layers environment
//! overrides (and a `.env` file, if any) on top.

use std::path::PathBuf;
use chrono::Duration;

use crate::constants;

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Vulnerabilities younger than this (days) are skipped at load time
    pub min_age_days: i64,

    /// Trailing window (days) for the target function
    pub target_window_days: i64,

    /// Loaded datasets below this size trigger a warning
    pub min_dataset_size: usize,

    /// Base URL of the cve-search compatible API
    pub cve_api_url: String,

    /// HTTP timeout in seconds
    pub http_timeout_secs: u64,

    /// Directory with `stopwords.txt` / `exceptions.csv` (built-ins if None)
    pub data_dir: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            min_age_days: constants::DEFAULT_MIN_AGE_DAYS,
            target_window_days: constants::DEFAULT_TARGET_WINDOW_DAYS,
            min_dataset_size: constants::DEFAULT_MIN_DATASET_SIZE,
            cve_api_url: constants::DEFAULT_CVE_API_URL.to_string(),
            http_timeout_secs: constants::DEFAULT_HTTP_TIMEOUT_SECS,
            data_dir: None,
        }
    }
}

impl PipelineConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        if dotenvy::dotenv().is_ok() {
            log::debug!("Loaded .env file");
        }

        Self {
            min_age_days: constants::get_min_age_days(),
            target_window_days: constants::get_target_window_days(),
            min_dataset_size: constants::get_min_dataset_size(),
            cve_api_url: constants::get_cve_api_url(),
            http_timeout_secs: constants::get_http_timeout_secs(),
            data_dir: constants::get_data_dir(),
        }
    }

    pub fn target_window(&self) -> Duration {
        Duration::days(self.target_window_days)
    }
}
