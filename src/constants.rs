//! Central Configuration Constants
//!
//! Single source of truth for all pipeline defaults.
//! Every value can be overridden from the environment (see `logic::config`).

/// Vulnerabilities published fewer days ago than this are dropped at load time
pub const DEFAULT_MIN_AGE_DAYS: i64 = 365;

/// Trailing window (days, inclusive) used by the target function
pub const DEFAULT_TARGET_WINDOW_DAYS: i64 = 31;

/// Datasets smaller than this trigger a diagnostic after loading
pub const DEFAULT_MIN_DATASET_SIZE: usize = 10;

/// Default cve-search compatible API
pub const DEFAULT_CVE_API_URL: &str = "https://cve.circl.lu/api";

/// Default HTTP timeout for data-source lookups (seconds)
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// App version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// App name
pub const APP_NAME: &str = "exploitcast";

/// Extension appended to persisted models
pub const MODEL_EXTENSION: &str = "model.json";

// ============================================
// Helper functions to read from env with fallback
// ============================================

/// Get minimum vulnerability age (days) from environment or use default
pub fn get_min_age_days() -> i64 {
    std::env::var("EXPLOITCAST_MIN_AGE_DAYS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(DEFAULT_MIN_AGE_DAYS)
}

/// Get target window (days) from environment or use default
pub fn get_target_window_days() -> i64 {
    std::env::var("EXPLOITCAST_TARGET_WINDOW_DAYS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(DEFAULT_TARGET_WINDOW_DAYS)
}

/// Get the dataset size below which a warning is logged
pub fn get_min_dataset_size() -> usize {
    std::env::var("EXPLOITCAST_MIN_DATASET_SIZE")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(DEFAULT_MIN_DATASET_SIZE)
}

/// Get CVE API base URL from environment or use default
pub fn get_cve_api_url() -> String {
    std::env::var("CVE_API_URL")
        .unwrap_or_else(|_| DEFAULT_CVE_API_URL.to_string())
}

/// Get HTTP timeout from environment or use default
pub fn get_http_timeout_secs() -> u64 {
    std::env::var("EXPLOITCAST_HTTP_TIMEOUT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS)
}

/// Directory holding `stopwords.txt` and `exceptions.csv`.
/// `EXPLOITCAST_DATA_DIR` wins; otherwise `<config dir>/exploitcast` if both files exist there.
pub fn get_data_dir() -> Option<std::path::PathBuf> {
    std::env::var("EXPLOITCAST_DATA_DIR")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .map(std::path::PathBuf::from)
        .or_else(|| {
            dirs::config_dir()
                .map(|dir| dir.join(APP_NAME))
                .filter(|dir| dir.join("stopwords.txt").is_file() && dir.join("exceptions.csv").is_file())
        })
}
