use std::env;

/// Application-level constants
pub const APP_NAME: &str = "vet-scheduling";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const API_URL_VAR: &str = "VET_SCHEDULING_API_URL";
pub const TIMEOUT_VAR: &str = "VET_SCHEDULING_TIMEOUT_SECS";
pub const TOKEN_VAR: &str = "VET_SCHEDULING_TOKEN";

const DEFAULT_API_URL: &str = "http://localhost:8080/internal/";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Log filter used when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "vet_scheduling=info,warn"
}

/// Where and how to reach the scheduling server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    pub bearer_token: Option<String>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.into(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            bearer_token: None,
        }
    }
}

impl BackendConfig {
    /// Read from the process environment, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Unparseable or empty values fall back to the default for that key.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let timeout_secs = match non_empty(TIMEOUT_VAR).map(|v| v.trim().parse::<u64>()) {
            Some(Ok(secs)) if secs > 0 => secs,
            Some(_) => {
                tracing::warn!(var = TIMEOUT_VAR, "Invalid timeout, using default");
                defaults.timeout_secs
            }
            None => defaults.timeout_secs,
        };

        Self {
            base_url: non_empty(API_URL_VAR).unwrap_or(defaults.base_url),
            timeout_secs,
            bearer_token: non_empty(TOKEN_VAR),
        }
    }
}
