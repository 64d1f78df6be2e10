//! Application configuration.
//!
//! Read from the JSON file named by `HABITAT_LENS_CONFIG`, else
//! `habitat-lens.json` in the working directory, else defaults. A few
//! environment variables override individual fields.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::data::model::{YearRange, check_month};

pub const CONFIG_ENV: &str = "HABITAT_LENS_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "habitat-lens.json";

const ENV_BACKEND_URL: &str = "HABITAT_LENS_BACKEND_URL";
const ENV_LOCATIONS: &str = "HABITAT_LENS_LOCATIONS";
const ENV_EVENTS: &str = "HABITAT_LENS_EVENTS";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Base URL of the backend serving `/api/predict` and `/api/parques`.
    #[serde(default = "default_backend_url")]
    pub backend_url: String,

    /// Location dataset: URL or file path. Defaults to the backend's parks endpoint.
    #[serde(default)]
    pub locations_source: Option<String>,

    /// Wildfire dataset (NDJSON): URL or file path.
    #[serde(default = "default_events_source")]
    pub events_source: String,

    /// Quiet period before a filter change reaches the map.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    #[serde(default = "default_year_min")]
    pub year_min: i32,

    #[serde(default = "default_year_max")]
    pub year_max: i32,

    #[serde(default = "default_year_max")]
    pub initial_year: i32,

    /// 0 = all months.
    #[serde(default)]
    pub initial_month: u32,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_backend_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_events_source() -> String {
    "data/fires_data.json".to_string()
}

fn default_debounce_ms() -> u64 {
    250
}

// Coverage of the wildfire dataset.
fn default_year_min() -> i32 {
    1992
}

fn default_year_max() -> i32 {
    2015
}

fn default_request_timeout_secs() -> u64 {
    60
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backend_url: default_backend_url(),
            locations_source: None,
            events_source: default_events_source(),
            debounce_ms: default_debounce_ms(),
            year_min: default_year_min(),
            year_max: default_year_max(),
            initial_year: default_year_max(),
            initial_month: 0,
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl AppConfig {
    /// Resolve the configuration for this process. Never fails: a broken
    /// config file is logged and the defaults are used instead.
    pub fn load() -> Self {
        let mut config = match config_path() {
            Some(path) => match Self::from_file(&path) {
                Ok(config) => {
                    log::info!("Loaded configuration from {}", path.display());
                    config
                }
                Err(e) => {
                    log::error!("Ignoring config file: {e:#}");
                    Self::default()
                }
            },
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        config
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
    }

    /// Apply environment overrides, looked up through `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(url) = non_empty(ENV_BACKEND_URL) {
            self.backend_url = url;
        }
        if let Some(src) = non_empty(ENV_LOCATIONS) {
            self.locations_source = Some(src);
        }
        if let Some(src) = non_empty(ENV_EVENTS) {
            self.events_source = src;
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.backend_url.trim_end_matches('/'))
    }

    pub fn predict_url(&self) -> String {
        self.endpoint("api/predict")
    }

    pub fn locations_source(&self) -> String {
        self.locations_source
            .clone()
            .unwrap_or_else(|| self.endpoint("api/parques"))
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn year_range(&self) -> YearRange {
        YearRange::new(self.year_min, self.year_max)
    }

    /// Initial year clamped into range; initial month falls back to "all".
    pub fn initial_filter(&self) -> (i32, u32) {
        let year = self.year_range().clamp(self.initial_year);
        let month = check_month(self.initial_month).unwrap_or_else(|e| {
            log::warn!("initial_month: {e}; using all months");
            0
        });
        (year, month)
    }
}

fn config_path() -> Option<PathBuf> {
    match std::env::var_os(CONFIG_ENV) {
        Some(p) => Some(PathBuf::from(p)),
        None => {
            let p = PathBuf::from(DEFAULT_CONFIG_FILE);
            p.exists().then_some(p)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.debounce(), Duration::from_millis(250));
        assert_eq!(config.year_range(), YearRange::new(1992, 2015));
        assert_eq!(config.initial_filter(), (2015, 0));
        assert_eq!(config.predict_url(), "http://localhost:8080/api/predict");
        assert_eq!(config.locations_source(), "http://localhost:8080/api/parques");
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("habitat-lens.json");
        std::fs::write(&path, r#"{ "backend_url": "http://ml:9000/", "debounce_ms": 100 }"#).unwrap();

        let config = AppConfig::from_file(&path).unwrap();
        assert_eq!(config.debounce_ms, 100);
        assert_eq!(config.predict_url(), "http://ml:9000/api/predict");
        assert_eq!(config.events_source, "data/fires_data.json");
        assert_eq!(config.year_max, 2015);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{ debounce_ms: ").unwrap();
        assert!(AppConfig::from_file(&path).is_err());
        assert!(AppConfig::from_file(&dir.path().join("absent.json")).is_err());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("HABITAT_LENS_BACKEND_URL", "https://habitat.example.org"),
            ("HABITAT_LENS_LOCATIONS", "data/parks.csv"),
            ("HABITAT_LENS_EVENTS", "  "),
        ]
        .into_iter()
        .collect();

        let mut config = AppConfig::default();
        config.apply_env(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(config.backend_url, "https://habitat.example.org");
        assert_eq!(config.locations_source(), "data/parks.csv");
        assert_eq!(config.events_source, "data/fires_data.json", "blank override ignored");
    }

    #[test]
    fn test_initial_filter_is_sanitised() {
        let config = AppConfig {
            initial_year: 1800,
            initial_month: 14,
            ..AppConfig::default()
        };
        assert_eq!(config.initial_filter(), (1992, 0));
    }
}
