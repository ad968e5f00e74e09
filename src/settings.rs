use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::engine::DEFAULT_MAX_ITERATIONS;
use crate::error::{BurnwiseError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub data_dir: String,
    #[serde(default = "default_currency")]
    pub default_currency: String,
    /// Units of currency per USD. Always used instead of stored rates.
    #[serde(default = "default_fixed_rates")]
    pub fixed_rates: HashMap<String, f64>,
    #[serde(default = "default_rate_ttl_minutes")]
    pub rate_ttl_minutes: u64,
    #[serde(default = "default_max_catch_up_iterations")]
    pub max_catch_up_iterations: usize,
}

fn default_currency() -> String {
    "USD".to_string()
}

fn default_fixed_rates() -> HashMap<String, f64> {
    // AED is pegged
    HashMap::from([("AED".to_string(), 3.6725)])
}

fn default_rate_ttl_minutes() -> u64 {
    60
}

fn default_max_catch_up_iterations() -> usize {
    DEFAULT_MAX_ITERATIONS
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir().to_string_lossy().to_string(),
            default_currency: default_currency(),
            fixed_rates: default_fixed_rates(),
            rate_ttl_minutes: default_rate_ttl_minutes(),
            max_catch_up_iterations: default_max_catch_up_iterations(),
        }
    }
}

impl Settings {
    pub fn rate_ttl(&self) -> Duration {
        Duration::from_secs(self.rate_ttl_minutes * 60)
    }

    pub fn db_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join("burnwise.db")
    }
}

fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("burnwise")
}

fn settings_path() -> PathBuf {
    config_dir().join("settings.json")
}

fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".local")
        .join("share")
        .join("burnwise")
}

pub fn load_settings() -> Settings {
    let path = settings_path();
    if path.exists() {
        let content = std::fs::read_to_string(&path).unwrap_or_default();
        serde_json::from_str(&content).unwrap_or_else(|e| {
            log::warn!("ignoring unreadable {}: {e}", path.display());
            Settings::default()
        })
    } else {
        Settings::default()
    }
}

pub fn save_settings(settings: &Settings) -> Result<()> {
    let dir = config_dir();
    std::fs::create_dir_all(&dir)?;
    let json = serde_json::to_string_pretty(settings)
        .map_err(|e| BurnwiseError::Settings(e.to_string()))?;
    std::fs::write(settings_path(), format!("{json}\n"))?;
    Ok(())
}

pub fn shellexpand_path(path: &str) -> String {
    if path.starts_with('~') {
        if let Some(home) = dirs::home_dir() {
            return path.replacen('~', &home.to_string_lossy(), 1);
        }
    }
    std::fs::canonicalize(path)
        .unwrap_or_else(|_| PathBuf::from(path))
        .to_string_lossy()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let settings = Settings {
            data_dir: "/tmp/test".to_string(),
            default_currency: "EUR".to_string(),
            fixed_rates: HashMap::new(),
            rate_ttl_minutes: 5,
            max_catch_up_iterations: 250,
        };
        let json = serde_json::to_string_pretty(&settings).unwrap();
        std::fs::write(&path, &json).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        let loaded: Settings = serde_json::from_str(&content).unwrap();
        assert_eq!(loaded.default_currency, "EUR");
        assert_eq!(loaded.data_dir, "/tmp/test");
        assert!(loaded.fixed_rates.is_empty());
        assert_eq!(loaded.rate_ttl(), Duration::from_secs(300));
        assert_eq!(loaded.max_catch_up_iterations, 250);
    }

    #[test]
    fn test_defaults() {
        let s = Settings::default();
        assert_eq!(s.default_currency, "USD");
        assert_eq!(s.fixed_rates.get("AED"), Some(&3.6725));
        assert_eq!(s.max_catch_up_iterations, 10_000);
        assert!(s.db_path().ends_with("burnwise.db"));
    }

    #[test]
    fn test_load_merges_with_defaults() {
        let json = r#"{"data_dir": "/tmp/test", "rate_ttl_minutes": 15}"#;
        let s: Settings = serde_json::from_str(json).unwrap();
        assert_eq!(s.rate_ttl_minutes, 15);
        assert_eq!(s.default_currency, "USD");
        assert_eq!(s.max_catch_up_iterations, 10_000);
        assert!(s.fixed_rates.contains_key("AED"));
    }
}
