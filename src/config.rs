use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::env;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::signal::{DEFAULT_LONG_ENTRY_Z, DEFAULT_SHORT_ENTRY_Z};
use crate::spread_window::{LookbackMode, DEFAULT_SPREAD_WINDOW};

const DEFAULT_OBSERVE_ONLY: bool = false;

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
struct TraderYaml {
    spread_window: Option<usize>,
    short_entry_z: Option<f64>,
    long_entry_z: Option<f64>,
    lookback_mode: Option<LookbackMode>,
    observe_only: Option<bool>,
    event_file: Option<String>,
    command_file: Option<String>,
    status_file: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TraderConfig {
    pub spread_window: usize,
    pub short_entry_z: f64,
    pub long_entry_z: f64,
    pub lookback_mode: LookbackMode,
    // Signals are evaluated and logged, nothing is sent
    pub observe_only: bool,
    // Recorded venue events, one JSON object per line; stdin when unset
    pub event_file: Option<String>,
    // Outbound commands as JSON lines; stdout when unset
    pub command_file: Option<String>,
    pub status_file: Option<String>,
}

impl Default for TraderConfig {
    fn default() -> Self {
        Self {
            spread_window: DEFAULT_SPREAD_WINDOW,
            short_entry_z: DEFAULT_SHORT_ENTRY_Z,
            long_entry_z: DEFAULT_LONG_ENTRY_Z,
            lookback_mode: LookbackMode::default(),
            observe_only: DEFAULT_OBSERVE_ONLY,
            event_file: None,
            command_file: None,
            status_file: None,
        }
    }
}

impl TraderConfig {
    pub fn from_env_or_yaml() -> Result<Self> {
        let config_path = env::var("AUTOTRADER_CONFIG_PATH")
            .ok()
            .filter(|value| !value.trim().is_empty());
        if let Some(path) = config_path {
            return Self::from_yaml_path(path);
        }
        Self::from_env()
    }

    pub fn from_yaml_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();
        let file = File::open(path_ref)
            .with_context(|| format!("failed to open autotrader config {}", path_ref.display()))?;
        let mut cfg = Self::from_yaml_reader(file)
            .with_context(|| format!("failed to parse autotrader config {}", path_ref.display()))?;
        cfg.apply_env_overrides();
        cfg.validate()?;
        Ok(cfg)
    }

    /// Parses YAML only; environment overrides are not applied.
    pub fn from_yaml_reader<R: Read>(mut reader: R) -> Result<Self> {
        let mut raw = String::new();
        reader.read_to_string(&mut raw)?;
        let yaml: TraderYaml = if raw.trim().is_empty() {
            TraderYaml::default()
        } else {
            serde_yaml::from_str(&raw)?
        };
        let cfg = TraderConfig {
            spread_window: yaml.spread_window.unwrap_or(DEFAULT_SPREAD_WINDOW),
            short_entry_z: yaml.short_entry_z.unwrap_or(DEFAULT_SHORT_ENTRY_Z),
            long_entry_z: yaml.long_entry_z.unwrap_or(DEFAULT_LONG_ENTRY_Z),
            lookback_mode: yaml.lookback_mode.unwrap_or_default(),
            observe_only: yaml.observe_only.unwrap_or(DEFAULT_OBSERVE_ONLY),
            event_file: yaml.event_file,
            command_file: yaml.command_file,
            status_file: yaml.status_file,
        };
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_env() -> Result<Self> {
        let mut cfg = Self::default();
        cfg.apply_env_overrides();
        cfg.validate()?;
        Ok(cfg)
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| env::var(key).ok());
    }

    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(value) = get("SPREAD_WINDOW") {
            match value.trim().parse() {
                Ok(v) => self.spread_window = v,
                Err(_) => log::warn!("[CONFIG] ignoring SPREAD_WINDOW={}", value),
            }
        }
        if let Some(value) = get("SHORT_ENTRY_Z") {
            match value.trim().parse() {
                Ok(v) => self.short_entry_z = v,
                Err(_) => log::warn!("[CONFIG] ignoring SHORT_ENTRY_Z={}", value),
            }
        }
        if let Some(value) = get("LONG_ENTRY_Z") {
            match value.trim().parse() {
                Ok(v) => self.long_entry_z = v,
                Err(_) => log::warn!("[CONFIG] ignoring LONG_ENTRY_Z={}", value),
            }
        }
        if let Some(value) = get("LOOKBACK_MODE") {
            match value.parse() {
                Ok(v) => self.lookback_mode = v,
                Err(e) => log::warn!("[CONFIG] {}", e),
            }
        }
        if let Some(value) = get("OBSERVE_ONLY") {
            let v = value.trim().to_ascii_lowercase();
            self.observe_only = v == "1" || v == "true" || v == "yes";
        }
        if let Some(value) = get("EVENT_FILE") {
            self.event_file = Some(value.trim().to_string());
        }
        if let Some(value) = get("COMMAND_FILE") {
            self.command_file = Some(value.trim().to_string());
        }
        if let Some(value) = get("STATUS_FILE") {
            self.status_file = Some(value.trim().to_string());
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.spread_window < 2 {
            return Err(anyhow!(
                "spread_window must be at least 2 (got {})",
                self.spread_window
            ));
        }
        if !self.short_entry_z.is_finite() || !self.long_entry_z.is_finite() {
            return Err(anyhow!(
                "entry thresholds must be finite (short={}, long={})",
                self.short_entry_z,
                self.long_entry_z
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn empty_yaml_uses_venue_defaults() {
        let cfg = TraderConfig::from_yaml_reader("".as_bytes()).unwrap();
        assert_eq!(cfg, TraderConfig::default());
        assert_eq!(cfg.spread_window, 50);
        assert_eq!(cfg.short_entry_z, 1.5);
        assert_eq!(cfg.long_entry_z, 0.95);
        assert_eq!(cfg.lookback_mode, LookbackMode::Legacy);
    }

    #[test]
    fn yaml_fields_are_read() {
        let raw = "spread_window: 20\nlookback_mode: trailing\nobserve_only: true\nevent_file: events.jsonl\n";
        let cfg = TraderConfig::from_yaml_reader(raw.as_bytes()).unwrap();
        assert_eq!(cfg.spread_window, 20);
        assert_eq!(cfg.lookback_mode, LookbackMode::Trailing);
        assert!(cfg.observe_only);
        assert_eq!(cfg.event_file.as_deref(), Some("events.jsonl"));
    }

    #[test]
    fn yaml_rejects_tiny_window() {
        let err = TraderConfig::from_yaml_reader("spread_window: 1\n".as_bytes()).unwrap_err();
        assert!(err.to_string().contains("spread_window"));
    }

    #[test]
    fn yaml_file_is_loaded_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "short_entry_z: 2.25").unwrap();
        let cfg = TraderConfig::from_yaml_reader(File::open(file.path()).unwrap()).unwrap();
        assert_eq!(cfg.short_entry_z, 2.25);
        assert!(TraderConfig::from_yaml_path("/nonexistent/autotrader.yaml").is_err());
    }

    #[test]
    fn overrides_win_and_bad_values_are_ignored() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("SPREAD_WINDOW", "30"),
            ("LONG_ENTRY_Z", "not-a-number"),
            ("LOOKBACK_MODE", "TRAILING"),
            ("OBSERVE_ONLY", "yes"),
            ("STATUS_FILE", " status.json "),
        ]);
        let mut cfg = TraderConfig::default();
        cfg.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));
        assert_eq!(cfg.spread_window, 30);
        assert_eq!(cfg.long_entry_z, DEFAULT_LONG_ENTRY_Z);
        assert_eq!(cfg.lookback_mode, LookbackMode::Trailing);
        assert!(cfg.observe_only);
        assert_eq!(cfg.status_file.as_deref(), Some("status.json"));
    }
}
