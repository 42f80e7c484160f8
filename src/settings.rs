use std::{fs, path::Path, time::Duration};

use anyhow::{bail, Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};

use crate::models::DEFAULT_DURATION_SECS;

pub const DEFAULT_STORAGE_KEY: &str = "calm-focus-storage";
/// Cloudflare's family resolver answers `0.0.0.0` for malware and adult sites.
pub const DEFAULT_RESOLVER_URL: &str = "https://family.cloudflare-dns.com/dns-query";

const DEBUG_ENV: &str = "CALMFOCUS_DEBUG";
const RESOLVER_ENV: &str = "CALMFOCUS_RESOLVER";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct FocusConfig {
    /// Key the engine record is stored under.
    pub storage_key: String,
    /// Duration selected on first launch.
    pub default_duration_secs: u64,
    pub tick_interval_ms: u64,
    pub resolver_url: String,
    pub lookup_timeout_secs: u64,
    /// Hostname substrings blocked without asking the resolver.
    pub deny_keywords: Vec<String>,
    /// Verbose countdown logging.
    pub debug: bool,
}

impl Default for FocusConfig {
    fn default() -> Self {
        Self {
            storage_key: DEFAULT_STORAGE_KEY.into(),
            default_duration_secs: DEFAULT_DURATION_SECS,
            tick_interval_ms: 1000,
            resolver_url: DEFAULT_RESOLVER_URL.into(),
            lookup_timeout_secs: 5,
            deny_keywords: vec!["porn".into(), "xxx".into()],
            debug: false,
        }
    }
}

impl FocusConfig {
    /// Loads the config file at `path`, then applies environment overrides.
    ///
    /// A missing file yields defaults. A file that fails to parse is logged and
    /// also yields defaults; only an unreadable file or an invalid result is an
    /// error.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                warn!("Ignoring malformed config {}: {err}", path.display());
                FocusConfig::default()
            })
        } else {
            FocusConfig::default()
        };

        config.apply_env_overrides(|name| std::env::var(name).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let serialized = serde_json::to_string_pretty(self)?;
        fs::write(path, serialized)
            .with_context(|| format!("Failed to write config to {}", path.display()))
    }

    pub fn validate(&self) -> Result<()> {
        if self.storage_key.trim().is_empty() {
            bail!("storageKey must not be empty");
        }
        if self.default_duration_secs == 0 {
            bail!("defaultDurationSecs must be greater than zero");
        }
        if self.tick_interval_ms == 0 {
            bail!("tickIntervalMs must be greater than zero");
        }
        if self.lookup_timeout_secs == 0 {
            bail!("lookupTimeoutSecs must be greater than zero");
        }

        let endpoint = url::Url::parse(&self.resolver_url)
            .with_context(|| format!("invalid resolverUrl '{}'", self.resolver_url))?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            bail!("resolverUrl must use http or https");
        }
        Ok(())
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn lookup_timeout(&self) -> Duration {
        Duration::from_secs(self.lookup_timeout_secs)
    }

    fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(value) = lookup(DEBUG_ENV) {
            self.debug = value == "1" || value.eq_ignore_ascii_case("true");
        }
        if let Some(resolver) = lookup(RESOLVER_ENV).filter(|value| !value.trim().is_empty()) {
            self.resolver_url = resolver;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = FocusConfig::load(&dir.path().join("absent.json")).unwrap();
        // environment may flip debug on a developer machine
        config.debug = false;
        config.resolver_url = DEFAULT_RESOLVER_URL.into();
        assert_eq!(config, FocusConfig::default());
    }

    #[test]
    fn partial_file_keeps_remaining_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "defaultDurationSecs": 600, "denyKeywords": ["casino"] }"#)
            .unwrap();

        let config = FocusConfig::load(&path).unwrap();
        assert_eq!(config.default_duration_secs, 600);
        assert_eq!(config.deny_keywords, vec!["casino".to_string()]);
        assert_eq!(config.tick_interval_ms, 1000);
    }

    #[test]
    fn malformed_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "not json").unwrap();

        let config = FocusConfig::load(&path).unwrap();
        assert_eq!(config.storage_key, DEFAULT_STORAGE_KEY);
    }

    #[test]
    fn save_then_load_preserves_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let config = FocusConfig {
            lookup_timeout_secs: 2,
            ..FocusConfig::default()
        };
        config.save(&path).unwrap();

        let loaded = FocusConfig::load(&path).unwrap();
        assert_eq!(loaded.lookup_timeout_secs, 2);
    }

    #[test]
    fn validation_rejects_zero_intervals_and_bad_endpoints() {
        let zero_tick = FocusConfig {
            tick_interval_ms: 0,
            ..FocusConfig::default()
        };
        assert!(zero_tick.validate().is_err());

        let ftp = FocusConfig {
            resolver_url: "ftp://resolver.example".into(),
            ..FocusConfig::default()
        };
        assert!(ftp.validate().is_err());

        let garbage = FocusConfig {
            resolver_url: "not a url".into(),
            ..FocusConfig::default()
        };
        assert!(garbage.validate().is_err());
    }

    #[test]
    fn env_overrides_apply() {
        let mut config = FocusConfig::default();
        config.apply_env_overrides(|name| match name {
            DEBUG_ENV => Some("TRUE".into()),
            RESOLVER_ENV => Some("https://dns.example/dns-query".into()),
            _ => None,
        });
        assert!(config.debug);
        assert_eq!(config.resolver_url, "https://dns.example/dns-query");
    }
}
