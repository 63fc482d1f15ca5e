//! Service configuration loading and types.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use darkness_common::DatasetSources;

/// Runtime configuration of the darkness service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Locators of the average and mask composites.
    pub sources: DatasetSources,

    /// Directory that `classpath:` locators are resolved against.
    pub resource_dir: PathBuf,

    /// Default admission limits for guarded operations.
    pub rate_limit: RateLimitConfig,
}

/// Default admission limits, overridable per guarded operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Requests admitted per window.
    pub requests: u32,

    /// Window length in seconds.
    pub duration_seconds: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests: default_requests(),
            duration_seconds: default_duration_seconds(),
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            sources: DatasetSources::default(),
            resource_dir: PathBuf::from("resources"),
            rate_limit: RateLimitConfig::default(),
        }
    }
}

impl ServiceConfig {
    /// Build configuration from process environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build configuration from a variable lookup, starting from defaults.
    ///
    /// Recognised variables: `VIIRS_AVERAGE_URL`, `VIIRS_MASK_URL`,
    /// `RESOURCE_DIR`, `RATELIMIT_REQUESTS`, `RATELIMIT_DURATION_SECONDS`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup("VIIRS_AVERAGE_URL") {
            config.sources.average = url;
        }
        if let Some(url) = lookup("VIIRS_MASK_URL") {
            config.sources.mask = url;
        }
        if let Some(dir) = lookup("RESOURCE_DIR") {
            config.resource_dir = PathBuf::from(dir);
        }
        if let Some(value) = lookup("RATELIMIT_REQUESTS") {
            config.rate_limit.requests = value
                .trim()
                .parse()
                .with_context(|| format!("Invalid RATELIMIT_REQUESTS: {}", value))?;
        }
        if let Some(value) = lookup("RATELIMIT_DURATION_SECONDS") {
            config.rate_limit.duration_seconds = value
                .trim()
                .parse()
                .with_context(|| format!("Invalid RATELIMIT_DURATION_SECONDS: {}", value))?;
        }

        Ok(config)
    }

    /// Load configuration from a YAML file.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read: {:?}", path))?;
        let config = Self::from_yaml(&content)
            .with_context(|| format!("Failed to parse: {:?}", path))?;

        tracing::info!(
            path = %path.display(),
            average = %config.sources.average,
            mask = %config.sources.mask,
            "Loaded service config"
        );
        Ok(config)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }
}

fn default_requests() -> u32 {
    50
}
fn default_duration_seconds() -> u64 {
    60
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ServiceConfig::default();
        assert_eq!(config.rate_limit.requests, 50);
        assert_eq!(config.rate_limit.duration_seconds, 60);
        assert_eq!(config.sources.average, "classpath:/viirs/2023/average.tif");
        assert_eq!(config.sources.mask, "classpath:/viirs/2023/mask.tif");
    }

    #[test]
    fn test_from_lookup_overrides() {
        let config = ServiceConfig::from_lookup(lookup_from(&[
            ("VIIRS_AVERAGE_URL", "https://data.example.org/average.tif"),
            ("RESOURCE_DIR", "/srv/darkness"),
            ("RATELIMIT_REQUESTS", "5"),
            ("RATELIMIT_DURATION_SECONDS", " 10 "),
        ]))
        .unwrap();

        assert_eq!(config.sources.average, "https://data.example.org/average.tif");
        assert_eq!(config.sources.mask, "classpath:/viirs/2023/mask.tif");
        assert_eq!(config.resource_dir, PathBuf::from("/srv/darkness"));
        assert_eq!(config.rate_limit, RateLimitConfig { requests: 5, duration_seconds: 10 });
    }

    #[test]
    fn test_from_lookup_rejects_bad_numbers() {
        let err = ServiceConfig::from_lookup(lookup_from(&[("RATELIMIT_REQUESTS", "many")]))
            .unwrap_err();
        assert!(err.to_string().contains("RATELIMIT_REQUESTS"));
    }

    #[test]
    fn test_config_yaml_parsing() {
        let yaml = r#"
sources:
  average: file:///data/viirs/average.tif
  mask: file:///data/viirs/mask.tif
rate_limit:
  requests: 100
"#;

        let config = ServiceConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.sources.average, "file:///data/viirs/average.tif");
        assert_eq!(config.rate_limit.requests, 100);
        assert_eq!(config.rate_limit.duration_seconds, 60);
        assert_eq!(config.resource_dir, PathBuf::from("resources"));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("darkness.yaml");
        std::fs::write(&path, "resource_dir: /opt/darkness\n").unwrap();

        let config = ServiceConfig::load_from_file(&path).unwrap();
        assert_eq!(config.resource_dir, PathBuf::from("/opt/darkness"));
        assert!(ServiceConfig::load_from_file(&dir.path().join("missing.yaml")).is_err());
    }
}
