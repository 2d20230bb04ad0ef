use crate::error::Result;
use serde::Deserialize;
use std::path::Path;

/// Environment variable overriding `backendUrl`
pub const BACKEND_ENV: &str = "FLOW_INSPECTOR_BACKEND";

/// Application configuration
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    /// Base URL of the device backend
    pub backend_url: String,

    /// Periodic hierarchy refresh interval (ms)
    pub hierarchy_refresh_ms: u64,

    /// Timeout for non-streaming backend requests (ms)
    pub request_timeout_ms: u64,

    /// Offer the class name as a locator
    pub include_class_locator: bool,

    /// Action written by auto-insert
    pub default_action: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend_url: "http://localhost:8000".to_string(),
            hierarchy_refresh_ms: 2000,
            request_timeout_ms: 30000,
            include_class_locator: false,
            default_action: "tapOn".to_string(),
        }
    }
}

impl Config {
    pub fn from_yaml(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    /// Load from an optional file, then apply the environment override
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_yaml(&std::fs::read_to_string(path)?)?,
            None => Self::default(),
        };
        config.apply_env(std::env::var(BACKEND_ENV).ok());
        Ok(config)
    }

    fn apply_env(&mut self, backend: Option<String>) {
        if let Some(url) = backend.filter(|u| !u.trim().is_empty()) {
            self.backend_url = url.trim().to_string();
        }
    }

    /// Backend URL without a trailing slash
    pub fn base_url(&self) -> &str {
        self.backend_url.trim_end_matches('/')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.backend_url, "http://localhost:8000");
        assert_eq!(config.hierarchy_refresh_ms, 2000);
        assert!(!config.include_class_locator);
        assert_eq!(config.default_action, "tapOn");
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = Config::from_yaml("backendUrl: http://10.0.0.5:9000/\nincludeClassLocator: true\n").unwrap();
        assert_eq!(config.base_url(), "http://10.0.0.5:9000");
        assert!(config.include_class_locator);
        assert_eq!(config.request_timeout_ms, 30000);
    }

    #[test]
    fn test_empty_yaml_is_default() {
        assert_eq!(Config::from_yaml("").unwrap(), Config::default());
    }

    #[test]
    fn test_invalid_yaml_is_config_error() {
        let err = Config::from_yaml("hierarchyRefreshMs: soon").unwrap_err();
        assert!(matches!(err, crate::error::InspectorError::Config(_)));
    }

    #[test]
    fn test_env_override() {
        let mut config = Config::default();
        config.apply_env(Some(" http://device-host:8000 ".into()));
        assert_eq!(config.backend_url, "http://device-host:8000");
        config.apply_env(Some("".into()));
        assert_eq!(config.backend_url, "http://device-host:8000");
    }
}
