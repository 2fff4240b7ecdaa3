//! Configuration types and loading
//!
//! File layer with a fallback chain (`.triad.yml`, then
//! `~/.config/triad/triad.yml`, then defaults), with the environment
//! variables from the CLI contract applied on top. Secrets only ever come
//! from the environment.

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Read the first set variable out of a preference list
fn env_first(names: &[&str]) -> Option<String> {
    names.iter().find_map(|name| std::env::var(name).ok()).filter(|v| !v.is_empty())
}

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// LLM endpoint configuration
    pub llm: LlmConfig,

    /// Executor limits
    pub executor: ExecutorConfig,

    /// Monitoring sidecar attachment
    pub monitoring: MonitoringConfig,
}

impl Config {
    /// Load configuration with fallback chain, then env overrides
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        let mut config = Self::load_file_layer(config_path)?;
        config.apply_env();
        Ok(config)
    }

    fn load_file_layer(config_path: Option<&PathBuf>) -> Result<Self> {
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        let local_config = PathBuf::from(".triad.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("triad").join("triad.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;
        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;
        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    /// Apply environment overrides from the CLI contract
    fn apply_env(&mut self) {
        if let Some(endpoint) = env_first(&["ENDPOINT", "AZURE_ENDPOINT_URL"]) {
            self.llm.endpoint = Some(endpoint);
        }
        if let Some(model) = env_first(&["MODEL", "AZURE_MODEL"]) {
            self.llm.model = Some(model);
        }
        if let Some(api_version) = env_first(&["API_VERSION"]) {
            self.llm.api_version = Some(api_version);
        }
        if let Some(port) = env_first(&["MONITORING_PORT"]).and_then(|p| p.parse().ok()) {
            self.monitoring.port = port;
        }
        if env_first(&["ENABLE_MONITORING"]).is_some_and(|v| v == "true") {
            self.monitoring.enabled = true;
        }
    }
}

/// LLM endpoint configuration
///
/// The API key is never stored here; [`LlmConfig::api_key`] reads it from
/// the environment each time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Chat-completion endpoint base URL
    pub endpoint: Option<String>,

    /// Model or deployment name
    pub model: Option<String>,

    /// API version; set for Azure-flavored endpoints
    #[serde(rename = "api-version")]
    pub api_version: Option<String>,

    /// Maximum tokens per response
    #[serde(rename = "max-tokens")]
    pub max_tokens: u32,

    /// Request timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,

    /// Total attempts per call (first try included)
    #[serde(rename = "max-retries")]
    pub max_retries: u32,

    /// Initial retry backoff in milliseconds
    #[serde(rename = "backoff-base-ms")]
    pub backoff_base_ms: u64,

    /// Retry backoff ceiling in milliseconds
    #[serde(rename = "backoff-cap-ms")]
    pub backoff_cap_ms: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            model: None,
            api_version: None,
            max_tokens: 8192,
            timeout_ms: 120_000,
            max_retries: 3,
            backoff_base_ms: 1_000,
            backoff_cap_ms: 8_000,
        }
    }
}

impl LlmConfig {
    /// API key from `API_KEY` or `AZURE_API_KEY`
    pub fn api_key(&self) -> Option<String> {
        env_first(&["API_KEY", "AZURE_API_KEY"])
    }

    /// Endpoint base URL, env winning over file
    pub fn endpoint(&self) -> Option<String> {
        env_first(&["ENDPOINT", "AZURE_ENDPOINT_URL"]).or_else(|| self.endpoint.clone())
    }

    /// Model name; vendor default when unset anywhere
    pub fn model(&self) -> String {
        env_first(&["MODEL", "AZURE_MODEL"])
            .or_else(|| self.model.clone())
            .unwrap_or_else(|| "gpt-4o".to_string())
    }

    /// API version, when the endpoint is Azure-flavored
    pub fn api_version(&self) -> Option<String> {
        env_first(&["API_VERSION"]).or_else(|| self.api_version.clone())
    }
}

/// Executor limits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Per-tool execution deadline in milliseconds
    #[serde(rename = "tool-timeout-ms")]
    pub tool_timeout_ms: u64,

    /// Dependency poll interval in milliseconds
    #[serde(rename = "dependency-poll-ms")]
    pub dependency_poll_ms: u64,

    /// Output-token cap for generated file content
    #[serde(rename = "content-max-tokens")]
    pub content_max_tokens: u32,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            tool_timeout_ms: 30_000,
            dependency_poll_ms: 100,
            content_max_tokens: 16_384,
        }
    }
}

/// Monitoring sidecar attachment; the core only emits on the event bus
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringConfig {
    /// Whether a sidecar should be attached at startup
    pub enabled: bool,

    /// Port the sidecar listens on
    pub port: u16,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: 4000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        for name in [
            "API_KEY",
            "AZURE_API_KEY",
            "ENDPOINT",
            "AZURE_ENDPOINT_URL",
            "MODEL",
            "AZURE_MODEL",
            "API_VERSION",
            "ENABLE_MONITORING",
            "MONITORING_PORT",
        ] {
            unsafe { std::env::remove_var(name) };
        }
    }

    #[test]
    #[serial]
    fn test_defaults() {
        clear_env();
        let config = Config::default();
        assert_eq!(config.llm.timeout_ms, 120_000);
        assert_eq!(config.llm.max_retries, 3);
        assert_eq!(config.llm.backoff_base_ms, 1_000);
        assert_eq!(config.llm.backoff_cap_ms, 8_000);
        assert_eq!(config.executor.tool_timeout_ms, 30_000);
        assert_eq!(config.monitoring.port, 4000);
        assert!(!config.monitoring.enabled);
    }

    #[test]
    #[serial]
    fn test_env_precedence_over_file_values() {
        clear_env();
        let mut config = Config::default();
        config.llm.endpoint = Some("https://file.example.com".to_string());
        config.llm.model = Some("file-model".to_string());

        unsafe {
            std::env::set_var("ENDPOINT", "https://env.example.com");
            std::env::set_var("AZURE_MODEL", "env-model");
        }
        assert_eq!(config.llm.endpoint().as_deref(), Some("https://env.example.com"));
        assert_eq!(config.llm.model(), "env-model");
        clear_env();

        assert_eq!(config.llm.endpoint().as_deref(), Some("https://file.example.com"));
        assert_eq!(config.llm.model(), "file-model");
    }

    #[test]
    #[serial]
    fn test_api_key_fallback_chain() {
        clear_env();
        let config = LlmConfig::default();
        assert!(config.api_key().is_none());

        unsafe { std::env::set_var("AZURE_API_KEY", "azure-secret") };
        assert_eq!(config.api_key().as_deref(), Some("azure-secret"));

        unsafe { std::env::set_var("API_KEY", "primary-secret") };
        assert_eq!(config.api_key().as_deref(), Some("primary-secret"));
        clear_env();
    }

    #[test]
    #[serial]
    fn test_yaml_parse() {
        clear_env();
        let yaml = r#"
llm:
  endpoint: "https://example.com"
  model: "gpt-4o-mini"
  timeout-ms: 60000
executor:
  tool-timeout-ms: 15000
monitoring:
  enabled: true
  port: 4321
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.llm.endpoint.as_deref(), Some("https://example.com"));
        assert_eq!(config.llm.timeout_ms, 60_000);
        assert_eq!(config.executor.tool_timeout_ms, 15_000);
        assert!(config.monitoring.enabled);
        assert_eq!(config.monitoring.port, 4321);
    }

    #[test]
    #[serial]
    fn test_monitoring_env_toggle() {
        clear_env();
        let mut config = Config::default();
        unsafe {
            std::env::set_var("ENABLE_MONITORING", "true");
            std::env::set_var("MONITORING_PORT", "5005");
        }
        config.apply_env();
        assert!(config.monitoring.enabled);
        assert_eq!(config.monitoring.port, 5005);
        clear_env();
    }
}
