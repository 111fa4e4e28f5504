use serde::Deserialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

use crate::agent::ContinuationPolicy;
use crate::model::SamplingConfig;

const DEFAULT_MODEL: &str = "qwen3:1.7b";
const DEFAULT_CONFIG_PATH: &str = "config/astrolabe.toml";
const ETHERSCAN_API_KEY_ENV: &str = "ETHERSCAN_API_KEY";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub model: String,
    pub system_prompt: Option<String>,
    pub thinking: bool,
    pub max_tool_steps: usize,
    pub continuation: ContinuationPolicy,
    /// Deadline in seconds for each generation call and tool invocation;
    /// absent means no deadline.
    pub step_timeout_secs: Option<u64>,
    pub sampling: SamplingConfig,
    pub etherscan: EtherscanConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EtherscanConfig {
    pub api_url: String,
    pub api_key: String,
}

impl Default for EtherscanConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.etherscan.io/api".to_string(),
            api_key: String::new(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config from {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse config from {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Deserialize, Default)]
struct RawConfig {
    model: Option<String>,
    system_prompt: Option<String>,
    thinking: Option<bool>,
    max_tool_steps: Option<usize>,
    continuation: Option<ContinuationPolicy>,
    step_timeout_secs: Option<u64>,
    sampling: Option<SamplingConfig>,
    etherscan: Option<EtherscanConfig>,
}

impl AppConfig {
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = path {
            read_config(path)?
        } else {
            let default_path = Path::new(DEFAULT_CONFIG_PATH);
            match read_config(default_path) {
                Ok(config) => config,
                Err(ConfigError::Io { source, .. }) if source.kind() == io::ErrorKind::NotFound => {
                    info!("Configuration file not found; using defaults");
                    Self::default()
                }
                Err(other) => return Err(other),
            }
        };
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn default() -> Self {
        RawConfig::default().into()
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(key) = std::env::var(ETHERSCAN_API_KEY_ENV) {
            if !key.trim().is_empty() {
                debug!("Overriding Etherscan API key from environment");
                self.etherscan.api_key = key;
            }
        }
    }
}

impl From<RawConfig> for AppConfig {
    fn from(raw: RawConfig) -> Self {
        Self {
            model: raw.model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            system_prompt: raw.system_prompt,
            thinking: raw.thinking.unwrap_or(false),
            max_tool_steps: raw
                .max_tool_steps
                .unwrap_or(crate::agent::DEFAULT_MAX_STEPS),
            continuation: raw.continuation.unwrap_or_default(),
            step_timeout_secs: raw.step_timeout_secs,
            sampling: raw.sampling.unwrap_or_default(),
            etherscan: raw.etherscan.unwrap_or_default(),
        }
    }
}

fn read_config(path: &Path) -> Result<AppConfig, ConfigError> {
    debug!(path = %path.display(), "Reading client configuration file");
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let parsed: RawConfig = toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(parsed.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_nothing_is_set() {
        let config = AppConfig::default();
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.max_tool_steps, crate::agent::DEFAULT_MAX_STEPS);
        assert_eq!(config.continuation, ContinuationPolicy::Direct);
        assert!(!config.thinking);
        assert!(config.etherscan.api_key.is_empty());
    }

    #[test]
    fn parses_full_configuration() {
        let raw: RawConfig = toml::from_str(
            r#"
model = "qwen3:8b"
system_prompt = "Answer tersely."
thinking = true
max_tool_steps = 4
continuation = "summarize"

[sampling]
temperature = 0.2

[etherscan]
api_key = "key123"
"#,
        )
        .unwrap();
        let config: AppConfig = raw.into();
        assert_eq!(config.model, "qwen3:8b");
        assert_eq!(config.system_prompt.as_deref(), Some("Answer tersely."));
        assert!(config.thinking);
        assert_eq!(config.max_tool_steps, 4);
        assert_eq!(config.continuation, ContinuationPolicy::Summarize);
        assert_eq!(config.sampling.temperature, 0.2);
        // Unspecified sampling fields keep their defaults.
        assert_eq!(config.sampling.top_k, 20);
        assert_eq!(config.etherscan.api_key, "key123");
        assert_eq!(config.etherscan.api_url, "https://api.etherscan.io/api");
    }
}
