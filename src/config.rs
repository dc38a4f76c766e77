use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

const ENV_CONFIG: &str = "TRIAGE_CONFIG";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Locations of the prompt and inbox files
    #[serde(default)]
    pub paths: PathsConfig,
    /// Model endpoint settings
    #[serde(default)]
    pub ai: AiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "default_prompts_path")]
    pub prompts: PathBuf,
    #[serde(default = "default_inbox_path")]
    pub inbox: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            prompts: default_prompts_path(),
            inbox: default_inbox_path(),
        }
    }
}

/// Language model settings (any OpenAI-compatible chat completions endpoint)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    /// API key. Environment variables and the keyring are consulted too.
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Maximum tokens for summaries, drafts, extraction and chat answers
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Automatic re-sends after a rate-limit response (at most 1 is honored)
    #[serde(default = "default_rate_limit_retries")]
    pub rate_limit_retries: u32,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: default_endpoint(),
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout_secs(),
            rate_limit_retries: default_rate_limit_retries(),
        }
    }
}

fn default_prompts_path() -> PathBuf {
    PathBuf::from("data/prompts.json")
}

fn default_inbox_path() -> PathBuf {
    PathBuf::from("data/mock_inbox.json")
}

fn default_endpoint() -> String {
    "https://api.openai.com/v1/chat/completions".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    1000
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_rate_limit_retries() -> u32 {
    1
}

impl Config {
    pub fn config_dir() -> Result<PathBuf> {
        let dir = dirs::config_dir()
            .context("Could not find config directory")?
            .join("triage");
        Ok(dir)
    }

    /// `$TRIAGE_CONFIG` if set, otherwise `<config dir>/triage/config.toml`
    pub fn config_path() -> Result<PathBuf> {
        match env::var_os(ENV_CONFIG) {
            Some(path) => Ok(PathBuf::from(path)),
            None => Ok(Self::config_dir()?.join("config.toml")),
        }
    }

    /// Load the config file. A missing file means "all defaults".
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if !path.exists() {
            tracing::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
            [paths]
            prompts = "/tmp/p.json"
            inbox = "/tmp/i.json"

            [ai]
            api_key = "sk-test"
            endpoint = "http://localhost:8080/v1/chat/completions"
            model = "local-model"
            temperature = 0.2
            max_tokens = 256
            timeout_secs = 5
            rate_limit_retries = 0
        "#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.paths.prompts, PathBuf::from("/tmp/p.json"));
        assert_eq!(config.paths.inbox, PathBuf::from("/tmp/i.json"));
        assert_eq!(config.ai.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.ai.model, "local-model");
        assert_eq!(config.ai.max_tokens, 256);
        assert_eq!(config.ai.timeout_secs, 5);
        assert_eq!(config.ai.rate_limit_retries, 0);
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.paths.prompts, default_prompts_path());
        assert_eq!(config.paths.inbox, default_inbox_path());
        assert_eq!(config.ai.model, "gpt-4o-mini");
        assert_eq!(config.ai.rate_limit_retries, 1);
        assert!(config.ai.api_key.is_none());
    }

    #[test]
    fn test_partial_ai_section() {
        let config: Config = toml::from_str("[ai]\nmodel = \"gpt-4o\"").unwrap();
        assert_eq!(config.ai.model, "gpt-4o");
        assert_eq!(config.ai.endpoint, default_endpoint());
        assert_eq!(config.ai.timeout_secs, 60);
    }

    #[test]
    fn test_load_from_reports_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[ai\nmodel = 1").unwrap();
        let err = Config::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }
}
