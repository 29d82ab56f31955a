//! Application configuration
//!
//! Loaded from YAML and then overridden by environment variables.

use action_flow::ExecutionConfig;
use agent_core::OpenAiConfig;
use anyhow::{Context, Result};
use cdp_adapter::CdpConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Model provider settings
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    /// Keys tried in order; the next one is used after HTTP 429
    pub api_keys: Vec<String>,
    pub model: String,
    pub vision_model: Option<String>,
    pub api_base: String,
    pub temperature: f32,
    pub timeout_secs: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        let defaults = OpenAiConfig::default();
        Self {
            api_keys: Vec::new(),
            model: defaults.model,
            vision_model: None,
            api_base: defaults.api_base,
            temperature: defaults.temperature,
            timeout_secs: defaults.timeout.as_secs(),
        }
    }
}

impl LlmSettings {
    pub fn to_provider_config(&self) -> OpenAiConfig {
        OpenAiConfig {
            api_keys: self.api_keys.clone(),
            model: self.model.clone(),
            vision_model: self.vision_model.clone(),
            api_base: self.api_base.clone(),
            temperature: self.temperature,
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }
}

/// Top-level configuration file
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub llm: LlmSettings,
    pub browser: CdpConfig,
    pub execution: ExecutionConfig,
    /// Log level used when `RUST_LOG` is unset
    pub log_level: Option<String>,
}

impl AppConfig {
    /// Parse YAML text
    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).context("Failed to parse config file")
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(&self.redacted()).context("Failed to render config")
    }

    /// Copy with API keys masked
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        copy.llm.api_keys = copy
            .llm
            .api_keys
            .iter()
            .map(|key| mask_key(key))
            .collect();
        copy
    }

    /// Apply environment overrides through `lookup`
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let env_keys: Vec<String> = ["SUREFOOT_API_KEY", "OPENAI_API_KEY"]
            .iter()
            .filter_map(|name| non_empty(name))
            .flat_map(|raw| {
                raw.split(',')
                    .map(|key| key.trim().to_string())
                    .filter(|key| !key.is_empty())
                    .collect::<Vec<_>>()
            })
            .collect();
        if !env_keys.is_empty() {
            self.llm.api_keys = env_keys;
        }
        if let Some(model) = non_empty("SUREFOOT_MODEL") {
            self.llm.model = model.trim().to_string();
        }
        if let Some(base) = non_empty("SUREFOOT_API_BASE") {
            self.llm.api_base = base.trim().to_string();
        }
        if let Some(headless) = non_empty("SUREFOOT_HEADLESS") {
            let lower = headless.trim().to_ascii_lowercase();
            self.browser.headless = !matches!(lower.as_str(), "0" | "false" | "no" | "off");
        }
    }

    pub fn has_api_key(&self) -> bool {
        !self.llm.api_keys.is_empty()
    }
}

fn mask_key(key: &str) -> String {
    let visible: String = key.chars().take(4).collect();
    format!("{visible}****")
}

/// Candidate config paths in lookup order
pub fn config_candidates(explicit: Option<&Path>) -> Vec<PathBuf> {
    if let Some(path) = explicit {
        return vec![path.to_path_buf()];
    }
    let mut candidates = vec![PathBuf::from("config/surefoot.yaml")];
    if let Some(mut path) = dirs::config_dir() {
        path.push("surefoot");
        path.push("config.yaml");
        candidates.push(path);
    }
    candidates
}

/// Load the first existing config file, falling back to defaults, then apply the environment.
///
/// An explicit path that does not exist is an error.
pub async fn load_config(explicit: Option<&Path>) -> Result<AppConfig> {
    let mut config = None;
    for path in config_candidates(explicit) {
        if !path.exists() {
            if explicit.is_some() {
                anyhow::bail!("Config file not found: {}", path.display());
            }
            continue;
        }
        let content = tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        config = Some(AppConfig::from_yaml(&content)?);
        info!("Loaded configuration from: {}", path.display());
        break;
    }
    let mut config = config.unwrap_or_else(|| {
        warn!("Config file not found, using defaults");
        AppConfig::default()
    });
    config.apply_env(|name| std::env::var(name).ok());
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_yaml_partial_config_uses_defaults() {
        let config = AppConfig::from_yaml(
            "llm:\n  model: local-model\nexecution:\n  max_retries: 2\nbrowser:\n  headless: false\n",
        )
        .unwrap();
        assert_eq!(config.llm.model, "local-model");
        assert_eq!(config.execution.max_retries, 2);
        assert_eq!(config.execution.quick_dismiss_key, "Escape");
        assert!(!config.browser.headless);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("OPENAI_API_KEY", "sk-a, sk-b"),
            ("SUREFOOT_MODEL", "gpt-test"),
            ("SUREFOOT_HEADLESS", "off"),
            ("SUREFOOT_API_BASE", "  "),
        ]);
        let mut config = AppConfig::default();
        config.apply_env(|name| env.get(name).map(|v| v.to_string()));

        assert_eq!(config.llm.api_keys, vec!["sk-a", "sk-b"]);
        assert_eq!(config.llm.model, "gpt-test");
        assert!(!config.browser.headless);
        assert_eq!(config.llm.api_base, LlmSettings::default().api_base);
    }

    #[test]
    fn test_api_keys_from_both_variables_in_order() {
        let mut config = AppConfig::default();
        config.apply_env(|name| match name {
            "SUREFOOT_API_KEY" => Some("sk-primary".into()),
            "OPENAI_API_KEY" => Some("sk-secondary".into()),
            _ => None,
        });
        assert_eq!(config.llm.api_keys, vec!["sk-primary", "sk-secondary"]);
    }

    #[test]
    fn test_redacted_masks_keys() {
        let mut config = AppConfig::default();
        config.llm.api_keys = vec!["sk-1234567".into()];
        let yaml = config.to_yaml().unwrap();
        assert!(yaml.contains("sk-1****"));
        assert!(!yaml.contains("sk-1234567"));
    }

    #[test]
    fn test_missing_explicit_config_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.yaml");
        tokio_test::assert_err!(tokio_test::block_on(load_config(Some(&missing))));
    }

    #[tokio::test]
    async fn test_explicit_config_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("surefoot.yaml");
        std::fs::write(&path, "execution:\n  autonomous_max_iterations: 3\n").unwrap();
        let config = load_config(Some(&path)).await.unwrap();
        assert_eq!(config.execution.autonomous_max_iterations, 3);
    }
}
