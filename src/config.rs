use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::metrics::EvaluationConfig;
use crate::orchestration::OptimizerConfig;
use crate::{tlog_debug, Error, Result};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Connection settings for the chat and embedding provider.
///
/// Models have no defaults; they must come from the config file or the
/// environment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub base_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chat_model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding_model: Option<String>,
    pub temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            chat_model: None,
            embedding_model: None,
            temperature: 0.2,
            timeout_secs: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub provider: ProviderConfig,
    pub evaluation: EvaluationConfig,
    pub optimization: OptimizerConfig,
}

impl Config {
    pub fn tdq_dir() -> Result<PathBuf> {
        Ok(dirs::home_dir().ok_or(Error::NoHomeDir)?.join(".tdq"))
    }

    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::tdq_dir()?.join("tdq.toml"))
    }

    /// Load `~/.tdq/tdq.toml` (defaults if absent), then apply environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::config_path()?)?;
        config.apply_env_with(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load a config file without environment overrides.
    pub fn load_from(path: &Path) -> Result<Self> {
        tlog_debug!("Config::load path={}", path.display());
        if !path.exists() {
            tlog_debug!("Config file not found, using defaults");
            return Ok(Self::default());
        }
        let config: Self = toml::from_str(&fs::read_to_string(path)?)?;
        config.validate()?;
        tlog_debug!(
            "Config loaded: base_url={}, chat_model={:?}, embedding_model={:?}, target={}, max_iterations={}",
            config.provider.base_url,
            config.provider.chat_model,
            config.provider.embedding_model,
            config.optimization.target_score,
            config.optimization.max_iterations
        );
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            if !dir.exists() {
                fs::create_dir_all(dir)?;
            }
        }
        fs::write(path, toml::to_string_pretty(self)?)?;
        tlog_debug!("Config saved to {}", path.display());
        Ok(())
    }

    /// Override provider settings from environment-style lookups.
    ///
    /// `TDQ_API_KEY` wins over `OPENAI_API_KEY`.
    pub fn apply_env_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup("TDQ_API_KEY").or_else(|| lookup("OPENAI_API_KEY")) {
            self.provider.api_key = Some(key);
        }
        if let Some(url) = lookup("TDQ_BASE_URL") {
            self.provider.base_url = url;
        }
        if let Some(model) = lookup("TDQ_CHAT_MODEL") {
            self.provider.chat_model = Some(model);
        }
        if let Some(model) = lookup("TDQ_EMBEDDING_MODEL") {
            self.provider.embedding_model = Some(model);
        }
    }

    /// Reject values no evaluation could use.
    pub fn validate(&self) -> Result<()> {
        let eval = &self.evaluation;
        let weights = eval.weights.as_array();
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(Error::Validation(
                "evaluation weights must be non-negative".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&eval.redundancy_threshold) {
            return Err(Error::Validation(format!(
                "redundancy_threshold must be within [0, 1], got {}",
                eval.redundancy_threshold
            )));
        }
        if !(eval.effort.min_hours > 0.0 && eval.effort.min_hours <= eval.effort.max_hours) {
            return Err(Error::Validation(format!(
                "effort range must satisfy 0 < min <= max, got [{}, {}]",
                eval.effort.min_hours, eval.effort.max_hours
            )));
        }
        if self.optimization.max_iterations == 0 {
            return Err(Error::Validation(
                "max_iterations must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
