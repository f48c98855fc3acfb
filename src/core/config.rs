//! Engine configuration with documented constants
//!
//! All tunables are collected here with explanations of their purpose.
//! Configuration is constructed by the hosting process and injected; there
//! is no global instance.

use crate::core::error::{Result, SimError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration for the round engine and its provider calls
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    // === RETRY POLICY ===
    /// Attempts per provider call before the failure is propagated
    ///
    /// Applies to roster generation, enrichment, actor decisions and the
    /// world update. Exhausting the budget converts the last error into a
    /// DecisionError / ResolutionError for the caller.
    pub max_attempts: u32,

    /// Delay between attempts for per-actor calls (milliseconds)
    pub decision_retry_delay_ms: u64,

    /// Delay between attempts for the round-level world update (milliseconds)
    ///
    /// Longer than the per-actor delay: the world update is the expensive call
    /// and a failure there aborts the whole round.
    pub world_retry_delay_ms: u64,

    // === ROUND PROCESSING ===
    /// Maximum number of actor decision calls in flight at once
    pub decision_concurrency: usize,

    /// Ask the decision provider for actors lacking a due action
    ///
    /// When false, rounds only resolve actions that were scheduled explicitly.
    pub gather_decisions: bool,

    // === PROVIDER OUTPUT LIMITS ===
    /// Maximum length of an action description (characters)
    pub max_action_chars: usize,

    /// Maximum length of an inter-actor message (characters)
    pub max_message_chars: usize,

    // === STORAGE ===
    /// Directory holding one JSON document per simulation
    pub store_dir: PathBuf,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            // Retry (3 attempts, 1s / 2s apart)
            max_attempts: 3,
            decision_retry_delay_ms: 1000,
            world_retry_delay_ms: 2000,

            // Rounds
            decision_concurrency: 4,
            gather_decisions: true,

            // Limits
            max_action_chars: 100,
            max_message_chars: 200,

            store_dir: PathBuf::from("./simulations"),
        }
    }
}

impl EngineConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a config from a TOML file; missing keys take their defaults
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| SimError::Config(format!("invalid config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn decision_retry_delay(&self) -> Duration {
        Duration::from_millis(self.decision_retry_delay_ms)
    }

    pub fn world_retry_delay(&self) -> Duration {
        Duration::from_millis(self.world_retry_delay_ms)
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(SimError::Config("max_attempts must be at least 1".into()));
        }

        if self.decision_concurrency == 0 {
            return Err(SimError::Config(
                "decision_concurrency must be at least 1".into(),
            ));
        }

        if self.max_action_chars == 0 || self.max_message_chars == 0 {
            return Err(SimError::Config("text limits must be positive".into()));
        }

        Ok(())
    }
}

/// Provider role, used to pick a model per kind of call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderRole {
    Roster,
    Enrichment,
    Decision,
    World,
}

/// Connection settings for the LLM-backed providers
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: String,
    pub api_url: String,
    /// Fallback model for any role without an override
    pub model: String,
    pub roster_model: Option<String>,
    pub enrichment_model: Option<String>,
    pub decision_model: Option<String>,
    pub world_model: Option<String>,
}

impl LlmConfig {
    /// Read settings from environment variables
    ///
    /// Required: LLM_API_KEY
    /// Optional: LLM_API_URL (defaults to Anthropic API), LLM_MODEL,
    /// LLM_ROSTER_MODEL, LLM_ENRICHMENT_MODEL, LLM_DECISION_MODEL, LLM_WORLD_MODEL
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("LLM_API_KEY")
            .map_err(|_| SimError::Config("LLM_API_KEY not set".into()))?;
        let api_url = std::env::var("LLM_API_URL")
            .unwrap_or_else(|_| "https://api.anthropic.com/v1/messages".into());
        let model =
            std::env::var("LLM_MODEL").unwrap_or_else(|_| "claude-3-haiku-20240307".into());

        Ok(Self {
            api_key,
            api_url,
            model,
            roster_model: std::env::var("LLM_ROSTER_MODEL").ok(),
            enrichment_model: std::env::var("LLM_ENRICHMENT_MODEL").ok(),
            decision_model: std::env::var("LLM_DECISION_MODEL").ok(),
            world_model: std::env::var("LLM_WORLD_MODEL").ok(),
        })
    }

    /// Model name for a provider role
    pub fn model_for(&self, role: ProviderRole) -> &str {
        let specific = match role {
            ProviderRole::Roster => &self.roster_model,
            ProviderRole::Enrichment => &self.enrichment_model,
            ProviderRole::Decision => &self.decision_model,
            ProviderRole::World => &self.world_model,
        };
        specific.as_deref().unwrap_or(&self.model)
    }
}
