//! Configuration for the assistant
//!
//! Selects the rulebook and the simulated latency range.

use crate::latency::LatencyConfig;
use crate::rulebook::{BuiltinRulebook, Rulebook};
use crate::{AssistantError, RulebookError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Assistant configuration
///
/// # Examples
///
/// ```
/// use civic_assistant::{AssistantConfig, BuiltinRulebook};
///
/// let config = AssistantConfig::default();
/// assert_eq!(config.rulebook, BuiltinRulebook::Portal);
/// assert_eq!(config.latency.max_ms, 1200);
///
/// // No artificial delay
/// let config = AssistantConfig::instant();
/// assert_eq!(config.latency.max_ms, 0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssistantConfig {
    /// Built-in rulebook to use
    /// Default: portal
    #[serde(default)]
    pub rulebook: BuiltinRulebook,

    /// Load the rulebook from this TOML file instead of a built-in one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rulebook_path: Option<PathBuf>,

    /// Reply delay range
    #[serde(default)]
    pub latency: LatencyConfig,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            rulebook: BuiltinRulebook::Portal,
            rulebook_path: None,
            latency: LatencyConfig::default(),
        }
    }
}

impl AssistantConfig {
    /// Default rulebook with no reply delay
    pub fn instant() -> Self {
        Self {
            latency: LatencyConfig::instant(),
            ..Self::default()
        }
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, AssistantError> {
        let contents = std::fs::read_to_string(path)?;
        let config: AssistantConfig = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<(), AssistantError> {
        self.latency.validate()
    }

    /// Load the configured rulebook
    pub fn load_rulebook(&self) -> Result<Rulebook, RulebookError> {
        match &self.rulebook_path {
            Some(path) => Rulebook::from_file(path),
            None => Rulebook::builtin(self.rulebook),
        }
    }
}
