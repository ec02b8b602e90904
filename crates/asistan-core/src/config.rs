//! Core configuration.
//!
//! One `CoreConfig` is built at startup and handed to `TurnOrchestrator::new`.
//! Every field has a default, so an empty file is a valid config.
//!
//! ```toml
//! [router]
//! min_confidence = 0.3
//!
//! [tier]
//! enabled = true
//! force = "quality"
//!
//! [[tools]]
//! name = "calendar.create_event"
//! required_slots = ["title"]
//! requires_confirmation = true
//! ```

use crate::dialog::DialogConfig;
use crate::entities::EntityConfig;
use crate::error::ConfigError;
use crate::plan_verifier::PlanConfig;
use crate::sanitizer::SanitizerConfig;
use crate::tier::TierConfig;
use crate::tools::ToolCatalog;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Router call settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Plans below this confidence are clarified, not executed
    pub min_confidence: f64,
    /// Re-prompts after a parse/schema failure
    pub repair_attempts: u32,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Previous user/assistant pairs included in the router prompt
    pub history_turns: usize,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            min_confidence: 0.3,
            repair_attempts: 1,
            temperature: 0.0,
            max_tokens: 512,
            history_turns: 4,
        }
    }
}

/// Finalizer call settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FinalizerConfig {
    pub temperature: f32,
    pub fast_max_tokens: u32,
    pub quality_max_tokens: u32,
    /// Bound on persisted `memory_update` notes
    pub max_memory_notes: usize,
}

impl Default for FinalizerConfig {
    fn default() -> Self {
        Self {
            temperature: 0.4,
            fast_max_tokens: 256,
            quality_max_tokens: 768,
            max_memory_notes: 20,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    pub router: RouterConfig,
    pub plan: PlanConfig,
    pub entities: EntityConfig,
    pub dialog: DialogConfig,
    pub tier: TierConfig,
    pub finalizer: FinalizerConfig,
    pub sanitizer: SanitizerConfig,
    pub tools: ToolCatalog,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            router: RouterConfig::default(),
            plan: PlanConfig::default(),
            entities: EntityConfig::default(),
            dialog: DialogConfig::default(),
            tier: TierConfig::default(),
            finalizer: FinalizerConfig::default(),
            sanitizer: SanitizerConfig::default(),
            tools: ToolCatalog::standard(),
        }
    }
}

impl CoreConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: CoreConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_toml_str(&contents)
            .with_context(|| format!("Failed to parse {}", path.display()))
    }

    /// Load from `path` when given, defaults otherwise
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Reject values the pipeline cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.router.min_confidence) {
            return Err(ConfigError::Invalid(format!(
                "router.min_confidence must be within 0..1, got {}",
                self.router.min_confidence
            )));
        }
        if self.dialog.max_reprompts == 0 {
            return Err(ConfigError::Invalid(
                "dialog.max_reprompts must be at least 1".to_string(),
            ));
        }
        if self.entities.prompt_budget_chars < 2 {
            return Err(ConfigError::Invalid(
                "entities.prompt_budget_chars must be at least 2".to_string(),
            ));
        }
        let mut names: Vec<&str> = self.tools.tools.iter().map(|t| t.name.as_str()).collect();
        names.sort_unstable();
        if let Some(pair) = names.windows(2).find(|w| w[0] == w[1]) {
            return Err(ConfigError::Invalid(format!("tool '{}' is defined twice", pair[0])));
        }
        Ok(())
    }
}
