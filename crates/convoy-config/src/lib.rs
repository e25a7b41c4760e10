use std::env;
use std::fs;
use std::path::Path;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Which pricing tier the provider should route the request through.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ServiceTier {
    #[default]
    Auto,
    Default,
    Flex,
    Priority,
}

impl ServiceTier {
    /// The spec only sends this field when it is explicitly non-auto.
    pub fn is_explicit(self) -> bool {
        self != ServiceTier::Auto
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ServiceTier::Auto => "auto",
            ServiceTier::Default => "default",
            ServiceTier::Flex => "flex",
            ServiceTier::Priority => "priority",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum WebSearchContextSize {
    Low,
    #[default]
    Medium,
    High,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct UserLocation {
    pub country: Option<String>,
    pub city: Option<String>,
    pub region: Option<String>,
    pub timezone: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebSearchConfig {
    pub enabled: bool,
    pub context_size: WebSearchContextSize,
    pub user_location: UserLocation,
}

impl Default for WebSearchConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            context_size: WebSearchContextSize::default(),
            user_location: UserLocation::default(),
        }
    }
}

/// Knobs that shape the `create`/`continue` request bodies sent to the
/// provider's Responses endpoint. See §6 of the design for the full list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub model: String,
    pub base_url: String,
    /// Loaded from `CONVOY_API_KEY` if left blank on disk; never serialized
    /// back out by `save_to`.
    #[serde(skip_serializing)]
    pub api_key: String,
    pub organization_id: Option<String>,
    pub project_id: Option<String>,
    pub max_completion_tokens: u32,
    pub temperature: f32,
    pub service_tier: ServiceTier,
    pub parallel_tool_calls: bool,
    pub web_search: WebSearchConfig,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            model: "gpt-5.1".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: String::new(),
            organization_id: None,
            project_id: None,
            max_completion_tokens: 0,
            temperature: 1.0,
            service_tier: ServiceTier::default(),
            parallel_tool_calls: false,
            web_search: WebSearchConfig::default(),
        }
    }
}

impl ProviderConfig {
    /// True when `model` matches the reasoning-class name prefixes the
    /// Runner uses to decide whether to omit `temperature` (§4.4).
    pub fn is_reasoning_model(&self) -> bool {
        const REASONING_PREFIXES: &[&str] = &["o1", "o3", "o4", "gpt-5"];
        REASONING_PREFIXES
            .iter()
            .any(|prefix| self.model.starts_with(prefix))
    }
}

/// Tool call ceilings and floors, keyed by tool name. Mirrors
/// `convoy_tools::ToolConstraints` but lives here so it round-trips through
/// TOML alongside the rest of the config.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ToolBudgetConfig {
    pub min_calls: u32,
    pub max_calls: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub max_turns: u32,
    pub tool_budgets: std::collections::BTreeMap<String, ToolBudgetConfig>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_turns: 32,
            tool_budgets: std::collections::BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    pub poll_interval_secs: u64,
    pub cost_optimize: bool,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 30,
            cost_optimize: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    pub log_level: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub provider: ProviderConfig,
    pub agent: AgentConfig,
    pub batch: BatchConfig,
    pub telemetry: TelemetryConfig,
}

impl AppConfig {
    /// Load from a TOML file, falling back to defaults when the file is
    /// missing, then layer environment-variable overrides on top.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let mut config = Self::default();
        if let Ok(raw) = fs::read_to_string(path) {
            config = toml::from_str(&raw)?;
        }
        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(key) = env::var("CONVOY_API_KEY") {
            if !key.is_empty() {
                self.provider.api_key = key;
            }
        }
        if let Ok(base_url) = env::var("CONVOY_BASE_URL") {
            if !base_url.is_empty() {
                self.provider.base_url = base_url;
            }
        }
        if let Ok(model) = env::var("CONVOY_MODEL") {
            if !model.is_empty() {
                self.provider.model = model;
            }
        }
        if let Ok(org) = env::var("CONVOY_ORGANIZATION_ID") {
            if !org.is_empty() {
                self.provider.organization_id = Some(org);
            }
        }
        if let Ok(project) = env::var("CONVOY_PROJECT_ID") {
            if !project.is_empty() {
                self.provider.project_id = Some(project);
            }
        }
    }

    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }
        let rendered = toml::to_string_pretty(self)?;
        fs::write(path, rendered)?;
        Ok(())
    }
}
