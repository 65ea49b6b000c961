//! Router configuration, parsed once into an immutable snapshot.
//!
//! The fabric holds an `Arc<RouterConfig>` and swaps it wholesale on
//! reload; nothing in here is mutated after load.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Error, Result};
use crate::hosting::{resolve_hosting_tier, HostingTier, ProviderKind};

pub const DEFAULT_CONFIG_FILE: &str = "aurarouter.json";
pub const DEFAULT_MAX_REVIEW_ITERATIONS: u32 = 3;
pub const DEFAULT_BUDGET_CACHE_TTL_SECS: u64 = 30;
pub const DEFAULT_MODEL_TIMEOUT_SECS: u64 = 120;

/// Settings for one backend model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    pub provider: String,
    /// Model name sent to the backend (e.g. `qwen2.5-coder:7b`).
    #[serde(default)]
    pub model_name: Option<String>,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    /// Environment variable consulted when `api_key` is unset.
    #[serde(default)]
    pub api_key_env: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub hosting_tier: Option<HostingTier>,
    #[serde(default)]
    pub cost_per_1m_input: Option<f64>,
    #[serde(default)]
    pub cost_per_1m_output: Option<f64>,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub context_limit: Option<u32>,
    /// Extra backend parameters (temperature, num_ctx, ...).
    #[serde(default)]
    pub parameters: serde_json::Value,
}

fn default_timeout() -> u64 {
    DEFAULT_MODEL_TIMEOUT_SECS
}

impl ModelConfig {
    /// Minimal config for a provider; mostly useful in tests.
    pub fn new(provider: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            model_name: None,
            endpoint: None,
            api_key: None,
            api_key_env: None,
            tags: Vec::new(),
            hosting_tier: None,
            cost_per_1m_input: None,
            cost_per_1m_output: None,
            timeout_secs: DEFAULT_MODEL_TIMEOUT_SECS,
            context_limit: None,
            parameters: serde_json::Value::Null,
        }
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn with_tier(mut self, tier: HostingTier) -> Self {
        self.hosting_tier = Some(tier);
        self
    }

    pub fn provider_kind(&self) -> Option<ProviderKind> {
        ProviderKind::parse(&self.provider)
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t.eq_ignore_ascii_case(tag))
    }

    /// Models tagged `private` are trusted with sensitive prompts.
    pub fn is_private(&self) -> bool {
        self.has_tag("private")
    }

    pub fn hosting_tier(&self) -> HostingTier {
        resolve_hosting_tier(self.hosting_tier, &self.provider)
    }

    pub fn is_cloud(&self) -> bool {
        self.hosting_tier().is_cloud()
    }

    /// API key from config, falling back to the configured env var.
    pub fn resolved_api_key(&self) -> Option<String> {
        if let Some(key) = &self.api_key {
            if !key.is_empty() {
                return Some(key.clone());
            }
        }
        self.api_key_env
            .as_deref()
            .and_then(|var| std::env::var(var).ok())
            .filter(|k| !k.is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// Review/correction rounds; 0 disables the review loop.
    #[serde(default = "default_review_iterations")]
    pub max_review_iterations: u32,
}

fn default_review_iterations() -> u32 {
    DEFAULT_MAX_REVIEW_ITERATIONS
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            max_review_iterations: DEFAULT_MAX_REVIEW_ITERATIONS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetConfig {
    #[serde(default)]
    pub enabled: bool,
    /// USD per calendar day (UTC). `None` is unlimited.
    #[serde(default)]
    pub daily_limit: Option<f64>,
    /// USD per calendar month (UTC). `None` is unlimited.
    #[serde(default)]
    pub monthly_limit: Option<f64>,
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,
}

fn default_cache_ttl() -> u64 {
    DEFAULT_BUDGET_CACHE_TTL_SECS
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            daily_limit: None,
            monthly_limit: None,
            cache_ttl_secs: DEFAULT_BUDGET_CACHE_TTL_SECS,
        }
    }
}

/// A caller-supplied privacy pattern.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomPattern {
    pub name: String,
    pub pattern: String,
    #[serde(default = "default_severity")]
    pub severity: String,
    #[serde(default)]
    pub description: String,
}

fn default_severity() -> String {
    "medium".into()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrivacyConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub custom_patterns: Vec<CustomPattern>,
}

fn default_true() -> bool {
    true
}

impl Default for PrivacyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            custom_patterns: Vec::new(),
        }
    }
}

/// Complexity bucket: tasks up to `max_complexity` go to `preferred_role`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriageRule {
    pub max_complexity: u8,
    pub preferred_role: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriageConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub rules: Vec<TriageRule>,
    #[serde(default = "default_triage_role")]
    pub default_role: String,
}

fn default_triage_role() -> String {
    "coding".into()
}

impl Default for TriageConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            rules: Vec::new(),
            default_role: default_triage_role(),
        }
    }
}

/// Per-model price override, USD per million tokens.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceOverride {
    pub input_per_million: f64,
    pub output_per_million: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// Immutable router configuration snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RouterConfig {
    #[serde(default)]
    pub models: HashMap<String, ModelConfig>,
    /// Role name → ordered candidate model ids.
    #[serde(default)]
    pub roles: HashMap<String, Vec<String>>,
    #[serde(default)]
    pub execution: ExecutionConfig,
    #[serde(default)]
    pub budget: BudgetConfig,
    #[serde(default)]
    pub privacy: PrivacyConfig,
    #[serde(default)]
    pub triage: TriageConfig,
    /// Custom canonical role → synonyms, checked before the built-in table.
    #[serde(default)]
    pub semantic_verbs: HashMap<String, Vec<String>>,
    #[serde(default)]
    pub pricing: HashMap<String, PriceOverride>,
    #[serde(default)]
    pub storage: StorageConfig,
}

impl RouterConfig {
    /// Parse a configuration document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::Config(format!("Invalid config: {}", e)))
    }

    /// Load a configuration file from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Cannot read {}: {}", path.display(), e)))?;
        let config = Self::from_json_str(&raw)?;
        info!(
            "Loaded router config from {}: {} models, {} roles",
            path.display(),
            config.models.len(),
            config.roles.len()
        );
        Ok(config)
    }

    /// Config path from `AURAROUTER_CONFIG`, else `aurarouter.json`.
    pub fn default_path() -> PathBuf {
        std::env::var("AURAROUTER_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_FILE))
    }

    /// Ordered candidate list for a role; empty if the role is undefined.
    pub fn role_chain(&self, role: &str) -> &[String] {
        self.roles.get(role).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has_role(&self, role: &str) -> bool {
        !self.role_chain(role).is_empty()
    }

    pub fn model_config(&self, model_id: &str) -> Option<&ModelConfig> {
        self.models.get(model_id)
    }

    pub fn max_review_iterations(&self) -> u32 {
        self.execution.max_review_iterations
    }

    /// Data directory, `AURAROUTER_DATA_DIR` taking precedence.
    pub fn data_dir(&self) -> PathBuf {
        std::env::var("AURAROUTER_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| self.storage.data_dir.clone())
    }

    /// Structural problems in the config, in a stable order.
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();

        let mut roles: Vec<_> = self.roles.iter().collect();
        roles.sort_by(|a, b| a.0.cmp(b.0));
        for (role, chain) in roles {
            if chain.is_empty() {
                problems.push(format!("role '{}' has an empty chain", role));
            }
            for model_id in chain {
                if !self.models.contains_key(model_id) {
                    problems.push(format!(
                        "role '{}' references unknown model '{}'",
                        role, model_id
                    ));
                }
            }
        }

        let mut models: Vec<_> = self.models.iter().collect();
        models.sort_by(|a, b| a.0.cmp(b.0));
        for (model_id, model) in models {
            if model.provider_kind().is_none() {
                problems.push(format!(
                    "model '{}' has unknown provider '{}'",
                    model_id, model.provider
                ));
            }
            if model.cost_per_1m_input.is_some() != model.cost_per_1m_output.is_some() {
                problems.push(format!(
                    "model '{}' sets only one of cost_per_1m_input/cost_per_1m_output",
                    model_id
                ));
            }
        }

        for rule in &self.triage.rules {
            if !(1..=10).contains(&rule.max_complexity) {
                problems.push(format!(
                    "triage rule for '{}' has max_complexity {} outside 1..=10",
                    rule.preferred_role, rule.max_complexity
                ));
            }
        }

        for (window, limit) in [
            ("daily", self.budget.daily_limit),
            ("monthly", self.budget.monthly_limit),
        ] {
            if matches!(limit, Some(l) if l < 0.0) {
                problems.push(format!("{} budget limit is negative", window));
            }
        }

        problems
    }
}
