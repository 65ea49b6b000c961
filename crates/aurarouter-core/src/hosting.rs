//! Provider kinds and hosting tier classification.
//!
//! A model's hosting tier decides whether the privacy and budget gates
//! apply to it. The provider supplies a default tier; an explicit tier in
//! the model's configuration always wins, in either direction.

use serde::{Deserialize, Serialize};

/// Backend provider families known to the router.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Ollama daemon (local).
    Ollama,
    /// Locally hosted llama.cpp server speaking the OpenAI wire format.
    Llamacpp,
    /// Remote OpenAI-compatible endpoint.
    Openapi,
    /// Anthropic Messages API.
    Claude,
    /// Google Gemini API.
    Google,
}

impl ProviderKind {
    pub fn all() -> &'static [ProviderKind] {
        &[
            Self::Ollama,
            Self::Llamacpp,
            Self::Openapi,
            Self::Claude,
            Self::Google,
        ]
    }

    /// Parse a provider name from configuration, accepting common aliases.
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "ollama" => Some(Self::Ollama),
            "llamacpp" | "llamacpp-server" | "llama.cpp" | "llama-cpp" => Some(Self::Llamacpp),
            "openapi" | "openai" | "remote-openapi" => Some(Self::Openapi),
            "claude" | "anthropic" => Some(Self::Claude),
            "google" | "gemini" => Some(Self::Google),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ollama => "ollama",
            Self::Llamacpp => "llamacpp",
            Self::Openapi => "openapi",
            Self::Claude => "claude",
            Self::Google => "google",
        }
    }

    /// Default hosting tier when the model does not declare one.
    pub fn default_tier(&self) -> HostingTier {
        match self {
            Self::Ollama | Self::Llamacpp => HostingTier::OnPrem,
            Self::Openapi | Self::Claude | Self::Google => HostingTier::Cloud,
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a backend runs, for cost and privacy gating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HostingTier {
    /// Runs on hardware the operator controls.
    #[serde(alias = "local", alias = "on_prem")]
    OnPrem,
    /// Shared public cloud API.
    Cloud,
    /// Single-tenant hosted deployment.
    #[serde(alias = "dedicated_tenant")]
    DedicatedTenant,
}

impl HostingTier {
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "on-prem" | "on_prem" | "onprem" | "local" => Some(Self::OnPrem),
            "cloud" => Some(Self::Cloud),
            "dedicated-tenant" | "dedicated_tenant" | "dedicated" => Some(Self::DedicatedTenant),
            _ => None,
        }
    }

    /// Only the shared cloud tier is subject to the privacy and budget gates.
    pub fn is_cloud(&self) -> bool {
        matches!(self, Self::Cloud)
    }
}

impl std::fmt::Display for HostingTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OnPrem => write!(f, "on-prem"),
            Self::Cloud => write!(f, "cloud"),
            Self::DedicatedTenant => write!(f, "dedicated-tenant"),
        }
    }
}

/// Whether a provider name is a cloud provider by default.
///
/// Unknown providers are treated as local.
pub fn is_cloud_provider(provider: &str) -> bool {
    ProviderKind::parse(provider)
        .map(|kind| kind.default_tier().is_cloud())
        .unwrap_or(false)
}

/// Resolve the effective hosting tier for a model.
pub fn resolve_hosting_tier(explicit: Option<HostingTier>, provider: &str) -> HostingTier {
    if let Some(tier) = explicit {
        return tier;
    }
    ProviderKind::parse(provider)
        .map(|kind| kind.default_tier())
        .unwrap_or(HostingTier::OnPrem)
}
