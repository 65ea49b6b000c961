//! AuraRouter Core: errors, hosting classification, configuration snapshot.

pub mod config;
pub mod error;
pub mod hosting;

pub use config::{
    BudgetConfig, CustomPattern, ExecutionConfig, ModelConfig, PriceOverride, PrivacyConfig,
    RouterConfig, StorageConfig, TriageConfig, TriageRule,
};
pub use error::{Error, Result};
pub use hosting::{is_cloud_provider, resolve_hosting_tier, HostingTier, ProviderKind};
