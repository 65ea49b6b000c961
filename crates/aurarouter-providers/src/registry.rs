//! Provider factory map, assembled once at startup.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use aurarouter_core::{Error, ModelConfig, ProviderKind, Result};

use crate::claude::ClaudeProvider;
use crate::google::GoogleProvider;
use crate::ollama::OllamaProvider;
use crate::openai::OpenAiCompatProvider;
use crate::provider::Provider;

/// Builds a backend for `(model_id, config)`.
pub type ProviderConstructor = fn(&str, &ModelConfig) -> Result<Arc<dyn Provider>>;

/// Source of backends for the fabric.
pub trait ProviderFactory: Send + Sync {
    fn create(&self, model_id: &str, config: &ModelConfig) -> Result<Arc<dyn Provider>>;
}

/// Static map from provider kind to constructor.
pub struct ProviderRegistry {
    constructors: HashMap<ProviderKind, ProviderConstructor>,
}

impl ProviderRegistry {
    /// Registry with every built-in provider kind.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register(ProviderKind::Ollama, build_ollama);
        registry.register(ProviderKind::Llamacpp, build_llamacpp);
        registry.register(ProviderKind::Openapi, build_openapi);
        registry.register(ProviderKind::Claude, build_claude);
        registry.register(ProviderKind::Google, build_google);
        registry
    }

    pub fn empty() -> Self {
        Self {
            constructors: HashMap::new(),
        }
    }

    pub fn register(&mut self, kind: ProviderKind, constructor: ProviderConstructor) {
        self.constructors.insert(kind, constructor);
    }

    pub fn supports(&self, kind: ProviderKind) -> bool {
        self.constructors.contains_key(&kind)
    }

    /// Registered kinds in declaration order.
    pub fn kinds(&self) -> Vec<ProviderKind> {
        ProviderKind::all()
            .iter()
            .copied()
            .filter(|k| self.supports(*k))
            .collect()
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ProviderFactory for ProviderRegistry {
    fn create(&self, model_id: &str, config: &ModelConfig) -> Result<Arc<dyn Provider>> {
        let kind = config.provider_kind().ok_or_else(|| {
            Error::Config(format!(
                "Unknown provider '{}' for model '{}'",
                config.provider, model_id
            ))
        })?;
        let constructor = self.constructors.get(&kind).ok_or_else(|| {
            Error::Config(format!("No constructor registered for provider {}", kind))
        })?;
        debug!("Creating {} backend for model {}", kind, model_id);
        constructor(model_id, config)
    }
}

fn build_ollama(model_id: &str, config: &ModelConfig) -> Result<Arc<dyn Provider>> {
    Ok(Arc::new(OllamaProvider::new(model_id, config)?))
}

fn build_llamacpp(model_id: &str, config: &ModelConfig) -> Result<Arc<dyn Provider>> {
    Ok(Arc::new(OpenAiCompatProvider::llamacpp(model_id, config)?))
}

fn build_openapi(model_id: &str, config: &ModelConfig) -> Result<Arc<dyn Provider>> {
    Ok(Arc::new(OpenAiCompatProvider::remote(model_id, config)?))
}

fn build_claude(model_id: &str, config: &ModelConfig) -> Result<Arc<dyn Provider>> {
    Ok(Arc::new(ClaudeProvider::new(model_id, config)?))
}

fn build_google(model_id: &str, config: &ModelConfig) -> Result<Arc<dyn Provider>> {
    Ok(Arc::new(GoogleProvider::new(model_id, config)?))
}
