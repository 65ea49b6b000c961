//! Scripted in-process backends for fabric and pipeline scenarios.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use aurarouter_core::{Error, ModelConfig, Result, RouterConfig};
use aurarouter_providers::{GenerateResult, Provider, ProviderFactory};
use aurarouter_savings::SpendSource;

pub type Responder = Box<dyn Fn(&str, usize) -> Result<String> + Send + Sync>;

/// Backend whose replies come from a closure of `(prompt, call_index)`.
pub struct ScriptedProvider {
    model_id: String,
    responder: Responder,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedProvider {
    pub fn new(
        model_id: &str,
        responder: impl Fn(&str, usize) -> Result<String> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            model_id: model_id.to_string(),
            responder: Box::new(responder),
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn replying(model_id: &str, text: &str) -> Arc<Self> {
        let text = text.to_string();
        Self::new(model_id, move |_, _| Ok(text.clone()))
    }

    pub fn failing(model_id: &str) -> Arc<Self> {
        Self::new(model_id, |_, _| Err(Error::Http("connection refused".into())))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }
}

impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn generate(&self, prompt: &str, _json_mode: bool) -> Result<GenerateResult> {
        let index = self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().push(prompt.to_string());
        let text = (self.responder)(prompt, index)?;
        Ok(GenerateResult::new(text, &self.model_id, "scripted").with_tokens(1_000, 500))
    }
}

/// Factory handing out pre-built scripted backends by model id.
#[derive(Default)]
pub struct ScriptedFactory {
    providers: HashMap<String, Arc<ScriptedProvider>>,
}

impl ScriptedFactory {
    pub fn with(providers: &[&Arc<ScriptedProvider>]) -> Arc<Self> {
        let providers = providers
            .iter()
            .map(|p| (p.model_id.clone(), Arc::clone(*p)))
            .collect();
        Arc::new(Self { providers })
    }
}

impl ProviderFactory for ScriptedFactory {
    fn create(&self, model_id: &str, _config: &ModelConfig) -> Result<Arc<dyn Provider>> {
        self.providers
            .get(model_id)
            .map(|p| p.clone() as Arc<dyn Provider>)
            .ok_or_else(|| Error::Config(format!("no scripted backend for {}", model_id)))
    }
}

/// Config with `(model_id, provider)` models and `(role, chain)` roles.
pub fn config(models: &[(&str, &str)], roles: &[(&str, &[&str])]) -> RouterConfig {
    let mut config = RouterConfig::default();
    for (id, provider) in models {
        config.models.insert(id.to_string(), ModelConfig::new(*provider));
    }
    for (role, chain) in roles {
        config
            .roles
            .insert(role.to_string(), chain.iter().map(|s| s.to_string()).collect());
    }
    config
}

/// Spend source returning a fixed figure and counting reads.
pub struct FixedSpend {
    pub spend: Mutex<f64>,
    pub reads: AtomicUsize,
}

impl FixedSpend {
    pub fn new(spend: f64) -> Arc<Self> {
        Arc::new(Self {
            spend: Mutex::new(spend),
            reads: AtomicUsize::new(0),
        })
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

impl SpendSource for FixedSpend {
    fn spend_since(&self, _start: DateTime<Utc>) -> Result<f64> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(*self.spend.lock())
    }
}
