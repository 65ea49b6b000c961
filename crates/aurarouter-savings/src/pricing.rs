//! Model price table.
//!
//! Resolution cascade, highest priority first:
//! 1. explicit per-call pricing (both halves set)
//! 2. the config resolver callback (both halves set)
//! 3. the override table
//! 4. the built-in cloud price table
//! 5. zero (free / local)

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;

use aurarouter_core::{is_cloud_provider, RouterConfig};

/// USD per million tokens.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ModelPrice {
    pub input_per_million: f64,
    pub output_per_million: f64,
}

impl ModelPrice {
    pub const FREE: ModelPrice = ModelPrice {
        input_per_million: 0.0,
        output_per_million: 0.0,
    };

    pub fn new(input_per_million: f64, output_per_million: f64) -> Self {
        Self {
            input_per_million,
            output_per_million,
        }
    }

    fn from_pair(pair: (Option<f64>, Option<f64>)) -> Option<Self> {
        match pair {
            (Some(input), Some(output)) => Some(Self::new(input, output)),
            _ => None,
        }
    }

    pub fn is_free(&self) -> bool {
        self.input_per_million == 0.0 && self.output_per_million == 0.0
    }
}

/// Looks up `(input, output)` prices for a model id from configuration.
pub type PriceResolver = Box<dyn Fn(&str) -> Option<(Option<f64>, Option<f64>)> + Send + Sync>;

/// Known cloud list prices, USD per million tokens (input, output).
const BUILTIN_PRICES: &[(&str, f64, f64)] = &[
    ("claude-opus-4", 15.0, 75.0),
    ("claude-sonnet-4", 3.0, 15.0),
    ("claude-haiku-4", 1.0, 5.0),
    ("claude-3-7-sonnet", 3.0, 15.0),
    ("claude-3-5-sonnet", 3.0, 15.0),
    ("claude-3-5-haiku", 0.8, 4.0),
    ("gemini-2.5-pro", 1.25, 10.0),
    ("gemini-2.5-flash", 0.30, 2.50),
    ("gemini-2.0-flash", 0.10, 0.40),
    ("gemini-1.5-pro", 1.25, 5.0),
    ("gemini-1.5-flash", 0.075, 0.30),
    ("gpt-4.1", 2.0, 8.0),
    ("gpt-4.1-mini", 0.40, 1.60),
    ("gpt-4o", 2.50, 10.0),
    ("gpt-4o-mini", 0.15, 0.60),
];

/// Price table with config-driven overrides.
#[derive(Default)]
pub struct PricingCatalog {
    overrides: HashMap<String, ModelPrice>,
    /// model id → backend model name, for built-in table lookups.
    model_names: HashMap<String, String>,
    resolver: Option<PriceResolver>,
}

impl PricingCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog wired to a config snapshot: the `pricing` table becomes the
    /// override table, per-model `cost_per_1m_*` fields feed the resolver.
    pub fn from_config(config: Arc<RouterConfig>) -> Self {
        let overrides = config
            .pricing
            .iter()
            .map(|(id, p)| {
                (
                    id.clone(),
                    ModelPrice::new(p.input_per_million, p.output_per_million),
                )
            })
            .collect();
        let model_names = config
            .models
            .iter()
            .filter_map(|(id, m)| m.model_name.clone().map(|name| (id.clone(), name)))
            .collect();

        let snapshot = config.clone();
        let resolver: PriceResolver = Box::new(move |model_id: &str| {
            snapshot
                .model_config(model_id)
                .map(|m| (m.cost_per_1m_input, m.cost_per_1m_output))
        });

        Self {
            overrides,
            model_names,
            resolver: Some(resolver),
        }
    }

    pub fn with_override(mut self, model_id: impl Into<String>, price: ModelPrice) -> Self {
        self.overrides.insert(model_id.into(), price);
        self
    }

    pub fn with_resolver(mut self, resolver: PriceResolver) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Resolve the price for one model.
    pub fn get_price(
        &self,
        model_id: &str,
        provider: &str,
        explicit: Option<(Option<f64>, Option<f64>)>,
    ) -> ModelPrice {
        if let Some(price) = explicit.and_then(ModelPrice::from_pair) {
            return price;
        }
        if let Some(price) = self
            .resolver
            .as_ref()
            .and_then(|resolve| resolve(model_id))
            .and_then(ModelPrice::from_pair)
        {
            return price;
        }
        if let Some(price) = self.overrides.get(model_id) {
            return *price;
        }
        if is_cloud_provider(provider) {
            let builtin = Self::builtin_price(model_id).or_else(|| {
                self.model_names
                    .get(model_id)
                    .and_then(|name| Self::builtin_price(name))
            });
            if let Some(price) = builtin {
                return price;
            }
        }
        ModelPrice::FREE
    }

    /// Built-in list price: exact key, else the longest key contained in the name.
    pub fn builtin_price(name: &str) -> Option<ModelPrice> {
        let name = name.to_ascii_lowercase();
        BUILTIN_PRICES
            .iter()
            .filter(|(key, _, _)| name == *key || name.contains(key))
            .max_by_key(|(key, _, _)| key.len())
            .map(|(_, input, output)| ModelPrice::new(*input, *output))
    }
}
