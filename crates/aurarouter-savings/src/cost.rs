//! Cost engine: spend figures from the usage ledger.
//!
//! Historical queries re-price ledger rows with the current catalog; no
//! price is frozen at call time.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Datelike, Duration, TimeZone, Utc};
use parking_lot::RwLock;

use aurarouter_core::Result;
use aurarouter_store::{TimeRange, UsageStore};

use crate::pricing::{ModelPrice, PricingCatalog};

/// Turns token counts and ledger rows into USD figures.
pub struct CostEngine {
    catalog: RwLock<Arc<PricingCatalog>>,
    usage: Arc<UsageStore>,
}

impl CostEngine {
    pub fn new(catalog: Arc<PricingCatalog>, usage: Arc<UsageStore>) -> Self {
        Self {
            catalog: RwLock::new(catalog),
            usage,
        }
    }

    pub fn catalog(&self) -> Arc<PricingCatalog> {
        self.catalog.read().clone()
    }

    /// Replace the price table. Later queries re-price with it.
    pub fn set_catalog(&self, catalog: Arc<PricingCatalog>) {
        *self.catalog.write() = catalog;
    }

    /// Cost of one call in USD.
    pub fn calculate_cost(
        &self,
        input_tokens: u64,
        output_tokens: u64,
        model_id: &str,
        provider: &str,
    ) -> f64 {
        let price = self.catalog.read().get_price(model_id, provider, None);
        Self::apply_price(&price, input_tokens, output_tokens)
    }

    fn apply_price(price: &ModelPrice, input_tokens: u64, output_tokens: u64) -> f64 {
        (input_tokens as f64 * price.input_per_million
            + output_tokens as f64 * price.output_per_million)
            / 1_000_000.0
    }

    /// Total spend in `range`.
    pub fn total_spend(&self, range: TimeRange) -> Result<f64> {
        Ok(self.spend_by_model(range)?.values().sum())
    }

    /// Spend per model id in `range`.
    pub fn spend_by_model(&self, range: TimeRange) -> Result<BTreeMap<String, f64>> {
        let mut spend = BTreeMap::new();
        for totals in self.usage.token_totals(range)? {
            let cost = self.calculate_cost(
                totals.input_tokens,
                totals.output_tokens,
                &totals.model_id,
                &totals.provider,
            );
            *spend.entry(totals.model_id).or_insert(0.0) += cost;
        }
        Ok(spend)
    }

    /// Spend per provider in `range`.
    pub fn spend_by_provider(&self, range: TimeRange) -> Result<BTreeMap<String, f64>> {
        let mut spend = BTreeMap::new();
        for totals in self.usage.token_totals(range)? {
            let cost = self.calculate_cost(
                totals.input_tokens,
                totals.output_tokens,
                &totals.model_id,
                &totals.provider,
            );
            *spend.entry(totals.provider).or_insert(0.0) += cost;
        }
        Ok(spend)
    }

    /// Spend since midnight UTC.
    pub fn daily_spend(&self) -> Result<f64> {
        self.total_spend(TimeRange::since(day_start(Utc::now())))
    }

    /// Spend since the first of the month UTC.
    pub fn monthly_spend(&self) -> Result<f64> {
        self.total_spend(TimeRange::since(month_start(Utc::now())))
    }

    /// Month-to-date spend extrapolated linearly to the whole month.
    pub fn monthly_projection(&self) -> Result<f64> {
        self.monthly_projection_at(Utc::now())
    }

    pub fn monthly_projection_at(&self, now: DateTime<Utc>) -> Result<f64> {
        let start = month_start(now);
        let spent = self.total_spend(TimeRange::between(start, now))?;
        let elapsed_days = now.day() as f64;
        Ok(spent / elapsed_days * days_in_month(now) as f64)
    }

    /// What local traffic in `range` would have cost on `reference` pricing.
    pub fn local_savings(&self, range: TimeRange, reference: ModelPrice) -> Result<f64> {
        let mut saved = 0.0;
        for totals in self.usage.token_totals(range)? {
            let actual = self.calculate_cost(
                totals.input_tokens,
                totals.output_tokens,
                &totals.model_id,
                &totals.provider,
            );
            if actual == 0.0 {
                saved += Self::apply_price(&reference, totals.input_tokens, totals.output_tokens);
            }
        }
        Ok(saved)
    }
}

pub(crate) fn day_start(now: DateTime<Utc>) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(now.year(), now.month(), now.day(), 0, 0, 0)
        .single()
        .unwrap_or(now)
}

pub(crate) fn month_start(now: DateTime<Utc>) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(now.year(), now.month(), 1, 0, 0, 0)
        .single()
        .unwrap_or(now)
}

fn days_in_month(now: DateTime<Utc>) -> i64 {
    let start = month_start(now);
    let (year, month) = if now.month() == 12 {
        (now.year() + 1, 1)
    } else {
        (now.year(), now.month() + 1)
    };
    Utc.with_ymd_and_hms(year, month, 1, 0, 0, 0)
        .single()
        .map(|next| (next - start).num_days())
        .unwrap_or(30)
}
