//! Cost accounting and budget admission for cloud models.
//!
//! `PricingCatalog` resolves per-million-token prices, `CostEngine` turns
//! usage ledger rows into spend, and `BudgetManager` caches daily/monthly
//! spend to answer allow/deny questions for the budget gate.

pub mod budget;
pub mod cost;
pub mod pricing;

pub use budget::{BudgetDecision, BudgetManager, BudgetStatus, SpendSource, WindowKind};
pub use cost::CostEngine;
pub use pricing::{ModelPrice, PriceResolver, PricingCatalog};
