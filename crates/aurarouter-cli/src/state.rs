//! Shared router state: ledgers, cost engine, budget, and the fabric.

use std::sync::Arc;

use tracing::info;

use aurarouter_core::{Result, RouterConfig};
use aurarouter_privacy::PrivacyAuditor;
use aurarouter_providers::ProviderRegistry;
use aurarouter_routing::ComputeFabric;
use aurarouter_savings::{BudgetManager, CostEngine, PricingCatalog};
use aurarouter_store::{PrivacyStore, UsageStore};

pub struct RouterState {
    pub config: Arc<RouterConfig>,
    pub usage: Arc<UsageStore>,
    pub privacy: Arc<PrivacyStore>,
    pub costs: Arc<CostEngine>,
    pub budget: Arc<BudgetManager>,
    pub fabric: ComputeFabric,
}

impl RouterState {
    pub fn new(config: RouterConfig) -> Result<Self> {
        let config = Arc::new(config);
        let data_dir = config.data_dir();
        info!("Data directory: {}", data_dir.display());

        let usage = Arc::new(UsageStore::open(&data_dir)?);
        let privacy = Arc::new(PrivacyStore::open(&data_dir)?);

        let catalog = Arc::new(PricingCatalog::from_config(config.clone()));
        let costs = Arc::new(CostEngine::new(catalog, usage.clone()));
        let budget = Arc::new(BudgetManager::new(config.budget.clone(), costs.clone()));

        // Attached even when disabled so a reloaded config can switch it on
        let auditor = PrivacyAuditor::from_config(&config.privacy)?;
        if config.privacy.enabled {
            info!("Privacy gate enabled: {} patterns", auditor.patterns().len());
        }
        let fabric = ComputeFabric::new(config.clone(), Arc::new(ProviderRegistry::new()))
            .with_usage(usage.clone())
            .with_budget(budget.clone())
            .with_privacy(Arc::new(auditor), Some(privacy.clone()));

        Ok(Self {
            config,
            usage,
            privacy,
            costs,
            budget,
            fabric,
        })
    }
}
