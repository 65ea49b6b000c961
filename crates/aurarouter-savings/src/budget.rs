//! Budget admission for cloud models.
//!
//! Daily and monthly spend are cached for `cache_ttl_secs` so the gate does
//! not hit the ledger on every check. Decisions are therefore eventually
//! consistent: concurrent calls inside one TTL window can all see the same
//! stale figure and overshoot the limit by at most the cost of the calls
//! in flight. The fabric invalidates the cache after every cloud usage row.
//!
//! Limits come from the config given at construction and are replaced by
//! `reload` when the router swaps its config snapshot.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tracing::{debug, info, warn};

use aurarouter_core::{BudgetConfig, Result, RouterConfig};
use aurarouter_store::TimeRange;

use crate::cost::{day_start, month_start, CostEngine};
use crate::pricing::PricingCatalog;

/// Anything that can report spend since a point in time.
pub trait SpendSource: Send + Sync {
    fn spend_since(&self, start: DateTime<Utc>) -> Result<f64>;

    /// Pick up pricing from a new config snapshot.
    fn reload(&self, _config: &Arc<RouterConfig>) {}
}

impl SpendSource for CostEngine {
    fn spend_since(&self, start: DateTime<Utc>) -> Result<f64> {
        self.total_spend(TimeRange::since(start))
    }

    fn reload(&self, config: &Arc<RouterConfig>) {
        self.set_catalog(Arc::new(PricingCatalog::from_config(config.clone())));
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowKind {
    Daily,
    Monthly,
}

impl WindowKind {
    fn start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            WindowKind::Daily => day_start(now),
            WindowKind::Monthly => month_start(now),
        }
    }
}

impl std::fmt::Display for WindowKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WindowKind::Daily => write!(f, "daily"),
            WindowKind::Monthly => write!(f, "monthly"),
        }
    }
}

/// Cached spend for one window.
#[derive(Debug)]
struct BudgetWindow {
    kind: WindowKind,
    cached_total: f64,
    cached_at: Option<Instant>,
    window_start: Option<DateTime<Utc>>,
}

impl BudgetWindow {
    fn new(kind: WindowKind) -> Self {
        Self {
            kind,
            cached_total: 0.0,
            cached_at: None,
            window_start: None,
        }
    }

    fn is_fresh(&self, ttl: Duration, start: DateTime<Utc>) -> bool {
        match (self.cached_at, self.window_start) {
            (Some(at), Some(cached_start)) => cached_start == start && at.elapsed() < ttl,
            _ => false,
        }
    }
}

/// Result of one admission check.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BudgetDecision {
    pub allowed: bool,
    /// The window that denied, if any.
    pub window: Option<WindowKind>,
    pub spend: f64,
    pub limit: Option<f64>,
}

impl BudgetDecision {
    fn allow() -> Self {
        Self {
            allowed: true,
            window: None,
            spend: 0.0,
            limit: None,
        }
    }
}

/// Snapshot of both windows for reporting.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetStatus {
    pub enabled: bool,
    pub daily_spend: f64,
    pub daily_limit: Option<f64>,
    pub monthly_spend: f64,
    pub monthly_limit: Option<f64>,
    pub allowed: bool,
}

pub struct BudgetManager {
    config: RwLock<BudgetConfig>,
    source: Arc<dyn SpendSource>,
    daily: Mutex<BudgetWindow>,
    monthly: Mutex<BudgetWindow>,
}

impl BudgetManager {
    pub fn new(config: BudgetConfig, source: Arc<dyn SpendSource>) -> Self {
        Self {
            config: RwLock::new(config),
            source,
            daily: Mutex::new(BudgetWindow::new(WindowKind::Daily)),
            monthly: Mutex::new(BudgetWindow::new(WindowKind::Monthly)),
        }
    }

    pub fn config(&self) -> BudgetConfig {
        self.config.read().clone()
    }

    /// Take limits and pricing from a new snapshot and drop cached totals.
    pub fn reload(&self, config: &Arc<RouterConfig>) {
        *self.config.write() = config.budget.clone();
        self.source.reload(config);
        self.invalidate();
        info!(
            "Budget reloaded: enabled={}, daily={:?}, monthly={:?}",
            config.budget.enabled, config.budget.daily_limit, config.budget.monthly_limit
        );
    }

    pub fn is_allowed(&self, is_cloud: bool) -> bool {
        self.check(is_cloud).allowed
    }

    /// Admission check. Local calls and a disabled budget always pass.
    pub fn check(&self, is_cloud: bool) -> BudgetDecision {
        let config = self.config();
        if !is_cloud || !config.enabled {
            return BudgetDecision::allow();
        }

        let ttl = Duration::from_secs(config.cache_ttl_secs);
        let windows = [
            (&self.daily, config.daily_limit),
            (&self.monthly, config.monthly_limit),
        ];
        for (window, limit) in windows {
            let Some(limit) = limit else { continue };
            let mut window = window.lock();
            let kind = window.kind;
            let spend = match self.window_spend(&mut window, ttl) {
                Ok(spend) => spend,
                Err(e) => {
                    warn!("Budget {} spend unavailable, allowing: {}", kind, e);
                    continue;
                }
            };
            if spend >= limit {
                return BudgetDecision {
                    allowed: false,
                    window: Some(kind),
                    spend,
                    limit: Some(limit),
                };
            }
        }

        BudgetDecision::allow()
    }

    /// Current spend and limits for both windows.
    pub fn status(&self) -> Result<BudgetStatus> {
        let config = self.config();
        let ttl = Duration::from_secs(config.cache_ttl_secs);
        let daily_spend = self.window_spend(&mut self.daily.lock(), ttl)?;
        let monthly_spend = self.window_spend(&mut self.monthly.lock(), ttl)?;
        let over = |spend: f64, limit: Option<f64>| limit.map(|l| spend >= l).unwrap_or(false);

        Ok(BudgetStatus {
            enabled: config.enabled,
            daily_spend,
            daily_limit: config.daily_limit,
            monthly_spend,
            monthly_limit: config.monthly_limit,
            allowed: !config.enabled
                || !(over(daily_spend, config.daily_limit)
                    || over(monthly_spend, config.monthly_limit)),
        })
    }

    /// Drop cached totals so the next check re-reads the ledger.
    pub fn invalidate(&self) {
        self.daily.lock().cached_at = None;
        self.monthly.lock().cached_at = None;
    }

    fn window_spend(&self, window: &mut BudgetWindow, ttl: Duration) -> Result<f64> {
        let start = window.kind.start(Utc::now());
        if window.is_fresh(ttl, start) {
            return Ok(window.cached_total);
        }

        let total = self.source.spend_since(start)?;
        debug!("Budget {} spend refreshed: ${:.4}", window.kind, total);
        window.cached_total = total;
        window.cached_at = Some(Instant::now());
        window.window_start = Some(start);
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricing::ModelPrice;
    use aurarouter_core::{Error, ModelConfig};
    use aurarouter_store::{UsageRecord, UsageStore};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    struct FixedSpend {
        spend: Mutex<f64>,
        reads: AtomicUsize,
        fail: bool,
    }

    impl FixedSpend {
        fn new(spend: f64) -> Arc<Self> {
            Arc::new(Self {
                spend: Mutex::new(spend),
                reads: AtomicUsize::new(0),
                fail: false,
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                spend: Mutex::new(0.0),
                reads: AtomicUsize::new(0),
                fail: true,
            })
        }
    }

    impl SpendSource for FixedSpend {
        fn spend_since(&self, _start: DateTime<Utc>) -> Result<f64> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(Error::Database("ledger offline".into()));
            }
            Ok(*self.spend.lock())
        }
    }

    fn config(daily: Option<f64>, monthly: Option<f64>) -> BudgetConfig {
        BudgetConfig {
            enabled: true,
            daily_limit: daily,
            monthly_limit: monthly,
            cache_ttl_secs: 30,
        }
    }

    #[test]
    fn test_local_always_allowed() {
        let source = FixedSpend::new(100.0);
        let budget = BudgetManager::new(config(Some(5.0), None), source.clone());
        assert!(budget.is_allowed(false));
        assert_eq!(source.reads.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_disabled_budget_allows() {
        let source = FixedSpend::new(100.0);
        let mut cfg = config(Some(5.0), None);
        cfg.enabled = false;
        let budget = BudgetManager::new(cfg, source);
        assert!(budget.is_allowed(true));
    }

    #[test]
    fn test_daily_limit_denies() {
        let budget = BudgetManager::new(config(Some(5.0), None), FixedSpend::new(10.0));
        let decision = budget.check(true);
        assert!(!decision.allowed);
        assert_eq!(decision.window, Some(WindowKind::Daily));
        assert_eq!(decision.spend, 10.0);
        assert_eq!(decision.limit, Some(5.0));
    }

    #[test]
    fn test_limit_reached_exactly_denies() {
        let budget = BudgetManager::new(config(None, Some(5.0)), FixedSpend::new(5.0));
        let decision = budget.check(true);
        assert!(!decision.allowed);
        assert_eq!(decision.window, Some(WindowKind::Monthly));
    }

    #[test]
    fn test_under_limit_allows() {
        let budget = BudgetManager::new(config(Some(5.0), Some(50.0)), FixedSpend::new(1.0));
        assert!(budget.is_allowed(true));
    }

    #[test]
    fn test_cache_ttl_and_invalidate() {
        let source = FixedSpend::new(1.0);
        let budget = BudgetManager::new(config(Some(5.0), None), source.clone());

        assert!(budget.is_allowed(true));
        assert!(budget.is_allowed(true));
        assert_eq!(source.reads.load(Ordering::SeqCst), 1);

        // Stale cache still allows after spend jumps
        *source.spend.lock() = 9.0;
        assert!(budget.is_allowed(true));

        budget.invalidate();
        assert!(!budget.is_allowed(true));
        assert_eq!(source.reads.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_zero_ttl_always_rereads() {
        let source = FixedSpend::new(1.0);
        let mut cfg = config(Some(5.0), None);
        cfg.cache_ttl_secs = 0;
        let budget = BudgetManager::new(cfg, source.clone());
        budget.check(true);
        budget.check(true);
        assert_eq!(source.reads.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_ledger_failure_fails_open() {
        let budget = BudgetManager::new(config(Some(5.0), Some(10.0)), FixedSpend::failing());
        assert!(budget.is_allowed(true));
        assert!(budget.status().is_err());
    }

    #[test]
    fn test_status() {
        let budget = BudgetManager::new(config(Some(5.0), Some(100.0)), FixedSpend::new(7.5));
        let status = budget.status().unwrap();
        assert!(status.enabled);
        assert_eq!(status.daily_spend, 7.5);
        assert_eq!(status.monthly_spend, 7.5);
        assert!(!status.allowed);
    }

    #[test]
    fn test_reload_swaps_limits_and_drops_cache() {
        let source = FixedSpend::new(7.0);
        let budget = BudgetManager::new(config(Some(5.0), None), source.clone());
        assert!(!budget.is_allowed(true));
        assert_eq!(source.reads.load(Ordering::SeqCst), 1);

        let mut snapshot = RouterConfig::default();
        snapshot.budget = config(Some(50.0), None);
        budget.reload(&Arc::new(snapshot));

        assert_eq!(budget.config().daily_limit, Some(50.0));
        assert!(budget.is_allowed(true));
        assert_eq!(source.reads.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_reload_reprices_cost_engine() {
        let dir = TempDir::new().unwrap();
        let usage = Arc::new(UsageStore::open(dir.path()).unwrap());
        usage
            .record(&UsageRecord {
                id: None,
                timestamp: Utc::now(),
                model_id: "fresh".into(),
                provider: "openapi".into(),
                role: "coding".into(),
                intent: None,
                input_tokens: 1_000_000,
                output_tokens: 0,
                elapsed_secs: 1.0,
                success: true,
                is_cloud: true,
            })
            .unwrap();
        let engine = Arc::new(CostEngine::new(Arc::new(PricingCatalog::new()), usage));
        let budget = BudgetManager::new(config(Some(5.0), None), engine.clone());
        assert!(budget.is_allowed(true));

        // A model added by the new snapshot carries its own price
        let mut model = ModelConfig::new("openapi");
        model.cost_per_1m_input = Some(8.0);
        model.cost_per_1m_output = Some(8.0);
        let mut snapshot = RouterConfig::default();
        snapshot.models.insert("fresh".into(), model);
        snapshot.budget = config(Some(5.0), None);
        budget.reload(&Arc::new(snapshot));

        assert_eq!(
            engine.catalog().get_price("fresh", "openapi", None),
            ModelPrice::new(8.0, 8.0)
        );
        let decision = budget.check(true);
        assert!(!decision.allowed);
        assert!((decision.spend - 8.0).abs() < 1e-9);
    }
}
