//! Compute fabric: walks a role's candidate chain through the gates.
//!
//! Per candidate, in fixed order:
//! 1. resolve the model (unknown ids are skipped, no callback, no ledger row)
//! 2. privacy gate (cloud, non-private models only)
//! 3. budget gate (cloud models only)
//! 4. backend call; the first reply longer than five characters wins
//!
//! The configuration is an immutable snapshot behind an `Arc`; a call
//! captures it once and runs to completion against it even if
//! `update_config` swaps in a new one mid-flight. The privacy auditor is
//! built from the snapshot and lives beside it. Budget limits and pricing
//! are pushed into the shared `BudgetManager` on each swap.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};

use aurarouter_core::{ModelConfig, Result, RouterConfig};
use aurarouter_privacy::PrivacyAuditor;
use aurarouter_providers::{GenerateResult, Provider, ProviderFactory};
use aurarouter_savings::{BudgetDecision, BudgetManager};
use aurarouter_store::{PrivacyStore, UsageRecord, UsageStore};

use crate::types::*;

/// Replies at or below this many characters (after trimming) count as failures.
pub const MIN_RESPONSE_CHARS: usize = 5;

/// Config snapshot plus the backends and auditor built from it.
struct FabricState {
    config: Arc<RouterConfig>,
    auditor: Option<Arc<PrivacyAuditor>>,
    providers: Mutex<HashMap<String, Arc<dyn Provider>>>,
}

impl FabricState {
    fn new(config: Arc<RouterConfig>, auditor: Option<Arc<PrivacyAuditor>>) -> Self {
        Self {
            config,
            auditor,
            providers: Mutex::new(HashMap::new()),
        }
    }
}

pub struct ComputeFabric {
    state: RwLock<Arc<FabricState>>,
    factory: Arc<dyn ProviderFactory>,
    /// Set by `with_privacy`; reloads rebuild the auditor from config.
    privacy_attached: bool,
    privacy_store: Option<Arc<PrivacyStore>>,
    budget: Option<Arc<BudgetManager>>,
    usage: Option<Arc<UsageStore>>,
}

impl ComputeFabric {
    pub fn new(config: Arc<RouterConfig>, factory: Arc<dyn ProviderFactory>) -> Self {
        info!(
            "ComputeFabric initialized: {} roles, {} models",
            config.roles.len(),
            config.models.len()
        );
        Self {
            state: RwLock::new(Arc::new(FabricState::new(config, None))),
            factory,
            privacy_attached: false,
            privacy_store: None,
            budget: None,
            usage: None,
        }
    }

    /// Enable the privacy gate. Hits are written to `store` when given.
    /// The gate only runs while the snapshot has `privacy.enabled` set.
    pub fn with_privacy(
        mut self,
        auditor: Arc<PrivacyAuditor>,
        store: Option<Arc<PrivacyStore>>,
    ) -> Self {
        let config = self.state.get_mut().config.clone();
        *self.state.get_mut() = Arc::new(FabricState::new(config, Some(auditor)));
        self.privacy_attached = true;
        self.privacy_store = store;
        self
    }

    /// Enable the budget gate.
    pub fn with_budget(mut self, budget: Arc<BudgetManager>) -> Self {
        self.budget = Some(budget);
        self
    }

    /// Record completed attempts to the usage ledger.
    pub fn with_usage(mut self, usage: Arc<UsageStore>) -> Self {
        self.usage = Some(usage);
        self
    }

    /// Current configuration snapshot.
    pub fn config(&self) -> Arc<RouterConfig> {
        self.state.read().config.clone()
    }

    /// Swap the configuration snapshot. Calls already running keep the old
    /// chain and auditor. On error the current snapshot stays in place.
    pub fn update_config(&self, config: Arc<RouterConfig>) -> Result<()> {
        let auditor = if self.privacy_attached && config.privacy.enabled {
            Some(Arc::new(PrivacyAuditor::from_config(&config.privacy)?))
        } else {
            None
        };
        let roles = config.roles.len();
        let models = config.models.len();
        *self.state.write() = Arc::new(FabricState::new(config.clone(), auditor));
        if let Some(budget) = &self.budget {
            budget.reload(&config);
        }
        info!("Config swapped: {} roles, {} models", roles, models);
        Ok(())
    }

    /// Run `prompt` against `role`'s chain.
    ///
    /// Returns the first qualifying reply, a `BUDGET_EXCEEDED` message when
    /// cloud spend blocked a chain with no local fallback, or `None`.
    pub fn execute(
        &self,
        role: &str,
        prompt: &str,
        json_mode: bool,
        on_attempt: impl FnMut(&AttemptReport),
    ) -> Option<String> {
        let mut request = ExecuteRequest::new(role, prompt);
        request.json_mode = json_mode;
        self.dispatch(&request, on_attempt).into_text()
    }

    pub fn execute_request(
        &self,
        request: &ExecuteRequest<'_>,
        on_attempt: impl FnMut(&AttemptReport),
    ) -> Option<String> {
        self.dispatch(request, on_attempt).into_text()
    }

    /// Walk the chain and return the tagged outcome.
    pub fn dispatch(
        &self,
        request: &ExecuteRequest<'_>,
        mut on_attempt: impl FnMut(&AttemptReport),
    ) -> FabricOutcome {
        let state = self.state.read().clone();
        let config = &state.config;
        let role = request.role;

        let chain = config.role_chain(role);
        if chain.is_empty() {
            warn!("No chain configured for role '{}'", role);
            return FabricOutcome::Exhausted;
        }

        let mut report = |model_id: &str, outcome: AttemptOutcome, elapsed: Duration| {
            on_attempt(&AttemptReport {
                role: role.to_string(),
                model_id: model_id.to_string(),
                success: outcome == AttemptOutcome::Success,
                elapsed,
                outcome,
            });
        };

        let mut budget_denial: Option<BudgetDecision> = None;
        let mut saw_local = false;

        for model_id in chain {
            let Some(model) = config.model_config(model_id) else {
                warn!("Role '{}' references unknown model '{}', skipping", role, model_id);
                continue;
            };

            let is_cloud = model.is_cloud();
            if !is_cloud {
                saw_local = true;
            }

            if is_cloud && self.privacy_blocked(&state, request, model_id, model) {
                report(model_id, AttemptOutcome::PrivacyBlocked, Duration::ZERO);
                continue;
            }

            if is_cloud {
                if let Some(budget) = &self.budget {
                    // One denial holds for every later cloud candidate in this call
                    if budget_denial.is_none() {
                        let decision = budget.check(true);
                        if !decision.allowed {
                            budget_denial = Some(decision);
                        }
                    }
                    if budget_denial.is_some() {
                        warn!("Budget gate skipped {} for role '{}'", model_id, role);
                        report(model_id, AttemptOutcome::BudgetBlocked, Duration::ZERO);
                        continue;
                    }
                }
            }

            // No backend means nothing was sent, so no ledger row
            let backend = match self.provider(&state, model_id, model) {
                Ok(backend) => backend,
                Err(e) => {
                    warn!("Model {} unavailable for role '{}': {}", model_id, role, e);
                    report(model_id, AttemptOutcome::BackendError, Duration::ZERO);
                    continue;
                }
            };

            let start = Instant::now();
            let result = backend.generate(request.prompt, request.json_mode);
            let elapsed = start.elapsed();

            match result {
                Err(e) => {
                    warn!(
                        "Model {} failed for role '{}' after {:.2}s: {}",
                        model_id,
                        role,
                        elapsed.as_secs_f64(),
                        e
                    );
                    self.record_usage(request, model_id, model, None, elapsed, false);
                    report(model_id, AttemptOutcome::BackendError, elapsed);
                }
                Ok(generated) if generated.text.trim().chars().count() <= MIN_RESPONSE_CHARS => {
                    warn!(
                        "Model {} returned an empty or trivial reply for role '{}'",
                        model_id, role
                    );
                    self.record_usage(request, model_id, model, Some(&generated), elapsed, false);
                    report(model_id, AttemptOutcome::EmptyResponse, elapsed);
                }
                Ok(generated) => {
                    info!(
                        "Role '{}' answered by {} in {:.2}s ({} in / {} out tokens)",
                        role,
                        model_id,
                        elapsed.as_secs_f64(),
                        generated.input_tokens,
                        generated.output_tokens
                    );
                    self.record_usage(request, model_id, model, Some(&generated), elapsed, true);
                    report(model_id, AttemptOutcome::Success, elapsed);
                    return FabricOutcome::Success {
                        text: generated.text,
                        model_id: model_id.clone(),
                    };
                }
            }
        }

        match budget_denial {
            Some(decision) if !saw_local => {
                FabricOutcome::BudgetExceeded(budget_exceeded_message(role, &decision))
            }
            _ => {
                warn!("All candidates failed for role '{}'", role);
                FabricOutcome::Exhausted
            }
        }
    }

    /// Run the privacy gate. True when the candidate must be skipped.
    fn privacy_blocked(
        &self,
        state: &FabricState,
        request: &ExecuteRequest<'_>,
        model_id: &str,
        model: &ModelConfig,
    ) -> bool {
        let Some(auditor) = &state.auditor else {
            return false;
        };
        if !state.config.privacy.enabled || model.is_private() {
            return false;
        }
        let Some(event) = auditor.audit(request.prompt, model_id, &model.provider, model.hosting_tier)
        else {
            return false;
        };

        warn!(
            "Privacy gate skipped {} for role '{}': {}",
            model_id,
            request.role,
            event.pattern_names().join(", ")
        );
        if let Some(store) = &self.privacy_store {
            if let Err(e) = store.record(&event) {
                warn!("Failed to record privacy event: {}", e);
            }
        }
        true
    }

    fn provider(
        &self,
        state: &FabricState,
        model_id: &str,
        model: &ModelConfig,
    ) -> Result<Arc<dyn Provider>> {
        if let Some(backend) = state.providers.lock().get(model_id) {
            return Ok(backend.clone());
        }
        let backend = self.factory.create(model_id, model)?;
        state
            .providers
            .lock()
            .insert(model_id.to_string(), backend.clone());
        Ok(backend)
    }

    fn record_usage(
        &self,
        request: &ExecuteRequest<'_>,
        model_id: &str,
        model: &ModelConfig,
        generated: Option<&GenerateResult>,
        elapsed: Duration,
        success: bool,
    ) {
        let Some(usage) = &self.usage else {
            return;
        };
        let is_cloud = model.is_cloud();
        let record = UsageRecord {
            id: None,
            timestamp: Utc::now(),
            model_id: model_id.to_string(),
            provider: model.provider.clone(),
            role: request.role.to_string(),
            intent: request.intent.map(str::to_string),
            input_tokens: generated.map(|g| g.input_tokens).unwrap_or(0),
            output_tokens: generated.map(|g| g.output_tokens).unwrap_or(0),
            elapsed_secs: elapsed.as_secs_f64(),
            success,
            is_cloud,
        };
        match usage.record(&record) {
            Ok(id) => debug!("Usage row {} recorded for {}", id, model_id),
            Err(e) => warn!("Failed to record usage for {}: {}", model_id, e),
        }

        // Spend just changed; next budget check re-reads the ledger
        if is_cloud {
            if let Some(budget) = &self.budget {
                budget.invalidate();
            }
        }
    }
}

fn budget_exceeded_message(role: &str, decision: &BudgetDecision) -> String {
    let window = decision
        .window
        .map(|w| w.to_string())
        .unwrap_or_else(|| "cloud".into());
    let limit = decision
        .limit
        .map(|l| format!("${:.2}", l))
        .unwrap_or_else(|| "the limit".into());
    format!(
        "{}: {} cloud budget reached (${:.2} spent of {}). \
         Configure a local fallback model for role '{}' to keep working.",
        BUDGET_EXCEEDED_PREFIX, window, decision.spend, limit, role
    )
}
