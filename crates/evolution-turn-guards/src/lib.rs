#![forbid(unsafe_code)]

pub mod intent;
pub mod neuropc;
pub mod turn;

use std::sync::Arc;

use evolution_turn_core::{
    EvolutionStore, EvolutionTurnInvariant, GuardConfig, InvariantError, InvariantRegistry,
};

pub use intent::{
    check_turn_eligibility, compile_template_to_proposal, detect_evolution_intent, plan_turn,
    EvolutionIntent, EvolutionIntentKind, EvolutionTemplateId, EvolutionTemplateRequest,
    TurnEligibility, TurnPlan, TurnSmartMeta,
};
pub use neuropc::{SmartEvoTurnNeuropc, SMART_EVO_TURN_NEUROPC};
pub use turn::{evaluate_check, validate_turn, TurnReport, TurnRequest};

/// Registry holding the rules a host node ships with.
///
/// `wrap` lets the caller decorate each rule (metering, tracing) before it
/// is registered.
pub fn default_registry<S, F>(
    store: Arc<S>,
    config: GuardConfig,
    wrap: F,
) -> Result<InvariantRegistry, InvariantError>
where
    S: EvolutionStore + 'static,
    F: Fn(SmartEvoTurnNeuropc<S>) -> Arc<dyn EvolutionTurnInvariant>,
{
    let mut registry = InvariantRegistry::new();
    registry.register(wrap(SmartEvoTurnNeuropc::new(store, config)))?;
    Ok(registry)
}
