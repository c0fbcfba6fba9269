//! Per-turn validation: every registered rule, every check, one report.

use chrono::{DateTime, Utc};
use evolution_turn_core::{CheckKind, CheckOutcome, EvolutionTurnInvariant, InvariantRegistry};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Arguments for one evolution turn, as a validator submits them.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TurnRequest {
    pub validator_alias: String,
    pub proposal_id: String,
    pub block_id: String,
    pub transcripthash: String,
    #[serde(default)]
    pub irreversible_required: bool,
    pub sovereignty_profile_id: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TurnReport {
    pub evaluation_id: Uuid,
    pub evaluated_at: DateTime<Utc>,
    pub proposal_id: String,
    pub outcomes: Vec<CheckOutcome>,
}

impl TurnReport {
    /// True only if at least one check ran and every check passed.
    pub fn all_passed(&self) -> bool {
        !self.outcomes.is_empty() && self.outcomes.iter().all(CheckOutcome::passed)
    }

    pub fn failures(&self) -> impl Iterator<Item = &CheckOutcome> {
        self.outcomes.iter().filter(|o| !o.passed())
    }
}

pub fn evaluate_check(
    rule: &dyn EvolutionTurnInvariant,
    check: CheckKind,
    request: &TurnRequest,
) -> CheckOutcome {
    let verdict = match check {
        CheckKind::TurnBudget => rule.evaluate_turn_budget(
            &request.validator_alias,
            &request.proposal_id,
            &request.block_id,
        ),
        CheckKind::TraceabilityAndConsent => rule.evaluate_traceability_and_consent(
            &request.proposal_id,
            &request.transcripthash,
            request.irreversible_required,
        ),
        CheckKind::MicrospaceSovereignty => rule
            .evaluate_microspace_sovereignty(&request.proposal_id, &request.sovereignty_profile_id),
    };
    CheckOutcome {
        rule_id: rule.id().to_string(),
        check,
        verdict,
    }
}

/// Run all three checks for every rule, in rule-id order.
pub fn validate_turn(registry: &InvariantRegistry, request: &TurnRequest) -> TurnReport {
    let mut outcomes = Vec::with_capacity(registry.len() * CheckKind::ALL.len());
    for rule in registry.iter() {
        for check in CheckKind::ALL {
            outcomes.push(evaluate_check(rule.as_ref(), check, request));
        }
    }

    TurnReport {
        evaluation_id: Uuid::new_v4(),
        evaluated_at: Utc::now(),
        proposal_id: request.proposal_id.clone(),
        outcomes,
    }
}
