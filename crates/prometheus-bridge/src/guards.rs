use std::sync::Arc;

use evolution_turn_core::{CheckKind, EvolutionTurnInvariant, Verdict};
use evolution_turn_guards::TurnReport;

use crate::InvariantMetrics;

/// Wraps a rule and counts every verdict it returns.
pub struct MeteredInvariant<R> {
    inner: R,
    metrics: Arc<InvariantMetrics>,
}

impl<R: EvolutionTurnInvariant> MeteredInvariant<R> {
    pub fn new(inner: R, metrics: Arc<InvariantMetrics>) -> Self {
        Self { inner, metrics }
    }

    fn record(&self, check: CheckKind, verdict: Verdict) -> Verdict {
        self.metrics.observe(self.inner.id(), check, &verdict);
        verdict
    }
}

impl<R: EvolutionTurnInvariant> EvolutionTurnInvariant for MeteredInvariant<R> {
    fn id(&self) -> &str {
        self.inner.id()
    }

    fn evaluate_turn_budget(&self, validator_alias: &str, proposal_id: &str, block_id: &str) -> Verdict {
        let verdict = self
            .inner
            .evaluate_turn_budget(validator_alias, proposal_id, block_id);
        self.record(CheckKind::TurnBudget, verdict)
    }

    fn evaluate_traceability_and_consent(
        &self,
        proposal_id: &str,
        transcripthash: &str,
        irreversible_required: bool,
    ) -> Verdict {
        let verdict = self.inner.evaluate_traceability_and_consent(
            proposal_id,
            transcripthash,
            irreversible_required,
        );
        self.record(CheckKind::TraceabilityAndConsent, verdict)
    }

    fn evaluate_microspace_sovereignty(&self, proposal_id: &str, sovereignty_profile_id: &str) -> Verdict {
        let verdict = self
            .inner
            .evaluate_microspace_sovereignty(proposal_id, sovereignty_profile_id);
        self.record(CheckKind::MicrospaceSovereignty, verdict)
    }
}

/// Count the report and return true when the turn must be rejected.
pub fn reject_if_turn_fails(metrics: &InvariantMetrics, report: &TurnReport) -> bool {
    let reject = !report.all_passed();
    let outcome = if reject { "rejected" } else { "accepted" };
    metrics.turn_reports_total.with_label_values(&[outcome]).inc();
    reject
}
