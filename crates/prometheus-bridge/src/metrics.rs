use anyhow::Context;
use evolution_turn_core::{CheckKind, Verdict};
use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};

/// Counters over evolution-turn rule evaluations, on a private registry so
/// several instances can coexist in one process.
pub struct InvariantMetrics {
    registry: Registry,
    pub evaluations_total: IntCounterVec,
    pub turn_reports_total: IntCounterVec,
}

impl InvariantMetrics {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let evaluations_total = IntCounterVec::new(
            Opts::new(
                "evolution_invariant_evaluations_total",
                "Evolution-turn invariant evaluations by rule, check and outcome",
            ),
            &["rule_id", "check", "outcome"],
        )?;
        registry.register(Box::new(evaluations_total.clone()))?;

        let turn_reports_total = IntCounterVec::new(
            Opts::new(
                "evolution_turn_reports_total",
                "Per-turn validation reports by outcome",
            ),
            &["outcome"],
        )?;
        registry.register(Box::new(turn_reports_total.clone()))?;

        Ok(Self {
            registry,
            evaluations_total,
            turn_reports_total,
        })
    }

    pub fn observe(&self, rule_id: &str, check: CheckKind, verdict: &Verdict) {
        self.evaluations_total
            .with_label_values(&[rule_id, check.as_str(), verdict.label()])
            .inc();
    }

    pub fn evaluations(&self, rule_id: &str, check: CheckKind, outcome: &str) -> u64 {
        self.evaluations_total
            .with_label_values(&[rule_id, check.as_str(), outcome])
            .get()
    }

    /// Prometheus text exposition of everything gathered so far.
    pub fn render_text(&self) -> anyhow::Result<String> {
        let mut buf = Vec::new();
        TextEncoder::new()
            .encode(&self.registry.gather(), &mut buf)
            .context("encode evolution-turn metrics")?;
        String::from_utf8(buf).context("metrics exposition is not UTF-8")
    }
}
