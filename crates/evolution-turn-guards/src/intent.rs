//! Chat-turn intake: from one AI-chat turn to at most one constrained
//! evolution proposal.
//!
//! Intent is read from the turn summary, eligibility from the validator's
//! turn ledger, and only fixed templates compile into proposals. A turn that
//! is not eligible is recorded log-only and produces no proposal.

use chrono::{DateTime, Utc};
use evolution_turn_core::{
    hash_transcript, BiophysicalPattern, ChatContext, EvolutionProposal, Reversibility,
    TurnBudgetPolicy, TurnLedger,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum EvolutionIntentKind {
    None,
    MicroEpoch,
    SingleStep,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct EvolutionIntent {
    pub kind: EvolutionIntentKind,
    /// BRAIN, WAVE, BLOOD, OXYGEN, ... when inferred.
    pub domain: Option<String>,
    /// Host-chosen risk tier label, e.g. "low", "medium".
    pub risk_tier: Option<String>,
}

impl EvolutionIntent {
    pub fn none() -> Self {
        Self {
            kind: EvolutionIntentKind::None,
            domain: None,
            risk_tier: None,
        }
    }

    pub fn is_evolution(&self) -> bool {
        self.kind != EvolutionIntentKind::None
    }
}

/// Detect an evolution intent from the tags in a chat summary.
pub fn detect_evolution_intent(summary: &str) -> EvolutionIntent {
    let lower = summary.to_lowercase();
    let (kind, risk_tier) = if lower.contains("single-step") {
        (EvolutionIntentKind::SingleStep, "medium")
    } else if lower.contains("cybernetical-evolution")
        || lower.contains("evolution-step")
        || lower.contains("micro-epoch")
    {
        (EvolutionIntentKind::MicroEpoch, "low")
    } else {
        return EvolutionIntent::none();
    };

    EvolutionIntent {
        kind,
        domain: Some("BRAIN".into()),
        risk_tier: Some(risk_tier.into()),
    }
}

/// The fixed templates a chat turn may compile into.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum EvolutionTemplateId {
    MicroEpochVisualFocusV1,
    MicroEpochHapticGuidanceLeftRightV1,
}

impl EvolutionTemplateId {
    pub const ALL: [EvolutionTemplateId; 2] = [
        EvolutionTemplateId::MicroEpochVisualFocusV1,
        EvolutionTemplateId::MicroEpochHapticGuidanceLeftRightV1,
    ];

    pub fn name(self) -> &'static str {
        match self {
            EvolutionTemplateId::MicroEpochVisualFocusV1 => "visual-focus",
            EvolutionTemplateId::MicroEpochHapticGuidanceLeftRightV1 => "haptic-guidance",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.name() == name)
    }

    /// Pattern asset the template is justified by.
    pub fn pattern_uri(self) -> &'static str {
        match self {
            EvolutionTemplateId::MicroEpochVisualFocusV1 => {
                "neuro://pattern/PAT.VisualEdgeEnhanceKernelV1"
            }
            EvolutionTemplateId::MicroEpochHapticGuidanceLeftRightV1 => {
                "neuro://pattern/PAT.HapticGuidancePulsePairV1"
            }
        }
    }

    /// (eco nJ, brain tokens) one turn of this template costs.
    fn cost(self) -> (f64, f64) {
        match self {
            EvolutionTemplateId::MicroEpochVisualFocusV1 => (12.5, 0.25),
            EvolutionTemplateId::MicroEpochHapticGuidanceLeftRightV1 => (20.0, 0.5),
        }
    }

    fn patterns(self, host_did: &str) -> Vec<BiophysicalPattern> {
        let pattern = |target: &str, intensity: f32, duration_secs: u64| BiophysicalPattern {
            target: target.into(),
            target_host: host_did.into(),
            intensity,
            duration_secs,
            reversibility: Reversibility::FullyReversible,
            negative_energy_sink: None,
        };
        match self {
            EvolutionTemplateId::MicroEpochVisualFocusV1 => {
                vec![pattern("cortex.visual.v1", 0.25, 45)]
            }
            EvolutionTemplateId::MicroEpochHapticGuidanceLeftRightV1 => vec![
                pattern("peripheral.haptics.leftarm", 0.20, 30),
                pattern("peripheral.haptics.rightarm", 0.20, 30),
            ],
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EvolutionTemplateRequest {
    pub template: EvolutionTemplateId,
    pub proposal_id: String,
    pub validator_alias: String,
    pub block_id: String,
    pub host_did: String,
    pub sovereignty_profile_id: String,
    pub submitted_at: DateTime<Utc>,
    pub chat: ChatContext,
}

/// Compile a template request into a self-only, host-bounded proposal.
pub fn compile_template_to_proposal(req: EvolutionTemplateRequest) -> EvolutionProposal {
    let (eco_cost_nj, brain_tokens) = req.template.cost();
    EvolutionProposal {
        patterns: req.template.patterns(&req.host_did),
        id: req.proposal_id,
        validator_alias: req.validator_alias,
        block_id: req.block_id,
        subject_did: req.host_did.clone(),
        host_did: req.host_did,
        submitted_at: req.submitted_at,
        chat: req.chat,
        irreversible_token: None,
        sovereignty_profile_id: req.sovereignty_profile_id,
        eco_cost_nj,
        brain_tokens,
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum TurnEligibility {
    Eligible,
    LogOnly(String),
}

/// Whether `validator_alias` may take an evolution turn at `now`.
///
/// An exhausted daily budget, too-close spacing, or an unreadable ledger
/// puts the turn in log-only mode.
pub fn check_turn_eligibility<L: TurnLedger + ?Sized>(
    ledger: &L,
    policy: &TurnBudgetPolicy,
    validator_alias: &str,
    now: DateTime<Utc>,
) -> TurnEligibility {
    if validator_alias.trim().is_empty() {
        return TurnEligibility::LogOnly("validator_alias is blank".into());
    }
    let turns = match ledger.turns_for_validator(validator_alias) {
        Ok(t) => t,
        Err(e) => return TurnEligibility::LogOnly(e.to_string()),
    };

    let errors = policy.check_interval(validator_alias, now, &turns);
    if errors.is_empty() {
        TurnEligibility::Eligible
    } else {
        TurnEligibility::LogOnly(format!(
            "evolution-interval budget or spacing exhausted: {}",
            errors.join("; ")
        ))
    }
}

/// SMART metadata tagged onto an accepted turn.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TurnSmartMeta {
    pub learning_epoch: u64,
    pub qpudatashard_id: String,
    pub entropy_seed_hex: String,
}

impl TurnSmartMeta {
    /// Seed is derived from epoch and shard, so replays of a turn agree.
    pub fn for_epoch(epoch: u64, shard: &str) -> Self {
        Self {
            learning_epoch: epoch,
            qpudatashard_id: shard.to_string(),
            entropy_seed_hex: hash_transcript(&format!("evo-turn-seed:{epoch}:{shard}")),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum TurnPlan {
    LogOnly {
        intent: EvolutionIntent,
        reason: String,
    },
    Propose {
        intent: EvolutionIntent,
        proposal: Box<EvolutionProposal>,
        meta: TurnSmartMeta,
    },
}

impl TurnPlan {
    pub fn proposal(&self) -> Option<&EvolutionProposal> {
        match self {
            TurnPlan::Propose { proposal, .. } => Some(&**proposal),
            TurnPlan::LogOnly { .. } => None,
        }
    }
}

/// Intent, eligibility, then compilation: the whole intake for one chat turn.
pub fn plan_turn<L: TurnLedger + ?Sized>(
    ledger: &L,
    policy: &TurnBudgetPolicy,
    request: EvolutionTemplateRequest,
    meta: TurnSmartMeta,
) -> TurnPlan {
    let intent = detect_evolution_intent(&request.chat.summary);
    if !intent.is_evolution() {
        info!(proposal_id = %request.proposal_id, "no evolution intent in chat turn, log-only");
        return TurnPlan::LogOnly {
            intent,
            reason: "no evolution intent detected in chat summary".into(),
        };
    }

    match check_turn_eligibility(ledger, policy, &request.validator_alias, request.submitted_at) {
        TurnEligibility::LogOnly(reason) => {
            warn!(
                validator_alias = %request.validator_alias,
                proposal_id = %request.proposal_id,
                %reason,
                "evolution turn not eligible, log-only"
            );
            TurnPlan::LogOnly { intent, reason }
        }
        TurnEligibility::Eligible => {
            info!(
                proposal_id = %request.proposal_id,
                template = request.template.name(),
                pattern_uri = request.template.pattern_uri(),
                epoch = meta.learning_epoch,
                "compiled evolution proposal from chat turn"
            );
            TurnPlan::Propose {
                intent,
                proposal: Box::new(compile_template_to_proposal(request)),
                meta,
            }
        }
    }
}
