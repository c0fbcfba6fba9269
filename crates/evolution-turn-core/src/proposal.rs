use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum Reversibility {
    FullyReversible,
    PartiallyReversible,
    Irreversible,
}

/// One actuation pattern carried by a proposal.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct BiophysicalPattern {
    /// e.g. "cortex.visual.v1", "peripheral.haptics.leftarm".
    pub target: String,
    /// Host DID the actuation lands on.
    pub target_host: String,
    pub intensity: f32,
    pub duration_secs: u64,
    pub reversibility: Reversibility,
    /// Where dissipated (negative) energy is routed, if anywhere.
    #[serde(default)]
    pub negative_energy_sink: Option<String>,
}

/// The AI-chat turn a proposal was compiled from.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatContext {
    pub transcripthash: String,
    pub summary: String,
}

impl ChatContext {
    pub fn summary_word_count(&self) -> usize {
        self.summary.split_whitespace().count()
    }
}

/// Host consent for non-reversible patterns, bound to one proposal and one
/// transcript.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct IrreversibleToken {
    pub token_id: String,
    pub proposal_id: String,
    pub host_did: String,
    pub transcripthash: String,
    pub scope_id: String,
    pub issued_at: DateTime<Utc>,
    #[serde(default)]
    pub revoked: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct EvolutionProposal {
    pub id: String,
    pub validator_alias: String,
    pub block_id: String,
    /// Host whose microspace this proposal evolves.
    pub host_did: String,
    /// Identity the proposal acts on behalf of.
    pub subject_did: String,
    pub submitted_at: DateTime<Utc>,
    pub chat: ChatContext,
    #[serde(default)]
    pub patterns: Vec<BiophysicalPattern>,
    #[serde(default)]
    pub irreversible_token: Option<IrreversibleToken>,
    pub sovereignty_profile_id: String,
    #[serde(default)]
    pub eco_cost_nj: f64,
    #[serde(default)]
    pub brain_tokens: f64,
}

impl EvolutionProposal {
    /// True when any pattern is irreversible or only partially reversible.
    pub fn requires_irreversible_token(&self) -> bool {
        self.patterns
            .iter()
            .any(|p| p.reversibility != Reversibility::FullyReversible)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pattern(reversibility: Reversibility) -> BiophysicalPattern {
        BiophysicalPattern {
            target: "peripheral.haptics.leftarm".into(),
            target_host: "did:aln:host-a".into(),
            intensity: 0.2,
            duration_secs: 30,
            reversibility,
            negative_energy_sink: None,
        }
    }

    fn proposal(patterns: Vec<BiophysicalPattern>) -> EvolutionProposal {
        EvolutionProposal {
            id: "prop-1".into(),
            validator_alias: "validator-1".into(),
            block_id: "block-1".into(),
            host_did: "did:aln:host-a".into(),
            subject_did: "did:aln:host-a".into(),
            submitted_at: Utc::now(),
            chat: ChatContext {
                transcripthash: String::new(),
                summary: "haptic guidance pulse pair".into(),
            },
            patterns,
            irreversible_token: None,
            sovereignty_profile_id: "microspace-v1".into(),
            eco_cost_nj: 0.0,
            brain_tokens: 0.0,
        }
    }

    #[test]
    fn reversible_patterns_need_no_token() {
        let p = proposal(vec![
            pattern(Reversibility::FullyReversible),
            pattern(Reversibility::FullyReversible),
        ]);
        assert!(!p.requires_irreversible_token());
        assert!(!proposal(Vec::new()).requires_irreversible_token());
    }

    #[test]
    fn partial_reversibility_needs_token() {
        let p = proposal(vec![
            pattern(Reversibility::FullyReversible),
            pattern(Reversibility::PartiallyReversible),
        ]);
        assert!(p.requires_irreversible_token());
    }

    #[test]
    fn summary_words_ignore_extra_whitespace() {
        let chat = ChatContext {
            transcripthash: String::new(),
            summary: "  visual   focus\nmicro-epoch ".into(),
        };
        assert_eq!(chat.summary_word_count(), 3);
    }
}
