//! Per-turn evolution budget discipline.
//!
//! Parameters are host-authored (loaded through `GuardConfig`), but the
//! corridor they may move in is fixed here: configuration can tighten the
//! budget, never loosen it past the hard ceilings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::proposal::EvolutionProposal;

pub const MAX_TURNS_PER_DAY_CEILING: u8 = 10;
pub const MIN_SECONDS_BETWEEN_TURNS_FLOOR: u32 = 60;

/// An evolution turn already accepted for a validator.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TurnRecord {
    pub validator_alias: String,
    pub proposal_id: String,
    pub block_id: String,
    pub at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TurnBudgetPolicy {
    pub max_turns_per_day: u8,
    pub min_seconds_between_turns: u32,
    pub max_turns_per_block: u8,
    pub max_eco_nj_per_turn: f64,
    pub max_brain_tokens_per_turn: f64,
}

impl Default for TurnBudgetPolicy {
    fn default() -> Self {
        Self {
            max_turns_per_day: MAX_TURNS_PER_DAY_CEILING,
            min_seconds_between_turns: MIN_SECONDS_BETWEEN_TURNS_FLOOR,
            max_turns_per_block: 1,
            max_eco_nj_per_turn: 52.0,
            max_brain_tokens_per_turn: 1.0,
        }
    }
}

fn non_negative_finite(v: f64) -> f64 {
    if v.is_finite() && v > 0.0 {
        v
    } else {
        0.0
    }
}

impl TurnBudgetPolicy {
    /// Clamp loaded values into the allowed corridor.
    pub fn normalized(self) -> Self {
        let max_turns_per_day = self.max_turns_per_day.min(MAX_TURNS_PER_DAY_CEILING);
        let max_turns_per_block = if max_turns_per_day == 0 {
            0
        } else {
            self.max_turns_per_block.clamp(1, max_turns_per_day)
        };

        Self {
            max_turns_per_day,
            min_seconds_between_turns: self
                .min_seconds_between_turns
                .max(MIN_SECONDS_BETWEEN_TURNS_FLOOR),
            max_turns_per_block,
            max_eco_nj_per_turn: non_negative_finite(self.max_eco_nj_per_turn),
            max_brain_tokens_per_turn: non_negative_finite(self.max_brain_tokens_per_turn),
        }
    }

    /// Daily-cap and spacing violations for a turn by `validator_alias` at
    /// `at`, counting every turn of that validator in `ledger`.
    pub fn check_interval(
        &self,
        validator_alias: &str,
        at: DateTime<Utc>,
        ledger: &[TurnRecord],
    ) -> Vec<String> {
        let prior: Vec<&TurnRecord> = ledger
            .iter()
            .filter(|t| t.validator_alias == validator_alias)
            .collect();
        self.interval_violations(validator_alias, at, &prior)
    }

    /// Violations of this budget by `proposal`, given the validator's ledger.
    ///
    /// Ledger entries for the proposal itself are ignored, so checking an
    /// already-recorded turn again yields the same answer.
    pub fn check(&self, proposal: &EvolutionProposal, ledger: &[TurnRecord]) -> Vec<String> {
        let others: Vec<&TurnRecord> = ledger
            .iter()
            .filter(|t| t.validator_alias == proposal.validator_alias && t.proposal_id != proposal.id)
            .collect();

        let mut errors =
            self.interval_violations(&proposal.validator_alias, proposal.submitted_at, &others);

        let same_block = others
            .iter()
            .filter(|t| t.block_id == proposal.block_id)
            .count();
        if same_block >= usize::from(self.max_turns_per_block) {
            errors.push(format!(
                "block '{}' already carries {} of {} turns for validator '{}'",
                proposal.block_id, same_block, self.max_turns_per_block, proposal.validator_alias
            ));
        }

        check_ceiling(
            &mut errors,
            "eco_cost_nj",
            proposal.eco_cost_nj,
            self.max_eco_nj_per_turn,
        );
        check_ceiling(
            &mut errors,
            "brain_tokens",
            proposal.brain_tokens,
            self.max_brain_tokens_per_turn,
        );

        errors
    }

    fn interval_violations(
        &self,
        validator_alias: &str,
        at: DateTime<Utc>,
        prior: &[&TurnRecord],
    ) -> Vec<String> {
        let mut errors = Vec::new();

        let day = at.date_naive();
        let same_day = prior.iter().filter(|t| t.at.date_naive() == day).count();
        if same_day >= usize::from(self.max_turns_per_day) {
            errors.push(format!(
                "validator '{}' already used {} of {} evolution turns on {}",
                validator_alias, same_day, self.max_turns_per_day, day
            ));
        }

        let closest = prior
            .iter()
            .map(|t| (t, (at - t.at).num_seconds().abs()))
            .min_by_key(|(_, gap)| *gap);
        if let Some((turn, gap)) = closest {
            if gap < i64::from(self.min_seconds_between_turns) {
                errors.push(format!(
                    "turn spacing {}s to proposal '{}' is below minimum {}s",
                    gap, turn.proposal_id, self.min_seconds_between_turns
                ));
            }
        }

        errors
    }
}

fn check_ceiling(errors: &mut Vec<String>, field: &str, value: f64, ceiling: f64) {
    if !value.is_finite() || value < 0.0 {
        errors.push(format!("{field} must be finite and >= 0 (got {value})"));
    } else if value > ceiling {
        errors.push(format!("{field}={value} exceeds per-turn ceiling {ceiling}"));
    }
}
