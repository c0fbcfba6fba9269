#![forbid(unsafe_code)]

pub mod budget;
pub mod config;
pub mod error;
pub mod invariant;
pub mod proposal;
pub mod registry;
pub mod sovereignty;
pub mod store;
pub mod transcript;

pub use budget::{TurnBudgetPolicy, TurnRecord};
pub use config::{GuardConfig, TraceabilityPolicy};
pub use error::InvariantError;
pub use invariant::{CheckKind, CheckOutcome, EvolutionTurnInvariant, Verdict};
pub use proposal::{
    BiophysicalPattern, ChatContext, EvolutionProposal, IrreversibleToken, Reversibility,
};
pub use registry::InvariantRegistry;
pub use sovereignty::{SovereigntyProfile, SovereigntyStatus, DENIED_ROLES, SOVEREIGN_ROLE};
pub use store::{
    EvolutionSnapshot, EvolutionStore, InMemoryEvolutionStore, ProposalStore,
    SovereigntyRegistry, TurnLedger,
};
pub use transcript::{hash_transcript, is_well_formed_transcript_hash};
