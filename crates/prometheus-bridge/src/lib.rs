pub mod guards;
pub mod metrics;

pub use guards::{reject_if_turn_fails, MeteredInvariant};
pub use metrics::InvariantMetrics;
