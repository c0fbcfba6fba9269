use thiserror::Error;

/// Errors raised by stores, the rule registry, and config loading.
///
/// Invariant checks never surface these directly; a rule folds them into
/// `Verdict::NotEvaluable`.
#[derive(Debug, Error)]
pub enum InvariantError {
    #[error("store lock poisoned: {0}")]
    StorePoisoned(&'static str),
    #[error("rule id must be non-empty")]
    EmptyRuleId,
    #[error("rule id '{0}' is already registered")]
    DuplicateRuleId(String),
    #[error("cannot read config {path}: {source}")]
    ConfigIo {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid guard config: {0}")]
    ConfigParse(#[source] serde_json::Error),
    #[error("invalid evolution snapshot: {0}")]
    SnapshotParse(#[source] serde_json::Error),
}
