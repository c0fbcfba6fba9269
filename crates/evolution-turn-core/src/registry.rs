use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::info;

use crate::error::InvariantError;
use crate::invariant::EvolutionTurnInvariant;

/// Evolution-turn rules keyed by their `id()`, filled at process start.
#[derive(Default, Clone)]
pub struct InvariantRegistry {
    rules: BTreeMap<String, Arc<dyn EvolutionTurnInvariant>>,
}

impl InvariantRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, rule: Arc<dyn EvolutionTurnInvariant>) -> Result<(), InvariantError> {
        let id = rule.id().to_string();
        if id.trim().is_empty() {
            return Err(InvariantError::EmptyRuleId);
        }
        if self.rules.contains_key(&id) {
            return Err(InvariantError::DuplicateRuleId(id));
        }
        info!(rule_id = %id, "registered evolution-turn invariant");
        self.rules.insert(id, rule);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn EvolutionTurnInvariant>> {
        self.rules.get(id).cloned()
    }

    /// Registered ids in ascending order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.rules.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn EvolutionTurnInvariant>> {
        self.rules.values()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl std::fmt::Debug for InvariantRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InvariantRegistry")
            .field("rules", &self.rules.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invariant::Verdict;

    struct FixedRule(&'static str, bool);

    impl EvolutionTurnInvariant for FixedRule {
        fn id(&self) -> &str {
            self.0
        }

        fn evaluate_turn_budget(&self, _: &str, _: &str, _: &str) -> Verdict {
            if self.1 {
                Verdict::Passed
            } else {
                Verdict::Failed(vec!["budget exhausted".into()])
            }
        }

        fn evaluate_traceability_and_consent(&self, _: &str, _: &str, _: bool) -> Verdict {
            Verdict::NotEvaluable("no transcript store".into())
        }

        fn evaluate_microspace_sovereignty(&self, _: &str, _: &str) -> Verdict {
            Verdict::Passed
        }
    }

    #[test]
    fn lookup_by_id() {
        let mut registry = InvariantRegistry::new();
        registry.register(Arc::new(FixedRule("RULE-B", true))).unwrap();
        registry.register(Arc::new(FixedRule("RULE-A", false))).unwrap();

        assert_eq!(registry.ids().collect::<Vec<_>>(), vec!["RULE-A", "RULE-B"]);
        let b = registry.get("RULE-B").unwrap();
        assert!(b.verify_turn_budget("validator-1", "prop-1", "block-1"));
        assert!(!b.verify_traceability_and_consent("prop-1", "", false));
        assert!(!registry.get("RULE-A").unwrap().verify_turn_budget("", "", ""));
        assert!(registry.get("RULE-C").is_none());
    }

    #[test]
    fn rejects_duplicate_and_blank_ids() {
        let mut registry = InvariantRegistry::new();
        registry.register(Arc::new(FixedRule("RULE-A", true))).unwrap();

        assert!(matches!(
            registry.register(Arc::new(FixedRule("RULE-A", false))),
            Err(InvariantError::DuplicateRuleId(id)) if id == "RULE-A"
        ));
        assert!(matches!(
            registry.register(Arc::new(FixedRule("  ", true))),
            Err(InvariantError::EmptyRuleId)
        ));
        assert_eq!(registry.len(), 1);
    }
}
