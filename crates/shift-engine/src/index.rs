//! Rule lookup, keyed by `(source package, source component)`.

use rustc_hash::FxHashMap;
use shift_foundation::MigrationRule;

/// Pre-sorted rule index. Rules for one component are ordered by `order`,
/// ties broken by declaration position in the rule document, so application
/// order is total and stable.
#[derive(Debug, Default)]
pub struct RuleIndex {
    by_component: FxHashMap<(String, String), Vec<MigrationRule>>,
}

impl RuleIndex {
    pub fn new(rules: &[MigrationRule]) -> Self {
        let mut by_component: FxHashMap<(String, String), Vec<(usize, MigrationRule)>> =
            FxHashMap::default();
        for (decl_index, rule) in rules.iter().enumerate() {
            by_component
                .entry((rule.source_package.clone(), rule.source_component.clone()))
                .or_default()
                .push((decl_index, rule.clone()));
        }
        let by_component = by_component
            .into_iter()
            .map(|(key, mut rules)| {
                rules.sort_by_key(|(decl_index, rule)| (rule.order, *decl_index));
                (key, rules.into_iter().map(|(_, rule)| rule).collect())
            })
            .collect();
        Self { by_component }
    }

    /// Rules targeting the given component, in application order.
    pub fn rules_for(&self, package: &str, component: &str) -> &[MigrationRule] {
        self.by_component
            .get(&(package.to_string(), component.to_string()))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.by_component.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use shift_foundation::{BindingKind, ImportTarget, RuleEdit};

    fn rule(order: i64, component: &str) -> MigrationRule {
        MigrationRule {
            order,
            source_package: "@ui/old".into(),
            source_component: component.into(),
            match_predicates: vec![],
            edit: RuleEdit::Remove(vec!["x".into()]),
            import_target: ImportTarget {
                package: "@ui/new".into(),
                component: component.into(),
                binding_kind: BindingKind::Named,
            },
        }
    }

    #[test]
    fn orders_by_order_then_declaration() {
        let rules = vec![rule(2, "Button"), rule(1, "Button"), rule(1, "Button")];
        let index = RuleIndex::new(&rules);
        let ordered: Vec<i64> = index
            .rules_for("@ui/old", "Button")
            .iter()
            .map(|r| r.order)
            .collect();
        assert_eq!(ordered, vec![1, 1, 2]);
        // The two order-1 rules keep declaration order: the original index 1
        // entry comes before index 2.
        assert!(index.rules_for("@ui/old", "Card").is_empty());
    }
}
