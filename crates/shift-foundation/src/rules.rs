//! Migration rule model.
//!
//! Rules are validated once, up front, by `shift-config`; by the time a rule
//! reaches the engine it is structurally sound. The edit clause is a sum
//! type matched exhaustively when applying, so there is no "shape of the
//! object" dispatch at application time.

use crate::protocol::{AttributeValue, BindingKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Expected literal value in a predicate or a `set` edit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LiteralValue {
    Bool(bool),
    Number(f64),
    String(String),
}

impl LiteralValue {
    /// Literal equality against an attribute's current value. Opaque
    /// expressions never match.
    pub fn matches(&self, value: &AttributeValue) -> bool {
        match (self, value) {
            (LiteralValue::String(a), AttributeValue::String(b)) => a == b,
            (LiteralValue::Number(a), AttributeValue::Number(b)) => a == b,
            (LiteralValue::Bool(a), AttributeValue::Bool(b)) => a == b,
            _ => false,
        }
    }

    /// Renders the literal as JSX attribute-value source text.
    pub fn to_jsx_source(&self) -> String {
        match self {
            LiteralValue::String(s) => format!("\"{}\"", s),
            LiteralValue::Number(n) => format!("{{{}}}", n),
            LiteralValue::Bool(b) => format!("{{{}}}", b),
        }
    }
}

/// One attribute-value predicate. A rule's predicate list is an AND; the
/// empty list matches unconditionally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Predicate {
    pub attribute: String,
    pub equals: LiteralValue,
}

/// Where a replacement template slot takes its content from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SlotSource {
    /// Source text of the named attribute's value on the original element.
    Attribute(String),
    /// Source text of the original element's children.
    Children,
}

/// Wholesale element replacement: the template is substituted for the whole
/// element, with named slots threading selected original attribute values
/// and children into it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplaceTemplate {
    /// Replacement source text with `{slot}` placeholders.
    pub template: String,
    #[serde(default)]
    pub slots: BTreeMap<String, SlotSource>,
}

/// The edit clause of a rule: exactly one of these. `ReplaceWith` is
/// exclusive with the attribute edits by construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RuleEdit {
    Remove(Vec<String>),
    Rename(BTreeMap<String, String>),
    Set(BTreeMap<String, LiteralValue>),
    ReplaceWith(ReplaceTemplate),
}

impl RuleEdit {
    /// Attribute names this edit touches. Used for the disjointness check
    /// that lets multiple rules apply to one usage.
    pub fn touched_attributes(&self) -> Vec<&str> {
        match self {
            RuleEdit::Remove(names) => names.iter().map(String::as_str).collect(),
            RuleEdit::Rename(map) => map
                .iter()
                .flat_map(|(from, to)| [from.as_str(), to.as_str()])
                .collect(),
            RuleEdit::Set(map) => map.keys().map(String::as_str).collect(),
            RuleEdit::ReplaceWith(_) => Vec::new(),
        }
    }

    pub fn is_replace(&self) -> bool {
        matches!(self, RuleEdit::ReplaceWith(_))
    }
}

/// Import statement the migrated usage should resolve through.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportTarget {
    pub package: String,
    pub component: String,
    pub binding_kind: BindingKind,
}

/// One ordered migration rule. Lower `order` applies first; ties break by
/// declaration order in the rule document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationRule {
    pub order: i64,
    pub source_package: String,
    pub source_component: String,
    #[serde(rename = "match")]
    pub match_predicates: Vec<Predicate>,
    pub edit: RuleEdit,
    pub import_target: ImportTarget,
}

impl MigrationRule {
    /// Stable label for per-rule reporting.
    pub fn label(&self) -> String {
        format!(
            "{}::{}#{}",
            self.source_package, self.source_component, self.order
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn literal_matching_is_typed() {
        let lit = LiteralValue::String("primary".into());
        assert!(lit.matches(&AttributeValue::String("primary".into())));
        assert!(!lit.matches(&AttributeValue::String("secondary".into())));
        assert!(!lit.matches(&AttributeValue::Expression("\"primary\"".into())));

        let num = LiteralValue::Number(2.0);
        assert!(num.matches(&AttributeValue::Number(2.0)));
        assert!(!num.matches(&AttributeValue::String("2".into())));
    }

    #[test]
    fn rule_deserializes_from_camel_case_document() {
        let rule: MigrationRule = serde_json::from_str(
            r#"{
                "order": 1,
                "sourcePackage": "@ui/old",
                "sourceComponent": "Button",
                "match": [{"attribute": "variant", "equals": "primary"}],
                "edit": {"rename": {"variant": "appearance"}},
                "importTarget": {"package": "@ui/new", "component": "Button", "bindingKind": "named"}
            }"#,
        )
        .unwrap();
        assert_eq!(rule.order, 1);
        assert_eq!(rule.source_component, "Button");
        assert_eq!(rule.label(), "@ui/old::Button#1");
        assert!(matches!(rule.edit, RuleEdit::Rename(_)));
    }

    #[test]
    fn touched_attributes_cover_rename_targets() {
        let mut map = BTreeMap::new();
        map.insert("variant".to_string(), "appearance".to_string());
        let edit = RuleEdit::Rename(map);
        let mut touched = edit.touched_attributes();
        touched.sort();
        assert_eq!(touched, vec!["appearance", "variant"]);
    }
}
