//! Rule-document loading and up-front validation.
//!
//! The document is keyed source package → source component → rule list, and
//! flattens to one ordered list. Every rule must carry `match`, exactly one
//! edit clause and `importTarget`; any omission is a configuration error
//! surfaced here, before a single file is touched.

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;
use shift_foundation::{
    ImportTarget, MigrationRule, Predicate, RuleEdit, ShiftError, ShiftResult,
};
use std::path::Path;
use tracing::debug;

/// One rule as written in the document, before validation. Package and
/// component come from the enclosing keys.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct RawRule {
    order: i64,
    #[serde(rename = "match")]
    match_predicates: Option<Vec<Predicate>>,
    edit: Option<Value>,
    import_target: Option<ImportTarget>,
}

type RawDocument = IndexMap<String, IndexMap<String, Vec<RawRule>>>;

const EDIT_KEYS: &[&str] = &["remove", "rename", "set", "replaceWith"];

fn parse_edit(package: &str, component: &str, order: i64, edit: Value) -> ShiftResult<RuleEdit> {
    let obj = edit.as_object().ok_or_else(|| {
        ShiftError::config(format!(
            "rule {}::{}#{}: edit clause must be an object",
            package, component, order
        ))
    })?;

    let present: Vec<&str> = EDIT_KEYS
        .iter()
        .copied()
        .filter(|k| obj.contains_key(*k))
        .collect();
    match present.as_slice() {
        [] => Err(ShiftError::config(format!(
            "rule {}::{}#{}: edit clause needs one of remove, rename, set, replaceWith",
            package, component, order
        ))),
        [_] => serde_json::from_value(edit).map_err(|e| {
            ShiftError::config(format!(
                "rule {}::{}#{}: malformed edit clause: {}",
                package, component, order, e
            ))
        }),
        keys => Err(ShiftError::config(format!(
            "rule {}::{}#{}: edit clause must carry exactly one operation, got {}",
            package,
            component,
            order,
            keys.join(", ")
        ))),
    }
}

/// Validates a parsed document into the flat, declaration-ordered rule list
/// the engine consumes.
pub fn validate_rule_document(doc: RawDocumentInput) -> ShiftResult<Vec<MigrationRule>> {
    let mut rules = Vec::new();
    for (package, components) in doc.0 {
        for (component, raw_rules) in components {
            for raw in raw_rules {
                let match_predicates = raw.match_predicates.ok_or_else(|| {
                    ShiftError::config(format!(
                        "rule {}::{}#{}: missing match predicate list (use [] for unconditional)",
                        package, component, raw.order
                    ))
                })?;
                let edit_value = raw.edit.ok_or_else(|| {
                    ShiftError::config(format!(
                        "rule {}::{}#{}: missing edit clause",
                        package, component, raw.order
                    ))
                })?;
                let import_target = raw.import_target.ok_or_else(|| {
                    ShiftError::config(format!(
                        "rule {}::{}#{}: missing importTarget",
                        package, component, raw.order
                    ))
                })?;
                let edit = parse_edit(&package, &component, raw.order, edit_value)?;
                rules.push(MigrationRule {
                    order: raw.order,
                    source_package: package.clone(),
                    source_component: component.clone(),
                    match_predicates,
                    edit,
                    import_target,
                });
            }
        }
    }
    debug!(rules = rules.len(), "rule document validated");
    Ok(rules)
}

/// Raw document newtype so callers cannot skip validation by accident.
pub struct RawDocumentInput(RawDocument);

/// Parses rule-document JSON text. Declaration order is preserved.
pub fn parse_rule_document(text: &str) -> ShiftResult<Vec<MigrationRule>> {
    let raw: RawDocument = serde_json::from_str(text)
        .map_err(|e| ShiftError::config(format!("malformed rule document: {}", e)))?;
    validate_rule_document(RawDocumentInput(raw))
}

/// Loads and validates a rule document from disk.
pub fn load_rules(path: &Path) -> ShiftResult<Vec<MigrationRule>> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        ShiftError::config(format!("cannot read rule document {}: {}", path.display(), e))
    })?;
    parse_rule_document(&text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use shift_foundation::RuleEdit;

    const VALID_DOC: &str = r#"{
        "@ui/old": {
            "Button": [
                {
                    "order": 1,
                    "match": [],
                    "edit": {"rename": {"variant": "appearance"}},
                    "importTarget": {"package": "@ui/new", "component": "Button", "bindingKind": "named"}
                },
                {
                    "order": 2,
                    "match": [{"attribute": "size", "equals": "xl"}],
                    "edit": {"set": {"size": "large"}},
                    "importTarget": {"package": "@ui/new", "component": "Button", "bindingKind": "named"}
                }
            ]
        }
    }"#;

    #[test]
    fn flattens_document_in_declaration_order() {
        let rules = parse_rule_document(VALID_DOC).unwrap();
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].source_package, "@ui/old");
        assert_eq!(rules[0].source_component, "Button");
        assert_eq!(rules[0].order, 1);
        assert!(matches!(rules[0].edit, RuleEdit::Rename(_)));
        assert!(matches!(rules[1].edit, RuleEdit::Set(_)));
    }

    #[test]
    fn missing_import_target_is_a_configuration_error() {
        let doc = r#"{
            "@ui/old": {"Button": [
                {"order": 1, "match": [], "edit": {"remove": ["x"]}}
            ]}
        }"#;
        let err = parse_rule_document(doc).unwrap_err();
        assert!(matches!(err, ShiftError::Config { .. }));
        assert!(err.to_string().contains("importTarget"));
    }

    #[test]
    fn missing_match_is_a_configuration_error() {
        let doc = r#"{
            "@ui/old": {"Button": [
                {"order": 1, "edit": {"remove": ["x"]},
                 "importTarget": {"package": "@ui/new", "component": "Button", "bindingKind": "named"}}
            ]}
        }"#;
        let err = parse_rule_document(doc).unwrap_err();
        assert!(err.to_string().contains("match"));
    }

    #[test]
    fn replace_with_is_exclusive_with_attribute_edits() {
        let doc = r#"{
            "@ui/old": {"Button": [
                {"order": 1, "match": [],
                 "edit": {"replaceWith": {"template": "<New />"}, "remove": ["x"]},
                 "importTarget": {"package": "@ui/new", "component": "New", "bindingKind": "named"}}
            ]}
        }"#;
        let err = parse_rule_document(doc).unwrap_err();
        assert!(err.to_string().contains("exactly one operation"));
    }

    #[test]
    fn empty_edit_clause_is_rejected() {
        let doc = r#"{
            "@ui/old": {"Button": [
                {"order": 1, "match": [], "edit": {},
                 "importTarget": {"package": "@ui/new", "component": "Button", "bindingKind": "named"}}
            ]}
        }"#;
        let err = parse_rule_document(doc).unwrap_err();
        assert!(err.to_string().contains("one of remove, rename, set, replaceWith"));
    }
}
