//! shift-engine: ordered, rule-driven planning of JSX edits.
//!
//! The engine consumes a finished project graph plus its module store and
//! produces one `ChangeSet` per affected file. Planning is deterministic:
//! files in id order, usages in source order, rules in `(order, declaration)`
//! order. Nothing here touches the filesystem.

mod attrs;
mod imports;
mod index;

pub use index::RuleIndex;

use indexmap::IndexMap;
use shift_ast::{apply_edits, ModuleStore, ParsedFile};
use shift_foundation::{
    AttributeValue, BindingKind, ChangeSet, ComponentUsage, FailurePhase, FileFailure, FileId,
    ImportBinding, ImportTarget, LiteralValue, MigrationRule, PlannedEdit, ProjectGraph,
    RuleApplication, RuleEdit, ShiftError, ShiftResult, SkippedFile, TextEdit, TextRange,
};
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, warn};

/// Everything the engine decided for one run. Change sets are planned, not
/// yet written to disk.
#[derive(Debug, Default)]
pub struct EnginePlan {
    pub change_sets: Vec<ChangeSet>,
    pub skipped: Vec<SkippedFile>,
    pub failures: Vec<FileFailure>,
    pub rules_applied: Vec<RuleApplication>,
}

/// Working view of one usage's attributes while rules apply in sequence.
/// Predicates of later rules see the effects of earlier ones.
struct WorkingAttr {
    value: Option<AttributeValue>,
    /// Key into the usage's recorded attribute map, for AST handles. `None`
    /// for attributes introduced by a `set` edit.
    source_name: Option<String>,
}

fn literal_to_value(literal: &LiteralValue) -> AttributeValue {
    match literal {
        LiteralValue::Bool(b) => AttributeValue::Bool(*b),
        LiteralValue::Number(n) => AttributeValue::Number(*n),
        LiteralValue::String(s) => AttributeValue::String(s.clone()),
    }
}

/// True when the binding already resolves exactly as the target asks; no
/// import edit is planned then.
fn import_matches(binding: &ImportBinding, target: &ImportTarget) -> bool {
    binding.package == target.package
        && binding.binding_kind == target.binding_kind
        && match target.binding_kind {
            BindingKind::Default => binding.imported_name == "default",
            BindingKind::Namespace => true,
            _ => binding.imported_name == target.component,
        }
}

/// Component name a usage matches rules under: the imported name for plain
/// bindings, the member path after the namespace root for star imports.
fn match_name<'a>(binding: &'a ImportBinding, usage: &'a ComponentUsage) -> Option<&'a str> {
    match binding.binding_kind {
        BindingKind::Namespace => usage
            .component_local_name
            .split_once('.')
            .map(|(_, member)| member),
        BindingKind::TypeOnly => None,
        _ => Some(binding.imported_name.as_str()),
    }
}

/// Plans the whole run. `blocked` holds files gated out by breaking
/// dependency cycles; they are reported, never transformed.
pub fn plan(
    graph: &ProjectGraph,
    store: &ModuleStore,
    rules: &[MigrationRule],
    blocked: &HashSet<FileId>,
) -> ShiftResult<EnginePlan> {
    if rules.is_empty() {
        return Ok(EnginePlan::default());
    }
    for file in graph.analyzed_files() {
        if store.get(file.id).is_none() {
            return Err(ShiftError::RecordsOnlyGraph);
        }
    }

    let index = RuleIndex::new(rules);
    let mut plan = EnginePlan::default();
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();

    for file in graph.analyzed_files() {
        if blocked.contains(&file.id) {
            plan.skipped.push(SkippedFile {
                file: file.path.clone(),
                reason: "participates in a breaking dependency cycle".to_string(),
            });
            continue;
        }
        let parsed = store
            .get(file.id)
            .ok_or_else(|| ShiftError::internal("analyzed file missing from module store"))?;

        let mut file_edits: Vec<PlannedEdit> = Vec::new();
        let mut rewrites: BTreeMap<String, ImportTarget> = BTreeMap::new();

        for usage in graph.usages_for(file.id) {
            let Some(binding) = usage.import_ref.as_ref().and_then(|k| graph.binding(k)) else {
                continue;
            };
            let Some(component) = match_name(binding, usage) else {
                continue;
            };
            let candidate_rules = index.rules_for(&binding.package, component);
            if candidate_rules.is_empty() {
                continue;
            }
            plan_usage(
                parsed,
                usage,
                binding,
                candidate_rules,
                &mut file_edits,
                &mut rewrites,
                &mut counts,
            );
        }

        file_edits.extend(imports::plan_import_rewrites(
            parsed,
            graph,
            file.id,
            &rewrites,
        )?);

        if file_edits.is_empty() {
            continue;
        }

        // A replaced element can enclose other rule-matched usages; their
        // edits sit inside the replacement's range and give way to it.
        let replaced: Vec<TextRange> = file_edits
            .iter()
            .filter_map(|e| match e {
                PlannedEdit::Replace { edit, .. } => Some(edit.range),
                _ => None,
            })
            .collect();
        if !replaced.is_empty() {
            file_edits.retain(|e| {
                let range = e.text_edit().range;
                !replaced.iter().any(|r| *r != range && r.contains(&range))
            });
        }

        file_edits.sort_by_key(|e| (e.text_edit().range.start, e.text_edit().range.end));
        let text_edits: Vec<TextEdit> =
            file_edits.iter().map(|e| e.text_edit().clone()).collect();
        let after = match apply_edits(&parsed.source, &text_edits) {
            Ok(after) => after,
            Err(e) => {
                warn!(file = %file.path.display(), error = %e, "edits conflict; file left untouched");
                plan.failures.push(FileFailure::new(
                    file.path.clone(),
                    FailurePhase::Transform,
                    e.to_string(),
                ));
                continue;
            }
        };
        plan.change_sets.push(ChangeSet {
            file: file.path.clone(),
            edits: file_edits,
            before_snapshot: parsed.source.clone(),
            after_snapshot: after,
        });
    }

    plan.rules_applied = counts
        .into_iter()
        .map(|(rule, count)| RuleApplication { rule, count })
        .collect();
    Ok(plan)
}

/// Applies every matching rule to one usage, maintaining the working
/// attribute state between rules. Rules whose touched attributes overlap an
/// earlier application are skipped; a `replaceWith` subsumes the usage's
/// earlier attribute edits.
#[allow(clippy::too_many_arguments)]
fn plan_usage(
    parsed: &ParsedFile,
    usage: &ComponentUsage,
    binding: &ImportBinding,
    rules: &[MigrationRule],
    file_edits: &mut Vec<PlannedEdit>,
    rewrites: &mut BTreeMap<String, ImportTarget>,
    counts: &mut BTreeMap<String, usize>,
) {
    let mut working: IndexMap<String, WorkingAttr> = usage
        .attributes
        .iter()
        .map(|(name, info)| {
            (
                name.clone(),
                WorkingAttr {
                    value: info.value.clone(),
                    source_name: Some(name.clone()),
                },
            )
        })
        .collect();
    let mut touched: HashSet<String> = HashSet::new();
    let mut usage_edits: Vec<PlannedEdit> = Vec::new();

    for rule in rules {
        let matched = rule.match_predicates.iter().all(|p| {
            working
                .get(&p.attribute)
                .and_then(|attr| attr.value.as_ref())
                .map(|value| p.equals.matches(value))
                .unwrap_or(false)
        });
        if !matched {
            continue;
        }
        let rule_touches = rule.edit.touched_attributes();
        if rule_touches.iter().any(|name| touched.contains(*name)) {
            debug!(rule = %rule.label(), "skipped: attribute set overlaps an earlier rule");
            continue;
        }

        match &rule.edit {
            RuleEdit::Remove(names) => {
                for name in names {
                    let Some(attr) = working.shift_remove(name) else {
                        continue;
                    };
                    if let Some(ast) = attr
                        .source_name
                        .and_then(|n| usage.attributes.get(&n))
                        .and_then(|info| info.ast)
                    {
                        usage_edits.extend(attrs::plan_remove(parsed, usage, &ast, name));
                    }
                }
            }
            RuleEdit::Rename(renames) => {
                for (from, to) in renames {
                    let Some(attr) = working.shift_remove(from) else {
                        continue;
                    };
                    if let Some(ast) = attr
                        .source_name
                        .as_ref()
                        .and_then(|n| usage.attributes.get(n))
                        .and_then(|info| info.ast)
                    {
                        usage_edits.extend(attrs::plan_rename(parsed, usage, &ast, from, to));
                    }
                    working.insert(to.clone(), attr);
                }
            }
            RuleEdit::Set(values) => {
                for (name, literal) in values {
                    let ast = working
                        .get(name)
                        .and_then(|attr| attr.source_name.as_ref())
                        .and_then(|n| usage.attributes.get(n))
                        .and_then(|info| info.ast);
                    usage_edits.extend(attrs::plan_set(
                        parsed,
                        usage,
                        ast.as_ref(),
                        name,
                        literal,
                    ));
                    working.insert(
                        name.clone(),
                        WorkingAttr {
                            value: Some(literal_to_value(literal)),
                            source_name: ast.map(|_| name.clone()),
                        },
                    );
                }
            }
            RuleEdit::ReplaceWith(template) => {
                let Some(edit) = attrs::plan_replace(parsed, usage, template) else {
                    continue;
                };
                // The replacement covers the whole element; earlier
                // attribute edits on this usage are inside it and give way.
                usage_edits.clear();
                usage_edits.push(edit);
            }
        }

        touched.extend(rule_touches.iter().map(|s| s.to_string()));
        *counts.entry(rule.label()).or_default() += 1;

        if !import_matches(binding, &rule.import_target) {
            match rewrites.get(&binding.local_name) {
                None => {
                    rewrites.insert(binding.local_name.clone(), rule.import_target.clone());
                }
                Some(existing) if *existing != rule.import_target => {
                    warn!(
                        local = %binding.local_name,
                        "conflicting import targets; keeping the first"
                    );
                }
                Some(_) => {}
            }
        }

        if rule.edit.is_replace() {
            break;
        }
    }
    file_edits.append(&mut usage_edits);
}
