//! Import statement rewriting.
//!
//! A migrated binding keeps its local alias so JSX tags never change; only
//! the package and the imported name move. The owning import declaration is
//! cloned, mutated and re-emitted through the code generator, splitting into
//! one declaration per target package when specifiers part ways.

use shift_ast::{emit_module_item, NodeKind, ParsedFile};
use shift_foundation::{
    BindingKey, BindingKind, FileId, ImportTarget, PlannedEdit, ProjectGraph, ShiftError,
    ShiftResult, TextEdit, TextRange,
};
use std::collections::BTreeMap;
use swc_common::{SyntaxContext, DUMMY_SP};
use swc_ecma_ast::{
    Ident, ImportDecl, ImportDefaultSpecifier, ImportNamedSpecifier, ImportSpecifier,
    ImportStarAsSpecifier, ModuleDecl, ModuleExportName, ModuleItem, Str,
};
use tracing::warn;

fn ident(sym: &str) -> Ident {
    Ident {
        span: DUMMY_SP,
        ctxt: SyntaxContext::empty(),
        sym: sym.into(),
        optional: false,
    }
}

/// Builds the specifier a migrated binding gets under its target, preserving
/// the local alias.
fn specifier_for(local: &str, target: &ImportTarget) -> ImportSpecifier {
    match target.binding_kind {
        BindingKind::Default => ImportSpecifier::Default(ImportDefaultSpecifier {
            span: DUMMY_SP,
            local: ident(local),
        }),
        BindingKind::Namespace => ImportSpecifier::Namespace(ImportStarAsSpecifier {
            span: DUMMY_SP,
            local: ident(local),
        }),
        BindingKind::Named | BindingKind::TypeOnly => {
            let imported = (target.component != local)
                .then(|| ModuleExportName::Ident(ident(&target.component)));
            ImportSpecifier::Named(ImportNamedSpecifier {
                span: DUMMY_SP,
                local: ident(local),
                imported,
                is_type_only: target.binding_kind == BindingKind::TypeOnly,
            })
        }
    }
}

fn local_name(spec: &ImportSpecifier) -> &str {
    match spec {
        ImportSpecifier::Named(named) => named.local.sym.as_ref(),
        ImportSpecifier::Default(default) => default.local.sym.as_ref(),
        ImportSpecifier::Namespace(ns) => ns.local.sym.as_ref(),
    }
}

/// Plans one `Replace`-style import edit per declaration that hosts a
/// migrated binding. `rewrites` maps local alias to target.
pub(crate) fn plan_import_rewrites(
    parsed: &ParsedFile,
    graph: &ProjectGraph,
    file: FileId,
    rewrites: &BTreeMap<String, ImportTarget>,
) -> ShiftResult<Vec<PlannedEdit>> {
    // Group migrated locals by their owning declaration.
    let mut by_decl: BTreeMap<u32, (TextRange, BTreeMap<String, ImportTarget>)> = BTreeMap::new();
    for (local, target) in rewrites {
        let key = BindingKey {
            file,
            local_name: local.clone(),
        };
        let Some(binding) = graph.binding(&key) else {
            continue;
        };
        let Some(ast_ref) = binding.ast_ref else {
            return Err(ShiftError::RecordsOnlyGraph);
        };
        let node = parsed
            .nodes
            .get(ast_ref.node)
            .ok_or_else(|| ShiftError::internal("import handle points outside the node table"))?;
        let NodeKind::ImportDecl { body_index } = node.kind else {
            return Err(ShiftError::internal(
                "import handle resolved to a non-import node",
            ));
        };
        by_decl
            .entry(body_index)
            .or_insert_with(|| (node.range, BTreeMap::new()))
            .1
            .insert(local.clone(), target.clone());
    }

    let mut edits = Vec::new();
    for (body_index, (range, targets)) in by_decl {
        let Some(ModuleItem::ModuleDecl(ModuleDecl::Import(decl))) =
            parsed.module.body.get(body_index as usize)
        else {
            return Err(ShiftError::internal(format!(
                "module item {} is not an import declaration",
                body_index
            )));
        };

        let mut staying: Vec<ImportSpecifier> = Vec::new();
        // Per target package: rebuilt specifiers plus the first component,
        // for reporting.
        let mut moved: BTreeMap<String, (Vec<ImportSpecifier>, String)> = BTreeMap::new();
        for spec in &decl.specifiers {
            let local = local_name(spec);
            match targets.get(local) {
                Some(target) => {
                    if matches!(spec, ImportSpecifier::Namespace(_))
                        && target.binding_kind != BindingKind::Namespace
                    {
                        // Narrowing a star import would change every member
                        // access in the file; leave the import alone.
                        warn!(local, "namespace import cannot move to a non-namespace target");
                        staying.push(spec.clone());
                        continue;
                    }
                    let entry = moved
                        .entry(target.package.clone())
                        .or_insert_with(|| (Vec::new(), target.component.clone()));
                    entry.0.push(specifier_for(local, target));
                }
                None => staying.push(spec.clone()),
            }
        }
        if moved.is_empty() {
            continue;
        }

        let mut pieces = Vec::new();
        if !staying.is_empty() {
            let kept = ImportDecl {
                specifiers: staying,
                ..decl.clone()
            };
            pieces.push(render(kept, parsed)?);
        }
        let Some((first_package, first_component)) = moved
            .iter()
            .next()
            .map(|(pkg, (_, component))| (pkg.clone(), component.clone()))
        else {
            continue;
        };
        for (package, (specifiers, _)) in moved {
            let fresh = ImportDecl {
                specifiers,
                src: Box::new(Str {
                    span: DUMMY_SP,
                    value: package.clone().into(),
                    raw: None,
                }),
                type_only: false,
                ..decl.clone()
            };
            pieces.push(render(fresh, parsed)?);
        }

        edits.push(PlannedEdit::Import {
            package: first_package,
            component: first_component,
            edit: TextEdit::new(range, pieces.join("\n")),
        });
    }
    Ok(edits)
}

fn render(decl: ImportDecl, parsed: &ParsedFile) -> ShiftResult<String> {
    emit_module_item(ModuleItem::ModuleDecl(ModuleDecl::Import(decl)), &parsed.cm)
        .map_err(|e| ShiftError::internal(e.to_string()))
}
