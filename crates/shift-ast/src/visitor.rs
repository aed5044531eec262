//! Single-pass extraction of import bindings and component usages.
//!
//! The visitor walks one file's tree in source order, so a usage always sees
//! the bindings declared above it; local-name resolution needs no second
//! pass. Unknown specifier shapes are logged and skipped, never fatal.

use crate::arena::{NodeKind, NodeTable, ParsedFile, RecordedNode};
use crate::error::AstResult;
use crate::parser::parse_source;
use shift_foundation::{
    AstRef, AttributeAst, AttributeInfo, AttributeValue, BindingKey, BindingKind, ComponentUsage,
    DynamicImport, FileId, FileRecords, ImportBinding, NodeId, Position, ReExport, TextRange,
};
use std::collections::HashSet;
use std::path::Path;
use swc_common::sync::Lrc;
use swc_common::{BytePos, SourceMap, Span, Spanned};
use swc_ecma_ast::{
    Callee, Expr, ExportAll, ImportDecl, ImportSpecifier, JSXAttrName, JSXAttrOrSpread,
    JSXAttrValue, JSXElement, JSXElementName, JSXExpr, JSXObject, Lit, Module, ModuleExportName,
    NamedExport,
};
use swc_ecma_visit::{Visit, VisitWith};
use tracing::{debug, warn};

struct ExtractionVisitor<'a> {
    file: FileId,
    source: &'a str,
    cm: &'a Lrc<SourceMap>,
    start_pos: BytePos,
    record_ast: bool,
    body_index: u32,
    nodes: NodeTable,
    imports: Vec<ImportBinding>,
    usages: Vec<ComponentUsage>,
    dynamic_imports: Vec<DynamicImport>,
    reexports: Vec<ReExport>,
    locals: HashSet<String>,
}

impl<'a> ExtractionVisitor<'a> {
    fn range(&self, span: Span) -> TextRange {
        TextRange::new(span.lo.0 - self.start_pos.0, span.hi.0 - self.start_pos.0)
    }

    fn position(&self, span: Span) -> Position {
        let loc = self.cm.lookup_char_pos(span.lo);
        Position {
            line: loc.line as u32,
            column: loc.col.0 as u32,
        }
    }

    fn record(&mut self, kind: NodeKind, range: TextRange) -> Option<AstRef> {
        if !self.record_ast {
            return None;
        }
        let node = self.nodes.push(RecordedNode { kind, range });
        Some(AstRef {
            file: self.file,
            node,
        })
    }

    fn text(&self, range: TextRange) -> &str {
        &self.source[range.start as usize..range.end as usize]
    }

    fn push_binding(
        &mut self,
        package: &str,
        imported_name: String,
        local_name: String,
        binding_kind: BindingKind,
        ast_ref: Option<AstRef>,
        span: Span,
    ) {
        if !self.locals.insert(local_name.clone()) {
            warn!(
                local = %local_name,
                "duplicate local binding; keeping both records"
            );
        }
        self.imports.push(ImportBinding {
            package: package.to_string(),
            file: self.file,
            imported_name,
            binding_kind,
            local_name,
            ast_ref,
            position: self.position(span),
        });
    }

    /// Dotted element name plus its root identifier, e.g. `UI.Button` / `UI`.
    fn element_name(name: &JSXElementName) -> Option<(String, String)> {
        match name {
            JSXElementName::Ident(ident) => {
                let s = ident.sym.to_string();
                Some((s.clone(), s))
            }
            JSXElementName::JSXMemberExpr(member) => {
                let mut parts = vec![member.prop.sym.to_string()];
                let mut obj = &member.obj;
                loop {
                    match obj {
                        JSXObject::Ident(ident) => {
                            parts.push(ident.sym.to_string());
                            break;
                        }
                        JSXObject::JSXMemberExpr(inner) => {
                            parts.push(inner.prop.sym.to_string());
                            obj = &inner.obj;
                        }
                    }
                }
                parts.reverse();
                let root = parts[0].clone();
                Some((parts.join("."), root))
            }
            JSXElementName::JSXNamespacedName(_) => None,
        }
    }

    fn attribute_value(&self, value: Option<&JSXAttrValue>) -> Option<AttributeValue> {
        let value = match value {
            // Shorthand: `<Btn disabled />`.
            None => return Some(AttributeValue::Bool(true)),
            Some(v) => v,
        };
        match value {
            JSXAttrValue::Str(s) => Some(AttributeValue::String(s.value.to_string_lossy().to_string())),
            JSXAttrValue::JSXExprContainer(container) => match &container.expr {
                JSXExpr::Expr(expr) => match expr.as_ref() {
                    Expr::Lit(Lit::Str(s)) => {
                        Some(AttributeValue::String(s.value.to_string_lossy().to_string()))
                    }
                    Expr::Lit(Lit::Num(n)) => Some(AttributeValue::Number(n.value)),
                    Expr::Lit(Lit::Bool(b)) => Some(AttributeValue::Bool(b.value)),
                    _ => Some(AttributeValue::Expression(
                        self.text(self.range(container.span)).to_string(),
                    )),
                },
                JSXExpr::JSXEmptyExpr(_) => None,
            },
            JSXAttrValue::JSXElement(el) => Some(AttributeValue::Expression(
                self.text(self.range(el.span)).to_string(),
            )),
            JSXAttrValue::JSXFragment(frag) => Some(AttributeValue::Expression(
                self.text(self.range(frag.span)).to_string(),
            )),
        }
    }

    /// Byte offset where a new attribute can be inserted: just past the last
    /// non-closing byte of the opening tag.
    fn attribute_insert_at(&self, opening: TextRange) -> u32 {
        let text = self.text(opening);
        let trimmed = text
            .trim_end_matches(|c: char| c == '>' || c == '/' || c.is_whitespace())
            .len();
        opening.start + trimmed as u32
    }
}

impl Visit for ExtractionVisitor<'_> {
    fn visit_module(&mut self, module: &Module) {
        for (i, item) in module.body.iter().enumerate() {
            self.body_index = i as u32;
            item.visit_with(self);
        }
    }

    fn visit_import_decl(&mut self, decl: &ImportDecl) {
        let package = decl.src.value.to_string_lossy().to_string();
        let decl_ref = self.record(
            NodeKind::ImportDecl {
                body_index: self.body_index,
            },
            self.range(decl.span),
        );
        for spec in &decl.specifiers {
            match spec {
                ImportSpecifier::Named(named) => {
                    let local = named.local.sym.to_string();
                    let imported = named
                        .imported
                        .as_ref()
                        .map(|name| match name {
                            ModuleExportName::Ident(ident) => ident.sym.to_string(),
                            ModuleExportName::Str(s) => s.value.to_string_lossy().to_string(),
                        })
                        .unwrap_or_else(|| local.clone());
                    let kind = if decl.type_only || named.is_type_only {
                        BindingKind::TypeOnly
                    } else {
                        BindingKind::Named
                    };
                    self.push_binding(&package, imported, local, kind, decl_ref, named.span);
                }
                ImportSpecifier::Default(default) => {
                    let local = default.local.sym.to_string();
                    let kind = if decl.type_only {
                        BindingKind::TypeOnly
                    } else {
                        BindingKind::Default
                    };
                    self.push_binding(&package, "default".into(), local, kind, decl_ref, default.span);
                }
                ImportSpecifier::Namespace(ns) => {
                    let local = ns.local.sym.to_string();
                    let kind = if decl.type_only {
                        BindingKind::TypeOnly
                    } else {
                        BindingKind::Namespace
                    };
                    self.push_binding(&package, "*".into(), local, kind, decl_ref, ns.span);
                }
            }
        }
    }

    fn visit_named_export(&mut self, export: &NamedExport) {
        if let Some(src) = &export.src {
            self.reexports.push(ReExport {
                specifier: src.value.to_string_lossy().to_string(),
                type_only: export.type_only,
                position: self.position(export.span),
            });
        }
    }

    fn visit_export_all(&mut self, export: &ExportAll) {
        self.reexports.push(ReExport {
            specifier: export.src.value.to_string_lossy().to_string(),
            type_only: export.type_only,
            position: self.position(export.span),
        });
    }

    fn visit_call_expr(&mut self, call: &swc_ecma_ast::CallExpr) {
        let is_dynamic = match &call.callee {
            Callee::Import(_) => true,
            Callee::Expr(expr) => matches!(expr.as_ref(), Expr::Ident(i) if i.sym.as_ref() == "require"),
            Callee::Super(_) => false,
        };
        if is_dynamic {
            match call.args.first().map(|a| a.expr.as_ref()) {
                Some(Expr::Lit(Lit::Str(s))) => {
                    self.dynamic_imports.push(DynamicImport {
                        specifier: s.value.to_string_lossy().to_string(),
                        position: self.position(call.span),
                    });
                }
                _ => {
                    warn!(
                        file = self.file.0,
                        "non-literal dynamic import specifier; site skipped"
                    );
                }
            }
        }
        call.visit_children_with(self);
    }

    fn visit_jsx_element(&mut self, element: &JSXElement) {
        if let Some((name, root)) = Self::element_name(&element.opening.name) {
            // Lowercase tags are host elements, not components.
            let is_component = name
                .chars()
                .next()
                .map(|c| c.is_uppercase() || c == '_')
                .unwrap_or(false);
            if is_component {
                self.collect_usage(element, name, root);
            }
        } else {
            debug!(file = self.file.0, "namespaced JSX name skipped");
        }
        element.visit_children_with(self);
    }
}

impl ExtractionVisitor<'_> {
    fn collect_usage(&mut self, element: &JSXElement, name: String, root: String) {
        let element_range = self.range(element.span);
        let children = element.closing.as_ref().map(|closing| {
            TextRange::new(
                self.range(element.opening.span).end,
                self.range(closing.span).start,
            )
        });
        let element_ref = self.record(NodeKind::Element { children }, element_range);

        let opening_range = self.range(element.opening.span);
        let insert_at = self.attribute_insert_at(opening_range);
        let opening_ref = self.record(NodeKind::OpeningElement { insert_at }, opening_range);

        let mut attributes = indexmap::IndexMap::new();
        for attr in &element.opening.attrs {
            let attr = match attr {
                JSXAttrOrSpread::JSXAttr(attr) => attr,
                JSXAttrOrSpread::SpreadElement(_) => {
                    debug!(file = self.file.0, component = %name, "spread attribute not indexed");
                    continue;
                }
            };
            let (attr_name, name_span) = match &attr.name {
                JSXAttrName::Ident(ident) => (ident.sym.to_string(), ident.span),
                JSXAttrName::JSXNamespacedName(_) => {
                    debug!(file = self.file.0, "namespaced attribute skipped");
                    continue;
                }
            };
            let attr_ref = self.record(NodeKind::Attribute, self.range(attr.span));
            let name_ref = self.record(NodeKind::AttributeName, self.range(name_span));
            let value_ref = attr
                .value
                .as_ref()
                .map(|v| self.range(v.span()))
                .and_then(|r| self.record(NodeKind::AttributeValue, r));
            let ast = match (attr_ref, name_ref) {
                (Some(attr), Some(name)) => Some(AttributeAst {
                    attr,
                    name,
                    value: value_ref,
                }),
                _ => None,
            };
            attributes.insert(
                attr_name,
                AttributeInfo {
                    value: self.attribute_value(attr.value.as_ref()),
                    ast,
                },
            );
        }

        let import_ref = if self.locals.contains(&root) {
            Some(BindingKey {
                file: self.file,
                local_name: root.clone(),
            })
        } else {
            None
        };

        self.usages.push(ComponentUsage {
            file: self.file,
            component_local_name: name,
            import_ref,
            attributes,
            position: self.position(element.span),
            ast_ref: element_ref,
            opening_ref,
        });
    }
}

/// Parses and extracts one file, keeping the tree and node table for
/// in-place transformation. Used by the sequential and pipeline strategies.
pub fn extract_with_ast(
    file: FileId,
    path: &Path,
    source: &str,
) -> AstResult<(FileRecords, ParsedFile)> {
    let parsed = parse_source(path, source)?;
    let mut visitor = ExtractionVisitor {
        file,
        source,
        cm: &parsed.cm,
        start_pos: parsed.start_pos,
        record_ast: true,
        body_index: 0,
        nodes: NodeTable::default(),
        imports: Vec::new(),
        usages: Vec::new(),
        dynamic_imports: Vec::new(),
        reexports: Vec::new(),
        locals: HashSet::new(),
    };
    parsed.module.visit_with(&mut visitor);
    // Move everything out of the visitor first; it borrows `parsed.cm`.
    let nodes = visitor.nodes;
    let records = FileRecords {
        file,
        imports: visitor.imports,
        usages: visitor.usages,
        dynamic_imports: visitor.dynamic_imports,
        reexports: visitor.reexports,
    };
    let parsed_file = ParsedFile {
        file,
        source: source.to_string(),
        module: parsed.module,
        cm: parsed.cm,
        start_pos: parsed.start_pos,
        nodes,
    };
    Ok((records, parsed_file))
}

/// Parses and extracts one file into plain, serializable records with no
/// AST handles. This is the pooled-worker entry point: the tree never
/// crosses the worker boundary, so pooled graphs support detection and
/// reporting but not in-place transformation.
pub fn extract_records(file: FileId, path: &Path, source: &str) -> AstResult<FileRecords> {
    let parsed = parse_source(path, source)?;
    let mut visitor = ExtractionVisitor {
        file,
        source,
        cm: &parsed.cm,
        start_pos: parsed.start_pos,
        record_ast: false,
        body_index: 0,
        nodes: NodeTable::default(),
        imports: Vec::new(),
        usages: Vec::new(),
        dynamic_imports: Vec::new(),
        reexports: Vec::new(),
        locals: HashSet::new(),
    };
    parsed.module.visit_with(&mut visitor);
    Ok(FileRecords {
        file,
        imports: visitor.imports,
        usages: visitor.usages,
        dynamic_imports: visitor.dynamic_imports,
        reexports: visitor.reexports,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    fn extract(src: &str) -> FileRecords {
        extract_records(FileId(0), &PathBuf::from("test.tsx"), src).unwrap()
    }

    #[test]
    fn collects_bindings_in_source_order() {
        let records = extract(
            r#"
import Button from "@ui/old";
import { Card, Card as AliasedCard } from "@ui/old";
import * as Icons from "@ui/icons";
import type { CardProps } from "@ui/old";
"#,
        );
        let names: Vec<_> = records
            .imports
            .iter()
            .map(|b| (b.local_name.as_str(), b.binding_kind))
            .collect();
        assert_eq!(
            names,
            vec![
                ("Button", BindingKind::Default),
                ("Card", BindingKind::Named),
                ("AliasedCard", BindingKind::Named),
                ("Icons", BindingKind::Namespace),
                ("CardProps", BindingKind::TypeOnly),
            ]
        );
        // Same export under two aliases yields two bindings.
        assert_eq!(records.imports[1].imported_name, "Card");
        assert_eq!(records.imports[2].imported_name, "Card");
    }

    #[test]
    fn resolves_usages_against_bindings_above() {
        let records = extract(
            r#"
import { Button } from "@ui/old";
const Local = () => null;
export const App = () => (
  <div>
    <Button variant="primary" count={3} disabled />
    <Local />
  </div>
);
"#,
        );
        assert_eq!(records.usages.len(), 2);
        let button = &records.usages[0];
        assert_eq!(button.component_local_name, "Button");
        assert_eq!(
            button.import_ref.as_ref().unwrap().local_name,
            "Button".to_string()
        );
        assert_eq!(
            button.attributes.get("variant").unwrap().value,
            Some(AttributeValue::String("primary".into()))
        );
        assert_eq!(
            button.attributes.get("count").unwrap().value,
            Some(AttributeValue::Number(3.0))
        );
        assert_eq!(
            button.attributes.get("disabled").unwrap().value,
            Some(AttributeValue::Bool(true))
        );

        // Locally declared component: no import back-reference, excluded
        // from rule matching downstream.
        assert!(records.usages[1].import_ref.is_none());
    }

    #[test]
    fn lowercase_tags_are_not_usages() {
        let records = extract(r#"export const X = () => <div className="a" />;"#);
        assert!(records.usages.is_empty());
    }

    #[test]
    fn member_expression_resolves_through_namespace_root() {
        let records = extract(
            r#"
import * as UI from "@ui/old";
export const App = () => <UI.Button variant="primary" />;
"#,
        );
        let usage = &records.usages[0];
        assert_eq!(usage.component_local_name, "UI.Button");
        assert_eq!(usage.import_ref.as_ref().unwrap().local_name, "UI");
    }

    #[test]
    fn records_reexports_and_dynamic_imports() {
        let records = extract(
            r#"
export { Button } from "./button";
export * from "./all";
export type { Props } from "./types";
const load = () => import("./lazy");
"#,
        );
        assert_eq!(records.reexports.len(), 3);
        assert!(!records.reexports[0].type_only);
        assert!(records.reexports[2].type_only);
        assert_eq!(records.dynamic_imports.len(), 1);
        assert_eq!(records.dynamic_imports[0].specifier, "./lazy");
    }

    #[test]
    fn pooled_records_carry_no_ast_handles() {
        let records = extract(
            r#"
import { Button } from "@ui/old";
export const App = () => <Button />;
"#,
        );
        assert!(records.imports.iter().all(|b| b.ast_ref.is_none()));
        assert!(records.usages.iter().all(|u| u.ast_ref.is_none()));
    }

    #[test]
    fn ast_mode_records_attribute_nodes() {
        let (records, parsed) = extract_with_ast(
            FileId(0),
            &PathBuf::from("test.tsx"),
            r#"import { Button } from "@ui/old";
export const App = () => <Button variant="primary" />;
"#,
        )
        .unwrap();
        let usage = &records.usages[0];
        let attr = usage.attributes.get("variant").unwrap();
        let ast = attr.ast.unwrap();
        let name_node = parsed.nodes.get(ast.name.node).unwrap();
        assert_eq!(parsed.text(name_node.range), "variant");
        let value_node = parsed.nodes.get(ast.value.unwrap().node).unwrap();
        assert_eq!(parsed.text(value_node.range), "\"primary\"");
    }
}
