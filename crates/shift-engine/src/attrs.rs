//! Attribute-level edit planning.
//!
//! Every edit here is derived from a recorded AST node's byte range; no
//! attribute is ever located by searching text. Planning is pure: it turns
//! `(usage, rule edit)` into `PlannedEdit`s and leaves application to the
//! serializer.

use shift_ast::{NodeKind, ParsedFile};
use shift_foundation::{
    AttributeAst, AttributeOp, ComponentUsage, LiteralValue, PlannedEdit, ReplaceTemplate,
    SlotSource, TextEdit, TextRange,
};
use tracing::warn;

/// Removes the attribute plus the whitespace run that precedes it, so the
/// opening tag does not keep a double space behind.
pub(crate) fn plan_remove(
    parsed: &ParsedFile,
    usage: &ComponentUsage,
    ast: &AttributeAst,
    name: &str,
) -> Option<PlannedEdit> {
    let attr = parsed.nodes.get(ast.attr.node)?;
    let bytes = parsed.source.as_bytes();
    let mut start = attr.range.start as usize;
    while start > 0 && bytes[start - 1].is_ascii_whitespace() {
        start -= 1;
    }
    Some(PlannedEdit::Attribute {
        component: usage.component_local_name.clone(),
        op: AttributeOp::Remove {
            name: name.to_string(),
        },
        edit: TextEdit::new(TextRange::new(start as u32, attr.range.end), ""),
    })
}

/// Renames an attribute by rewriting just its name node; the value bytes are
/// untouched.
pub(crate) fn plan_rename(
    parsed: &ParsedFile,
    usage: &ComponentUsage,
    ast: &AttributeAst,
    from: &str,
    to: &str,
) -> Option<PlannedEdit> {
    let name_node = parsed.nodes.get(ast.name.node)?;
    Some(PlannedEdit::Attribute {
        component: usage.component_local_name.clone(),
        op: AttributeOp::Rename {
            from: from.to_string(),
            to: to.to_string(),
        },
        edit: TextEdit::new(name_node.range, to),
    })
}

/// Sets an attribute to a literal value. Overwrites the value node when one
/// exists, rewrites the whole attribute for shorthand form, and inserts a
/// fresh attribute at the opening tag's insertion point when the attribute
/// is absent.
pub(crate) fn plan_set(
    parsed: &ParsedFile,
    usage: &ComponentUsage,
    ast: Option<&AttributeAst>,
    name: &str,
    value: &LiteralValue,
) -> Option<PlannedEdit> {
    let rendered = value.to_jsx_source();
    let op = AttributeOp::Set {
        name: name.to_string(),
        value: rendered.clone(),
    };
    let edit = match ast {
        Some(ast) => match ast.value {
            Some(value_ref) => {
                let node = parsed.nodes.get(value_ref.node)?;
                TextEdit::new(node.range, rendered)
            }
            // Shorthand attribute: rewrite `name` as `name=value`.
            None => {
                let attr = parsed.nodes.get(ast.attr.node)?;
                TextEdit::new(attr.range, format!("{}={}", name, rendered))
            }
        },
        None => {
            let opening = usage.opening_ref?;
            let node = parsed.nodes.get(opening.node)?;
            let NodeKind::OpeningElement { insert_at } = node.kind else {
                warn!(component = %usage.component_local_name, "opening handle resolved to a non-opening node");
                return None;
            };
            TextEdit::new(
                TextRange::new(insert_at, insert_at),
                format!(" {}={}", name, rendered),
            )
        }
    };
    Some(PlannedEdit::Attribute {
        component: usage.component_local_name.clone(),
        op,
        edit,
    })
}

/// Replaces the whole element with a rendered template. Slot placeholders
/// (`{slot}`) thread selected original attribute-value source text and the
/// original children into the replacement.
pub(crate) fn plan_replace(
    parsed: &ParsedFile,
    usage: &ComponentUsage,
    template: &ReplaceTemplate,
) -> Option<PlannedEdit> {
    let element_ref = usage.ast_ref?;
    let element = parsed.nodes.get(element_ref.node)?;
    let NodeKind::Element { children } = element.kind else {
        warn!(component = %usage.component_local_name, "element handle resolved to a non-element node");
        return None;
    };

    let mut rendered = template.template.clone();
    for (slot, source) in &template.slots {
        let content = match source {
            SlotSource::Attribute(attr_name) => usage
                .attributes
                .get(attr_name)
                .and_then(|info| info.ast)
                .map(|ast| match ast.value {
                    Some(value_ref) => parsed
                        .nodes
                        .get(value_ref.node)
                        .map(|n| parsed.text(n.range).to_string())
                        .unwrap_or_default(),
                    // Shorthand reads as an explicit true.
                    None => "{true}".to_string(),
                })
                .unwrap_or_default(),
            SlotSource::Children => children
                .map(|range| parsed.text(range).to_string())
                .unwrap_or_default(),
        };
        rendered = rendered.replace(&format!("{{{}}}", slot), &content);
    }

    Some(PlannedEdit::Replace {
        component: usage.component_local_name.clone(),
        edit: TextEdit::new(element.range, rendered),
    })
}
