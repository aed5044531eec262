//! Serializer adapter.
//!
//! Mutated trees are rendered back to source as minimal span replacements:
//! untouched bytes are carried over verbatim, so formatting survives
//! everywhere an edit did not land. Overlapping edits are a programmer
//! error surfaced as `AstError::Transformation`, never silent corruption.

use crate::error::{AstError, AstResult};
use shift_foundation::TextEdit;
use swc_common::sync::Lrc;
use swc_common::{SourceMap, DUMMY_SP};
use swc_ecma_ast::{Module, ModuleItem};
use swc_ecma_codegen::{text_writer::JsWriter, Emitter};

/// Applies a set of non-overlapping edits to the original text.
pub fn apply_edits(source: &str, edits: &[TextEdit]) -> AstResult<String> {
    if edits.is_empty() {
        return Ok(source.to_string());
    }

    let mut ordered: Vec<&TextEdit> = edits.iter().collect();
    ordered.sort_by_key(|e| (e.range.start, e.range.end));

    for pair in ordered.windows(2) {
        if pair[0].range.overlaps(&pair[1].range) {
            return Err(AstError::transformation(format!(
                "overlapping edits at {}..{} and {}..{}",
                pair[0].range.start, pair[0].range.end, pair[1].range.start, pair[1].range.end
            )));
        }
    }
    if let Some(last) = ordered.last() {
        if last.range.end as usize > source.len() {
            return Err(AstError::transformation(format!(
                "edit range {}..{} exceeds source length {}",
                last.range.start,
                last.range.end,
                source.len()
            )));
        }
    }

    let mut out = String::with_capacity(source.len());
    let mut cursor = 0usize;
    for edit in ordered {
        out.push_str(&source[cursor..edit.range.start as usize]);
        out.push_str(&edit.new_text);
        cursor = edit.range.end as usize;
    }
    out.push_str(&source[cursor..]);
    Ok(out)
}

/// Renders a single module item (an import declaration, in practice)
/// through the code generator. Used when an import statement is rewritten
/// wholesale rather than patched span-by-span.
pub fn emit_module_item(item: ModuleItem, cm: &Lrc<SourceMap>) -> AstResult<String> {
    let module = Module {
        span: DUMMY_SP,
        body: vec![item],
        shebang: None,
    };

    let mut buf = vec![];
    {
        let mut emitter = Emitter {
            cfg: Default::default(),
            cm: cm.clone(),
            comments: None,
            wr: JsWriter::new(cm.clone(), "\n", &mut buf, None),
        };
        emitter
            .emit_module(&module)
            .map_err(|e| AstError::transformation(format!("codegen failed: {}", e)))?;
    }

    String::from_utf8(buf)
        .map(|s| s.trim_end().to_string())
        .map_err(|e| AstError::transformation(format!("codegen produced invalid utf8: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use shift_foundation::TextRange;

    #[test]
    fn applies_edits_preserving_untouched_bytes() {
        let source = "<Button variant=\"primary\" size=\"m\" />";
        let edits = vec![
            TextEdit::new(TextRange::new(8, 15), "appearance"),
            TextEdit::new(TextRange::new(26, 34), ""),
        ];
        let out = apply_edits(source, &edits).unwrap();
        assert_eq!(out, "<Button appearance=\"primary\"  />");
    }

    #[test]
    fn edits_apply_regardless_of_given_order() {
        let source = "abcdef";
        let forward = vec![
            TextEdit::new(TextRange::new(0, 1), "X"),
            TextEdit::new(TextRange::new(3, 4), "Y"),
        ];
        let reversed: Vec<TextEdit> = forward.iter().rev().cloned().collect();
        assert_eq!(
            apply_edits(source, &forward).unwrap(),
            apply_edits(source, &reversed).unwrap()
        );
    }

    #[test]
    fn overlapping_edits_are_rejected() {
        let source = "abcdef";
        let edits = vec![
            TextEdit::new(TextRange::new(0, 3), "X"),
            TextEdit::new(TextRange::new(2, 4), "Y"),
        ];
        let err = apply_edits(source, &edits).unwrap_err();
        assert!(matches!(err, AstError::Transformation { .. }));
    }

    #[test]
    fn out_of_bounds_edit_is_rejected() {
        let err = apply_edits("ab", &[TextEdit::new(TextRange::new(0, 9), "X")]).unwrap_err();
        assert!(matches!(err, AstError::Transformation { .. }));
    }
}
