//! Change sets: the ordered list of AST-derived edits computed for one file,
//! plus the rendered before/after text pair the review layer displays.

use super::TextRange;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A minimal text replacement derived from an AST node's span. Untouched
/// bytes are preserved verbatim by the serializer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextEdit {
    pub range: TextRange,
    pub new_text: String,
}

impl TextEdit {
    pub fn new(range: TextRange, new_text: impl Into<String>) -> Self {
        Self {
            range,
            new_text: new_text.into(),
        }
    }
}

/// Attribute-level operation, for reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum AttributeOp {
    Remove { name: String },
    Rename { from: String, to: String },
    Set { name: String, value: String },
}

/// One planned edit in a change set. Matched exhaustively when applying.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum PlannedEdit {
    Attribute {
        component: String,
        #[serde(flatten)]
        op: AttributeOp,
        edit: TextEdit,
    },
    Import {
        package: String,
        component: String,
        edit: TextEdit,
    },
    Replace {
        component: String,
        edit: TextEdit,
    },
}

impl PlannedEdit {
    pub fn text_edit(&self) -> &TextEdit {
        match self {
            PlannedEdit::Attribute { edit, .. }
            | PlannedEdit::Import { edit, .. }
            | PlannedEdit::Replace { edit, .. } => edit,
        }
    }
}

/// All edits computed for one file. A file with no matching rule gets no
/// change set at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeSet {
    pub file: PathBuf,
    pub edits: Vec<PlannedEdit>,
    pub before_snapshot: String,
    pub after_snapshot: String,
}
