//! Core data model shared between the graph builder, the cycle detector and
//! the transformation engine.

pub mod change_set;
pub mod report;

pub use change_set::{AttributeOp, ChangeSet, PlannedEdit, TextEdit};
pub use report::{RuleApplication, RunReport, SkippedFile};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Index into the coordinator-owned file table. Assigned deterministically
/// from the sorted discovery list before any extraction starts, so ids are
/// stable regardless of completion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileId(pub u32);

impl FileId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Index into a file's recorded-node side table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u32);

/// Arena-indexed handle to an AST node. Only graphs built by the sequential
/// or pipeline strategies carry these; pooled workers return data-only
/// records with no handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AstRef {
    pub file: FileId,
    pub node: NodeId,
}

/// Half-open byte range into a file's original source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextRange {
    pub start: u32,
    pub end: u32,
}

impl TextRange {
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> u32 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn overlaps(&self, other: &TextRange) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn contains(&self, other: &TextRange) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

/// 1-based line, 0-based column. Diagnostics only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

/// How an imported name is bound into the file's scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BindingKind {
    Default,
    Named,
    Namespace,
    TypeOnly,
}

/// One imported name in one file. Unique per `(file, local_name)`: importing
/// the same export twice under different aliases yields two bindings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportBinding {
    /// Module specifier as written in the source.
    pub package: String,
    pub file: FileId,
    /// `"default"`, `"*"`, or a named export.
    pub imported_name: String,
    pub binding_kind: BindingKind,
    /// Alias the name is bound to in this file.
    pub local_name: String,
    /// Handle to the owning import declaration; absent for pooled results.
    pub ast_ref: Option<AstRef>,
    pub position: Position,
}

/// Identifies a binding without an index into merge-order-dependent storage:
/// the `(file, local_name)` pair is unique by invariant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BindingKey {
    pub file: FileId,
    pub local_name: String,
}

/// Literal value of a JSX attribute, when one can be read statically.
/// Non-literal expressions are kept as opaque source text; rule predicates
/// never match them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AttributeValue {
    String(String),
    Number(f64),
    /// Shorthand attributes (`<Btn disabled />`) read as `Bool(true)`.
    Bool(bool),
    Expression(String),
}

/// AST handles for one attribute: the whole attribute node, its name node
/// and (when present) its value node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeAst {
    pub attr: AstRef,
    pub name: AstRef,
    pub value: Option<AstRef>,
}

/// One attribute on a component usage. Values are read from the tree, never
/// re-parsed from text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeInfo {
    pub value: Option<AttributeValue>,
    pub ast: Option<AttributeAst>,
}

/// One JSX element invocation of a (potentially imported) component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentUsage {
    pub file: FileId,
    pub component_local_name: String,
    /// Binding that introduced the local name, or `None` for locally-declared
    /// components (excluded from rule matching). Always refers into the same
    /// file.
    pub import_ref: Option<BindingKey>,
    /// Source-ordered attribute map.
    pub attributes: IndexMap<String, AttributeInfo>,
    pub position: Position,
    /// Handle to the element node; absent for pooled results.
    pub ast_ref: Option<AstRef>,
    /// Handle to the opening element, which carries the attribute insertion
    /// point for `set` edits.
    pub opening_ref: Option<AstRef>,
}

/// A non-statically-analyzable import site (`import(...)`, `require(...)`
/// behind a condition). Flagged, never silently dropped: cycles through
/// these are classified conditional and treated as breaking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DynamicImport {
    pub specifier: String,
    pub position: Position,
}

/// `export ... from "spec"` — introduces a dependency edge but no local
/// binding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReExport {
    pub specifier: String,
    pub type_only: bool,
    pub position: Position,
}

/// Per-file entry in the project graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    pub id: FileId,
    pub path: PathBuf,
    /// False until the file's extraction results have been merged; files
    /// that fail to parse stay unanalyzed and contribute nothing.
    pub analyzed: bool,
    pub dynamic_imports: Vec<DynamicImport>,
    pub reexports: Vec<ReExport>,
}

/// Serializable result of extracting one file. This is the unit pooled
/// workers send back to the coordinator; in AST-bearing modes the same
/// record is produced alongside the parsed module.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRecords {
    pub file: FileId,
    pub imports: Vec<ImportBinding>,
    pub usages: Vec<ComponentUsage>,
    pub dynamic_imports: Vec<DynamicImport>,
    pub reexports: Vec<ReExport>,
}

/// The whole-project index: every import binding and every component usage.
/// Append-only while the builder runs, read-only afterwards. One per
/// migration run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectGraph {
    pub files: Vec<FileRecord>,
    pub imports: Vec<ImportBinding>,
    pub usages: Vec<ComponentUsage>,
}

impl ProjectGraph {
    /// Pre-registers the candidate files so ids are stable no matter in
    /// which order extraction results arrive.
    pub fn with_files(paths: Vec<PathBuf>) -> Self {
        let files = paths
            .into_iter()
            .enumerate()
            .map(|(i, path)| FileRecord {
                id: FileId(i as u32),
                path,
                analyzed: false,
                dynamic_imports: Vec::new(),
                reexports: Vec::new(),
            })
            .collect();
        Self {
            files,
            imports: Vec::new(),
            usages: Vec::new(),
        }
    }

    pub fn path(&self, file: FileId) -> &Path {
        &self.files[file.index()].path
    }

    pub fn file_id(&self, path: &Path) -> Option<FileId> {
        self.files.iter().find(|f| f.path == path).map(|f| f.id)
    }

    /// Merges one file's extraction results. Commutative across files: the
    /// graph is a union of append-only per-file lists keyed by stable ids.
    pub fn absorb(&mut self, records: FileRecords) {
        let entry = &mut self.files[records.file.index()];
        debug_assert!(!entry.analyzed, "file merged twice: {}", entry.path.display());
        entry.analyzed = true;
        entry.dynamic_imports = records.dynamic_imports;
        entry.reexports = records.reexports;
        self.imports.extend(records.imports);
        self.usages.extend(records.usages);
    }

    pub fn binding(&self, key: &BindingKey) -> Option<&ImportBinding> {
        self.imports
            .iter()
            .find(|b| b.file == key.file && b.local_name == key.local_name)
    }

    pub fn imports_for(&self, file: FileId) -> impl Iterator<Item = &ImportBinding> {
        self.imports.iter().filter(move |b| b.file == file)
    }

    pub fn usages_for(&self, file: FileId) -> impl Iterator<Item = &ComponentUsage> {
        self.usages.iter().filter(move |u| u.file == file)
    }

    pub fn analyzed_files(&self) -> impl Iterator<Item = &FileRecord> {
        self.files.iter().filter(|f| f.analyzed)
    }

    /// Restores a deterministic record order after an arbitrary-completion
    /// merge. Within a file records are already in source order, so a
    /// stable sort by file id is enough to make graphs byte-identical
    /// across strategies and file permutations.
    pub fn normalize(&mut self) {
        self.imports.sort_by_key(|b| b.file);
        self.usages.sort_by_key(|u| u.file);
    }

    /// True if any record carries an AST handle; pooled graphs never do.
    pub fn has_ast_refs(&self) -> bool {
        self.imports.iter().any(|b| b.ast_ref.is_some())
            || self.usages.iter().any(|u| u.ast_ref.is_some())
    }
}
