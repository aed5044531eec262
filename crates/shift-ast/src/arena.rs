//! Per-file node arenas.
//!
//! Each parsed file owns its tree; graph records never hold references into
//! it. Instead the visitor records the nodes the engine may need to edit in
//! a side table, and records carry `(FileId, NodeId)` handles. The
//! coordinator-owned `ModuleStore` is the single writer and the only place a
//! handle can be resolved.

use shift_foundation::{AstRef, FileId, NodeId, TextRange};
use std::collections::HashMap;
use swc_common::sync::Lrc;
use swc_common::{BytePos, SourceMap, Span};
use swc_ecma_ast::Module;

/// What a recorded node is, plus the data the engine needs to edit it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// Top-level import declaration; `body_index` locates it in
    /// `Module::body` for clone-mutate-reemit rewrites.
    ImportDecl { body_index: u32 },
    /// A whole JSX element. `children` spans the region between the opening
    /// and closing tags, when the element has one.
    Element { children: Option<TextRange> },
    /// Opening tag of an element. `insert_at` is the byte offset where a new
    /// attribute can be spliced in.
    OpeningElement { insert_at: u32 },
    Attribute,
    AttributeName,
    AttributeValue,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedNode {
    pub kind: NodeKind,
    pub range: TextRange,
}

/// Side table of recorded nodes for one file.
#[derive(Debug, Clone, Default)]
pub struct NodeTable {
    nodes: Vec<RecordedNode>,
}

impl NodeTable {
    pub fn push(&mut self, node: RecordedNode) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    pub fn get(&self, id: NodeId) -> Option<&RecordedNode> {
        self.nodes.get(id.0 as usize)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// One successfully parsed file: tree, source map, original text and the
/// recorded-node table.
pub struct ParsedFile {
    pub file: FileId,
    pub source: String,
    pub module: Module,
    pub cm: Lrc<SourceMap>,
    /// Offset of this file inside its source map; spans are global to the
    /// map, ranges are file-local.
    pub start_pos: BytePos,
    pub nodes: NodeTable,
}

impl ParsedFile {
    /// Converts a span from this file's tree into a file-local byte range.
    pub fn range(&self, span: Span) -> TextRange {
        TextRange::new(span.lo.0 - self.start_pos.0, span.hi.0 - self.start_pos.0)
    }

    pub fn text(&self, range: TextRange) -> &str {
        &self.source[range.start as usize..range.end as usize]
    }
}

impl std::fmt::Debug for ParsedFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParsedFile")
            .field("file", &self.file)
            .field("nodes", &self.nodes.len())
            .finish_non_exhaustive()
    }
}

/// Coordinator-owned store of parsed modules, keyed by `FileId`. Built by a
/// single owner; workers and pipeline units never hold references into it.
#[derive(Debug, Default)]
pub struct ModuleStore {
    parsed: HashMap<FileId, ParsedFile>,
}

impl ModuleStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, parsed: ParsedFile) {
        self.parsed.insert(parsed.file, parsed);
    }

    pub fn get(&self, file: FileId) -> Option<&ParsedFile> {
        self.parsed.get(&file)
    }

    pub fn node(&self, handle: AstRef) -> Option<&RecordedNode> {
        self.parsed.get(&handle.file)?.nodes.get(handle.node)
    }

    pub fn len(&self) -> usize {
        self.parsed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parsed.is_empty()
    }

    /// Drops a file's tree. Used to release memory once a file can no longer
    /// be edited.
    pub fn evict(&mut self, file: FileId) {
        self.parsed.remove(&file);
    }
}
