//! shift-ast: parser, per-file node arenas and serializer for UIShift.
//!
//! The parser adapter turns file content into a SWC module behind one
//! interface (JSX/TSX vs plain dialects); the extraction visitor walks the
//! tree once, in source order, producing the records the project graph is
//! made of; the serializer re-renders mutated trees as minimal span edits
//! that leave untouched formatting alone.

pub mod arena;
pub mod error;
pub mod parser;
pub mod serializer;
pub mod visitor;

pub use arena::{ModuleStore, NodeKind, NodeTable, ParsedFile, RecordedNode};
pub use error::{AstError, AstResult};
pub use parser::{parse_source, syntax_for_path, ParsedSource};
pub use serializer::{apply_edits, emit_module_item};
pub use visitor::{extract_records, extract_with_ast};
