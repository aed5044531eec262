//! shift-foundation: shared data model, rules and error taxonomy for UIShift.
//!
//! Everything the graph builder, cycle detector and transformation engine
//! exchange lives here: the project graph records, the migration rule model,
//! change sets, the run report and the per-file failure values.

pub mod cancel;
pub mod error;
pub mod protocol;
pub mod rules;

pub use cancel::CancelToken;
pub use error::{FailurePhase, FileFailure, ShiftError, ShiftResult};
pub use protocol::{
    AstRef, AttributeAst, AttributeInfo, AttributeOp, AttributeValue, BindingKey, BindingKind,
    ChangeSet, ComponentUsage, DynamicImport, FileId, FileRecord, FileRecords, ImportBinding,
    NodeId, PlannedEdit, Position, ProjectGraph, ReExport, RuleApplication, RunReport, SkippedFile,
    TextEdit, TextRange,
};
pub use rules::{
    ImportTarget, LiteralValue, MigrationRule, Predicate, ReplaceTemplate, RuleEdit, SlotSource,
};
