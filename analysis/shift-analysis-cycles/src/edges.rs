//! Derives file-level dependency edges from a `ProjectGraph`.
//!
//! A specifier only becomes an edge when it resolves to a file inside the
//! project; external packages are not edges. Static imports carry their
//! binding kind, re-exports contribute re-export edges, and dynamic import
//! sites contribute value edges flagged conditional.

use serde::{Deserialize, Serialize};
use shift_foundation::{BindingKind, FileId, ProjectGraph};
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EdgeKind {
    Value,
    TypeOnly,
    ReExport,
}

/// One merged dependency edge between two project files. Multiple import
/// statements between the same pair collapse into one edge; value wins
/// over runtime re-export wins over type-only. A `export type` re-export
/// is type-only, not a runtime edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileDependencyEdge {
    pub from: FileId,
    pub to: FileId,
    pub kind: EdgeKind,
    /// Some statement between the pair is a re-export.
    pub reexport: bool,
    /// Some import site between the pair is dynamic/conditional.
    pub conditional: bool,
}

impl FileDependencyEdge {
    /// A type-only edge cannot break at runtime; everything else can.
    pub fn is_value_kind(&self) -> bool {
        self.kind != EdgeKind::TypeOnly
    }
}

const PROBE_SUFFIXES: &[&str] = &["", ".ts", ".tsx", ".js", ".jsx", "/index.ts", "/index.tsx"];

/// Lexically normalizes a path (resolves `.` and `..` without touching the
/// filesystem).
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Resolves a relative specifier against the importing file, probing the
/// usual extension and index-file suffixes. Bare specifiers are external
/// packages and never resolve.
pub fn resolve_specifier(
    specifier: &str,
    from: &Path,
    files_by_path: &HashMap<PathBuf, FileId>,
) -> Option<FileId> {
    if !specifier.starts_with("./") && !specifier.starts_with("../") {
        return None;
    }
    let base = from.parent()?.join(specifier);
    for suffix in PROBE_SUFFIXES {
        let candidate = normalize(&PathBuf::from(format!("{}{}", base.display(), suffix)));
        if let Some(&id) = files_by_path.get(&candidate) {
            return Some(id);
        }
    }
    None
}

#[derive(Default)]
struct EdgeAgg {
    value: bool,
    reexport: bool,
    /// A re-export between the pair that carries runtime bindings. A
    /// `export type { .. } from` statement sets `reexport` but not this.
    runtime_reexport: bool,
    type_only: bool,
    conditional: bool,
}

/// Derives the merged file-dependency edges of the whole graph.
pub fn derive_edges(graph: &ProjectGraph) -> Vec<FileDependencyEdge> {
    let files_by_path: HashMap<PathBuf, FileId> = graph
        .files
        .iter()
        .map(|f| (f.path.clone(), f.id))
        .collect();

    let mut merged: HashMap<(FileId, FileId), EdgeAgg> = HashMap::new();

    for binding in &graph.imports {
        let from_path = graph.path(binding.file);
        if let Some(to) = resolve_specifier(&binding.package, from_path, &files_by_path) {
            let agg = merged.entry((binding.file, to)).or_default();
            if binding.binding_kind == BindingKind::TypeOnly {
                agg.type_only = true;
            } else {
                agg.value = true;
            }
        }
    }

    for file in graph.analyzed_files() {
        for reexport in &file.reexports {
            if let Some(to) = resolve_specifier(&reexport.specifier, &file.path, &files_by_path) {
                let agg = merged.entry((file.id, to)).or_default();
                agg.reexport = true;
                if reexport.type_only {
                    agg.type_only = true;
                } else {
                    agg.runtime_reexport = true;
                }
            }
        }
        for dynamic in &file.dynamic_imports {
            if let Some(to) = resolve_specifier(&dynamic.specifier, &file.path, &files_by_path) {
                let agg = merged.entry((file.id, to)).or_default();
                agg.value = true;
                agg.conditional = true;
            }
        }
    }

    let mut edges: Vec<FileDependencyEdge> = merged
        .into_iter()
        .map(|((from, to), agg)| {
            let kind = if agg.value {
                EdgeKind::Value
            } else if agg.runtime_reexport {
                EdgeKind::ReExport
            } else {
                EdgeKind::TypeOnly
            };
            FileDependencyEdge {
                from,
                to,
                kind,
                reexport: agg.reexport,
                conditional: agg.conditional,
            }
        })
        .collect();
    edges.sort_by_key(|e| (e.from, e.to));
    edges
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn normalizes_parent_segments() {
        assert_eq!(
            normalize(Path::new("/proj/src/../lib/a.ts")),
            PathBuf::from("/proj/lib/a.ts")
        );
    }

    #[test]
    fn bare_specifiers_never_resolve() {
        let files = HashMap::from([(PathBuf::from("/p/react.ts"), FileId(0))]);
        assert_eq!(
            resolve_specifier("react", Path::new("/p/a.ts"), &files),
            None
        );
    }

    #[test]
    fn probes_extensions_and_index_files() {
        let files = HashMap::from([
            (PathBuf::from("/p/b.tsx"), FileId(1)),
            (PathBuf::from("/p/widgets/index.ts"), FileId(2)),
        ]);
        assert_eq!(
            resolve_specifier("./b", Path::new("/p/a.ts"), &files),
            Some(FileId(1))
        );
        assert_eq!(
            resolve_specifier("./widgets", Path::new("/p/a.ts"), &files),
            Some(FileId(2))
        );
    }
}
