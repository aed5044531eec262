//! Detects and classifies circular file dependencies in a `ProjectGraph`.
//!
//! Edges derive lazily from the graph's import records; strongly connected
//! components come from Tarjan's algorithm, and elementary cycles inside
//! each component are enumerated with a bounded depth-first search anchored
//! at the component's smallest file id, so rotations of the same loop are
//! never reported twice.

pub mod edges;

pub use edges::{derive_edges, resolve_specifier, EdgeKind, FileDependencyEdge};

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};
use shift_foundation::{FileId, ProjectGraph};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use tracing::{debug, warn};

/// Shape of a detected cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CycleKind {
    /// A file that imports itself.
    SelfReference,
    /// Two files importing each other.
    Direct,
    /// Longer loop of static value/type imports.
    Indirect,
    /// Loop passing through a re-export statement.
    ThroughReExport,
    /// Loop formed through a dynamic/conditional import site. Inherently
    /// heuristic, so always treated as breaking.
    Conditional,
    /// Indirect loop spanning five or more files.
    DeepIndirect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResolutionComplexity {
    Low,
    High,
}

/// One classified cycle. `nodes` closes the loop: first == last.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cycle {
    pub nodes: Vec<PathBuf>,
    pub node_ids: Vec<FileId>,
    pub kind: CycleKind,
    /// True iff some edge on the loop is value-kind; a purely type-only
    /// loop cannot break at runtime.
    pub breaking: bool,
    pub resolution_complexity: ResolutionComplexity,
    /// Files imported by two or more cycle members — extraction candidates.
    pub shared_dependencies: Vec<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub total_cycles: usize,
    pub breaking_cycles: usize,
    pub non_breaking_cycles: usize,
    pub largest_cycle_size: usize,
    pub files_analyzed: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleAnalysis {
    pub cycles: Vec<Cycle>,
    pub summary: Summary,
}

impl CycleAnalysis {
    /// Files participating in any breaking cycle; the engine refuses to
    /// transform these.
    pub fn blocked_files(&self) -> HashSet<FileId> {
        self.cycles
            .iter()
            .filter(|c| c.breaking)
            .flat_map(|c| c.node_ids.iter().copied())
            .collect()
    }
}

/// Search bounds. Real-world cycles are short; the caps keep dense graphs
/// tractable.
#[derive(Debug, Clone)]
pub struct CycleOptions {
    pub max_cycle_len: usize,
    pub max_cycles: usize,
}

impl Default for CycleOptions {
    fn default() -> Self {
        Self {
            max_cycle_len: 32,
            max_cycles: 10_000,
        }
    }
}

/// Finds and classifies every elementary cycle among the graph's derived
/// file-dependency edges.
pub fn find_cycles(graph: &ProjectGraph, options: &CycleOptions) -> CycleAnalysis {
    let edges = derive_edges(graph);
    let edge_map: HashMap<(FileId, FileId), &FileDependencyEdge> =
        edges.iter().map(|e| ((e.from, e.to), e)).collect();

    let mut digraph: DiGraph<FileId, ()> = DiGraph::new();
    let mut node_map: HashMap<FileId, NodeIndex> = HashMap::new();
    for file in &graph.files {
        node_map.insert(file.id, digraph.add_node(file.id));
    }
    for edge in &edges {
        digraph.add_edge(node_map[&edge.from], node_map[&edge.to], ());
    }

    // Sorted adjacency keyed by file id keeps enumeration deterministic.
    let mut adjacency: HashMap<FileId, Vec<FileId>> = HashMap::new();
    for edge in &edges {
        adjacency.entry(edge.from).or_default().push(edge.to);
    }

    let mut raw_cycles: Vec<Vec<FileId>> = Vec::new();
    for scc in tarjan_scc(&digraph) {
        if raw_cycles.len() >= options.max_cycles {
            warn!(max = options.max_cycles, "cycle cap reached, search truncated");
            break;
        }
        let mut members: Vec<FileId> = scc.iter().map(|&n| digraph[n]).collect();
        members.sort();
        // Self-loops are invisible to the anchored walk below; report them
        // per member whatever the component's size.
        for &id in &members {
            if edge_map.contains_key(&(id, id)) {
                raw_cycles.push(vec![id, id]);
            }
        }
        if members.len() > 1 {
            enumerate_scc_cycles(&members, &adjacency, options, &mut raw_cycles);
        }
    }

    let cycles: Vec<Cycle> = raw_cycles
        .into_iter()
        .map(|nodes| classify(graph, &edge_map, &adjacency, nodes))
        .collect();

    let breaking = cycles.iter().filter(|c| c.breaking).count();
    let largest = cycles
        .iter()
        .map(|c| c.node_ids.len().saturating_sub(1))
        .max()
        .unwrap_or(0);
    let summary = Summary {
        total_cycles: cycles.len(),
        breaking_cycles: breaking,
        non_breaking_cycles: cycles.len() - breaking,
        largest_cycle_size: largest,
        files_analyzed: graph.analyzed_files().count(),
    };
    debug!(
        cycles = summary.total_cycles,
        breaking = summary.breaking_cycles,
        "cycle analysis complete"
    );
    CycleAnalysis { cycles, summary }
}

/// Enumerates elementary cycles within one strongly connected component.
/// Each cycle is anchored at its smallest member, which makes rotations of
/// the same loop impossible by construction; the walk is an iterative DFS
/// over an explicit path stack.
fn enumerate_scc_cycles(
    members: &[FileId],
    adjacency: &HashMap<FileId, Vec<FileId>>,
    options: &CycleOptions,
    out: &mut Vec<Vec<FileId>>,
) {
    let member_set: HashSet<FileId> = members.iter().copied().collect();
    let empty: Vec<FileId> = Vec::new();

    for &start in members {
        let mut path: Vec<FileId> = vec![start];
        let mut on_path: HashSet<FileId> = HashSet::from([start]);
        // One frame per path node: which neighbor index to try next.
        let mut frames: Vec<usize> = vec![0];

        while let Some(next_idx) = frames.last_mut() {
            if out.len() >= options.max_cycles {
                return;
            }
            let Some(&node) = path.last() else {
                break;
            };
            let neighbors = adjacency.get(&node).unwrap_or(&empty);
            if *next_idx >= neighbors.len() {
                frames.pop();
                on_path.remove(&node);
                path.pop();
                continue;
            }
            let neighbor = neighbors[*next_idx];
            *next_idx += 1;

            if neighbor == start && path.len() >= 2 {
                let mut cycle = path.clone();
                cycle.push(start);
                out.push(cycle);
                continue;
            }
            // Anchor at the minimum member: only walk ids above the start.
            if neighbor <= start
                || !member_set.contains(&neighbor)
                || on_path.contains(&neighbor)
                || path.len() >= options.max_cycle_len
            {
                continue;
            }
            path.push(neighbor);
            on_path.insert(neighbor);
            frames.push(0);
        }
    }
}

fn classify(
    graph: &ProjectGraph,
    edge_map: &HashMap<(FileId, FileId), &FileDependencyEdge>,
    adjacency: &HashMap<FileId, Vec<FileId>>,
    node_ids: Vec<FileId>,
) -> Cycle {
    let distinct = node_ids.len() - 1;
    let cycle_edges: Vec<&FileDependencyEdge> = node_ids
        .windows(2)
        .filter_map(|pair| edge_map.get(&(pair[0], pair[1])).copied())
        .collect();

    let conditional = cycle_edges.iter().any(|e| e.conditional);
    let through_reexport = cycle_edges.iter().any(|e| e.reexport);
    let breaking = conditional || cycle_edges.iter().any(|e| e.is_value_kind());

    let kind = if distinct == 1 {
        CycleKind::SelfReference
    } else if distinct == 2 {
        CycleKind::Direct
    } else if conditional {
        CycleKind::Conditional
    } else if through_reexport {
        CycleKind::ThroughReExport
    } else if distinct >= 5 {
        CycleKind::DeepIndirect
    } else {
        CycleKind::Indirect
    };

    let resolution_complexity = if breaking || distinct >= 3 {
        ResolutionComplexity::High
    } else {
        ResolutionComplexity::Low
    };

    // Files imported by two or more members, excluding the members
    // themselves (and thus the cycle's own edges).
    let member_set: HashSet<FileId> = node_ids.iter().copied().collect();
    let mut import_counts: HashMap<FileId, usize> = HashMap::new();
    for &member in member_set.iter() {
        if let Some(targets) = adjacency.get(&member) {
            let unique: HashSet<FileId> = targets.iter().copied().collect();
            for target in unique {
                *import_counts.entry(target).or_default() += 1;
            }
        }
    }
    let mut shared: Vec<FileId> = import_counts
        .into_iter()
        .filter(|(target, count)| *count >= 2 && !member_set.contains(target))
        .map(|(target, _)| target)
        .collect();
    shared.sort();

    Cycle {
        nodes: node_ids
            .iter()
            .map(|&id| graph.path(id).to_path_buf())
            .collect(),
        node_ids,
        kind,
        breaking,
        resolution_complexity,
        shared_dependencies: shared.iter().map(|&id| graph.path(id).to_path_buf()).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use shift_foundation::{
        BindingKind, DynamicImport, FileRecords, ImportBinding, Position, ProjectGraph, ReExport,
    };

    /// Builds a graph from `(file name, value imports, type imports)`
    /// triples; names resolve as `./name` specifiers under one directory.
    fn graph(files: &[(&str, &[&str], &[&str])]) -> ProjectGraph {
        let paths = files
            .iter()
            .map(|(name, _, _)| PathBuf::from(format!("/proj/{}.ts", name)))
            .collect();
        let mut graph = ProjectGraph::with_files(paths);
        for (i, (_, value_imports, type_imports)) in files.iter().enumerate() {
            let file = FileId(i as u32);
            let binding = |spec: &str, kind: BindingKind, n: usize| ImportBinding {
                package: format!("./{}", spec),
                file,
                imported_name: format!("X{}", n),
                binding_kind: kind,
                local_name: format!("X{}", n),
                ast_ref: None,
                position: Position::default(),
            };
            let mut imports = Vec::new();
            for (n, spec) in value_imports.iter().enumerate() {
                imports.push(binding(spec, BindingKind::Named, n));
            }
            for (n, spec) in type_imports.iter().enumerate() {
                imports.push(binding(spec, BindingKind::TypeOnly, 100 + n));
            }
            graph.absorb(FileRecords {
                file,
                imports,
                usages: vec![],
                dynamic_imports: vec![],
                reexports: vec![],
            });
        }
        graph
    }

    fn analyze(g: &ProjectGraph) -> CycleAnalysis {
        find_cycles(g, &CycleOptions::default())
    }

    #[test]
    fn direct_cycle_is_found_exactly_once() {
        let g = graph(&[("a", &["b"], &[]), ("b", &["a"], &[])]);
        let analysis = analyze(&g);
        assert_eq!(analysis.summary.total_cycles, 1);
        let cycle = &analysis.cycles[0];
        assert_eq!(cycle.kind, CycleKind::Direct);
        assert_eq!(cycle.node_ids.len(), 3); // a, b, a
        assert!(cycle.breaking);
    }

    #[test]
    fn three_file_cycle_is_indirect_with_closure() {
        let g = graph(&[("a", &["b"], &[]), ("b", &["c"], &[]), ("c", &["a"], &[])]);
        let analysis = analyze(&g);
        assert_eq!(analysis.summary.total_cycles, 1);
        let cycle = &analysis.cycles[0];
        assert_eq!(cycle.kind, CycleKind::Indirect);
        assert_eq!(cycle.node_ids.len(), 4);
        assert_eq!(cycle.node_ids.first(), cycle.node_ids.last());
        assert_eq!(cycle.resolution_complexity, ResolutionComplexity::High);
    }

    #[test]
    fn self_import_is_a_self_reference() {
        let g = graph(&[("a", &["a"], &[])]);
        let analysis = analyze(&g);
        assert_eq!(analysis.summary.total_cycles, 1);
        let cycle = &analysis.cycles[0];
        assert_eq!(cycle.kind, CycleKind::SelfReference);
        assert_eq!(cycle.node_ids.len(), 2);
    }

    #[test]
    fn self_loop_inside_a_larger_component_is_still_reported() {
        // a is both its own dependency and half of a two-file loop; the
        // component has two members but the self-loop must not vanish.
        let g = graph(&[("a", &["a", "b"], &[]), ("b", &["a"], &[])]);
        let analysis = analyze(&g);
        assert_eq!(analysis.summary.total_cycles, 2);
        let kinds: Vec<_> = analysis.cycles.iter().map(|c| c.kind).collect();
        assert!(kinds.contains(&CycleKind::SelfReference));
        assert!(kinds.contains(&CycleKind::Direct));
    }

    #[test]
    fn type_only_cycle_is_non_breaking_until_a_value_edge_joins() {
        let type_only = graph(&[("a", &[], &["b"]), ("b", &[], &["a"])]);
        let analysis = analyze(&type_only);
        assert_eq!(analysis.summary.total_cycles, 1);
        assert!(!analysis.cycles[0].breaking);
        assert_eq!(
            analysis.cycles[0].resolution_complexity,
            ResolutionComplexity::Low
        );
        assert_eq!(analysis.summary.non_breaking_cycles, 1);

        let mixed = graph(&[("a", &["b"], &[]), ("b", &[], &["a"])]);
        let analysis = analyze(&mixed);
        assert!(analysis.cycles[0].breaking);
        assert_eq!(
            analysis.cycles[0].resolution_complexity,
            ResolutionComplexity::High
        );
    }

    #[test]
    fn five_file_cycle_is_deep_indirect() {
        let g = graph(&[
            ("a", &["b"], &[]),
            ("b", &["c"], &[]),
            ("c", &["d"], &[]),
            ("d", &["e"], &[]),
            ("e", &["a"], &[]),
        ]);
        let analysis = analyze(&g);
        assert_eq!(analysis.summary.total_cycles, 1);
        assert_eq!(analysis.cycles[0].kind, CycleKind::DeepIndirect);
        assert_eq!(analysis.summary.largest_cycle_size, 5);
    }

    #[test]
    fn dynamic_import_cycle_is_conditional_and_breaking() {
        let mut g = graph(&[("a", &[], &[]), ("b", &["a"], &[]), ("c", &["b"], &[])]);
        // a dynamically imports c, closing a -> c -> b -> a.
        g.files[0].dynamic_imports.push(DynamicImport {
            specifier: "./c".to_string(),
            position: Position::default(),
        });
        let analysis = analyze(&g);
        assert_eq!(analysis.summary.total_cycles, 1);
        let cycle = &analysis.cycles[0];
        assert_eq!(cycle.kind, CycleKind::Conditional);
        assert!(cycle.breaking);
    }

    #[test]
    fn reexport_cycle_is_tagged_through_reexport() {
        let mut g = graph(&[("a", &["b"], &[]), ("b", &["c"], &[]), ("c", &[], &[])]);
        // c re-exports from a, closing a -> b -> c -> a.
        g.files[2].reexports.push(ReExport {
            specifier: "./a".to_string(),
            type_only: false,
            position: Position::default(),
        });
        let analysis = analyze(&g);
        assert_eq!(analysis.summary.total_cycles, 1);
        assert_eq!(analysis.cycles[0].kind, CycleKind::ThroughReExport);
        assert!(analysis.cycles[0].breaking);
    }

    #[test]
    fn type_only_reexport_cycle_is_non_breaking() {
        // a type-imports b; b closes the loop with `export type { .. } from
        // "./a"`. Nothing on the loop exists at runtime.
        let mut g = graph(&[("a", &[], &["b"]), ("b", &[], &[])]);
        g.files[1].reexports.push(ReExport {
            specifier: "./a".to_string(),
            type_only: true,
            position: Position::default(),
        });
        let analysis = analyze(&g);
        assert_eq!(analysis.summary.total_cycles, 1);
        let cycle = &analysis.cycles[0];
        assert!(!cycle.breaking);
        assert_eq!(cycle.resolution_complexity, ResolutionComplexity::Low);
        assert!(analysis.blocked_files().is_empty());
    }

    #[test]
    fn shared_dependencies_exclude_cycle_members() {
        // a and b form the cycle; both import shared c.
        let g = graph(&[
            ("a", &["b", "c"], &[]),
            ("b", &["a", "c"], &[]),
            ("c", &[], &[]),
        ]);
        let analysis = analyze(&g);
        assert_eq!(analysis.summary.total_cycles, 1);
        assert_eq!(
            analysis.cycles[0].shared_dependencies,
            vec![PathBuf::from("/proj/c.ts")]
        );
    }

    #[test]
    fn acyclic_graph_reports_nothing() {
        let g = graph(&[("a", &["b"], &[]), ("b", &["c"], &[]), ("c", &[], &[])]);
        let analysis = analyze(&g);
        assert_eq!(analysis.summary.total_cycles, 0);
        assert!(analysis.blocked_files().is_empty());
    }

    #[test]
    fn blocked_files_cover_breaking_members_only() {
        let g = graph(&[
            ("a", &["b"], &[]),
            ("b", &["a"], &[]),
            ("c", &[], &["d"]),
            ("d", &[], &["c"]),
        ]);
        let analysis = analyze(&g);
        assert_eq!(analysis.summary.total_cycles, 2);
        let blocked = analysis.blocked_files();
        assert!(blocked.contains(&FileId(0)));
        assert!(blocked.contains(&FileId(1)));
        assert!(!blocked.contains(&FileId(2)));
        assert!(!blocked.contains(&FileId(3)));
    }
}
