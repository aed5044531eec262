//! shift-graph: whole-project graph construction.
//!
//! Given a list of file paths, produce a `ProjectGraph` plus a list of
//! per-file failures; a single bad file never aborts the build. Three
//! execution strategies share the same extraction algorithm and produce
//! identical graphs for the same input (pooled graphs carry no AST handles,
//! which is the one sanctioned difference).

pub mod discovery;
mod pipeline;
pub mod policy;
mod pooled;

pub use discovery::discover_files;
pub use policy::{choose_strategy, pressure, FixedProbe, MemoryProbe, Pressure, StatmProbe, Strategy};

use shift_ast::ModuleStore;
use shift_config::StrategyConfig;
use shift_foundation::{CancelToken, FileFailure, FileId, ProjectGraph, ShiftError, ShiftResult};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Result of a graph build: the graph, the module store backing its AST
/// handles (empty in pooled mode), and every per-file failure.
#[derive(Debug)]
pub struct GraphBuild {
    pub graph: ProjectGraph,
    pub store: ModuleStore,
    pub failures: Vec<FileFailure>,
    pub strategy: Strategy,
}

/// Builds `ProjectGraph`s. The builder is the only writer of the graph and
/// the store; strategy units hand it immutable result records.
pub struct GraphBuilder {
    pub(crate) strategy_config: StrategyConfig,
    pub(crate) memory_ceiling: Option<u64>,
    pub(crate) probe: Arc<dyn MemoryProbe>,
    pub(crate) cancel: CancelToken,
}

impl GraphBuilder {
    pub fn new(strategy_config: StrategyConfig, memory_ceiling: Option<u64>) -> Self {
        Self {
            strategy_config,
            memory_ceiling,
            probe: Arc::new(StatmProbe),
            cancel: CancelToken::new(),
        }
    }

    pub fn with_probe(mut self, probe: Arc<dyn MemoryProbe>) -> Self {
        self.probe = probe;
        self
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Applies the strategy policy to the current corpus and memory
    /// reading.
    pub fn select_strategy(&self, file_count: usize) -> Strategy {
        let pressure = pressure(self.probe.as_ref(), self.memory_ceiling);
        choose_strategy(file_count, pressure, &self.strategy_config)
    }

    /// Builds the graph with an automatically selected strategy.
    pub async fn build(&self, paths: Vec<PathBuf>) -> ShiftResult<GraphBuild> {
        let strategy = self.select_strategy(paths.len());
        self.build_with(paths, strategy).await
    }

    /// Builds the graph with an explicit strategy.
    pub async fn build_with(
        &self,
        paths: Vec<PathBuf>,
        strategy: Strategy,
    ) -> ShiftResult<GraphBuild> {
        let mut graph = ProjectGraph::with_files(paths);
        let jobs: Vec<(FileId, PathBuf)> = graph
            .files
            .iter()
            .map(|f| (f.id, f.path.clone()))
            .collect();
        let mut store = ModuleStore::new();
        let mut failures = Vec::new();

        match strategy {
            Strategy::Sequential => {
                self.build_sequential(&mut graph, &mut store, &mut failures, jobs)?
            }
            Strategy::Pipeline { window } => {
                pipeline::run(self, &mut graph, &mut store, &mut failures, jobs, window).await?
            }
            Strategy::Pooled { batch_size } => {
                pooled::run(self, &mut graph, &mut failures, jobs, batch_size).await?
            }
        }

        graph.normalize();
        failures.sort_by(|a, b| a.file.cmp(&b.file));
        debug!(
            imports = graph.imports.len(),
            usages = graph.usages.len(),
            failures = failures.len(),
            "graph build complete"
        );
        Ok(GraphBuild {
            graph,
            store,
            failures,
            strategy,
        })
    }

    fn build_sequential(
        &self,
        graph: &mut ProjectGraph,
        store: &mut ModuleStore,
        failures: &mut Vec<FileFailure>,
        jobs: Vec<(FileId, PathBuf)>,
    ) -> ShiftResult<()> {
        for (id, path) in jobs {
            if self.cancel.is_cancelled() {
                return Err(ShiftError::Cancelled);
            }
            match std::fs::read_to_string(&path) {
                Ok(source) => extract_into(graph, store, failures, id, &path, &source),
                Err(e) => failures.push(FileFailure::io(path, e.to_string())),
            }
        }
        Ok(())
    }
}

/// Shared per-file step for the AST-bearing strategies: extract, keep the
/// tree, merge the records. Failures are recorded, never propagated.
pub(crate) fn extract_into(
    graph: &mut ProjectGraph,
    store: &mut ModuleStore,
    failures: &mut Vec<FileFailure>,
    id: FileId,
    path: &Path,
    source: &str,
) {
    match shift_ast::extract_with_ast(id, path, source) {
        Ok((records, parsed)) => {
            store.insert(parsed);
            graph.absorb(records);
        }
        Err(e) => failures.push(FileFailure::parse(path.to_path_buf(), e.to_string())),
    }
}
