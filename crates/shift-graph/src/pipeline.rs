//! Concurrent pipeline strategy: a producer of file paths feeds a fixed
//! in-flight window of reads; results merge into the single coordinator-
//! owned graph in whatever order they complete. The merge is commutative,
//! so completion order never shows in the result.

use crate::{extract_into, GraphBuilder};
use futures::stream::{self, StreamExt};
use shift_ast::ModuleStore;
use shift_foundation::{FileFailure, FileId, ProjectGraph, ShiftError, ShiftResult};
use std::path::PathBuf;

pub(crate) async fn run(
    builder: &GraphBuilder,
    graph: &mut ProjectGraph,
    store: &mut ModuleStore,
    failures: &mut Vec<FileFailure>,
    jobs: Vec<(FileId, PathBuf)>,
    window: usize,
) -> ShiftResult<()> {
    let mut results = stream::iter(jobs.into_iter().map(|(id, path)| async move {
        let read = tokio::fs::read_to_string(&path).await;
        (id, path, read)
    }))
    .buffer_unordered(window.max(1));

    while let Some((id, path, read)) = results.next().await {
        if builder.cancel.is_cancelled() {
            return Err(ShiftError::Cancelled);
        }
        match read {
            Ok(source) => extract_into(graph, store, failures, id, &path, &source),
            Err(e) => failures.push(FileFailure::io(path, e.to_string())),
        }
    }
    Ok(())
}
