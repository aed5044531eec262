//! Batched worker-pool strategy.
//!
//! Files are partitioned into batches; within a batch, parsing and
//! extraction run on blocking workers that receive only serializable data
//! (path, raw text) and return plain records with no AST handles. The
//! coordinator stays the single graph writer. Batch size shrinks under
//! memory pressure down to a floor; running out of floor is the one
//! engine-fatal condition.

use crate::policy::{pressure, Pressure};
use crate::GraphBuilder;
use shift_foundation::{FileFailure, FileId, ProjectGraph, ShiftError, ShiftResult};
use std::collections::VecDeque;
use std::path::PathBuf;
use tokio::task::JoinSet;
use tracing::{error, info};

pub(crate) async fn run(
    builder: &GraphBuilder,
    graph: &mut ProjectGraph,
    failures: &mut Vec<FileFailure>,
    jobs: Vec<(FileId, PathBuf)>,
    initial_batch_size: usize,
) -> ShiftResult<()> {
    let floor = builder.strategy_config.batch_floor.max(1);
    let mut batch_size = initial_batch_size.max(floor);
    let mut queue: VecDeque<(FileId, PathBuf)> = jobs.into();

    while !queue.is_empty() {
        if builder.cancel.is_cancelled() {
            return Err(ShiftError::Cancelled);
        }

        // Policy re-evaluation at the batch boundary: shrink instead of
        // blocking, abort once there is no floor left to shrink to.
        if pressure(builder.probe.as_ref(), builder.memory_ceiling) == Pressure::Elevated {
            let shrunk = batch_size / 2;
            if shrunk < floor {
                return Err(ShiftError::MemoryCeiling { floor });
            }
            batch_size = shrunk;
            info!(batch_size, "memory pressure elevated, batch size shrunk");
        }

        let take = batch_size.min(queue.len());
        let batch: Vec<(FileId, PathBuf)> = queue.drain(..take).collect();

        // The coordinator reads; workers never touch the filesystem.
        let mut inputs = Vec::with_capacity(batch.len());
        for (id, path) in batch {
            match tokio::fs::read_to_string(&path).await {
                Ok(text) => inputs.push((id, path, text)),
                Err(e) => failures.push(FileFailure::io(path, e.to_string())),
            }
        }

        let mut join_set = JoinSet::new();
        for (id, path, text) in inputs {
            join_set.spawn_blocking(move || {
                shift_ast::extract_records(id, &path, &text)
                    .map_err(|e| FileFailure::parse(path, e.to_string()))
            });
        }

        while let Some(res) = join_set.join_next().await {
            match res {
                Ok(Ok(records)) => graph.absorb(records),
                Ok(Err(failure)) => failures.push(failure),
                Err(e) => error!("worker task failed: {}", e),
            }
        }
        // Batch intermediates dropped here before the next pressure check.
    }
    Ok(())
}
