//! Adaptive strategy selection and memory-pressure probing.
//!
//! One explicit policy function picks the execution strategy from corpus
//! size and current memory pressure; the pooled runner re-consults the
//! probe at every batch boundary and shrinks its batch toward a floor
//! instead of blocking.

use shift_config::StrategyConfig;
use tracing::info;

/// How a project graph gets built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Single-threaded; small corpora and debugging.
    Sequential,
    /// Bounded-concurrency async pipeline with a fixed in-flight window.
    Pipeline { window: usize },
    /// Fixed-size batches across blocking workers; records only, no AST
    /// handles, so the result supports reporting but not transformation.
    Pooled { batch_size: usize },
}

/// Snapshot of resident memory against the configured ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pressure {
    Nominal,
    /// Resident memory exceeds the ceiling.
    Elevated,
}

/// Source of resident-memory readings. A trait seam so tests can inject
/// fixed readings.
pub trait MemoryProbe: Send + Sync {
    /// Current resident set size in bytes, if the platform exposes it.
    fn resident_bytes(&self) -> Option<u64>;
}

/// Reads `/proc/self/statm`. On platforms without procfs every reading is
/// `None`, which the policy treats as nominal.
#[derive(Debug, Default)]
pub struct StatmProbe;

impl MemoryProbe for StatmProbe {
    fn resident_bytes(&self) -> Option<u64> {
        let statm = std::fs::read_to_string("/proc/self/statm").ok()?;
        let resident_pages: u64 = statm.split_whitespace().nth(1)?.parse().ok()?;
        Some(resident_pages * 4096)
    }
}

/// Fixed reading, for tests.
#[derive(Debug)]
pub struct FixedProbe(pub u64);

impl MemoryProbe for FixedProbe {
    fn resident_bytes(&self) -> Option<u64> {
        Some(self.0)
    }
}

/// Current pressure given a probe and an optional ceiling.
pub fn pressure(probe: &dyn MemoryProbe, ceiling_bytes: Option<u64>) -> Pressure {
    match (probe.resident_bytes(), ceiling_bytes) {
        (Some(resident), Some(ceiling)) if resident > ceiling => Pressure::Elevated,
        _ => Pressure::Nominal,
    }
}

/// The strategy policy. Small corpora run sequentially, medium ones through
/// the pipeline, large ones across the worker pool. Elevated pressure
/// demotes the pipeline (which retains every parsed tree) to pooled mode
/// and halves the opening batch.
pub fn choose_strategy(
    file_count: usize,
    pressure: Pressure,
    config: &StrategyConfig,
) -> Strategy {
    let strategy = if file_count <= config.sequential_max_files {
        Strategy::Sequential
    } else if file_count <= config.pipeline_max_files && pressure == Pressure::Nominal {
        Strategy::Pipeline {
            window: config.pipeline_window,
        }
    } else {
        let batch_size = match pressure {
            Pressure::Nominal => config.batch_size,
            Pressure::Elevated => (config.batch_size / 2).max(config.batch_floor),
        };
        Strategy::Pooled { batch_size }
    };
    info!(files = file_count, ?pressure, ?strategy, "strategy selected");
    strategy
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn config() -> StrategyConfig {
        StrategyConfig::default()
    }

    #[test]
    fn small_corpora_run_sequentially() {
        assert_eq!(
            choose_strategy(10, Pressure::Nominal, &config()),
            Strategy::Sequential
        );
    }

    #[test]
    fn medium_corpora_use_the_pipeline() {
        assert_eq!(
            choose_strategy(300, Pressure::Nominal, &config()),
            Strategy::Pipeline { window: 50 }
        );
    }

    #[test]
    fn large_corpora_use_the_pool() {
        assert_eq!(
            choose_strategy(5000, Pressure::Nominal, &config()),
            Strategy::Pooled { batch_size: 64 }
        );
    }

    #[test]
    fn elevated_pressure_demotes_pipeline_and_shrinks_batches() {
        assert_eq!(
            choose_strategy(300, Pressure::Elevated, &config()),
            Strategy::Pooled { batch_size: 32 }
        );
    }

    #[test]
    fn pressure_requires_both_reading_and_ceiling() {
        assert_eq!(pressure(&FixedProbe(100), None), Pressure::Nominal);
        assert_eq!(pressure(&FixedProbe(100), Some(200)), Pressure::Nominal);
        assert_eq!(pressure(&FixedProbe(300), Some(200)), Pressure::Elevated);
    }
}
