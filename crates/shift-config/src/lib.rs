//! shift-config: application configuration, rule-document loading and
//! logging initialization for UIShift.

pub mod logging;
pub mod rules;

pub use rules::{load_rules, parse_rule_document, validate_rule_document};

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Log output format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

/// Thresholds and sizes for the adaptive strategy policy. The numbers are
/// re-evaluated at batch boundaries, not just once up front.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyConfig {
    /// Corpora up to this size run single-threaded.
    pub sequential_max_files: usize,
    /// Corpora up to this size run through the bounded async pipeline.
    pub pipeline_max_files: usize,
    /// In-flight window for the pipeline strategy.
    pub pipeline_window: usize,
    /// Initial batch size for the pooled strategy.
    pub batch_size: usize,
    /// Smallest batch the pooled strategy will shrink to under memory
    /// pressure; going below it aborts the run with partial results kept.
    pub batch_floor: usize,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            sequential_max_files: 48,
            pipeline_max_files: 512,
            pipeline_window: 50,
            batch_size: 64,
            batch_floor: 16,
        }
    }
}

/// Top-level application configuration for one migration run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppConfig {
    /// Root of the source tree to migrate.
    pub root: PathBuf,
    /// Include globs, relative to `root`. Empty means every supported file.
    pub include: Vec<String>,
    /// Exclude globs, relative to `root`.
    pub exclude: Vec<String>,
    pub strategy: StrategyConfig,
    /// Resident-memory ceiling in bytes; `None` disables pressure checks.
    pub memory_ceiling_bytes: Option<u64>,
    pub logging: LoggingConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            include: Vec::new(),
            exclude: vec!["**/node_modules/**".to_string(), "**/dist/**".to_string()],
            strategy: StrategyConfig::default(),
            memory_ceiling_bytes: None,
            logging: LoggingConfig::default(),
        }
    }
}
