//! Run reporting: every run states what was processed, what was skipped and
//! why, so a blocked or partial run is self-explanatory.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedFile {
    pub file: PathBuf,
    pub reason: String,
}

/// Applications of one rule across the whole run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleApplication {
    /// Stable rule label: `sourcePackage::sourceComponent#order`.
    pub rule: String,
    pub count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub files_processed: usize,
    pub files_skipped: Vec<SkippedFile>,
    pub cycles_found: usize,
    pub breaking_cycles: usize,
    pub non_breaking_cycles: usize,
    pub rules_applied: Vec<RuleApplication>,
}
