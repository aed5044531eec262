//! shift-services: end-to-end orchestration of one migration run.
//!
//! The service wires the stages together: discovery, graph construction,
//! cycle analysis, rule planning and (in apply mode) writing the results
//! back. Every stage's outcome lands in the run report, so a partial or
//! blocked run explains itself.

use shift_analysis_cycles::{find_cycles, CycleAnalysis, CycleOptions};
use shift_config::AppConfig;
use shift_engine::EnginePlan;
use shift_foundation::{
    CancelToken, ChangeSet, FileFailure, MigrationRule, RunReport, ShiftResult, SkippedFile,
};
use shift_graph::{GraphBuilder, Strategy};
use tracing::{info, instrument};

/// Whether a run writes its change sets back to disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Plan and report only; no file is modified.
    DryRun,
    /// Plan, then write each change set's rendered output in place.
    Apply,
}

/// Everything one run produced.
#[derive(Debug)]
pub struct RunOutcome {
    pub report: RunReport,
    pub change_sets: Vec<ChangeSet>,
    pub cycles: CycleAnalysis,
    pub failures: Vec<FileFailure>,
    pub strategy: Strategy,
}

/// One configured migration runner.
pub struct MigrationService {
    config: AppConfig,
    rules: Vec<MigrationRule>,
    cancel: CancelToken,
}

impl MigrationService {
    pub fn new(config: AppConfig, rules: Vec<MigrationRule>) -> Self {
        Self {
            config,
            rules,
            cancel: CancelToken::new(),
        }
    }

    /// Loads the rule document from disk and builds a service around it.
    pub fn from_rule_file(config: AppConfig, rule_path: &std::path::Path) -> ShiftResult<Self> {
        let rules = shift_config::load_rules(rule_path)?;
        Ok(Self::new(config, rules))
    }

    /// Token shared with callers that want to stop the run between files.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    #[instrument(skip(self), fields(root = %self.config.root.display()))]
    pub async fn run(&self, mode: RunMode) -> ShiftResult<RunOutcome> {
        let paths = shift_graph::discover_files(
            &self.config.root,
            &self.config.include,
            &self.config.exclude,
        )?;
        info!(files = paths.len(), "discovery complete");

        let builder = GraphBuilder::new(
            self.config.strategy.clone(),
            self.config.memory_ceiling_bytes,
        )
        .with_cancel(self.cancel.clone());

        let mut build = builder.build(paths.clone()).await?;

        // Pooled graphs carry no AST handles. Detection and reporting work
        // on them, but transformation needs the trees, so a rule-bearing run
        // re-extracts through the bounded pipeline.
        if matches!(build.strategy, Strategy::Pooled { .. }) && !self.rules.is_empty() {
            info!("records-only graph cannot be transformed; re-extracting through the pipeline");
            build = builder
                .build_with(
                    paths,
                    Strategy::Pipeline {
                        window: self.config.strategy.pipeline_window,
                    },
                )
                .await?;
        }

        let cycles = find_cycles(&build.graph, &CycleOptions::default());
        let blocked = cycles.blocked_files();

        let plan = shift_engine::plan(&build.graph, &build.store, &self.rules, &blocked)?;

        if mode == RunMode::Apply {
            for change in &plan.change_sets {
                tokio::fs::write(&change.file, &change.after_snapshot).await?;
            }
            info!(files = plan.change_sets.len(), "change sets applied");
        }

        // Planning can fail per file too (conflicting edits); those failures
        // join the build's in the report.
        let mut failures = build.failures;
        failures.extend(plan.failures.iter().cloned());

        let report = build_report(&plan, &cycles, &failures);
        Ok(RunOutcome {
            report,
            change_sets: plan.change_sets,
            cycles,
            failures,
            strategy: build.strategy,
        })
    }
}

fn build_report(
    plan: &EnginePlan,
    cycles: &CycleAnalysis,
    failures: &[FileFailure],
) -> RunReport {
    let mut files_skipped = plan.skipped.clone();
    files_skipped.extend(failures.iter().map(|f| SkippedFile {
        file: f.file.clone(),
        reason: f.message.clone(),
    }));
    RunReport {
        files_processed: plan.change_sets.len(),
        files_skipped,
        cycles_found: cycles.summary.total_cycles,
        breaking_cycles: cycles.summary.breaking_cycles,
        non_breaking_cycles: cycles.summary.non_breaking_cycles,
        rules_applied: plan.rules_applied.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use shift_config::parse_rule_document;
    use std::path::Path;

    const RULES: &str = r#"{
        "@ui/old": {
            "Button": [{
                "order": 1,
                "match": [{"attribute": "variant", "equals": "primary"}],
                "edit": {"rename": {"variant": "appearance"}},
                "importTarget": {"package": "@ui/new", "component": "Button", "bindingKind": "named"}
            }]
        }
    }"#;

    const APP: &str = "import { Button } from \"@ui/old\";\nexport const App = () => <Button variant=\"primary\" />;\n";

    fn service_for(root: &Path, rules: &str) -> MigrationService {
        let config = AppConfig {
            root: root.to_path_buf(),
            ..Default::default()
        };
        MigrationService::new(config, parse_rule_document(rules).unwrap())
    }

    #[tokio::test]
    async fn dry_run_plans_without_writing() {
        let dir = tempfile::tempdir().unwrap();
        let app = dir.path().join("app.tsx");
        std::fs::write(&app, APP).unwrap();

        let outcome = service_for(dir.path(), RULES)
            .run(RunMode::DryRun)
            .await
            .unwrap();

        assert_eq!(outcome.report.files_processed, 1);
        assert_eq!(outcome.change_sets.len(), 1);
        assert!(outcome.change_sets[0]
            .after_snapshot
            .contains("appearance=\"primary\""));
        // Disk untouched in dry-run mode.
        assert_eq!(std::fs::read_to_string(&app).unwrap(), APP);
    }

    #[tokio::test]
    async fn apply_writes_the_rendered_output() {
        let dir = tempfile::tempdir().unwrap();
        let app = dir.path().join("app.tsx");
        std::fs::write(&app, APP).unwrap();

        let outcome = service_for(dir.path(), RULES)
            .run(RunMode::Apply)
            .await
            .unwrap();

        assert_eq!(outcome.report.files_processed, 1);
        let written = std::fs::read_to_string(&app).unwrap();
        assert!(written.contains("appearance=\"primary\""));
        assert!(written.contains("import { Button } from \"@ui/new\";"));
        assert!(!written.contains("@ui/old"));
    }

    #[tokio::test]
    async fn breaking_cycle_blocks_its_members() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.tsx");
        std::fs::write(
            &a,
            "import { Button } from \"@ui/old\";\nimport { helper } from \"./b\";\nexport const A = () => <Button variant=\"primary\" />;\nexport const useA = helper;\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("b.tsx"),
            "import { useA } from \"./a\";\nexport const helper = useA;\n",
        )
        .unwrap();

        let outcome = service_for(dir.path(), RULES)
            .run(RunMode::Apply)
            .await
            .unwrap();

        assert_eq!(outcome.report.breaking_cycles, 1);
        assert_eq!(outcome.report.files_processed, 0);
        assert!(outcome
            .report
            .files_skipped
            .iter()
            .any(|s| s.reason.contains("breaking dependency cycle")));
        // The cycle member kept its original text.
        assert!(std::fs::read_to_string(&a).unwrap().contains("@ui/old"));
    }

    #[tokio::test]
    async fn type_only_cycle_does_not_block() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.tsx");
        std::fs::write(
            &a,
            "import { Button } from \"@ui/old\";\nimport type { B } from \"./b\";\nexport type A = { b?: B };\nexport const App = () => <Button variant=\"primary\" />;\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("b.tsx"),
            "import type { A } from \"./a\";\nexport type B = { a?: A };\n",
        )
        .unwrap();

        let outcome = service_for(dir.path(), RULES)
            .run(RunMode::DryRun)
            .await
            .unwrap();

        assert_eq!(outcome.report.cycles_found, 1);
        assert_eq!(outcome.report.non_breaking_cycles, 1);
        assert_eq!(outcome.report.files_processed, 1);
    }

    #[tokio::test]
    async fn change_sets_are_identical_across_build_strategies() {
        use shift_config::StrategyConfig;
        use std::collections::HashSet;

        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("app.tsx"), APP).unwrap();
        std::fs::write(
            dir.path().join("card.tsx"),
            "import { Button } from \"@ui/old\";\nexport const C = () => <Button variant=\"primary\" count={2} />;\n",
        )
        .unwrap();

        let paths = shift_graph::discover_files(dir.path(), &[], &[]).unwrap();
        let builder = GraphBuilder::new(StrategyConfig::default(), None);
        let sequential = builder
            .build_with(paths.clone(), Strategy::Sequential)
            .await
            .unwrap();
        let pipelined = builder
            .build_with(paths, Strategy::Pipeline { window: 2 })
            .await
            .unwrap();

        let rules = parse_rule_document(RULES).unwrap();
        let blocked = HashSet::new();
        let seq_plan =
            shift_engine::plan(&sequential.graph, &sequential.store, &rules, &blocked).unwrap();
        let pipe_plan =
            shift_engine::plan(&pipelined.graph, &pipelined.store, &rules, &blocked).unwrap();

        assert_eq!(seq_plan.change_sets.len(), 2);
        // Byte-for-byte: same files, same edits, same rendered output.
        assert_eq!(seq_plan.change_sets, pipe_plan.change_sets);
    }

    #[tokio::test]
    async fn malformed_file_is_reported_and_the_rest_migrate() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("app.tsx"), APP).unwrap();
        std::fs::write(dir.path().join("broken.tsx"), "const = <<< nope").unwrap();

        let outcome = service_for(dir.path(), RULES)
            .run(RunMode::DryRun)
            .await
            .unwrap();

        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.report.files_processed, 1);
        assert!(outcome
            .report
            .files_skipped
            .iter()
            .any(|s| s.file.ends_with("broken.tsx")));
    }
}
