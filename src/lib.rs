pub mod cli;
pub mod command;
pub mod core;
pub mod discovery;
pub mod processing;
pub mod reporting;

use crate::command::CommandRunner;
use crate::core::{ProcessingResult, RunMode, SubjectResult, WorkItem};
use crate::discovery::{OutputLayout, SubjectScanner};
use crate::processing::{ParallelDispatcher, ProcessingConfig, SubjectPipeline};
use crate::reporting::RunSummary;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// 1回のバッチ実行の結果
#[derive(Debug, Clone)]
pub struct BatchOutcome {
    pub results: Vec<SubjectResult>,
    pub skipped: Vec<String>,
    pub summary: RunSummary,
}

// 依存関係を直接所有するアプリケーション構造体
// ランナーと設定はコンストラクタで注入する
pub struct App<R, C> {
    runner: Arc<R>,
    config: C,
}

impl<R, C> App<R, C>
where
    R: CommandRunner + 'static,
    C: ProcessingConfig,
{
    pub fn new(runner: R, config: C) -> Self {
        Self {
            runner: Arc::new(runner),
            config,
        }
    }

    /// 全被験者に対して 再構成 → セグメンテーション を実行
    pub async fn run_full(&self, root: &Path, layout: &OutputLayout) -> ProcessingResult<BatchOutcome> {
        self.config.validate()?;
        info!("=== STARTING COMPLETE SUBJECT PROCESSING ===");

        let items = SubjectScanner::discover_work_items(root, layout)?;
        info!("Found {} .nii files for processing", items.len());

        let results = self.dispatch(items, RunMode::Full).await?;
        Ok(Self::outcome(RunMode::Full, results, Vec::new()))
    }

    /// 既存の再構成結果に対してセグメンテーションのみ実行
    ///
    /// `force`がfalseの場合、完了マーカーのある被験者はスキップする
    pub async fn run_segmentation_only(
        &self,
        root: &Path,
        layout: &OutputLayout,
        force: bool,
    ) -> ProcessingResult<BatchOutcome> {
        self.config.validate()?;
        info!("=== RUNNING HIPPOCAMPUS SEGMENTATION ONLY ===");

        let plan = SubjectScanner::plan_segmentation(root, layout, force)?;
        info!(
            "Found {} existing FreeSurfer directories",
            plan.pending.len() + plan.skipped.len()
        );
        if !plan.skipped.is_empty() {
            info!(
                "Skipping {} subjects with existing segmentation: {}",
                plan.skipped.len(),
                plan.skipped.join(", ")
            );
        }

        let results = self.dispatch(plan.pending, RunMode::SegmentationOnly).await?;
        Ok(Self::outcome(RunMode::SegmentationOnly, results, plan.skipped))
    }

    async fn dispatch(&self, items: Vec<WorkItem>, mode: RunMode) -> ProcessingResult<Vec<SubjectResult>> {
        let pipeline = Arc::new(SubjectPipeline::new(self.runner.clone(), &self.config, mode));
        ParallelDispatcher::new(pipeline).execute(items, &self.config).await
    }

    fn outcome(mode: RunMode, results: Vec<SubjectResult>, skipped: Vec<String>) -> BatchOutcome {
        let summary = RunSummary::from_results(mode, &results);
        BatchOutcome {
            results,
            skipped,
            summary,
        }
    }
}
