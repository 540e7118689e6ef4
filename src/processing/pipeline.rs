// 被験者単位のパイプライン
//
// PENDING → RECON_RUNNING → RECON_FAILED
//                         → RECON_OK → SEGMENT_RUNNING → SEGMENT_FAILED | SEGMENT_OK
//
// 失敗はStageResultとして返す。ここからエラーやpanicが上がることはない。

use super::config::ProcessingConfig;
use crate::command::{CommandRunner, CommandTemplate};
use crate::core::{RunMode, Stage, StageResult, StageStatus, SubjectResult, WorkItem};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

/// 被験者の処理状態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubjectState {
    Pending,
    ReconRunning,
    ReconFailed,
    ReconOk,
    SegmentRunning,
    SegmentFailed,
    SegmentOk,
}

impl SubjectState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::ReconFailed | Self::SegmentFailed | Self::SegmentOk)
    }
}

/// 状態遷移を記録するトラッカー
struct StateTracker<'a> {
    subject: &'a str,
    state: SubjectState,
    entered_at: Instant,
}

impl<'a> StateTracker<'a> {
    fn new(subject: &'a str) -> Self {
        Self {
            subject,
            state: SubjectState::Pending,
            entered_at: Instant::now(),
        }
    }

    fn transition(&mut self, next: SubjectState) {
        let elapsed = self.entered_at.elapsed();
        debug!(
            subject = self.subject,
            from = ?self.state,
            to = ?next,
            elapsed_secs = elapsed.as_secs_f64(),
            "state transition"
        );
        self.state = next;
        self.entered_at = Instant::now();
    }
}

/// ワーカーが1被験者に対して実行するタスク
#[async_trait]
pub trait SubjectTask: Send + Sync {
    async fn process(&self, item: &WorkItem) -> SubjectResult;
}

/// 再構成とセグメンテーションを順に実行するパイプライン
pub struct SubjectPipeline<R> {
    runner: Arc<R>,
    mode: RunMode,
    reconstruction: CommandTemplate,
    segmentation: CommandTemplate,
    stage_timeout: Option<Duration>,
}

impl<R> SubjectPipeline<R>
where
    R: CommandRunner + 'static,
{
    pub fn new<C: ProcessingConfig>(runner: Arc<R>, config: &C, mode: RunMode) -> Self {
        Self {
            runner,
            mode,
            reconstruction: config.reconstruction_command().clone(),
            segmentation: config.segmentation_command().clone(),
            stage_timeout: config.stage_timeout(),
        }
    }

    /// 再構成 → (成功時のみ) セグメンテーション
    pub async fn run_complete(&self, item: &WorkItem) -> SubjectResult {
        let subject = item.subject();
        let start_total = Instant::now();
        let mut tracker = StateTracker::new(subject);
        info!(subject, "Starting complete processing for subject: {subject}");

        tracker.transition(SubjectState::ReconRunning);
        let reconstruction = match tokio::fs::create_dir_all(&item.subjects_dir).await {
            Ok(()) => {
                self.run_stage(Stage::Reconstruction, &self.reconstruction, item)
                    .await
            }
            Err(e) => {
                let reason = format!("{}: {e}", item.subjects_dir.display());
                error!(subject, "Cannot create subjects directory {reason}");
                StageResult::new(StageStatus::LaunchFailed { reason }, Duration::ZERO)
            }
        };

        let result = if reconstruction.success() {
            tracker.transition(SubjectState::ReconOk);
            tracker.transition(SubjectState::SegmentRunning);
            let segmentation = self
                .run_stage(Stage::Segmentation, &self.segmentation, item)
                .await;
            tracker.transition(if segmentation.success() {
                SubjectState::SegmentOk
            } else {
                SubjectState::SegmentFailed
            });
            SubjectResult::completed(subject, reconstruction, segmentation)
        } else {
            tracker.transition(SubjectState::ReconFailed);
            error!(subject, "Skipping hippocampus segmentation for {subject} due to FreeSurfer failure");
            SubjectResult::reconstruction_failed(subject, reconstruction)
        };

        info!(
            subject,
            total_secs = result.total_elapsed.as_secs_f64(),
            wall_secs = start_total.elapsed().as_secs_f64(),
            "Complete processing for {subject} finished in {:.2} seconds",
            result.total_elapsed.as_secs_f64()
        );
        result
    }

    /// 既存の再構成結果に対してセグメンテーションのみ実行
    pub async fn run_segmentation_only(&self, item: &WorkItem) -> SubjectResult {
        let subject = item.subject();
        let mut tracker = StateTracker::new(subject);
        // 既存ディレクトリ = 再構成済みとみなす
        tracker.transition(SubjectState::ReconOk);
        tracker.transition(SubjectState::SegmentRunning);

        let segmentation = self
            .run_stage(Stage::Segmentation, &self.segmentation, item)
            .await;
        tracker.transition(if segmentation.success() {
            SubjectState::SegmentOk
        } else {
            SubjectState::SegmentFailed
        });

        SubjectResult::completed(subject, StageResult::preexisting(), segmentation)
    }

    async fn run_stage(&self, stage: Stage, template: &CommandTemplate, item: &WorkItem) -> StageResult {
        let subject = item.subject();
        let spec = template.render(item);
        info!(subject, stage = ?stage, "Running {}: {spec}", stage.as_str());

        let result = self.runner.run(&spec, self.stage_timeout).await;
        let secs = result.elapsed.as_secs_f64();

        match &result.status {
            StageStatus::Succeeded => {
                info!(subject, stage = ?stage, elapsed_secs = secs,
                    "{} for {subject} completed successfully in {secs:.2} seconds", stage.as_str());
            }
            StageStatus::Failed { exit_code } => {
                let code = exit_code.map_or_else(|| "signal".to_string(), |c| c.to_string());
                error!(subject, stage = ?stage, elapsed_secs = secs,
                    "{} for {subject} failed with return code {code}", stage.as_str());
            }
            StageStatus::TimedOut => {
                error!(subject, stage = ?stage, elapsed_secs = secs,
                    "{} for {subject} timed out after {secs:.2} seconds", stage.as_str());
            }
            StageStatus::LaunchFailed { reason } => {
                error!(subject, stage = ?stage,
                    "{} for {subject} could not be started: {reason}", stage.as_str());
            }
        }

        result
    }
}

#[async_trait]
impl<R> SubjectTask for SubjectPipeline<R>
where
    R: CommandRunner + 'static,
{
    async fn process(&self, item: &WorkItem) -> SubjectResult {
        match self.mode {
            RunMode::Full => self.run_complete(item).await,
            RunMode::SegmentationOnly => self.run_segmentation_only(item).await,
        }
    }
}
