// 実行結果の集計
//
// 結果リストだけから計算する純粋関数。分母が0の平均は None（ログでは省略）。

use crate::core::{RunMode, SubjectResult};
use serde::Serialize;
use std::time::Duration;
use tracing::info;

/// 実行全体のサマリー
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub mode: RunMode,
    pub total_subjects: usize,
    pub fs_success_count: usize,
    pub hc_success_count: usize,
    /// 再構成に失敗した被験者
    pub failed_fs: Vec<String>,
    /// 再構成は成功したがセグメンテーションに失敗した被験者
    pub failed_hc: Vec<String>,
    #[serde(serialize_with = "secs")]
    pub total_fs_time: Duration,
    #[serde(serialize_with = "secs")]
    pub total_hc_time: Duration,
    #[serde(serialize_with = "secs")]
    pub total_time: Duration,
}

fn secs<S: serde::Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(duration.as_secs_f64())
}

impl RunSummary {
    pub fn from_results(mode: RunMode, results: &[SubjectResult]) -> Self {
        let failed_fs = results
            .iter()
            .filter(|r| !r.fs_success())
            .map(|r| r.subject.clone())
            .collect();
        let failed_hc = results
            .iter()
            .filter(|r| r.fs_success() && !r.hc_success())
            .map(|r| r.subject.clone())
            .collect();

        Self {
            mode,
            total_subjects: results.len(),
            fs_success_count: results.iter().filter(|r| r.fs_success()).count(),
            hc_success_count: results.iter().filter(|r| r.hc_success()).count(),
            failed_fs,
            failed_hc,
            total_fs_time: results.iter().map(|r| r.reconstruction.elapsed).sum(),
            total_hc_time: results.iter().map(SubjectResult::hc_time).sum(),
            total_time: results.iter().map(|r| r.total_elapsed).sum(),
        }
    }

    /// 被験者あたりの平均再構成時間
    pub fn average_fs_time(&self) -> Option<Duration> {
        average(self.total_fs_time, self.total_subjects)
    }

    /// 再構成成功者あたりの平均セグメンテーション時間
    pub fn average_hc_time(&self) -> Option<Duration> {
        average(self.total_hc_time, self.fs_success_count)
    }

    /// 被験者あたりの平均合計時間
    pub fn average_total_time(&self) -> Option<Duration> {
        average(self.total_time, self.total_subjects)
    }

    /// 失敗した被験者がいるか
    pub fn has_failures(&self) -> bool {
        !self.failed_fs.is_empty() || !self.failed_hc.is_empty()
    }

    /// サマリーブロックをログに出力する
    pub fn log(&self) {
        for line in self.render_lines() {
            info!("{line}");
        }
    }

    /// サマリーブロックの各行
    pub fn render_lines(&self) -> Vec<String> {
        let mut lines = vec![
            "=== PROCESSING SUMMARY ===".to_string(),
            format!("Total subjects processed: {}", self.total_subjects),
        ];

        if self.mode == RunMode::Full {
            lines.push(format!(
                "FreeSurfer successful: {}/{}",
                self.fs_success_count, self.total_subjects
            ));
            if !self.failed_fs.is_empty() {
                lines.push(format!("Failed FreeSurfer subjects: {}", self.failed_fs.join(", ")));
            }
            lines.push(format!(
                "Total FreeSurfer processing time: {:.2} seconds",
                self.total_fs_time.as_secs_f64()
            ));
            if let Some(avg) = self.average_fs_time() {
                lines.push(format!(
                    "Average FreeSurfer time per subject: {:.2} seconds",
                    avg.as_secs_f64()
                ));
            }
        }

        lines.push(format!(
            "Hippocampus segmentation successful: {}/{}",
            self.hc_success_count, self.fs_success_count
        ));
        if !self.failed_hc.is_empty() {
            lines.push(format!("Failed hippocampus subjects: {}", self.failed_hc.join(", ")));
        }
        lines.push(format!(
            "Total hippocampus segmentation time: {:.2} seconds",
            self.total_hc_time.as_secs_f64()
        ));
        if let Some(avg) = self.average_hc_time() {
            lines.push(format!(
                "Average hippocampus time per subject: {:.2} seconds",
                avg.as_secs_f64()
            ));
        }

        lines.push(format!("Total processing time: {:.2} seconds", self.total_time.as_secs_f64()));
        if let Some(avg) = self.average_total_time() {
            lines.push(format!(
                "Average total time per subject: {:.2} seconds",
                avg.as_secs_f64()
            ));
        }

        lines.push("=== MRI PROCESSING COMPLETE ===".to_string());
        lines
    }
}

fn average(total: Duration, count: usize) -> Option<Duration> {
    let count = u32::try_from(count).ok().filter(|c| *c > 0)?;
    Some(total / count)
}
