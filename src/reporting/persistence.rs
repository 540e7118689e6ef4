// 実行結果のJSON保存

use super::summary::RunSummary;
use crate::core::{ProcessingError, ProcessingResult, SubjectResult};
use chrono::{DateTime, Local};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// JSONレポートの内容
#[derive(Debug, Serialize)]
pub struct RunReport<'a> {
    pub generated_at: DateTime<Local>,
    pub run_id: &'a str,
    /// 完了マーカーがあるためスキップした被験者
    pub skipped: &'a [String],
    pub summary: &'a RunSummary,
    pub results: &'a [SubjectResult],
}

/// 実行結果をJSONファイルに書き出す
#[derive(Debug, Clone)]
pub struct JsonReportWriter {
    output_path: PathBuf,
}

impl JsonReportWriter {
    pub fn new(output_path: impl AsRef<Path>) -> Self {
        Self {
            output_path: output_path.as_ref().to_path_buf(),
        }
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    /// レポートを書き出す（既存ファイルは上書き）
    pub fn write(&self, report: &RunReport<'_>) -> ProcessingResult<()> {
        if let Some(parent) = self.output_path.parent() {
            fs::create_dir_all(parent).map_err(|e| ProcessingError::persistence(e.into()))?;
        }

        let json = serde_json::to_string_pretty(report)
            .map_err(|e| ProcessingError::persistence(e.into()))?;

        // 一時ファイルに書いてからrenameで置き換える
        let temp_path = self.output_path.with_extension("json.tmp");
        fs::write(&temp_path, json).map_err(|e| ProcessingError::persistence(e.into()))?;
        fs::rename(&temp_path, &self.output_path).map_err(|e| ProcessingError::persistence(e.into()))?;
        Ok(())
    }
}
