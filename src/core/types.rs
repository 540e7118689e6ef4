// 処理に関連するデータ型定義

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// 処理対象の1被験者分の作業単位
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    /// 入力スキャンファイルのパス
    pub input_path: PathBuf,
    /// 再構成結果を書き込むSUBJECTS_DIR
    pub subjects_dir: PathBuf,
    subject: String,
}

impl WorkItem {
    /// 入力ファイルから作業単位を作成
    ///
    /// 被験者IDは拡張子を除いたファイル名。ファイル名が取得できない場合は`None`
    pub fn new(input_path: impl Into<PathBuf>, subjects_dir: impl Into<PathBuf>) -> Option<Self> {
        let input_path = input_path.into();
        let subject = input_path.file_stem()?.to_str()?.to_string();
        Some(Self {
            input_path,
            subjects_dir: subjects_dir.into(),
            subject,
        })
    }

    /// 既存の再構成ディレクトリから作業単位を作成（セグメンテーションのみモード用）
    pub fn from_reconstruction(recon_dir: &Path) -> Option<Self> {
        let subject = recon_dir.file_name()?.to_str()?.to_string();
        let subjects_dir = recon_dir.parent()?.to_path_buf();
        Some(Self {
            input_path: recon_dir.to_path_buf(),
            subjects_dir,
            subject,
        })
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// この被験者の再構成出力ディレクトリ
    pub fn reconstruction_dir(&self) -> PathBuf {
        self.subjects_dir.join(&self.subject)
    }
}

/// 実行モード
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    /// 再構成 → セグメンテーション
    #[default]
    Full,
    /// 既存の再構成結果に対してセグメンテーションのみ
    SegmentationOnly,
}

/// 処理ステージ
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Reconstruction,
    Segmentation,
}

impl Stage {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Reconstruction => "FreeSurfer",
            Self::Segmentation => "Hippocampus segmentation",
        }
    }
}

/// 外部コマンド1回分の終了状態
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StageStatus {
    /// 終了コード0
    Succeeded,
    /// 非ゼロ終了（シグナル終了時はコードなし）
    Failed { exit_code: Option<i32> },
    /// タイムアウトにより強制終了
    TimedOut,
    /// プロセスを起動できなかった
    LaunchFailed { reason: String },
}

/// 1ステージの実行結果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageResult {
    #[serde(flatten)]
    pub status: StageStatus,
    #[serde(with = "duration_secs")]
    pub elapsed: Duration,
}

impl StageResult {
    pub fn new(status: StageStatus, elapsed: Duration) -> Self {
        Self { status, elapsed }
    }

    /// 既に完了している再構成（セグメンテーションのみモードで使用）
    pub fn preexisting() -> Self {
        Self::new(StageStatus::Succeeded, Duration::ZERO)
    }

    pub fn success(&self) -> bool {
        matches!(self.status, StageStatus::Succeeded)
    }
}

/// 1被験者分の処理結果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectResult {
    pub subject: String,
    pub reconstruction: StageResult,
    /// 再構成が失敗した場合は`None`
    pub segmentation: Option<StageResult>,
    #[serde(with = "duration_secs")]
    pub total_elapsed: Duration,
}

impl SubjectResult {
    /// 再構成失敗で終了した結果
    pub fn reconstruction_failed(subject: impl Into<String>, reconstruction: StageResult) -> Self {
        let total_elapsed = reconstruction.elapsed;
        Self {
            subject: subject.into(),
            reconstruction,
            segmentation: None,
            total_elapsed,
        }
    }

    /// 両ステージを実行した結果
    pub fn completed(
        subject: impl Into<String>,
        reconstruction: StageResult,
        segmentation: StageResult,
    ) -> Self {
        let total_elapsed = reconstruction.elapsed + segmentation.elapsed;
        Self {
            subject: subject.into(),
            reconstruction,
            segmentation: Some(segmentation),
            total_elapsed,
        }
    }

    pub fn fs_success(&self) -> bool {
        self.reconstruction.success()
    }

    pub fn hc_success(&self) -> bool {
        self.segmentation.as_ref().is_some_and(StageResult::success)
    }

    /// セグメンテーション所要時間（未実行なら0）
    pub fn hc_time(&self) -> Duration {
        self.segmentation
            .as_ref()
            .map_or(Duration::ZERO, |stage| stage.elapsed)
    }

    /// 試行した全ステージが成功したか
    pub fn fully_succeeded(&self) -> bool {
        self.fs_success() && self.hc_success()
    }
}

/// Durationを秒数(f64)としてシリアライズする
mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(duration.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}
