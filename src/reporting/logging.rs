// ログ出力の初期化
//
// コンソールと実行ごとのログファイルの両方に出力する。
// ファイル側はMutexで1行単位に書き込むため、並列ワーカーの行が混ざっても壊れない。

use anyhow::{Context, Result};
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::Dispatch;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// RUST_LOG未設定時のフィルタ
pub const DEFAULT_LOG_FILTER: &str = "info";

/// ログ出力先の設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    pub log_dir: PathBuf,
    pub run_id: String,
}

impl LogConfig {
    pub fn new(log_dir: impl Into<PathBuf>, run_id: impl Into<String>) -> Self {
        Self {
            log_dir: log_dir.into(),
            run_id: run_id.into(),
        }
    }

    /// <log_dir>/<run_id>.log
    pub fn log_file(&self) -> PathBuf {
        self.log_dir.join(format!("{}.log", self.run_id))
    }

    /// <log_dir>/<run_id>_results.json
    pub fn report_file(&self) -> PathBuf {
        self.log_dir.join(format!("{}_results.json", self.run_id))
    }
}

/// 実行IDを決定する（明示指定 → ホスト名）
///
/// CONTAINER_NAMEはCLI層で`explicit`として渡される
pub fn resolve_run_id(explicit: Option<&str>) -> String {
    explicit
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .unwrap_or_else(read_hostname)
}

fn read_hostname() -> String {
    std::fs::read_to_string("/proc/sys/kernel/hostname")
        .map(|s| s.trim().to_string())
        .ok()
        .or_else(|| std::env::var("HOSTNAME").ok())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "mri_batch".to_string())
}

/// ログファイル（追記）を開く
pub fn open_log_file(path: &Path) -> Result<File> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("ログディレクトリを作成できません: {}", dir.display()))?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("ログファイルを開けません: {}", path.display()))
}

/// グローバルなtracing subscriberを初期化する
///
/// 実行開始時に一度だけ呼ぶ
pub fn init_logging(config: &LogConfig) -> Result<PathBuf> {
    let log_file = config.log_file();
    let file = open_log_file(&log_file)?;

    build_dispatch(file, env_filter(), true)
        .try_init()
        .context("ロガーの初期化に失敗しました")?;

    Ok(log_file)
}

/// ファイルを使わないコンソールのみのロガー（check系サブコマンド用）
pub fn init_console_logging() {
    // 既に初期化済みの場合は何もしない
    let _ = tracing_subscriber::registry()
        .with(env_filter())
        .with(fmt::layer().with_target(false))
        .try_init();
}

fn env_filter() -> EnvFilter {
    EnvFilter::new(std::env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()))
}

/// コンソール層（任意）とファイル層を持つDispatchを組み立てる
///
/// ファイル側は1イベントを書き終えるまでMutexを保持する
fn build_dispatch(file: File, filter: EnvFilter, console: bool) -> Dispatch {
    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(console.then(|| fmt::layer().with_target(false)))
        .with(
            fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file)),
        );
    Dispatch::new(subscriber)
}
