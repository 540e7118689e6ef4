// tokio::processによるCommandRunner実装

use super::{CommandRunner, CommandSpec};
use crate::core::{StageResult, StageStatus};
use async_trait::async_trait;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::{Child, Command};
use tracing::warn;

/// 実プロセスを起動するランナー
///
/// 子プロセスの標準出力・標準エラーはそのままコンソールに流す
#[derive(Debug, Clone, Default)]
pub struct SystemCommandRunner {
    quiet: bool,
}

impl SystemCommandRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// 子プロセスの出力を捨てる（テスト用）
    pub fn quiet() -> Self {
        Self { quiet: true }
    }

    fn output(&self) -> Stdio {
        if self.quiet {
            Stdio::null()
        } else {
            Stdio::inherit()
        }
    }
}

#[async_trait]
impl CommandRunner for SystemCommandRunner {
    async fn run(&self, spec: &CommandSpec, timeout: Option<Duration>) -> StageResult {
        let start = Instant::now();

        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args)
            .stdin(Stdio::null())
            .stdout(self.output())
            .stderr(self.output())
            .kill_on_drop(true);
        // 子孫プロセスごと停止できるよう専用のプロセスグループで起動する
        #[cfg(unix)]
        cmd.process_group(0);

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                return StageResult::new(
                    StageStatus::LaunchFailed {
                        reason: format!("{}: {e}", spec.program),
                    },
                    start.elapsed(),
                );
            }
        };
        // タスクが中断された場合もDropでグループ全体を停止する
        let mut group = ProcessGroup::new(&child);

        let waited = match timeout {
            Some(limit) => match tokio::time::timeout(limit, child.wait()).await {
                Ok(waited) => waited,
                Err(_) => {
                    // 制限時間超過: グループ全体を停止してからタイムアウトとして記録
                    if let Err(e) = child.kill().await {
                        warn!(program = %spec.program, error = %e, "タイムアウトしたプロセスの停止に失敗");
                    }
                    group.kill();
                    return StageResult::new(StageStatus::TimedOut, start.elapsed());
                }
            },
            None => child.wait().await,
        };
        group.disarm();

        let status = match waited {
            Ok(exit) if exit.success() => StageStatus::Succeeded,
            Ok(exit) => StageStatus::Failed {
                exit_code: exit.code(),
            },
            Err(e) => StageStatus::LaunchFailed {
                reason: format!("{}: {e}", spec.program),
            },
        };

        StageResult::new(status, start.elapsed())
    }
}

/// 子プロセスを先頭とするプロセスグループ
///
/// 外部ツールはシェルスクリプトのため、直接の子だけでなく孫プロセスも停止する必要がある
struct ProcessGroup {
    pgid: Option<i32>,
}

impl ProcessGroup {
    fn new(child: &Child) -> Self {
        Self {
            pgid: child.id().and_then(|id| i32::try_from(id).ok()),
        }
    }

    /// グループ全体にSIGKILLを送る（1回のみ）
    fn kill(&mut self) {
        if let Some(pgid) = self.pgid.take() {
            kill_process_group(pgid);
        }
    }

    /// 正常に終了を待てた場合は何もしない
    fn disarm(&mut self) {
        self.pgid = None;
    }
}

impl Drop for ProcessGroup {
    fn drop(&mut self) {
        self.kill();
    }
}

#[cfg(unix)]
fn kill_process_group(pgid: i32) {
    use nix::errno::Errno;
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    match killpg(Pid::from_raw(pgid), Signal::SIGKILL) {
        Ok(()) | Err(Errno::ESRCH) => {}
        Err(e) => warn!(pgid, error = %e, "プロセスグループの停止に失敗"),
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pgid: i32) {}
