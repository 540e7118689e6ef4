// 外部コマンド呼び出し層
//
// 外部ツールとの接点はここだけ。コマンドはシェル文字列ではなく
// 実行ファイル + 引数リストとして組み立てる。

use crate::core::{ProcessingError, ProcessingResult, StageResult, WorkItem};
use async_trait::async_trait;
use mockall::automock;
use std::fmt;
use std::time::Duration;

pub mod system;

pub use system::SystemCommandRunner;

/// 再構成コマンドのデフォルトテンプレート
pub const DEFAULT_RECON_TEMPLATE: &str = "recon-all -i {input} -subjid {subject} -sd {subjects_dir} -all";
/// セグメンテーションコマンドのデフォルトテンプレート
pub const DEFAULT_SEGMENT_TEMPLATE: &str = "segmentHA_T1.sh {subject} {subjects_dir}";

/// 実行可能な形に展開済みのコマンド
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// プレースホルダー付きのコマンドテンプレート
///
/// 使用可能なプレースホルダー: `{subject}` `{input}` `{subjects_dir}`
/// 置換は引数ごとに行うため、パスに空白が含まれても引数が分割されることはない。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandTemplate {
    program: String,
    args: Vec<String>,
}

impl CommandTemplate {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// 空白区切りの文字列からテンプレートを作成
    pub fn parse(template: &str) -> ProcessingResult<Self> {
        let mut parts = template.split_whitespace().map(str::to_string);
        let program = parts
            .next()
            .ok_or_else(|| ProcessingError::configuration("コマンドテンプレートが空です"))?;
        let args: Vec<String> = parts.collect();

        let template = Self { program, args };
        template.validate()?;
        Ok(template)
    }

    /// デフォルトの再構成コマンド（recon-all）
    pub fn reconstruction() -> Self {
        Self::builtin(DEFAULT_RECON_TEMPLATE)
    }

    /// デフォルトのセグメンテーションコマンド（segmentHA_T1.sh）
    pub fn segmentation() -> Self {
        Self::builtin(DEFAULT_SEGMENT_TEMPLATE)
    }

    /// 実行ファイルだけを差し替える（引数はそのまま）
    ///
    /// `/opt/freesurfer/bin/recon-all` のようにパスのみ指定された場合に使う
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// 作業単位の値でプレースホルダーを置換する
    pub fn render(&self, item: &WorkItem) -> CommandSpec {
        let input = item.input_path.to_string_lossy();
        let subjects_dir = item.subjects_dir.to_string_lossy();
        let values = [
            ("{subject}", item.subject()),
            ("{input}", input.as_ref()),
            ("{subjects_dir}", subjects_dir.as_ref()),
        ];
        let args = self.args.iter().map(|arg| substitute(arg, &values)).collect();

        CommandSpec {
            program: self.program.clone(),
            args,
        }
    }

    fn builtin(template: &str) -> Self {
        let mut parts = template.split_whitespace().map(str::to_string);
        let program = parts.next().unwrap_or_default();
        Self {
            program,
            args: parts.collect(),
        }
    }

    fn validate(&self) -> ProcessingResult<()> {
        let has_subject = self.args.iter().any(|arg| arg.contains("{subject}"));
        if !has_subject {
            return Err(ProcessingError::configuration(format!(
                "コマンドテンプレートに{{subject}}が含まれていません: {}",
                self.program
            )));
        }
        Ok(())
    }
}

/// プレースホルダーを1回の走査で置換する（置換後の値は再展開しない）
fn substitute(arg: &str, values: &[(&str, &str)]) -> String {
    let mut output = String::with_capacity(arg.len());
    let mut rest = arg;

    while let Some(pos) = rest.find('{') {
        output.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        match values.iter().find(|(key, _)| tail.starts_with(key)) {
            Some((key, value)) => {
                output.push_str(value);
                rest = &tail[key.len()..];
            }
            None => {
                output.push('{');
                rest = &tail[1..];
            }
        }
    }
    output.push_str(rest);
    output
}

/// コマンド実行の抽象化
///
/// 実装は失敗をエラーとして返さない。非ゼロ終了・タイムアウト・起動失敗は
/// すべて`StageResult`のステータスとして表現する。
#[automock]
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// コマンドを完了まで実行し、成否と所要時間を返す
    async fn run(&self, spec: &CommandSpec, timeout: Option<Duration>) -> StageResult;
}
