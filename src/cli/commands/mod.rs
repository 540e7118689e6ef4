pub mod check_failures;
pub mod check_segmentation;
pub mod run;

pub use check_failures::*;
pub use check_segmentation::*;
pub use run::*;

/// コマンド終了時の状態（プロセスの終了コードに対応）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandStatus {
    /// 全ての処理が成功
    Success,
    /// 実行は完了したが失敗した被験者がいる
    SubjectFailures,
}

impl CommandStatus {
    pub const fn exit_code(self) -> u8 {
        match self {
            Self::Success => 0,
            Self::SubjectFailures => 2,
        }
    }
}
