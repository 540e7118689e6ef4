// 被験者処理システムのモジュール
//
// config             - 実行設定（ワーカー数・制限時間・コマンド）
// pipeline           - 1被験者分の2段階パイプライン
// parallel_execution - ワーカープールによる並列実行

pub mod config;
pub mod parallel_execution;
pub mod pipeline;

// 公開API
pub use config::{DefaultProcessingConfig, ProcessingConfig, DEFAULT_STAGE_TIMEOUT};
pub use parallel_execution::ParallelDispatcher;
pub use pipeline::{SubjectPipeline, SubjectState, SubjectTask};
