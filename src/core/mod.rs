// コアレイヤー - 基盤となる型とエラー定義
// 他のレイヤーから参照される基本的な抽象化を提供

pub mod error;
pub mod types;

// 公開API
pub use error::{ErrorContext, ErrorSeverity, ProcessingError, ProcessingResult};
pub use types::{RunMode, Stage, StageResult, StageStatus, SubjectResult, WorkItem};
