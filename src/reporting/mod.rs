// 集計・ログ出力・結果保存

pub mod logging;
pub mod persistence;
pub mod summary;

// 公開API
pub use logging::{init_console_logging, init_logging, resolve_run_id, LogConfig};
pub use persistence::{JsonReportWriter, RunReport};
pub use summary::RunSummary;
