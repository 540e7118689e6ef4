// 並列実行機能
// Producer-Consumer パターンによるファンアウトと入力順のファンイン

pub mod consumer;
pub mod dispatcher;
pub mod producer;

// 公開API
pub use consumer::{spawn_consumers, spawn_single_consumer};
pub use dispatcher::ParallelDispatcher;
pub use producer::spawn_producer;
