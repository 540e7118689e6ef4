// Dispatcher - Producer-Consumer によるファンアウト/ファンイン
//
// 結果は完了順ではなく入力順で返す。
// ワーカータスク自体の異常終了（panic等）は実行全体の致命的エラーとして扱う。

use super::consumer::{spawn_consumers, IndexedResult};
use super::producer::spawn_producer;
use crate::core::{ProcessingError, ProcessingResult, SubjectResult, WorkItem};
use crate::processing::config::ProcessingConfig;
use crate::processing::pipeline::SubjectTask;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info};

/// 固定サイズのワーカープールで被験者を並列処理する
pub struct ParallelDispatcher<T> {
    task: Arc<T>,
}

impl<T> ParallelDispatcher<T>
where
    T: SubjectTask + 'static,
{
    pub fn new(task: Arc<T>) -> Self {
        Self { task }
    }

    /// 全作業単位を処理し、入力と同じ順序・同じ件数の結果を返す
    pub async fn execute<C>(&self, items: Vec<WorkItem>, config: &C) -> ProcessingResult<Vec<SubjectResult>>
    where
        C: ProcessingConfig,
    {
        config.validate()?;

        let total = items.len();
        if total == 0 {
            return Ok(Vec::new());
        }

        let worker_count = config.max_workers().min(total);
        info!(subjects = total, workers = worker_count, "Dispatching subjects to worker pool");

        let (work_tx, work_rx) = mpsc::channel(config.channel_buffer_size());
        let (result_tx, result_rx) = mpsc::channel(config.channel_buffer_size());

        let producer_handle = spawn_producer(items, work_tx);
        let mut workers = spawn_consumers(self.task.clone(), work_rx, result_tx, worker_count);
        let collector_handle = spawn_result_collector(result_rx, total);

        // 終了した順にワーカーを監視し、最初の異常終了で全体を止める
        while let Some(joined) = workers.join_next().await {
            if let Err(join_error) = joined {
                error!(error = %join_error, "Worker task terminated abnormally");
                // 残りのワーカーを中断して待つ（実行中の外部プロセスもここで停止する）
                workers.shutdown().await;
                producer_handle.abort();
                collector_handle.abort();
                return Err(ProcessingError::task(join_error));
            }
        }

        producer_handle.await.map_err(ProcessingError::task)?;

        // 全ワーカーが終了すると result_tx が全てドロップされ Collector が終了する
        let slots = collector_handle.await.map_err(ProcessingError::task)?;

        let results: Vec<SubjectResult> = slots.into_iter().flatten().collect();
        if results.len() != total {
            return Err(ProcessingError::parallel_execution(format!(
                "結果件数が一致しません: {} / {total}",
                results.len()
            )));
        }
        Ok(results)
    }
}

/// Result Collector: 入力番号の位置に結果を格納する
fn spawn_result_collector(
    mut result_rx: mpsc::Receiver<IndexedResult>,
    total: usize,
) -> tokio::task::JoinHandle<Vec<Option<SubjectResult>>> {
    tokio::spawn(async move {
        let mut slots: Vec<Option<SubjectResult>> = vec![None; total];
        let mut completed = 0usize;

        while let Some((index, result)) = result_rx.recv().await {
            if let Some(slot) = slots.get_mut(index) {
                *slot = Some(result);
                completed += 1;
                info!("Progress: {completed}/{total} subjects finished");
            }
        }
        slots
    })
}
