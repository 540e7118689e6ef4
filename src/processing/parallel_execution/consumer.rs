// Consumer - 並列ワーカー

use super::producer::IndexedWorkItem;
use crate::core::SubjectResult;
use crate::processing::pipeline::SubjectTask;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;
use tracing::debug;

/// 入力順の番号付き処理結果
pub type IndexedResult = (usize, SubjectResult);

/// 単一ワーカー
///
/// キューが空になるまで1被験者ずつ取り出し、パイプライン全体を実行する
pub fn spawn_single_consumer<T>(
    worker_id: usize,
    task: Arc<T>,
    work_rx: Arc<Mutex<mpsc::Receiver<IndexedWorkItem>>>,
    result_tx: mpsc::Sender<IndexedResult>,
) -> tokio::task::JoinHandle<()>
where
    T: SubjectTask + 'static,
{
    tokio::spawn(consume(worker_id, task, work_rx, result_tx))
}

/// ワーカープールを起動
///
/// JoinSetで保持するため、呼び出し側は終了順にワーカーを監視できる
pub fn spawn_consumers<T>(
    task: Arc<T>,
    work_rx: mpsc::Receiver<IndexedWorkItem>,
    result_tx: mpsc::Sender<IndexedResult>,
    worker_count: usize,
) -> JoinSet<()>
where
    T: SubjectTask + 'static,
{
    let work_rx = Arc::new(Mutex::new(work_rx));
    let mut workers = JoinSet::new();

    for worker_id in 0..worker_count {
        workers.spawn(consume(worker_id, task.clone(), work_rx.clone(), result_tx.clone()));
    }
    workers
}

async fn consume<T>(
    worker_id: usize,
    task: Arc<T>,
    work_rx: Arc<Mutex<mpsc::Receiver<IndexedWorkItem>>>,
    result_tx: mpsc::Sender<IndexedResult>,
) where
    T: SubjectTask + 'static,
{
    loop {
        // ロックは受信の間だけ保持する
        let (index, item) = {
            let mut rx = work_rx.lock().await;
            match rx.recv().await {
                Some(work) => work,
                None => break,
            }
        };

        debug!(worker_id, subject = item.subject(), "worker picked up subject");
        let result = task.process(&item).await;

        if result_tx.send((index, result)).await.is_err() {
            // 結果チャンネルが閉じられた場合は終了
            break;
        }
    }
    debug!(worker_id, "worker finished");
}
