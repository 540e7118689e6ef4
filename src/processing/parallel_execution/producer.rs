// Producer - 作業単位の配信

use crate::core::WorkItem;
use tokio::sync::mpsc;

/// 入力順の番号付き作業単位
pub type IndexedWorkItem = (usize, WorkItem);

/// Producer: 作業単位を入力順の番号付きで配信
pub fn spawn_producer(
    items: Vec<WorkItem>,
    work_tx: mpsc::Sender<IndexedWorkItem>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        for indexed in items.into_iter().enumerate() {
            if work_tx.send(indexed).await.is_err() {
                // 受信側が全て終了した場合は配信をやめる
                break;
            }
        }
        // work_txのドロップでチャンネル終了を通知
    })
}
