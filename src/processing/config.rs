// 実行設定の抽象化と標準実装

use crate::command::CommandTemplate;
use crate::core::{ProcessingError, ProcessingResult};
use std::time::Duration;

/// 外部ツール1ステージあたりのデフォルト制限時間（48時間）
pub const DEFAULT_STAGE_TIMEOUT: Duration = Duration::from_secs(48 * 60 * 60);

/// バッチ実行の設定を抽象化するトレイト
pub trait ProcessingConfig: Send + Sync {
    /// 同時に処理する被験者数
    fn max_workers(&self) -> usize;

    /// 作業キューのバッファサイズ
    fn channel_buffer_size(&self) -> usize;

    /// 1ステージあたりの制限時間（`None`なら無制限）
    fn stage_timeout(&self) -> Option<Duration>;

    /// 再構成コマンド
    fn reconstruction_command(&self) -> &CommandTemplate;

    /// セグメンテーションコマンド
    fn segmentation_command(&self) -> &CommandTemplate;

    /// 設定値の検証
    fn validate(&self) -> ProcessingResult<()> {
        if self.max_workers() == 0 {
            return Err(ProcessingError::configuration("ワーカー数は1以上である必要があります"));
        }
        if self.channel_buffer_size() == 0 {
            return Err(ProcessingError::configuration("バッファサイズは1以上である必要があります"));
        }
        if self.stage_timeout().is_some_and(|t| t.is_zero()) {
            return Err(ProcessingError::configuration("制限時間は0より大きい必要があります"));
        }
        Ok(())
    }
}

/// デフォルト設定実装
#[derive(Debug, Clone)]
pub struct DefaultProcessingConfig {
    max_workers: usize,
    buffer_size: usize,
    stage_timeout: Option<Duration>,
    reconstruction: CommandTemplate,
    segmentation: CommandTemplate,
}

impl DefaultProcessingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers;
        self
    }

    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size;
        self
    }

    pub fn with_stage_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.stage_timeout = timeout;
        self
    }

    pub fn with_reconstruction_command(mut self, template: CommandTemplate) -> Self {
        self.reconstruction = template;
        self
    }

    pub fn with_segmentation_command(mut self, template: CommandTemplate) -> Self {
        self.segmentation = template;
        self
    }
}

impl Default for DefaultProcessingConfig {
    fn default() -> Self {
        Self {
            max_workers: num_cpus::get().max(1),
            buffer_size: 100,
            stage_timeout: Some(DEFAULT_STAGE_TIMEOUT),
            reconstruction: CommandTemplate::reconstruction(),
            segmentation: CommandTemplate::segmentation(),
        }
    }
}

impl ProcessingConfig for DefaultProcessingConfig {
    fn max_workers(&self) -> usize {
        self.max_workers
    }

    fn channel_buffer_size(&self) -> usize {
        self.buffer_size
    }

    fn stage_timeout(&self) -> Option<Duration> {
        self.stage_timeout
    }

    fn reconstruction_command(&self) -> &CommandTemplate {
        &self.reconstruction
    }

    fn segmentation_command(&self) -> &CommandTemplate {
        &self.segmentation
    }
}
