use crate::PipelineError;
use crate::dedup::DedupState;
use climlog_storage::{TimeSeriesPoint, TimeSeriesSink};
use climlog_telemetry::{record_backpressure, record_points_written, record_write_failure};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// 写入任务参数。
#[derive(Debug, Clone)]
pub struct PersistConfig {
    /// 队列容量（以报文为单位）。
    pub queue_capacity: usize,
    /// 单批写入失败后的最大重试次数。
    pub max_retries: usize,
    pub retry_backoff: Duration,
    /// 去重缓存容量（传感器数），0 表示关闭。
    pub dedup_cache_size: usize,
}

impl Default for PersistConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 64,
            max_retries: 3,
            retry_backoff: Duration::from_millis(500),
            dedup_cache_size: 1024,
        }
    }
}

/// 写入统计，写入任务结束时返回。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriterStats {
    pub batches: u64,
    pub points_written: u64,
    pub duplicates_skipped: u64,
    pub failed_batches: u64,
}

/// 入队端，可克隆。
#[derive(Clone)]
pub struct PersistQueue {
    sender: mpsc::Sender<Vec<TimeSeriesPoint>>,
}

impl PersistQueue {
    /// 非阻塞入队；队列满时返回 [`PipelineError::Backpressure`]。
    pub fn submit(&self, points: Vec<TimeSeriesPoint>) -> Result<(), PipelineError> {
        match self.sender.try_send(points) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(points)) => {
                record_backpressure();
                warn!(target: "climlog.pipeline", dropped = points.len(), "writer_queue_full");
                Err(PipelineError::Backpressure("writer queue full".to_string()))
            }
            Err(TrySendError::Closed(_)) => Err(PipelineError::Closed),
        }
    }
}

/// 写入任务句柄。
pub struct PersistWorker {
    handle: JoinHandle<WriterStats>,
}

impl PersistWorker {
    /// 等待队列排空后返回统计；调用前必须丢弃所有 [`PersistQueue`]。
    pub async fn finish(self) -> Result<WriterStats, PipelineError> {
        self.handle
            .await
            .map_err(|err| PipelineError::Writer(err.to_string()))
    }
}

/// 持久化流水线入口。
pub struct PersistPipeline;

impl PersistPipeline {
    pub fn spawn(
        sink: Arc<dyn TimeSeriesSink>,
        config: PersistConfig,
    ) -> (PersistQueue, PersistWorker) {
        let (sender, receiver) = mpsc::channel(config.queue_capacity.max(1));
        let handle = tokio::spawn(run_writer(sink, receiver, config));
        (PersistQueue { sender }, PersistWorker { handle })
    }
}

async fn run_writer(
    sink: Arc<dyn TimeSeriesSink>,
    mut receiver: mpsc::Receiver<Vec<TimeSeriesPoint>>,
    config: PersistConfig,
) -> WriterStats {
    let mut dedup = DedupState::new(config.dedup_cache_size);
    let mut stats = WriterStats::default();

    while let Some(points) = receiver.recv().await {
        let total = points.len();
        let fresh: Vec<TimeSeriesPoint> = points
            .into_iter()
            .filter(|point| !dedup.is_duplicate(point))
            .collect();
        let skipped = (total - fresh.len()) as u64;
        if skipped > 0 {
            stats.duplicates_skipped += skipped;
            debug!(target: "climlog.pipeline", skipped, "duplicate_points_skipped");
        }
        if fresh.is_empty() {
            continue;
        }

        match write_with_retry(sink.as_ref(), &fresh, &config).await {
            Ok(count) => {
                for point in &fresh {
                    dedup.remember(point);
                }
                stats.batches += 1;
                stats.points_written += count as u64;
                record_points_written(count as u64);
                debug!(target: "climlog.pipeline", count, "points_written");
            }
            Err(err) => {
                stats.failed_batches += 1;
                record_write_failure();
                error!(
                    target: "climlog.pipeline",
                    points = fresh.len(),
                    error = %err,
                    "points_write_failed"
                );
            }
        }
    }

    info!(
        target: "climlog.pipeline",
        batches = stats.batches,
        points_written = stats.points_written,
        failed_batches = stats.failed_batches,
        "writer_stopped"
    );
    stats
}

async fn write_with_retry(
    sink: &dyn TimeSeriesSink,
    points: &[TimeSeriesPoint],
    config: &PersistConfig,
) -> Result<usize, PipelineError> {
    let mut attempt = 0;
    loop {
        match sink.write_points(points).await {
            Ok(count) => return Ok(count),
            Err(err) => {
                attempt += 1;
                if attempt > config.max_retries {
                    return Err(PipelineError::Writer(err.to_string()));
                }
                warn!(target: "climlog.pipeline", attempt, error = %err, "points_write_retry");
                if !config.retry_backoff.is_zero() {
                    tokio::time::sleep(config.retry_backoff).await;
                }
            }
        }
    }
}
