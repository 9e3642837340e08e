//! 订阅链路装配：收到的报文 → 时序点 → 写入队列。

use climlog_ingest::{InboundMessage, IngestError, MessageHandler};
use climlog_pipeline::{PersistQueue, PipelineError, points_from_message};
use climlog_telemetry::{record_decode_failure, record_write_failure};
use tracing::{debug, warn};

/// 把每条报文拆成时序点并交给写入任务。
pub struct PersistHandler {
    queue: PersistQueue,
    measurement: String,
}

impl PersistHandler {
    pub fn new(queue: PersistQueue, measurement: impl Into<String>) -> Self {
        Self {
            queue,
            measurement: measurement.into(),
        }
    }
}

#[async_trait::async_trait]
impl MessageHandler for PersistHandler {
    async fn handle(&self, message: InboundMessage) -> Result<(), IngestError> {
        // 解析失败只影响当前报文
        let points = match points_from_message(&message.topic, &message.payload, &self.measurement)
        {
            Ok(points) => points,
            Err(err) => {
                record_decode_failure();
                warn!(
                    target: "climlog.ingest",
                    topic = %message.topic,
                    payload_size = message.payload.len(),
                    error = %err,
                    "message_decode_failed"
                );
                return Err(IngestError::Handler(err.to_string()));
            }
        };

        let count = points.len();
        match self.queue.submit(points) {
            Ok(()) => {
                debug!(target: "climlog.ingest", topic = %message.topic, points = count, "points_enqueued");
                Ok(())
            }
            Err(err) => {
                if !matches!(err, PipelineError::Backpressure(_)) {
                    record_write_failure();
                }
                Err(IngestError::Handler(err.to_string()))
            }
        }
    }
}
