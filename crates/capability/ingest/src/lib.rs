//! 订阅端：连接 broker、每次连上后（重新）订阅主题，并把收到的消息交给
//! [`MessageHandler`]。

use async_trait::async_trait;
use climlog_telemetry::record_message_received;
use climlog_transport::{QosLevel, SubscriberSession, TransportEvent};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// 订阅错误。
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("initial connect failed: {0}")]
    Connect(String),
    #[error("handler error: {0}")]
    Handler(String),
}

/// 收到的一条消息。
#[derive(Debug, Clone, PartialEq)]
pub struct InboundMessage {
    pub topic: String,
    pub payload: Vec<u8>,
    pub qos: u8,
    pub retain: bool,
}

/// 消息处理器。返回错误只记录日志，不会中断订阅循环。
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle(&self, message: InboundMessage) -> Result<(), IngestError>;
}

/// 订阅参数。
#[derive(Debug, Clone)]
pub struct SubscriberConfig {
    pub topic: String,
    pub qos: QosLevel,
    /// 连接层出错后的等待时长，随后由会话自行重连。
    pub reconnect_pause: Duration,
}

impl SubscriberConfig {
    pub fn new(topic: impl Into<String>, qos: QosLevel) -> Self {
        Self {
            topic: topic.into(),
            qos,
            reconnect_pause: Duration::from_secs(1),
        }
    }
}

/// 一次运行的统计。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubscriberStats {
    pub connects: u32,
    pub subscribe_requests: u32,
    pub messages: u64,
    pub handler_errors: u64,
}

/// 订阅循环。
pub struct Subscriber {
    config: SubscriberConfig,
}

impl Subscriber {
    pub fn new(config: SubscriberConfig) -> Self {
        Self { config }
    }

    /// 运行到 `shutdown` 完成为止。
    ///
    /// 第一次连上之前出现的连接错误是致命的；之后的错误记录日志并等待
    /// 会话重连。每次收到 CONNACK 都会重新订阅。
    pub async fn run<F>(
        &self,
        mut session: Box<dyn SubscriberSession>,
        handler: Arc<dyn MessageHandler>,
        shutdown: F,
    ) -> Result<SubscriberStats, IngestError>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut stats = SubscriberStats::default();

        loop {
            let event = tokio::select! {
                _ = &mut shutdown => break,
                event = session.next_event() => event,
            };

            match event {
                Ok(TransportEvent::Connected { session_present }) => {
                    stats.connects += 1;
                    info!(
                        target: "climlog.ingest",
                        session_present,
                        connects = stats.connects,
                        "mqtt_connack_received"
                    );
                    match session.subscribe(&self.config.topic, self.config.qos).await {
                        Ok(()) => {
                            stats.subscribe_requests += 1;
                            info!(
                                target: "climlog.ingest",
                                topic = %self.config.topic,
                                qos = self.config.qos.as_u8(),
                                "mqtt_subscribe_sent"
                            );
                        }
                        Err(err) => {
                            warn!(target: "climlog.ingest", error = %err, "mqtt_subscribe_failed")
                        }
                    }
                }
                Ok(TransportEvent::Subscribed { packet_id, granted }) => {
                    info!(
                        target: "climlog.ingest",
                        packet_id,
                        granted = ?granted,
                        "mqtt_suback_received"
                    );
                }
                Ok(TransportEvent::Message {
                    topic,
                    payload,
                    qos,
                    retain,
                }) => {
                    stats.messages += 1;
                    record_message_received();
                    debug!(
                        target: "climlog.ingest",
                        topic = %topic,
                        qos,
                        payload_size = payload.len(),
                        "mqtt_message_received"
                    );
                    let message = InboundMessage {
                        topic,
                        payload,
                        qos,
                        retain,
                    };
                    if let Err(err) = handler.handle(message).await {
                        stats.handler_errors += 1;
                        warn!(target: "climlog.ingest", error = %err, "message_handler_failed");
                    }
                }
                Ok(TransportEvent::Disconnected { unexpected: true }) => {
                    error!(target: "climlog.ingest", "mqtt_unexpected_disconnect");
                }
                Ok(TransportEvent::Disconnected { unexpected: false }) => {
                    info!(target: "climlog.ingest", "mqtt_disconnect_completed");
                }
                Ok(TransportEvent::Published { packet_id }) => {
                    debug!(target: "climlog.ingest", packet_id, "mqtt_puback_ignored");
                }
                Err(err) if stats.connects == 0 => {
                    error!(target: "climlog.ingest", error = %err, "mqtt_initial_connect_failed");
                    return Err(IngestError::Connect(err.to_string()));
                }
                Err(err) => {
                    warn!(target: "climlog.ingest", error = %err, "mqtt_connection_error");
                    tokio::select! {
                        _ = &mut shutdown => break,
                        _ = tokio::time::sleep(self.config.reconnect_pause) => {}
                    }
                }
            }
        }

        info!(target: "climlog.ingest", "shutdown_requested");
        if let Err(err) = session.disconnect().await {
            warn!(target: "climlog.ingest", error = %err, "mqtt_disconnect_failed");
        }
        Ok(stats)
    }
}
