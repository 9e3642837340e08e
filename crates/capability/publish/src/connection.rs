use climlog_transport::{TransportEvent, TransportEventHandler};
use domain::ConnectionState;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tracing::{debug, error, info};

/// 连接重试策略：第 n 次失败后等待 `base + n * step`。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base: Duration,
    pub step: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 30,
            base: Duration::from_secs(1),
            step: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// 第 `failed_attempt` 次（从 1 开始）失败后的等待时长。
    pub fn delay_after(&self, failed_attempt: u32) -> Duration {
        self.base + self.step * failed_attempt
    }
}

/// 连接请求发出后等待 CONNACK 的方式。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandshakePolicy {
    pub timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for HandshakePolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            poll_interval: Duration::from_millis(500),
        }
    }
}

/// 发布端连接状态，由传输事件驱动。
#[derive(Debug)]
pub struct ConnectionTracker {
    state: Mutex<ConnectionState>,
}

impl Default for ConnectionTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionTracker {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ConnectionState::Disconnected),
        }
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set(&self, next: ConnectionState) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = next;
    }
}

impl TransportEventHandler for ConnectionTracker {
    fn on_event(&self, event: TransportEvent) {
        match event {
            TransportEvent::Connected { session_present } => {
                info!(target: "climlog.publish", session_present, "mqtt_connack_received");
                self.set(ConnectionState::Connected);
            }
            TransportEvent::Disconnected { unexpected: true } => {
                error!(target: "climlog.publish", "mqtt_unexpected_disconnect");
                self.set(ConnectionState::Disconnected);
            }
            TransportEvent::Disconnected { unexpected: false } => {
                info!(target: "climlog.publish", "mqtt_disconnect_completed");
                self.set(ConnectionState::Disconnected);
            }
            TransportEvent::Published { packet_id } => {
                debug!(target: "climlog.publish", packet_id, "mqtt_puback_received");
            }
            TransportEvent::Subscribed { packet_id, .. } => {
                debug!(target: "climlog.publish", packet_id, "mqtt_suback_ignored");
            }
            TransportEvent::Message { topic, .. } => {
                debug!(target: "climlog.publish", topic = %topic, "mqtt_message_ignored");
            }
        }
    }
}
