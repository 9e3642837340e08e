//! # 消息传输能力
//!
//! 发布端与订阅端共用的 MQTT 抽象：
//!
//! - [`PublishTransport`]：发布端连接生命周期与发布调用，事件通过
//!   [`TransportEventHandler`] 回调异步送达。
//! - [`SubscriberSession`]：订阅端按需拉取事件，在同一任务内完成订阅。
//! - [`MqttTransport`] / [`MqttSession`]：基于 rumqttc 的实现。

mod error;
mod event;
mod mqtt;
mod qos;

pub use error::TransportError;
pub use event::{TransportEvent, TransportEventHandler, map_event};
pub use mqtt::{MqttEndpoint, MqttSession, MqttTransport};
pub use qos::{QosLevel, qos_from_u8};

use async_trait::async_trait;
use std::sync::Arc;

/// 发布端传输。
#[async_trait]
pub trait PublishTransport: Send {
    /// 发起一次连接尝试。返回 `Ok` 只代表请求已送出，是否连上以
    /// [`TransportEvent::Connected`] 为准。
    async fn connect(&mut self, events: Arc<dyn TransportEventHandler>)
    -> Result<(), TransportError>;

    async fn publish(
        &self,
        topic: &str,
        qos: QosLevel,
        payload: Vec<u8>,
    ) -> Result<(), TransportError>;

    /// 主动断开。
    async fn disconnect(&mut self) -> Result<(), TransportError>;

    /// 停止后台网络循环，不再产生事件。
    async fn stop(&mut self);
}

/// 订阅端会话。
#[async_trait]
pub trait SubscriberSession: Send {
    /// 等待下一个传输事件；连接层错误以 `Err` 返回，调用方决定是否继续。
    async fn next_event(&mut self) -> Result<TransportEvent, TransportError>;

    async fn subscribe(&mut self, topic: &str, qos: QosLevel) -> Result<(), TransportError>;

    async fn disconnect(&mut self) -> Result<(), TransportError>;
}
