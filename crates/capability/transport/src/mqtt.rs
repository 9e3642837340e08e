use crate::error::TransportError;
use crate::event::{TransportEvent, TransportEventHandler, map_event};
use crate::qos::QosLevel;
use crate::{PublishTransport, SubscriberSession};
use async_trait::async_trait;
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Outgoing};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

const REQUEST_CAPACITY: usize = 10;
const RECONNECT_PAUSE: Duration = Duration::from_secs(1);
const DISCONNECT_GRACE: Duration = Duration::from_secs(2);

/// broker 连接参数。
#[derive(Debug, Clone)]
pub struct MqttEndpoint {
    pub host: String,
    pub port: u16,
    pub keep_alive_seconds: u64,
    pub username: Option<String>,
    pub password: Option<String>,
    /// 客户端 ID 前缀，实际 ID 追加随机 UUID。
    pub client_prefix: String,
}

impl MqttEndpoint {
    fn options(&self) -> MqttOptions {
        let client_id = format!("{}-{}", self.client_prefix, uuid::Uuid::new_v4());
        let mut options = MqttOptions::new(client_id, self.host.clone(), self.port);
        options.set_keep_alive(Duration::from_secs(self.keep_alive_seconds.max(5)));
        if let (Some(username), Some(password)) = (self.username.as_ref(), self.password.as_ref()) {
            options.set_credentials(username, password);
        }
        options
    }
}

/// 发布端 MQTT 传输：首个事件在调用方任务中等待，之后的网络循环在
/// 后台任务中运行。
pub struct MqttTransport {
    endpoint: MqttEndpoint,
    client: Option<AsyncClient>,
    event_loop: Option<JoinHandle<()>>,
}

impl MqttTransport {
    pub fn new(endpoint: MqttEndpoint) -> Self {
        Self {
            endpoint,
            client: None,
            event_loop: None,
        }
    }

    fn spawn_event_loop(
        mut eventloop: EventLoop,
        events: Arc<dyn TransportEventHandler>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut link_up = true;
            loop {
                match eventloop.poll().await {
                    Ok(event) => {
                        let closing = matches!(event, Event::Outgoing(Outgoing::Disconnect));
                        if let Some(mapped) = map_event(event) {
                            match &mapped {
                                TransportEvent::Connected { .. } => link_up = true,
                                TransportEvent::Disconnected { .. } => link_up = false,
                                _ => {}
                            }
                            events.on_event(mapped);
                        }
                        if closing {
                            debug!(target: "climlog.transport", "mqtt_event_loop_closed");
                            return;
                        }
                    }
                    Err(err) => {
                        if link_up {
                            link_up = false;
                            error!(target: "climlog.transport", error = %err, "mqtt_unexpected_disconnect");
                            events.on_event(TransportEvent::Disconnected { unexpected: true });
                        } else {
                            warn!(target: "climlog.transport", error = %err, "mqtt_event_loop_error");
                        }
                        tokio::time::sleep(RECONNECT_PAUSE).await;
                    }
                }
            }
        })
    }
}

#[async_trait]
impl PublishTransport for MqttTransport {
    async fn connect(
        &mut self,
        events: Arc<dyn TransportEventHandler>,
    ) -> Result<(), TransportError> {
        self.stop().await;
        let (client, mut eventloop) = AsyncClient::new(self.endpoint.options(), REQUEST_CAPACITY);
        info!(
            target: "climlog.transport",
            host = %self.endpoint.host,
            port = self.endpoint.port,
            "mqtt_connect_requested"
        );
        let first = eventloop
            .poll()
            .await
            .map_err(|err| TransportError::Connect(err.to_string()))?;
        if let Some(mapped) = map_event(first) {
            events.on_event(mapped);
        }
        self.event_loop = Some(Self::spawn_event_loop(eventloop, events));
        self.client = Some(client);
        Ok(())
    }

    async fn publish(
        &self,
        topic: &str,
        qos: QosLevel,
        payload: Vec<u8>,
    ) -> Result<(), TransportError> {
        let client = self.client.as_ref().ok_or(TransportError::NotConnected)?;
        // 请求队列满时立即失败，不阻塞采样节拍。
        client
            .try_publish(topic, qos.to_mqtt(), false, payload)
            .map_err(|err| TransportError::Publish(err.to_string()))
    }

    async fn disconnect(&mut self) -> Result<(), TransportError> {
        let Some(client) = self.client.take() else {
            return Ok(());
        };
        client
            .disconnect()
            .await
            .map_err(|err| TransportError::Disconnect(err.to_string()))?;
        if let Some(handle) = self.event_loop.take() {
            let abort = handle.abort_handle();
            if tokio::time::timeout(DISCONNECT_GRACE, handle).await.is_err() {
                abort.abort();
            }
        }
        info!(target: "climlog.transport", "mqtt_disconnected");
        Ok(())
    }

    async fn stop(&mut self) {
        if let Some(handle) = self.event_loop.take() {
            handle.abort();
            debug!(target: "climlog.transport", "mqtt_event_loop_stopped");
        }
        self.client = None;
    }
}

/// 订阅端 MQTT 会话，事件在调用方任务中轮询。
pub struct MqttSession {
    client: AsyncClient,
    eventloop: EventLoop,
}

impl MqttSession {
    /// 创建会话；真正的网络连接在第一次 [`SubscriberSession::next_event`] 时建立。
    pub fn new(endpoint: &MqttEndpoint) -> Self {
        let (client, eventloop) = AsyncClient::new(endpoint.options(), REQUEST_CAPACITY);
        Self { client, eventloop }
    }
}

#[async_trait]
impl SubscriberSession for MqttSession {
    async fn next_event(&mut self) -> Result<TransportEvent, TransportError> {
        loop {
            let event = self
                .eventloop
                .poll()
                .await
                .map_err(|err| TransportError::Connection(err.to_string()))?;
            if let Some(mapped) = map_event(event) {
                return Ok(mapped);
            }
        }
    }

    async fn subscribe(&mut self, topic: &str, qos: QosLevel) -> Result<(), TransportError> {
        self.client
            .subscribe(topic, qos.to_mqtt())
            .await
            .map_err(|err| TransportError::Subscribe(err.to_string()))
    }

    async fn disconnect(&mut self) -> Result<(), TransportError> {
        self.client
            .disconnect()
            .await
            .map_err(|err| TransportError::Disconnect(err.to_string()))?;
        // 把 DISCONNECT 报文真正写出去。
        let flush = async {
            loop {
                match self.eventloop.poll().await {
                    Ok(Event::Outgoing(Outgoing::Disconnect)) | Err(_) => break,
                    Ok(_) => {}
                }
            }
        };
        let _ = tokio::time::timeout(DISCONNECT_GRACE, flush).await;
        Ok(())
    }
}
