use crate::connection::{ConnectionTracker, HandshakePolicy, RetryPolicy};
use crate::indicator::BlinkIndicator;
use climlog_buttons::ButtonMonitorHandle;
use climlog_device::{
    Backlight, DeviceError, DisplayRenderer, DisplaySurface, SamplePair, SampleSource,
};
use climlog_telemetry::{
    record_connect_attempt, record_message_published, record_publish_failure,
    record_publish_skipped, record_sample_failure, record_sample_taken,
};
use climlog_transport::{PublishTransport, QosLevel, TransportEventHandler};
use domain::{ConnectionState, DisplaySnapshot};
use message_contract::MeasurementMessage;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinError;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// 发布流水线参数。
#[derive(Debug, Clone)]
pub struct PublishSettings {
    pub topic: String,
    pub qos: QosLevel,
    pub retry: RetryPolicy,
    pub handshake: HandshakePolicy,
    pub sample_interval: Duration,
}

impl PublishSettings {
    pub fn new(topic: impl Into<String>, qos: QosLevel) -> Self {
        Self {
            topic: topic.into(),
            qos,
            retry: RetryPolicy::default(),
            handshake: HandshakePolicy::default(),
            sample_interval: Duration::from_secs(1),
        }
    }
}

/// 一次运行的统计，流水线退出时返回。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishSummary {
    pub connect_attempts: u32,
    pub publishing_enabled: bool,
    pub ticks: u64,
    pub samples: u64,
    pub published: u64,
    pub skipped: u64,
}

pub struct PublishPipeline {
    settings: PublishSettings,
    transport: Box<dyn PublishTransport>,
    tracker: Arc<ConnectionTracker>,
    source: Arc<Mutex<SampleSource>>,
    renderer: DisplayRenderer,
    surface: Box<dyn DisplaySurface>,
    backlight: Arc<Backlight>,
    monitor: Option<ButtonMonitorHandle>,
    indicator: BlinkIndicator,
    summary: PublishSummary,
}

impl PublishPipeline {
    pub fn new(
        settings: PublishSettings,
        transport: Box<dyn PublishTransport>,
        source: SampleSource,
        surface: Box<dyn DisplaySurface>,
        backlight: Arc<Backlight>,
    ) -> Self {
        Self {
            settings,
            transport,
            tracker: Arc::new(ConnectionTracker::new()),
            source: Arc::new(Mutex::new(source)),
            renderer: DisplayRenderer::default(),
            surface,
            backlight,
            monitor: None,
            indicator: BlinkIndicator::default(),
            summary: PublishSummary::default(),
        }
    }

    /// 退出时需要停止并等待的按钮线程。
    pub fn with_button_monitor(mut self, monitor: ButtonMonitorHandle) -> Self {
        self.monitor = Some(monitor);
        self
    }

    pub fn tracker(&self) -> Arc<ConnectionTracker> {
        Arc::clone(&self.tracker)
    }

    /// 运行到 `shutdown` 完成为止，随后清理资源并返回统计。
    ///
    /// 连接阶段与采样阶段都响应 `shutdown`，进行中的节拍会被放弃。
    pub async fn run<F>(mut self, shutdown: F) -> PublishSummary
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        let established = tokio::select! {
            _ = &mut shutdown => None,
            enabled = self.establish() => Some(enabled),
        };
        let Some(enabled) = established else {
            info!(target: "climlog.publish", "shutdown_during_connect");
            self.teardown().await;
            return self.summary;
        };
        self.summary.publishing_enabled = enabled;

        info!(
            target: "climlog.publish",
            publishing_enabled = enabled,
            interval_ms = self.settings.sample_interval.as_millis() as u64,
            "measurement_loop_started"
        );
        let mut ticker = tokio::time::interval(self.settings.sample_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = ticker.tick() => {}
            }
            tokio::select! {
                _ = &mut shutdown => break,
                _ = self.tick() => {}
            }
        }

        info!(target: "climlog.publish", ticks = self.summary.ticks, "shutdown_requested");
        self.teardown().await;
        self.summary
    }

    /// 连接 + 握手；返回是否启用发布。
    async fn establish(&mut self) -> bool {
        let events: Arc<dyn TransportEventHandler> = self.tracker.clone();
        let retry = self.settings.retry;
        let mut requested = false;

        for attempt in 1..=retry.max_attempts {
            self.tracker.set(ConnectionState::Connecting);
            self.summary.connect_attempts = attempt;
            record_connect_attempt();
            info!(
                target: "climlog.publish",
                attempt,
                max_attempts = retry.max_attempts,
                topic = %self.settings.topic,
                qos = self.settings.qos.as_u8(),
                "mqtt_connect_sent"
            );
            match self.transport.connect(Arc::clone(&events)).await {
                Ok(()) => {
                    requested = true;
                    break;
                }
                Err(err) => {
                    if self.tracker.state() == ConnectionState::Connecting {
                        self.tracker.set(ConnectionState::Disconnected);
                    }
                    if attempt == retry.max_attempts {
                        error!(
                            target: "climlog.publish",
                            attempt,
                            max_attempts = retry.max_attempts,
                            error = %err,
                            "mqtt_connect_failed"
                        );
                        break;
                    }
                    let delay = retry.delay_after(attempt);
                    error!(
                        target: "climlog.publish",
                        attempt,
                        max_attempts = retry.max_attempts,
                        retry_in_secs = delay.as_secs(),
                        error = %err,
                        "mqtt_connect_failed"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }

        if requested && wait_for_handshake(&self.tracker, self.settings.handshake).await {
            info!(target: "climlog.publish", "mqtt_connection_established");
            return true;
        }

        error!(target: "climlog.publish", "mqtt_unavailable_publishing_disabled");
        self.transport.stop().await;
        self.tracker.set(ConnectionState::Failed);
        false
    }

    async fn tick(&mut self) {
        self.summary.ticks += 1;

        let pair = match self.sample().await {
            Ok(Ok(pair)) => pair,
            Ok(Err(err)) => {
                record_sample_failure();
                warn!(target: "climlog.publish", error = %err, "sample_failed_tick_skipped");
                return;
            }
            Err(err) => {
                record_sample_failure();
                error!(target: "climlog.publish", error = %err, "sample_task_failed_tick_skipped");
                return;
            }
        };
        record_sample_taken();
        self.summary.samples += 1;

        let connected = self.tracker.state().is_connected();
        let snapshot = DisplaySnapshot {
            indoor: pair.indoor,
            outdoor: pair.outdoor,
            link_indicator_color: self.indicator.next(connected),
        };
        if let Err(err) = self.renderer.render(self.surface.as_mut(), &snapshot) {
            warn!(target: "climlog.publish", error = %err, "display_render_failed");
        }

        if !(self.summary.publishing_enabled && connected) {
            record_publish_skipped();
            self.summary.skipped += 1;
            return;
        }

        let message = MeasurementMessage::new(snapshot.indoor, snapshot.outdoor);
        let payload = match message.encode() {
            Ok(payload) => payload,
            Err(err) => {
                record_publish_failure();
                warn!(target: "climlog.publish", error = %err, "message_encode_failed");
                return;
            }
        };
        let payload_size = payload.len();
        match self
            .transport
            .publish(&self.settings.topic, self.settings.qos, payload)
            .await
        {
            Ok(()) => {
                record_message_published();
                self.summary.published += 1;
                debug!(
                    target: "climlog.publish",
                    topic = %self.settings.topic,
                    qos = self.settings.qos.as_u8(),
                    payload_size,
                    "mqtt_publish_sent"
                );
            }
            Err(err) => {
                record_publish_failure();
                warn!(target: "climlog.publish", error = %err, "mqtt_publish_failed");
            }
        }
    }

    /// 传感器读取是阻塞文件 IO（1-Wire 约 750 ms），放到阻塞线程池执行。
    async fn sample(&self) -> Result<Result<SamplePair, DeviceError>, JoinError> {
        let source = Arc::clone(&self.source);
        tokio::task::spawn_blocking(move || source.lock().map_err(|_| DeviceError::Lock)?.sample())
            .await
    }

    /// 清屏、关背光、停止按钮线程，已连接时再断开 broker。
    async fn teardown(&mut self) {
        if let Err(err) = self.renderer.clear(self.surface.as_mut()) {
            warn!(target: "climlog.publish", error = %err, "display_clear_failed");
        }
        if let Err(err) = self.backlight.set(false) {
            warn!(target: "climlog.publish", error = %err, "backlight_off_failed");
        }
        if let Some(monitor) = self.monitor.take() {
            match tokio::task::spawn_blocking(move || monitor.stop()).await {
                Ok(Ok(())) => debug!(target: "climlog.publish", "button_monitor_joined"),
                Ok(Err(err)) => {
                    warn!(target: "climlog.publish", error = %err, "button_monitor_join_failed")
                }
                Err(err) => {
                    warn!(target: "climlog.publish", error = %err, "button_monitor_join_failed")
                }
            }
        }
        if self.tracker.state().is_connected() {
            info!(target: "climlog.publish", "mqtt_disconnect_sent");
            if let Err(err) = self.transport.disconnect().await {
                warn!(target: "climlog.publish", error = %err, "mqtt_disconnect_failed");
            }
        } else {
            self.transport.stop().await;
        }
        info!(target: "climlog.publish", "publish_pipeline_stopped");
    }
}

async fn wait_for_handshake(tracker: &ConnectionTracker, policy: HandshakePolicy) -> bool {
    let deadline = Instant::now() + policy.timeout;
    loop {
        if tracker.state().is_connected() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        info!(target: "climlog.publish", "mqtt_connack_waiting");
        tokio::time::sleep(policy.poll_interval).await;
    }
}
