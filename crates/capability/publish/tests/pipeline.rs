use async_trait::async_trait;
use climlog_device::{
    Backlight, DeviceError, DisplaySurface, DrawOp, FontSize, HeadlessSurface, NullOutput, Point,
    Rect, SampleSource, Sensor, SimulatedSensor,
};
use climlog_publish::{PublishPipeline, PublishSettings, PublishSummary};
use climlog_transport::{
    PublishTransport, QosLevel, TransportError, TransportEvent, TransportEventHandler,
};
use domain::{Color, ConnectionState, SensorReading};
use message_contract::MeasurementMessage;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

#[derive(Default)]
struct TransportLog {
    attempts: Vec<Instant>,
    published: Vec<(String, QosLevel, Vec<u8>)>,
    stopped: usize,
    disconnected: usize,
}

/// 前 `failures` 次连接失败，之后成功；`ack` 控制是否送达 CONNACK。
struct ScriptedTransport {
    failures: u32,
    ack: bool,
    log: Arc<Mutex<TransportLog>>,
    events: Option<Arc<dyn TransportEventHandler>>,
}

impl ScriptedTransport {
    fn new(failures: u32, ack: bool) -> (Self, Arc<Mutex<TransportLog>>) {
        let log = Arc::new(Mutex::new(TransportLog::default()));
        (
            Self {
                failures,
                ack,
                log: Arc::clone(&log),
                events: None,
            },
            log,
        )
    }
}

#[async_trait]
impl PublishTransport for ScriptedTransport {
    async fn connect(
        &mut self,
        events: Arc<dyn TransportEventHandler>,
    ) -> Result<(), TransportError> {
        let attempt = {
            let mut log = self.log.lock().expect("log");
            log.attempts.push(Instant::now());
            log.attempts.len() as u32
        };
        if attempt <= self.failures {
            return Err(TransportError::Connect("connection refused".to_string()));
        }
        if self.ack {
            events.on_event(TransportEvent::Connected {
                session_present: false,
            });
        }
        self.events = Some(events);
        Ok(())
    }

    async fn publish(
        &self,
        topic: &str,
        qos: QosLevel,
        payload: Vec<u8>,
    ) -> Result<(), TransportError> {
        self.log
            .lock()
            .expect("log")
            .published
            .push((topic.to_string(), qos, payload));
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), TransportError> {
        self.log.lock().expect("log").disconnected += 1;
        if let Some(events) = &self.events {
            events.on_event(TransportEvent::Disconnected { unexpected: false });
        }
        Ok(())
    }

    async fn stop(&mut self) {
        self.log.lock().expect("log").stopped += 1;
    }
}

/// 连接立即确认，但发布永不完成（请求队列已满时的 rumqttc 客户端）。
struct StalledTransport {
    disconnected: Arc<Mutex<usize>>,
}

#[async_trait]
impl PublishTransport for StalledTransport {
    async fn connect(
        &mut self,
        events: Arc<dyn TransportEventHandler>,
    ) -> Result<(), TransportError> {
        events.on_event(TransportEvent::Connected {
            session_present: false,
        });
        Ok(())
    }

    async fn publish(
        &self,
        _topic: &str,
        _qos: QosLevel,
        _payload: Vec<u8>,
    ) -> Result<(), TransportError> {
        std::future::pending().await
    }

    async fn disconnect(&mut self) -> Result<(), TransportError> {
        *self.disconnected.lock().expect("log") += 1;
        Ok(())
    }

    async fn stop(&mut self) {}
}

#[derive(Clone)]
struct SharedSurface(Arc<Mutex<HeadlessSurface>>);

impl DisplaySurface for SharedSurface {
    fn size(&self) -> (u32, u32) {
        self.0.lock().map(|surface| surface.size()).unwrap_or((0, 0))
    }

    fn fill_rect(&mut self, rect: Rect, color: Color) -> Result<(), DeviceError> {
        self.0
            .lock()
            .map_err(|_| DeviceError::Lock)?
            .fill_rect(rect, color)
    }

    fn place_text(
        &mut self,
        at: Point,
        text: &str,
        font: FontSize,
        color: Color,
    ) -> Result<(), DeviceError> {
        self.0
            .lock()
            .map_err(|_| DeviceError::Lock)?
            .place_text(at, text, font, color)
    }

    fn present(&mut self) -> Result<(), DeviceError> {
        self.0.lock().map_err(|_| DeviceError::Lock)?.present()
    }
}

/// 每隔一次采样失败一次。
struct FlakySensor {
    inner: SimulatedSensor,
    calls: u32,
}

impl Sensor for FlakySensor {
    fn id(&self) -> &str {
        self.inner.id()
    }

    fn sample(&mut self) -> Result<SensorReading, DeviceError> {
        self.calls += 1;
        if self.calls % 2 == 0 {
            return Err(DeviceError::NotFound("i2c".to_string()));
        }
        self.inner.sample()
    }
}

struct Rig {
    pipeline: PublishPipeline,
    surface: Arc<Mutex<HeadlessSurface>>,
    backlight: Arc<Backlight>,
}

fn rig(transport: impl PublishTransport + 'static, climate: Box<dyn Sensor>) -> Rig {
    let surface = Arc::new(Mutex::new(HeadlessSurface::new(240, 240)));
    let backlight = Arc::new(Backlight::new(Box::new(NullOutput::default())));
    backlight.set(true).expect("backlight on");
    let source = SampleSource::new(climate, Box::new(SimulatedSensor::probe("0316a2795fff")));
    let pipeline = PublishPipeline::new(
        PublishSettings::new("site/pi/climdata", QosLevel::AtLeastOnce),
        Box::new(transport),
        source,
        Box::new(SharedSurface(Arc::clone(&surface))),
        Arc::clone(&backlight),
    );
    Rig {
        pipeline,
        surface,
        backlight,
    }
}

fn climate() -> Box<dyn Sensor> {
    Box::new(SimulatedSensor::climate("564ac640bedb"))
}

fn assert_cleared(rig_surface: &Arc<Mutex<HeadlessSurface>>, backlight: &Backlight) {
    let surface = rig_surface.lock().expect("surface");
    assert_eq!(
        surface.last_frame(),
        &[DrawOp::Fill {
            rect: Rect::new(0, 0, 240, 240),
            color: Color::BLACK,
        }]
    );
    assert!(!backlight.is_on());
}

fn assert_close(actual: Duration, expected_secs: u64) {
    let expected = Duration::from_secs(expected_secs);
    let diff = actual.abs_diff(expected);
    assert!(diff <= Duration::from_millis(10), "{actual:?} vs {expected:?}");
}

#[tokio::test(start_paused = true)]
async fn retries_with_linear_backoff_until_connected() {
    let (transport, log) = ScriptedTransport::new(5, true);
    let rig = rig(transport, climate());
    let tracker = rig.pipeline.tracker();

    let summary: PublishSummary = rig
        .pipeline
        .run(tokio::time::sleep(Duration::from_secs(60)))
        .await;

    let log = log.lock().expect("log");
    assert_eq!(log.attempts.len(), 6);
    assert_eq!(summary.connect_attempts, 6);
    for (index, pair) in log.attempts.windows(2).enumerate() {
        assert_close(pair[1] - pair[0], index as u64 + 2);
    }

    assert!(summary.publishing_enabled);
    assert!(summary.published > 0);
    assert_eq!(summary.published as usize, log.published.len());
    let (topic, qos, payload) = &log.published[0];
    assert_eq!(topic, "site/pi/climdata");
    assert_eq!(*qos, QosLevel::AtLeastOnce);
    let message = MeasurementMessage::decode(payload).expect("decode");
    assert_eq!(message.climate.source_id, "564ac640bedb");
    assert_eq!(message.probe.source_id, "0316a2795fff");

    assert_eq!(log.disconnected, 1);
    assert_eq!(tracker.state(), ConnectionState::Disconnected);
    assert_cleared(&rig.surface, &rig.backlight);
}

#[tokio::test(start_paused = true)]
async fn exhausted_retries_degrade_without_stopping_the_loop() {
    let (transport, log) = ScriptedTransport::new(u32::MAX, true);
    let rig = rig(transport, climate());
    let tracker = rig.pipeline.tracker();

    let summary = rig
        .pipeline
        .run(tokio::time::sleep(Duration::from_secs(600)))
        .await;

    let log = log.lock().expect("log");
    assert_eq!(log.attempts.len(), 30);
    assert_close(log.attempts[29] - log.attempts[0], 464);
    assert!(!summary.publishing_enabled);
    assert_eq!(summary.published, 0);
    assert!(log.published.is_empty());
    assert!(summary.samples > 100);
    assert_eq!(summary.skipped, summary.samples);
    assert!(log.stopped >= 1);
    assert_eq!(log.disconnected, 0);
    assert_eq!(tracker.state(), ConnectionState::Failed);
    assert!(rig.surface.lock().expect("surface").frames() > 100);
}

#[tokio::test(start_paused = true)]
async fn missing_connack_disables_publishing_after_handshake_timeout() {
    let (transport, log) = ScriptedTransport::new(0, false);
    let rig = rig(transport, climate());

    let started = Instant::now();
    let summary = rig
        .pipeline
        .run(tokio::time::sleep(Duration::from_secs(45)))
        .await;

    let log = log.lock().expect("log");
    assert_eq!(log.attempts.len(), 1);
    assert!(!summary.publishing_enabled);
    assert!(log.published.is_empty());
    assert!(log.stopped >= 1);
    // 30 秒握手后才开始采样。
    assert!(summary.ticks <= 16);
    assert!(summary.ticks > 0);
    assert!(started.elapsed() >= Duration::from_secs(45));
}

#[tokio::test(start_paused = true)]
async fn sample_failure_abandons_only_that_tick() {
    let (transport, log) = ScriptedTransport::new(0, true);
    let flaky = FlakySensor {
        inner: SimulatedSensor::climate("564ac640bedb"),
        calls: 0,
    };
    let rig = rig(transport, Box::new(flaky));

    let summary = rig
        .pipeline
        .run(tokio::time::sleep(Duration::from_millis(9_500)))
        .await;

    assert_eq!(summary.ticks, 10);
    assert_eq!(summary.samples, 5);
    assert_eq!(summary.published, 5);
    assert_eq!(log.lock().expect("log").published.len(), 5);
}

#[tokio::test(start_paused = true)]
async fn shutdown_during_connect_still_cleans_up() {
    let (transport, log) = ScriptedTransport::new(u32::MAX, true);
    let rig = rig(transport, climate());

    let summary = rig
        .pipeline
        .run(tokio::time::sleep(Duration::from_secs(10)))
        .await;

    let log = log.lock().expect("log");
    assert_eq!(log.attempts.len(), 4);
    assert_eq!(summary.ticks, 0);
    assert!(!summary.publishing_enabled);
    assert_eq!(log.disconnected, 0);
    assert!(log.stopped >= 1);
    assert_cleared(&rig.surface, &rig.backlight);
}

#[tokio::test(start_paused = true)]
async fn shutdown_interrupts_a_publish_that_never_completes() {
    let disconnected = Arc::new(Mutex::new(0));
    let transport = StalledTransport {
        disconnected: Arc::clone(&disconnected),
    };
    let rig = rig(transport, climate());

    let started = Instant::now();
    let summary = tokio::time::timeout(
        Duration::from_secs(3600),
        rig.pipeline.run(tokio::time::sleep(Duration::from_secs(5))),
    )
    .await
    .expect("run must return once shutdown fires");

    assert!(started.elapsed() < Duration::from_secs(6));
    assert!(summary.publishing_enabled);
    assert_eq!(summary.ticks, 1);
    assert_eq!(summary.published, 0);
    assert_eq!(*disconnected.lock().expect("log"), 1);
    assert_cleared(&rig.surface, &rig.backlight);
}
