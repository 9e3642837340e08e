use async_trait::async_trait;
use climlog_ingest::{
    InboundMessage, IngestError, MessageHandler, Subscriber, SubscriberConfig,
};
use climlog_transport::{QosLevel, SubscriberSession, TransportError, TransportEvent};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Default)]
struct SessionLog {
    subscriptions: Vec<(String, QosLevel)>,
    disconnects: usize,
}

/// 按脚本返回事件；脚本耗尽后一直挂起。
struct ScriptedSession {
    script: VecDeque<Result<TransportEvent, TransportError>>,
    log: Arc<Mutex<SessionLog>>,
}

impl ScriptedSession {
    fn new(
        script: Vec<Result<TransportEvent, TransportError>>,
    ) -> (Box<dyn SubscriberSession>, Arc<Mutex<SessionLog>>) {
        let log = Arc::new(Mutex::new(SessionLog::default()));
        (
            Box::new(Self {
                script: script.into(),
                log: Arc::clone(&log),
            }),
            log,
        )
    }
}

#[async_trait]
impl SubscriberSession for ScriptedSession {
    async fn next_event(&mut self) -> Result<TransportEvent, TransportError> {
        match self.script.pop_front() {
            Some(event) => event,
            None => std::future::pending().await,
        }
    }

    async fn subscribe(&mut self, topic: &str, qos: QosLevel) -> Result<(), TransportError> {
        self.log
            .lock()
            .expect("log")
            .subscriptions
            .push((topic.to_string(), qos));
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), TransportError> {
        self.log.lock().expect("log").disconnects += 1;
        Ok(())
    }
}

#[derive(Default)]
struct RecordingHandler {
    messages: Mutex<Vec<InboundMessage>>,
}

#[async_trait]
impl MessageHandler for RecordingHandler {
    async fn handle(&self, message: InboundMessage) -> Result<(), IngestError> {
        let reject = message.payload.is_empty();
        self.messages.lock().expect("messages").push(message);
        if reject {
            return Err(IngestError::Handler("empty payload".to_string()));
        }
        Ok(())
    }
}

fn connected() -> Result<TransportEvent, TransportError> {
    Ok(TransportEvent::Connected {
        session_present: false,
    })
}

fn message(payload: &[u8]) -> Result<TransportEvent, TransportError> {
    Ok(TransportEvent::Message {
        topic: "47e0g1/headlesspi/climdata".to_string(),
        payload: payload.to_vec(),
        qos: 1,
        retain: false,
    })
}

fn subscriber() -> Subscriber {
    Subscriber::new(SubscriberConfig::new(
        "47e0g1/headlesspi/climdata",
        QosLevel::AtLeastOnce,
    ))
}

#[tokio::test(start_paused = true)]
async fn resubscribes_after_every_connack() {
    let (session, log) = ScriptedSession::new(vec![
        connected(),
        message(b"one"),
        Ok(TransportEvent::Disconnected { unexpected: true }),
        Err(TransportError::Connection("connection reset".to_string())),
        connected(),
        message(b"two"),
    ]);
    let handler = Arc::new(RecordingHandler::default());

    let stats = subscriber()
        .run(
            session,
            handler.clone(),
            tokio::time::sleep(Duration::from_secs(10)),
        )
        .await
        .expect("run");

    let log = log.lock().expect("log");
    assert_eq!(log.subscriptions.len(), 2);
    assert!(
        log.subscriptions
            .iter()
            .all(|(topic, qos)| topic == "47e0g1/headlesspi/climdata"
                && *qos == QosLevel::AtLeastOnce)
    );
    assert_eq!(log.disconnects, 1);
    assert_eq!(stats.connects, 2);
    assert_eq!(stats.messages, 2);
    assert_eq!(handler.messages.lock().expect("messages").len(), 2);
}

#[tokio::test(start_paused = true)]
async fn initial_connect_failure_is_fatal() {
    let (session, log) = ScriptedSession::new(vec![Err(TransportError::Connection(
        "dns failure".to_string(),
    ))]);

    let err = subscriber()
        .run(
            session,
            Arc::new(RecordingHandler::default()),
            std::future::pending::<()>(),
        )
        .await
        .expect_err("fatal");

    assert!(matches!(err, IngestError::Connect(_)));
    assert!(log.lock().expect("log").subscriptions.is_empty());
}

#[tokio::test(start_paused = true)]
async fn handler_errors_do_not_stop_the_loop() {
    let (session, _log) =
        ScriptedSession::new(vec![connected(), message(b""), message(b"ok")]);
    let handler = Arc::new(RecordingHandler::default());

    let stats = subscriber()
        .run(
            session,
            handler.clone(),
            tokio::time::sleep(Duration::from_secs(1)),
        )
        .await
        .expect("run");

    assert_eq!(stats.messages, 2);
    assert_eq!(stats.handler_errors, 1);
}

#[tokio::test(start_paused = true)]
async fn shutdown_cuts_the_reconnect_pause_short() {
    let (session, log) = ScriptedSession::new(vec![
        connected(),
        Err(TransportError::Connection("broker unreachable".to_string())),
    ]);
    let mut config = SubscriberConfig::new("47e0g1/headlesspi/climdata", QosLevel::AtLeastOnce);
    config.reconnect_pause = Duration::from_secs(3600);

    let started = tokio::time::Instant::now();
    let stats = tokio::time::timeout(
        Duration::from_secs(60),
        Subscriber::new(config).run(
            session,
            Arc::new(RecordingHandler::default()),
            tokio::time::sleep(Duration::from_secs(1)),
        ),
    )
    .await
    .expect("shutdown must not wait for the reconnect pause")
    .expect("run");

    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(stats.connects, 1);
    assert_eq!(log.lock().expect("log").disconnects, 1);
}
