//! 记录器：订阅测量报文并写入时序存储。

mod ingest;

use climlog_config::{CliSurface, RecorderConfig, parse_cli_args};
use climlog_ingest::{Subscriber, SubscriberConfig};
use climlog_pipeline::{PersistConfig, PersistPipeline};
use climlog_storage::PgTimeSeriesStore;
use climlog_telemetry::{TracingOptions, init_tracing, metrics};
use climlog_transport::{MqttEndpoint, MqttSession, qos_from_u8};
use ingest::PersistHandler;
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 加载本地 .env（如存在）
    dotenvy::dotenv().ok();
    let mut config = RecorderConfig::from_env()?;

    let mut args = std::env::args();
    let program = args.next().unwrap_or_else(|| "climlog-recorder".to_string());
    match parse_cli_args(args, CliSurface::Recorder) {
        Ok(overrides) => config.apply_cli(overrides),
        Err(err) => {
            eprintln!("{err}");
            eprintln!("{}", CliSurface::Recorder.usage(&program));
            std::process::exit(1);
        }
    }

    init_tracing(TracingOptions {
        debug: config.log.debug,
        file: config.log.file.as_deref(),
    })?;
    let qos = qos_from_u8(config.mqtt.qos);
    info!(
        target: "climlog.recorder",
        host = %config.mqtt.host,
        port = config.mqtt.port,
        topic = %config.mqtt.topic,
        qos = qos.as_u8(),
        measurement = %config.measurement_name,
        "recorder_starting"
    );

    // 时序表按需创建
    let store = match PgTimeSeriesStore::connect(&config.database_url).await {
        Ok(store) => store,
        Err(err) => {
            error!(target: "climlog.recorder", error = %err, "storage_connect_failed");
            std::process::exit(1);
        }
    };
    if let Err(err) = store.ensure_schema().await {
        error!(target: "climlog.recorder", error = %err, "storage_schema_failed");
        std::process::exit(1);
    }

    let persist = PersistConfig {
        queue_capacity: config.writer_queue,
        max_retries: config.write_max_retries,
        ..PersistConfig::default()
    };
    let (queue, worker) = PersistPipeline::spawn(Arc::new(store), persist);
    let handler = Arc::new(PersistHandler::new(queue, config.measurement_name.clone()));

    let session = MqttSession::new(&MqttEndpoint {
        host: config.mqtt.host.clone(),
        port: config.mqtt.port,
        keep_alive_seconds: config.mqtt.keep_alive_seconds,
        username: config.mqtt.username.clone(),
        password: config.mqtt.password.clone(),
        client_prefix: "climlog-recorder".to_string(),
    });
    let subscriber = Subscriber::new(SubscriberConfig::new(config.mqtt.topic.clone(), qos));

    let result = subscriber
        .run(Box::new(session), handler.clone(), shutdown_signal())
        .await;

    // 丢弃所有入队端后写入任务才会排空退出
    drop(handler);
    let writer = worker.finish().await;

    match result {
        Ok(stats) => {
            info!(
                target: "climlog.recorder",
                connects = stats.connects,
                messages = stats.messages,
                handler_errors = stats.handler_errors,
                writer = ?writer,
                metrics = ?metrics().snapshot(),
                "recorder_stopped"
            );
            Ok(())
        }
        Err(err) => {
            error!(target: "climlog.recorder", error = %err, "recorder_failed");
            std::process::exit(1);
        }
    }
}

/// Ctrl-C 或 SIGTERM。
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(target: "climlog.recorder", error = %err, "ctrl_c_handler_failed");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!(target: "climlog.recorder", error = %err, "sigterm_handler_failed");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
