//! 采集站：采样、显示、按钮监视与 MQTT 发布。

mod hardware;

use climlog_buttons::ButtonMonitor;
use climlog_config::{CliSurface, StationConfig, parse_cli_args};
use climlog_device::{Backlight, HeadlessSurface};
use climlog_publish::{HandshakePolicy, PublishPipeline, PublishSettings, RetryPolicy};
use climlog_telemetry::{TracingOptions, init_tracing, metrics};
use climlog_transport::{MqttEndpoint, MqttTransport, qos_from_u8};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 加载本地 .env（如存在）
    dotenvy::dotenv().ok();
    let mut config = StationConfig::from_env()?;

    let mut args = std::env::args();
    let program = args.next().unwrap_or_else(|| "climlog-station".to_string());
    match parse_cli_args(args, CliSurface::Station) {
        Ok(overrides) => config.apply_cli(overrides),
        Err(err) => {
            eprintln!("{err}");
            eprintln!("{}", CliSurface::Station.usage(&program));
            std::process::exit(1);
        }
    }

    init_tracing(TracingOptions {
        debug: config.log.debug,
        file: config.log.file.as_deref(),
    })?;
    info!(
        target: "climlog.station",
        host = %config.mqtt.host,
        port = config.mqtt.port,
        topic = %config.mqtt.topic,
        backend = ?config.sensor_backend,
        "station_starting"
    );

    let source = match hardware::open_sensors(&config) {
        Ok(source) => source,
        Err(err) => {
            error!(target: "climlog.station", error = %err, "sensor_init_failed");
            std::process::exit(1);
        }
    };
    let gpio = match hardware::open_gpio(&config) {
        Ok(gpio) => gpio,
        Err(err) => {
            error!(target: "climlog.station", error = %err, "gpio_init_failed");
            std::process::exit(1);
        }
    };

    // 启动时点亮背光，之后由按钮线程翻转
    let backlight = Arc::new(Backlight::new(gpio.backlight));
    backlight.toggle()?;

    let monitor = ButtonMonitor::new(
        gpio.backlight_button,
        gpio.power_button,
        Arc::clone(&backlight),
        hardware::power_control(&config),
    )
    .spawn()?;

    let qos = qos_from_u8(config.mqtt.qos);
    let mut settings = PublishSettings::new(config.mqtt.topic.clone(), qos);
    settings.retry = RetryPolicy {
        max_attempts: config.connect_retry_limit.max(1),
        ..RetryPolicy::default()
    };
    settings.handshake = HandshakePolicy {
        timeout: Duration::from_millis(config.handshake_timeout_ms),
        poll_interval: Duration::from_millis(config.handshake_poll_ms.max(1)),
    };
    settings.sample_interval = Duration::from_millis(config.sample_interval_ms.max(1));

    let transport = MqttTransport::new(MqttEndpoint {
        host: config.mqtt.host.clone(),
        port: config.mqtt.port,
        keep_alive_seconds: config.mqtt.keep_alive_seconds,
        username: config.mqtt.username.clone(),
        password: config.mqtt.password.clone(),
        client_prefix: "climlog-station".to_string(),
    });
    let surface = HeadlessSurface::new(config.display_width, config.display_height);

    let pipeline = PublishPipeline::new(
        settings,
        Box::new(transport),
        source,
        Box::new(surface),
        backlight,
    )
    .with_button_monitor(monitor);

    let summary = pipeline.run(shutdown_signal()).await;
    info!(
        target: "climlog.station",
        connect_attempts = summary.connect_attempts,
        publishing_enabled = summary.publishing_enabled,
        ticks = summary.ticks,
        samples = summary.samples,
        published = summary.published,
        skipped = summary.skipped,
        metrics = ?metrics().snapshot(),
        "station_stopped"
    );
    Ok(())
}

/// Ctrl-C 或 SIGTERM。
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(target: "climlog.station", error = %err, "ctrl_c_handler_failed");
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
                error!(target: "climlog.station", error = %err, "sigterm_handler_failed");
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
