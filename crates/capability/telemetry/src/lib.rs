//! 日志初始化与进程级计数指标。

use std::fs::OpenOptions;
use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, OnceLock};
use tracing_subscriber::{EnvFilter, fmt};

/// 日志初始化参数。
#[derive(Debug, Clone, Default)]
pub struct TracingOptions<'a> {
    /// 无 `RUST_LOG` 时使用 debug 级别。
    pub debug: bool,
    /// 日志文件路径；为空时写 stdout。
    pub file: Option<&'a Path>,
}

/// 基础指标快照。
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsSnapshot {
    pub samples_taken: u64,
    pub sample_failures: u64,
    pub connect_attempts: u64,
    pub messages_published: u64,
    pub publish_failures: u64,
    pub publish_skipped: u64,
    pub messages_received: u64,
    pub decode_failures: u64,
    pub points_written: u64,
    pub write_failures: u64,
    pub backpressure: u64,
}

/// 基础指标。
pub struct TelemetryMetrics {
    samples_taken: AtomicU64,
    sample_failures: AtomicU64,
    connect_attempts: AtomicU64,
    messages_published: AtomicU64,
    publish_failures: AtomicU64,
    publish_skipped: AtomicU64,
    messages_received: AtomicU64,
    decode_failures: AtomicU64,
    points_written: AtomicU64,
    write_failures: AtomicU64,
    backpressure: AtomicU64,
}

impl TelemetryMetrics {
    pub fn new() -> Self {
        Self {
            samples_taken: AtomicU64::new(0),
            sample_failures: AtomicU64::new(0),
            connect_attempts: AtomicU64::new(0),
            messages_published: AtomicU64::new(0),
            publish_failures: AtomicU64::new(0),
            publish_skipped: AtomicU64::new(0),
            messages_received: AtomicU64::new(0),
            decode_failures: AtomicU64::new(0),
            points_written: AtomicU64::new(0),
            write_failures: AtomicU64::new(0),
            backpressure: AtomicU64::new(0),
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            samples_taken: self.samples_taken.load(Ordering::Relaxed),
            sample_failures: self.sample_failures.load(Ordering::Relaxed),
            connect_attempts: self.connect_attempts.load(Ordering::Relaxed),
            messages_published: self.messages_published.load(Ordering::Relaxed),
            publish_failures: self.publish_failures.load(Ordering::Relaxed),
            publish_skipped: self.publish_skipped.load(Ordering::Relaxed),
            messages_received: self.messages_received.load(Ordering::Relaxed),
            decode_failures: self.decode_failures.load(Ordering::Relaxed),
            points_written: self.points_written.load(Ordering::Relaxed),
            write_failures: self.write_failures.load(Ordering::Relaxed),
            backpressure: self.backpressure.load(Ordering::Relaxed),
        }
    }
}

impl Default for TelemetryMetrics {
    fn default() -> Self {
        Self::new()
    }
}

static METRICS: OnceLock<TelemetryMetrics> = OnceLock::new();

/// 获取全局指标实例。
pub fn metrics() -> &'static TelemetryMetrics {
    METRICS.get_or_init(TelemetryMetrics::new)
}

/// 初始化 tracing（默认 info，`RUST_LOG` 优先）。
///
/// 重复调用时保留第一次安装的订阅器。日志文件无法打开时返回错误，
/// 调用方按初始化失败处理。
pub fn init_tracing(options: TracingOptions<'_>) -> io::Result<()> {
    let default_level = if options.debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    match options.file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            let _ = fmt()
                .with_env_filter(filter)
                .with_thread_names(true)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init();
        }
        None => {
            let _ = fmt()
                .with_env_filter(filter)
                .with_thread_names(true)
                .try_init();
        }
    }
    Ok(())
}

/// 记录一次成功采样（两个传感器都返回）。
pub fn record_sample_taken() {
    metrics().samples_taken.fetch_add(1, Ordering::Relaxed);
}

/// 记录采样失败（整个周期被放弃）。
pub fn record_sample_failure() {
    metrics().sample_failures.fetch_add(1, Ordering::Relaxed);
}

/// 记录 broker 连接尝试次数。
pub fn record_connect_attempt() {
    metrics().connect_attempts.fetch_add(1, Ordering::Relaxed);
}

pub fn record_message_published() {
    metrics().messages_published.fetch_add(1, Ordering::Relaxed);
}

pub fn record_publish_failure() {
    metrics().publish_failures.fetch_add(1, Ordering::Relaxed);
}

/// 记录未连接或发布被禁用时跳过的发布。
pub fn record_publish_skipped() {
    metrics().publish_skipped.fetch_add(1, Ordering::Relaxed);
}

pub fn record_message_received() {
    metrics().messages_received.fetch_add(1, Ordering::Relaxed);
}

pub fn record_decode_failure() {
    metrics().decode_failures.fetch_add(1, Ordering::Relaxed);
}

/// 记录写入时序库的点数。
pub fn record_points_written(count: u64) {
    metrics().points_written.fetch_add(count, Ordering::Relaxed);
}

pub fn record_write_failure() {
    metrics().write_failures.fetch_add(1, Ordering::Relaxed);
}

/// 记录背压丢弃次数。
pub fn record_backpressure() {
    metrics().backpressure.fetch_add(1, Ordering::Relaxed);
}
