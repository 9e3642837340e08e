//! 采集站与记录器的运行配置加载（环境变量 + 命令行覆盖）。

use std::env;
use std::path::PathBuf;

/// 配置加载错误。
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required env: {0}")]
    Missing(String),
    #[error("invalid value for {0}: {1}")]
    Invalid(String, String),
    #[error("{0}")]
    Usage(String),
}

/// MQTT 连接参数。
#[derive(Debug, Clone)]
pub struct MqttConfig {
    pub host: String,
    pub port: u16,
    pub keep_alive_seconds: u64,
    pub topic: String,
    /// 原始值；0/1 以外的值由传输层回落到 1 并告警。
    pub qos: u8,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl MqttConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            host: env::var("CLIM_MQTT_HOST").unwrap_or_else(|_| "test.mosquitto.org".to_string()),
            port: read_u16_with_default("CLIM_MQTT_PORT", 1883)?,
            keep_alive_seconds: read_u64_with_default("CLIM_MQTT_KEEP_ALIVE_SECONDS", 60)?,
            topic: env::var("CLIM_MQTT_TOPIC")
                .unwrap_or_else(|_| "47e0g1/headlesspi/climdata".to_string()),
            qos: read_u8_with_default("CLIM_MQTT_QOS", 1)?,
            username: read_optional("CLIM_MQTT_USERNAME"),
            password: read_optional("CLIM_MQTT_PASSWORD"),
        })
    }
}

/// 日志输出配置。
#[derive(Debug, Clone, Default)]
pub struct LogConfig {
    /// 记录全部（debug 级别）日志。
    pub debug: bool,
    /// 设置后日志写入该文件而不是 stdout。
    pub file: Option<PathBuf>,
}

impl LogConfig {
    fn from_env() -> Self {
        Self {
            debug: read_bool_with_default("CLIM_LOG_DEBUG", false),
            file: read_optional("CLIM_LOG_FILE").map(PathBuf::from),
        }
    }
}

/// 传感器后端。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorBackend {
    /// 内核 IIO + 1-Wire sysfs。
    Hardware,
    /// 无硬件时的模拟数据。
    Simulated,
}

/// 按键与背光的 GPIO 编号（BCM）。
#[derive(Debug, Clone)]
pub struct GpioConfig {
    pub sysfs_root: PathBuf,
    pub backlight: u32,
    pub backlight_button: u32,
    pub power_button: u32,
}

/// 采集站（发布端）配置。
#[derive(Debug, Clone)]
pub struct StationConfig {
    pub mqtt: MqttConfig,
    pub log: LogConfig,
    pub connect_retry_limit: u32,
    pub handshake_timeout_ms: u64,
    pub handshake_poll_ms: u64,
    pub sample_interval_ms: u64,
    pub sensor_backend: SensorBackend,
    pub climate_sensor_id: String,
    pub iio_device_dir: PathBuf,
    pub w1_devices_dir: PathBuf,
    pub gpio: GpioConfig,
    pub power_dry_run: bool,
    pub display_width: u32,
    pub display_height: u32,
}

impl StationConfig {
    /// 从环境变量读取配置。
    pub fn from_env() -> Result<Self, ConfigError> {
        let sensor_backend = match env::var("CLIM_SENSOR_BACKEND") {
            Ok(value) => parse_sensor_backend(&value)?,
            Err(_) => SensorBackend::Hardware,
        };
        let gpio = GpioConfig {
            sysfs_root: PathBuf::from(
                env::var("CLIM_GPIO_ROOT").unwrap_or_else(|_| "/sys/class/gpio".to_string()),
            ),
            backlight: read_u32_with_default("CLIM_GPIO_BACKLIGHT", 22)?,
            backlight_button: read_u32_with_default("CLIM_GPIO_BACKLIGHT_BUTTON", 24)?,
            power_button: read_u32_with_default("CLIM_GPIO_POWER_BUTTON", 23)?,
        };

        Ok(Self {
            mqtt: MqttConfig::from_env()?,
            log: LogConfig::from_env(),
            connect_retry_limit: read_u32_with_default("CLIM_CONNECT_RETRY_LIMIT", 30)?,
            handshake_timeout_ms: read_u64_with_default("CLIM_HANDSHAKE_TIMEOUT_MS", 30_000)?,
            handshake_poll_ms: read_u64_with_default("CLIM_HANDSHAKE_POLL_MS", 500)?,
            sample_interval_ms: read_u64_with_default("CLIM_SAMPLE_INTERVAL_MS", 1_000)?,
            sensor_backend,
            climate_sensor_id: env::var("CLIM_CLIMATE_SENSOR_ID")
                .unwrap_or_else(|_| "564ac640bedb".to_string()),
            iio_device_dir: PathBuf::from(
                env::var("CLIM_IIO_DEVICE_DIR")
                    .unwrap_or_else(|_| "/sys/bus/iio/devices/iio:device0".to_string()),
            ),
            w1_devices_dir: PathBuf::from(
                env::var("CLIM_W1_DEVICES_DIR").unwrap_or_else(|_| "/sys/bus/w1/devices".to_string()),
            ),
            gpio,
            power_dry_run: read_bool_with_default("CLIM_POWER_DRY_RUN", false),
            display_width: read_u32_with_default("CLIM_DISPLAY_WIDTH", 240)?,
            display_height: read_u32_with_default("CLIM_DISPLAY_HEIGHT", 240)?,
        })
    }

    /// 应用命令行覆盖（采集站只接受 `--debug`）。
    pub fn apply_cli(&mut self, overrides: CliOverrides) {
        if overrides.debug {
            self.log.debug = true;
        }
    }
}

/// 记录器（订阅端）配置。
#[derive(Debug, Clone)]
pub struct RecorderConfig {
    pub mqtt: MqttConfig,
    pub log: LogConfig,
    pub database_url: String,
    pub measurement_name: String,
    pub writer_queue: usize,
    pub write_max_retries: usize,
}

impl RecorderConfig {
    /// 从环境变量读取配置。
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = env::var("CLIM_DATABASE_URL")
            .map_err(|_| ConfigError::Missing("CLIM_DATABASE_URL".to_string()))?;
        Ok(Self {
            mqtt: MqttConfig::from_env()?,
            log: LogConfig::from_env(),
            database_url,
            measurement_name: env::var("CLIM_MEASUREMENT_NAME")
                .unwrap_or_else(|_| "climatemeasurements".to_string()),
            writer_queue: read_u64_with_default("CLIM_WRITER_QUEUE", 64)?.max(1) as usize,
            write_max_retries: read_u64_with_default("CLIM_WRITE_MAX_RETRIES", 3)? as usize,
        })
    }

    pub fn apply_cli(&mut self, overrides: CliOverrides) {
        if overrides.debug {
            self.log.debug = true;
        }
        if let Some(host) = overrides.host {
            self.mqtt.host = host;
        }
        if let Some(qos) = overrides.qos {
            self.mqtt.qos = qos;
        }
        if let Some(topic) = overrides.topic {
            self.mqtt.topic = topic;
        }
    }
}

/// 进程接受的命令行参数集合。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliSurface {
    /// 仅 `-d/--debug`。
    Station,
    /// `-d/--debug`、`-h/--host`、`-q/--qos`、`-t/--topic`。
    Recorder,
}

impl CliSurface {
    /// 用法说明。
    pub fn usage(&self, program: &str) -> String {
        match self {
            CliSurface::Station => format!("Usage: {} [-d | --debug]", program),
            CliSurface::Recorder => format!(
                "Usage: {} [-d | --debug] [-h | --host <host>] [-q | --qos <0|1>] [-t | --topic <topic>]",
                program
            ),
        }
    }
}

/// 命令行覆盖项。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliOverrides {
    pub debug: bool,
    pub host: Option<String>,
    pub qos: Option<u8>,
    pub topic: Option<String>,
}

/// 解析命令行参数（不含程序名）。
///
/// 支持 `--flag=value`、`--flag value`、`-f value` 三种写法。
pub fn parse_cli_args<I>(args: I, surface: CliSurface) -> Result<CliOverrides, ConfigError>
where
    I: IntoIterator<Item = String>,
{
    let mut overrides = CliOverrides::default();
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        let (flag, inline_value) = match arg.split_once('=') {
            Some((flag, value)) if flag.starts_with("--") => (flag.to_string(), Some(value.to_string())),
            _ => (arg.clone(), None),
        };
        match flag.as_str() {
            "-d" | "--debug" if inline_value.is_none() => overrides.debug = true,
            "-h" | "--host" if surface == CliSurface::Recorder => {
                overrides.host = Some(flag_value(&flag, inline_value, &mut args)?);
            }
            "-q" | "--qos" if surface == CliSurface::Recorder => {
                let value = flag_value(&flag, inline_value, &mut args)?;
                let qos = value
                    .parse::<u8>()
                    .map_err(|_| ConfigError::Usage(format!("invalid value for {}: {}", flag, value)))?;
                overrides.qos = Some(qos);
            }
            "-t" | "--topic" if surface == CliSurface::Recorder => {
                overrides.topic = Some(flag_value(&flag, inline_value, &mut args)?);
            }
            _ => return Err(ConfigError::Usage(format!("unrecognized option '{}'", arg))),
        }
    }
    Ok(overrides)
}

fn flag_value<I>(flag: &str, inline: Option<String>, rest: &mut I) -> Result<String, ConfigError>
where
    I: Iterator<Item = String>,
{
    let value = match inline {
        Some(value) => value,
        None => rest
            .next()
            .ok_or_else(|| ConfigError::Usage(format!("option {} requires an argument", flag)))?,
    };
    if value.is_empty() {
        return Err(ConfigError::Usage(format!("option {} requires an argument", flag)));
    }
    Ok(value)
}

fn parse_sensor_backend(value: &str) -> Result<SensorBackend, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "hardware" => Ok(SensorBackend::Hardware),
        "simulated" => Ok(SensorBackend::Simulated),
        _ => Err(ConfigError::Invalid(
            "CLIM_SENSOR_BACKEND".to_string(),
            value.to_string(),
        )),
    }
}

fn read_u16_with_default(key: &str, default: u16) -> Result<u16, ConfigError> {
    let value = match env::var(key) {
        Ok(value) => value,
        Err(_) => return Ok(default),
    };
    value
        .parse::<u16>()
        .map_err(|_| ConfigError::Invalid(key.to_string(), value))
}

fn read_u8_with_default(key: &str, default: u8) -> Result<u8, ConfigError> {
    let value = match env::var(key) {
        Ok(value) => value,
        Err(_) => return Ok(default),
    };
    value
        .parse::<u8>()
        .map_err(|_| ConfigError::Invalid(key.to_string(), value))
}

fn read_u32_with_default(key: &str, default: u32) -> Result<u32, ConfigError> {
    let value = match env::var(key) {
        Ok(value) => value,
        Err(_) => return Ok(default),
    };
    value
        .parse::<u32>()
        .map_err(|_| ConfigError::Invalid(key.to_string(), value))
}

fn read_u64_with_default(key: &str, default: u64) -> Result<u64, ConfigError> {
    let value = match env::var(key) {
        Ok(value) => value,
        Err(_) => return Ok(default),
    };
    value
        .parse::<u64>()
        .map_err(|_| ConfigError::Invalid(key.to_string(), value))
}

fn read_optional(key: &str) -> Option<String> {
    match env::var(key) {
        Ok(value) if !value.is_empty() => Some(value),
        _ => None,
    }
}

fn read_bool_with_default(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(value) => matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "on"),
        Err(_) => default,
    }
}
