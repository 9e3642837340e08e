//! # 传感器能力
//!
//! 每个传感器只暴露一个阻塞的“立即采样”调用。寄存器访问与校准由
//! 内核驱动完成，这里只读取驱动导出的 sysfs 数值：
//!
//! - [`IioClimateSensor`]：温度/气压/湿度（IIO 子系统，BME280 等）
//! - [`W1ThermProbe`]：1-Wire 温度探头（DS18B20）
//! - [`SimulatedSensor`]：无硬件时的模拟数据

mod iio;
mod simulated;
mod w1;

pub use iio::IioClimateSensor;
pub use simulated::SimulatedSensor;
pub use w1::{W1SlaveError, W1ThermProbe, parse_w1_slave};

use crate::error::DeviceError;
use chrono::{SecondsFormat, Utc};
use domain::SensorReading;
use tracing::debug;

/// 单个传感器的采样能力。
pub trait Sensor: Send {
    fn id(&self) -> &str;

    /// 阻塞采样一次。
    fn sample(&mut self) -> Result<SensorReading, DeviceError>;
}

/// 一个采样周期内两个传感器的读数。
#[derive(Debug, Clone, PartialEq)]
pub struct SamplePair {
    /// 多量传感器（室内）。
    pub indoor: SensorReading,
    /// 单量探头（室外）。
    pub outdoor: SensorReading,
}

/// 组合两个传感器，每次调用产生一对读数。
pub struct SampleSource {
    climate: Box<dyn Sensor>,
    probe: Box<dyn Sensor>,
}

impl SampleSource {
    pub fn new(climate: Box<dyn Sensor>, probe: Box<dyn Sensor>) -> Self {
        Self { climate, probe }
    }

    /// 依次采样多量传感器与探头；任一失败则整个周期失败。
    pub fn sample(&mut self) -> Result<SamplePair, DeviceError> {
        let indoor = self.climate.sample()?;
        debug!(
            target: "climlog.sensor",
            sensor_id = %indoor.source_id,
            timestamp = %indoor.timestamp,
            temperature_c = indoor.temperature_c,
            pressure_hpa = ?indoor.pressure_hpa,
            humidity_rh = ?indoor.humidity_rh,
            "climate_sampled"
        );
        let outdoor = self.probe.sample()?;
        debug!(
            target: "climlog.sensor",
            sensor_id = %outdoor.source_id,
            timestamp = %outdoor.timestamp,
            temperature_c = outdoor.temperature_c,
            "probe_sampled"
        );
        Ok(SamplePair { indoor, outdoor })
    }
}

/// 当前 UTC 时间的 RFC3339 字符串（微秒精度，`Z` 后缀）。
pub fn rfc3339_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn read_trimmed(path: &std::path::Path) -> Result<String, DeviceError> {
    std::fs::read_to_string(path)
        .map(|content| content.trim().to_string())
        .map_err(|err| DeviceError::io(path, err))
}

pub(crate) fn read_number(path: &std::path::Path) -> Result<f64, DeviceError> {
    let value = read_trimmed(path)?;
    value.parse::<f64>().map_err(|_| DeviceError::Parse {
        path: path.to_path_buf(),
        value,
    })
}
