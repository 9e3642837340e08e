use super::{Sensor, read_number, rfc3339_now};
use crate::error::DeviceError;
use domain::SensorReading;
use std::path::{Path, PathBuf};

const TEMPERATURE_FILE: &str = "in_temp_input";
const PRESSURE_FILE: &str = "in_pressure_input";
const HUMIDITY_FILE: &str = "in_humidityrelative_input";

/// 通过 IIO sysfs 读取的温度/气压/湿度传感器。
///
/// 单位换算：温度 m°C → °C，气压 kPa → hPa，湿度 m%RH → %RH。
pub struct IioClimateSensor {
    id: String,
    dir: PathBuf,
}

impl IioClimateSensor {
    /// 打开设备目录，三个通道文件必须全部存在。
    pub fn open(id: impl Into<String>, dir: impl Into<PathBuf>) -> Result<Self, DeviceError> {
        let dir = dir.into();
        for file in [TEMPERATURE_FILE, PRESSURE_FILE, HUMIDITY_FILE] {
            if !dir.join(file).exists() {
                return Err(DeviceError::NotFound(dir.join(file).display().to_string()));
            }
        }
        Ok(Self { id: id.into(), dir })
    }

    fn channel(&self, file: &str) -> PathBuf {
        Path::new(&self.dir).join(file)
    }
}

impl Sensor for IioClimateSensor {
    fn id(&self) -> &str {
        &self.id
    }

    fn sample(&mut self) -> Result<SensorReading, DeviceError> {
        let temperature_c = read_number(&self.channel(TEMPERATURE_FILE))? / 1000.0;
        let pressure_hpa = read_number(&self.channel(PRESSURE_FILE))? * 10.0;
        let humidity_rh = read_number(&self.channel(HUMIDITY_FILE))? / 1000.0;
        Ok(SensorReading::climate(
            self.id.clone(),
            rfc3339_now(),
            temperature_c,
            pressure_hpa,
            humidity_rh,
        ))
    }
}
