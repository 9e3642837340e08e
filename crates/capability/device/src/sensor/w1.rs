use super::{Sensor, rfc3339_now};
use crate::error::DeviceError;
use domain::SensorReading;
use std::path::{Path, PathBuf};

/// DS18B20 的 1-Wire 家族前缀。
const FAMILY_PREFIX: &str = "28-";

/// 1-Wire 温度探头（`w1_slave` 接口）。
pub struct W1ThermProbe {
    id: String,
    slave_path: PathBuf,
}

impl W1ThermProbe {
    /// 在 1-Wire 设备目录下查找第一个 DS18B20。
    pub fn discover(devices_dir: impl AsRef<Path>) -> Result<Self, DeviceError> {
        let devices_dir = devices_dir.as_ref();
        let entries =
            std::fs::read_dir(devices_dir).map_err(|err| DeviceError::io(devices_dir, err))?;
        let mut candidates: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.file_name()
                    .and_then(|name| name.to_str())
                    .is_some_and(|name| name.starts_with(FAMILY_PREFIX))
            })
            .collect();
        candidates.sort();
        let device_dir = candidates.into_iter().next().ok_or_else(|| {
            DeviceError::NotFound(format!("no {}* device in {}", FAMILY_PREFIX, devices_dir.display()))
        })?;
        Self::open(device_dir)
    }

    /// 打开指定设备目录；探头 ID 为去掉家族前缀的设备名。
    pub fn open(device_dir: impl AsRef<Path>) -> Result<Self, DeviceError> {
        let device_dir = device_dir.as_ref();
        let name = device_dir
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| DeviceError::NotFound(device_dir.display().to_string()))?;
        let id = name.strip_prefix(FAMILY_PREFIX).unwrap_or(name).to_string();
        let slave_path = device_dir.join("w1_slave");
        if !slave_path.exists() {
            return Err(DeviceError::NotFound(slave_path.display().to_string()));
        }
        Ok(Self { id, slave_path })
    }
}

impl Sensor for W1ThermProbe {
    fn id(&self) -> &str {
        &self.id
    }

    fn sample(&mut self) -> Result<SensorReading, DeviceError> {
        let content = std::fs::read_to_string(&self.slave_path)
            .map_err(|err| DeviceError::io(&self.slave_path, err))?;
        let temperature_c = parse_w1_slave(&content).map_err(|err| match err {
            W1SlaveError::Crc => DeviceError::Crc(self.slave_path.clone()),
            W1SlaveError::Malformed => DeviceError::Parse {
                path: self.slave_path.clone(),
                value: content.trim().to_string(),
            },
        })?;
        Ok(SensorReading::temperature_only(
            self.id.clone(),
            rfc3339_now(),
            temperature_c,
        ))
    }
}

/// `w1_slave` 内容解析失败的原因。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum W1SlaveError {
    Crc,
    Malformed,
}

/// 解析 `w1_slave`：第一行以 `YES` 结尾表示 CRC 通过，第二行 `t=` 为千分之一摄氏度。
///
/// ```text
/// 72 01 4b 46 7f ff 0e 10 57 : crc=57 YES
/// 72 01 4b 46 7f ff 0e 10 57 t=23125
/// ```
pub fn parse_w1_slave(content: &str) -> Result<f64, W1SlaveError> {
    let mut lines = content.lines();
    let crc_line = lines.next().ok_or(W1SlaveError::Malformed)?;
    if !crc_line.trim_end().ends_with("YES") {
        return Err(W1SlaveError::Crc);
    }
    let data_line = lines.next().ok_or(W1SlaveError::Malformed)?;
    let (_, raw) = data_line.rsplit_once("t=").ok_or(W1SlaveError::Malformed)?;
    let millidegrees = raw
        .trim()
        .parse::<i64>()
        .map_err(|_| W1SlaveError::Malformed)?;
    Ok(millidegrees as f64 / 1000.0)
}
