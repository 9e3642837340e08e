//! 采集站与记录器之间的测量报文契约。
//!
//! 报文是一个 JSON 对象，顶层条目顺序固定为：
//!
//! 1. `bme280id`：多量传感器 ID
//! 2. `<多量传感器时间戳>`：该传感器的读数对象
//! 3. `ds18b2id`：单量传感器 ID
//! 4. `<单量传感器时间戳>`：该传感器的读数对象
//!
//! 记录器按位置而不是按键名读取条目，因此编码端必须严格保持该顺序，
//! 解码端也不能借助任何会重排键的中间结构（例如未开启 `preserve_order` 的
//! `serde_json::Map`）。

use domain::SensorReading;
use serde::de::{Deserializer, MapAccess, Visitor};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 多量传感器 ID 条目的键名。
pub const CLIMATE_SENSOR_KEY: &str = "bme280id";
/// 单量传感器 ID 条目的键名。
pub const PROBE_SENSOR_KEY: &str = "ds18b2id";

pub const UNIT_CELSIUS: &str = "C";
pub const UNIT_HECTOPASCAL: &str = "hPa";
pub const UNIT_RELATIVE_HUMIDITY: &str = "rH";

const CLIMATE_ID_POSITION: usize = 0;
const CLIMATE_READING_POSITION: usize = 1;
const PROBE_ID_POSITION: usize = 2;
const PROBE_READING_POSITION: usize = 3;

/// 编码错误。
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    #[error("non-finite value for {sensor_id}.{field}")]
    NonFinite { sensor_id: String, field: &'static str },
    #[error("serialize error: {0}")]
    Serialize(String),
}

/// 解码错误。
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("invalid json: {0}")]
    Json(String),
    #[error("missing entry at position {0}")]
    MissingEntry(usize),
    #[error("invalid entry at position {index}: {reason}")]
    InvalidEntry { index: usize, reason: String },
}

/// 一次采样周期的线上报文。
#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementMessage {
    pub climate: SensorReading,
    pub probe: SensorReading,
}

impl MeasurementMessage {
    pub fn new(climate: SensorReading, probe: SensorReading) -> Self {
        Self { climate, probe }
    }

    /// 序列化为 JSON 字节。非有限值直接拒绝，线上不出现 `null` 占位。
    pub fn encode(&self) -> Result<Vec<u8>, EncodeError> {
        ensure_finite(&self.climate)?;
        ensure_finite(&self.probe)?;
        serde_json::to_vec(self).map_err(|err| EncodeError::Serialize(err.to_string()))
    }

    /// 按位置解析报文。
    pub fn decode(payload: &[u8]) -> Result<Self, DecodeError> {
        let OrderedEntries(entries) =
            serde_json::from_slice(payload).map_err(|err| DecodeError::Json(err.to_string()))?;
        let climate = reading_at(&entries, CLIMATE_ID_POSITION, CLIMATE_READING_POSITION)?;
        let probe = reading_at(&entries, PROBE_ID_POSITION, PROBE_READING_POSITION)?;
        Ok(Self { climate, probe })
    }

    pub fn into_readings(self) -> [SensorReading; 2] {
        [self.climate, self.probe]
    }
}

impl Serialize for MeasurementMessage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(4))?;
        map.serialize_entry(CLIMATE_SENSOR_KEY, &self.climate.source_id)?;
        map.serialize_entry(&self.climate.timestamp, &ReadingRecord::from(&self.climate))?;
        map.serialize_entry(PROBE_SENSOR_KEY, &self.probe.source_id)?;
        map.serialize_entry(&self.probe.timestamp, &ReadingRecord::from(&self.probe))?;
        map.end()
    }
}

/// 单个物理量：数值 + 单位。
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Quantity {
    value: f64,
    #[serde(default)]
    unit: String,
}

impl Quantity {
    fn new(value: f64, unit: &str) -> Self {
        Self {
            value,
            unit: unit.to_string(),
        }
    }
}

/// 时间戳条目下的读数对象。缺失的物理量直接省略。
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ReadingRecord {
    temperature: Quantity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pressure: Option<Quantity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    humidity: Option<Quantity>,
}

impl From<&SensorReading> for ReadingRecord {
    fn from(reading: &SensorReading) -> Self {
        Self {
            temperature: Quantity::new(reading.temperature_c, UNIT_CELSIUS),
            pressure: reading
                .pressure_hpa
                .map(|value| Quantity::new(value, UNIT_HECTOPASCAL)),
            humidity: reading
                .humidity_rh
                .map(|value| Quantity::new(value, UNIT_RELATIVE_HUMIDITY)),
        }
    }
}

/// 保序的顶层条目列表（重复键也按出现顺序保留）。
struct OrderedEntries(Vec<(String, serde_json::Value)>);

impl<'de> Deserialize<'de> for OrderedEntries {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct EntriesVisitor;

        impl<'de> Visitor<'de> for EntriesVisitor {
            type Value = OrderedEntries;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a JSON object")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(4));
                while let Some((key, value)) = map.next_entry::<String, serde_json::Value>()? {
                    entries.push((key, value));
                }
                Ok(OrderedEntries(entries))
            }
        }

        deserializer.deserialize_map(EntriesVisitor)
    }
}

fn reading_at(
    entries: &[(String, serde_json::Value)],
    id_position: usize,
    reading_position: usize,
) -> Result<SensorReading, DecodeError> {
    let (_, id_value) = entries
        .get(id_position)
        .ok_or(DecodeError::MissingEntry(id_position))?;
    let (timestamp, reading_value) = entries
        .get(reading_position)
        .ok_or(DecodeError::MissingEntry(reading_position))?;

    let source_id = id_value
        .as_str()
        .ok_or_else(|| DecodeError::InvalidEntry {
            index: id_position,
            reason: "sensor id is not a string".to_string(),
        })?
        .to_string();
    let record: ReadingRecord =
        serde_json::from_value(reading_value.clone()).map_err(|err| DecodeError::InvalidEntry {
            index: reading_position,
            reason: err.to_string(),
        })?;

    Ok(SensorReading {
        source_id,
        timestamp: timestamp.clone(),
        temperature_c: record.temperature.value,
        pressure_hpa: record.pressure.map(|quantity| quantity.value),
        humidity_rh: record.humidity.map(|quantity| quantity.value),
    })
}

fn ensure_finite(reading: &SensorReading) -> Result<(), EncodeError> {
    let fields = [
        ("temperature", Some(reading.temperature_c)),
        ("pressure", reading.pressure_hpa),
        ("humidity", reading.humidity_rh),
    ];
    for (field, value) in fields {
        if let Some(value) = value {
            if !value.is_finite() {
                return Err(EncodeError::NonFinite {
                    sensor_id: reading.source_id.clone(),
                    field,
                });
            }
        }
    }
    Ok(())
}
