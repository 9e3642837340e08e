use crate::PipelineError;
use chrono::{DateTime, Utc};
use climlog_storage::{PointFields, PointTags, TimeSeriesPoint};
use message_contract::MeasurementMessage;

/// 主题的第一个非空段，作为 location 标签。
pub fn location_from_topic(topic: &str) -> &str {
    topic
        .split('/')
        .find(|segment| !segment.is_empty())
        .unwrap_or("")
}

/// 解析读数时间戳（RFC3339，任意时区，统一转为 UTC）。
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, PipelineError> {
    DateTime::parse_from_rfc3339(value)
        .map(|time| time.with_timezone(&Utc))
        .map_err(|_| PipelineError::Timestamp(value.to_string()))
}

/// 解码报文并拆成两个时序点（多量传感器在前）。
pub fn points_from_message(
    topic: &str,
    payload: &[u8],
    measurement: &str,
) -> Result<Vec<TimeSeriesPoint>, PipelineError> {
    let message = MeasurementMessage::decode(payload)?;
    let location = location_from_topic(topic);
    message
        .into_readings()
        .into_iter()
        .map(|reading| {
            Ok(TimeSeriesPoint {
                measurement: measurement.to_string(),
                time: parse_timestamp(&reading.timestamp)?,
                tags: PointTags {
                    sensor_id: reading.source_id,
                    location: location.to_string(),
                },
                fields: PointFields {
                    temperature_c: reading.temperature_c,
                    pressure_hpa: reading.pressure_hpa,
                    humidity_rh: reading.humidity_rh,
                },
            })
        })
        .collect()
}
