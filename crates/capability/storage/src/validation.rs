//! 写入前校验

use crate::error::StorageError;
use crate::models::TimeSeriesPoint;

/// 校验时序点：measurement 与 sensor_id 非空，所有字段为有限值。
pub fn validate_point(point: &TimeSeriesPoint) -> Result<(), StorageError> {
    if point.measurement.trim().is_empty() {
        return Err(StorageError::InvalidPoint("empty measurement".to_string()));
    }
    if point.tags.sensor_id.trim().is_empty() {
        return Err(StorageError::InvalidPoint("empty sensor_id".to_string()));
    }
    let fields = [
        ("temperature_c", Some(point.fields.temperature_c)),
        ("pressure_hpa", point.fields.pressure_hpa),
        ("humidity_rh", point.fields.humidity_rh),
    ];
    for (name, value) in fields {
        if value.is_some_and(|value| !value.is_finite()) {
            return Err(StorageError::InvalidPoint(format!(
                "non-finite {name} for {}",
                point.tags.sensor_id
            )));
        }
    }
    Ok(())
}
