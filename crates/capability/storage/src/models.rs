//! 时序点模型

use chrono::{DateTime, Utc};

/// 默认 measurement 名称。
pub const DEFAULT_MEASUREMENT: &str = "climatemeasurements";

/// 时序点标签。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PointTags {
    pub sensor_id: String,
    /// 主题第一段。
    pub location: String,
}

/// 时序点字段。气压与湿度只有多量传感器才有。
#[derive(Debug, Clone, PartialEq)]
pub struct PointFields {
    pub temperature_c: f64,
    pub pressure_hpa: Option<f64>,
    pub humidity_rh: Option<f64>,
}

/// 一个传感器读数对应的时序点。
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeriesPoint {
    pub measurement: String,
    /// 读数自带的采样时间。
    pub time: DateTime<Utc>,
    pub tags: PointTags,
    pub fields: PointFields,
}
