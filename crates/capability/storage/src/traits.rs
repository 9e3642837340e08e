//! 存储接口

use crate::error::StorageError;
use crate::models::TimeSeriesPoint;
use chrono::{DateTime, Utc};

/// 查询条件。
#[derive(Debug, Clone)]
pub struct SeriesQuery {
    pub measurement: String,
    pub sensor_id: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub limit: usize,
}

impl SeriesQuery {
    pub fn new(measurement: impl Into<String>) -> Self {
        Self {
            measurement: measurement.into(),
            sensor_id: None,
            from: None,
            to: None,
            limit: 1000,
        }
    }

    pub fn sensor(mut self, sensor_id: impl Into<String>) -> Self {
        self.sensor_id = Some(sensor_id.into());
        self
    }

    pub fn between(mut self, from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        self.from = Some(from);
        self.to = Some(to);
        self
    }

    pub(crate) fn matches(&self, point: &TimeSeriesPoint) -> bool {
        point.measurement == self.measurement
            && self
                .sensor_id
                .as_ref()
                .is_none_or(|sensor_id| &point.tags.sensor_id == sensor_id)
            && self.from.is_none_or(|from| point.time >= from)
            && self.to.is_none_or(|to| point.time <= to)
    }
}

/// 时序存储接口。
#[async_trait::async_trait]
pub trait TimeSeriesSink: Send + Sync {
    async fn write_point(&self, point: &TimeSeriesPoint) -> Result<(), StorageError>;

    /// 批量写入，全部成功或全部失败。返回写入条数。
    async fn write_points(&self, points: &[TimeSeriesPoint]) -> Result<usize, StorageError>;

    /// 按时间升序查询。
    async fn query_points(&self, query: &SeriesQuery)
    -> Result<Vec<TimeSeriesPoint>, StorageError>;
}
