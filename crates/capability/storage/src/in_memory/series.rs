use crate::error::StorageError;
use crate::models::TimeSeriesPoint;
use crate::traits::{SeriesQuery, TimeSeriesSink};
use crate::validation::validate_point;
use std::sync::RwLock;

/// 时序点内存存储
#[derive(Default)]
pub struct InMemoryTimeSeriesStore {
    points: RwLock<Vec<TimeSeriesPoint>>,
}

impl InMemoryTimeSeriesStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 当前累计的点数（用于测试）
    pub fn len(&self) -> usize {
        self.points.read().map(|points| points.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 按写入顺序返回全部点。
    pub fn points(&self) -> Vec<TimeSeriesPoint> {
        self.points
            .read()
            .map(|points| points.clone())
            .unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl TimeSeriesSink for InMemoryTimeSeriesStore {
    async fn write_point(&self, point: &TimeSeriesPoint) -> Result<(), StorageError> {
        validate_point(point)?;
        let mut points = self.points.write().map_err(|_| StorageError::Lock)?;
        points.push(point.clone());
        Ok(())
    }

    async fn write_points(&self, points: &[TimeSeriesPoint]) -> Result<usize, StorageError> {
        for point in points {
            validate_point(point)?;
        }
        let mut store = self.points.write().map_err(|_| StorageError::Lock)?;
        store.extend(points.iter().cloned());
        Ok(points.len())
    }

    async fn query_points(
        &self,
        query: &SeriesQuery,
    ) -> Result<Vec<TimeSeriesPoint>, StorageError> {
        let points = self.points.read().map_err(|_| StorageError::Lock)?;
        let mut items: Vec<TimeSeriesPoint> = points
            .iter()
            .filter(|point| query.matches(point))
            .cloned()
            .collect();
        items.sort_by_key(|point| point.time);
        items.truncate(query.limit);
        Ok(items)
    }
}
