use crate::error::StorageError;
use crate::models::{PointFields, PointTags, TimeSeriesPoint};
use crate::traits::{SeriesQuery, TimeSeriesSink};
use crate::validation::validate_point;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use tracing::info;

const INSERT_POINT: &str = "insert into climate_measurements \
     (measurement, ts, sensor_id, location, temperature_c, pressure_hpa, humidity_rh) \
     values ($1, $2, $3, $4, $5, $6, $7)";

pub struct PgTimeSeriesStore {
    pub pool: PgPool,
}

impl PgTimeSeriesStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> Result<Self, StorageError> {
        let pool = crate::connection::connect_pool(database_url).await?;
        Ok(Self { pool })
    }

    /// 建表与索引（已存在时不做任何事）。
    pub async fn ensure_schema(&self) -> Result<(), StorageError> {
        sqlx::query(
            "create table if not exists climate_measurements ( \
                measurement text not null, \
                ts timestamptz not null, \
                sensor_id text not null, \
                location text not null, \
                temperature_c double precision not null, \
                pressure_hpa double precision, \
                humidity_rh double precision \
             )",
        )
        .execute(&self.pool)
        .await?;
        sqlx::query(
            "create index if not exists idx_climate_measurements_sensor_ts \
             on climate_measurements (measurement, sensor_id, ts)",
        )
        .execute(&self.pool)
        .await?;
        info!(target: "climlog.storage", "schema_ready");
        Ok(())
    }
}

#[async_trait::async_trait]
impl TimeSeriesSink for PgTimeSeriesStore {
    async fn write_point(&self, point: &TimeSeriesPoint) -> Result<(), StorageError> {
        validate_point(point)?;
        sqlx::query(INSERT_POINT)
            .bind(&point.measurement)
            .bind(point.time)
            .bind(&point.tags.sensor_id)
            .bind(&point.tags.location)
            .bind(point.fields.temperature_c)
            .bind(point.fields.pressure_hpa)
            .bind(point.fields.humidity_rh)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn write_points(&self, points: &[TimeSeriesPoint]) -> Result<usize, StorageError> {
        if points.is_empty() {
            return Ok(0);
        }
        for point in points {
            validate_point(point)?;
        }
        let mut tx = self.pool.begin().await?;
        for point in points {
            sqlx::query(INSERT_POINT)
                .bind(&point.measurement)
                .bind(point.time)
                .bind(&point.tags.sensor_id)
                .bind(&point.tags.location)
                .bind(point.fields.temperature_c)
                .bind(point.fields.pressure_hpa)
                .bind(point.fields.humidity_rh)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(points.len())
    }

    async fn query_points(
        &self,
        query: &SeriesQuery,
    ) -> Result<Vec<TimeSeriesPoint>, StorageError> {
        if query.limit == 0 {
            return Ok(Vec::new());
        }
        let rows = sqlx::query(
            "select measurement, ts, sensor_id, location, temperature_c, pressure_hpa, humidity_rh \
             from climate_measurements \
             where measurement = $1 \
             and ($2::text is null or sensor_id = $2) \
             and ($3::timestamptz is null or ts >= $3) \
             and ($4::timestamptz is null or ts <= $4) \
             order by ts asc \
             limit $5",
        )
        .bind(&query.measurement)
        .bind(query.sensor_id.as_deref())
        .bind(query.from)
        .bind(query.to)
        .bind(i64::try_from(query.limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;

        let mut items = Vec::with_capacity(rows.len());
        for row in rows {
            let time: DateTime<Utc> = row.try_get("ts")?;
            items.push(TimeSeriesPoint {
                measurement: row.try_get("measurement")?,
                time,
                tags: PointTags {
                    sensor_id: row.try_get("sensor_id")?,
                    location: row.try_get("location")?,
                },
                fields: PointFields {
                    temperature_c: row.try_get("temperature_c")?,
                    pressure_hpa: row.try_get("pressure_hpa")?,
                    humidity_rh: row.try_get("humidity_rh")?,
                },
            });
        }
        Ok(items)
    }
}
