use async_trait::async_trait;
use climlog_pipeline::{
    PersistConfig, PersistPipeline, PipelineError, WriterStats, points_from_message,
};
use climlog_storage::{
    InMemoryTimeSeriesStore, SeriesQuery, StorageError, TimeSeriesPoint, TimeSeriesSink,
};
use domain::SensorReading;
use message_contract::MeasurementMessage;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::{Notify, Semaphore};

const MEASUREMENT: &str = "climatemeasurements";

fn payload(climate_ts: &str, probe_ts: &str, outdoor: f64) -> Vec<u8> {
    MeasurementMessage::new(
        SensorReading::climate("564ac640bedb", climate_ts, 21.7, 1013.0, 45.0),
        SensorReading::temperature_only("0316a2795fff", probe_ts, outdoor),
    )
    .encode()
    .expect("encode")
}

fn points(seconds: u32) -> Vec<TimeSeriesPoint> {
    let ts = format!("2021-03-17T10:00:{seconds:02}.000000Z");
    points_from_message("47e0g1/headlesspi/climdata", &payload(&ts, &ts, 19.3), MEASUREMENT)
        .expect("points")
}

fn config() -> PersistConfig {
    PersistConfig {
        queue_capacity: 8,
        max_retries: 2,
        retry_backoff: Duration::ZERO,
        dedup_cache_size: 16,
    }
}

#[test]
fn message_becomes_one_point_per_sensor() {
    let items = points_from_message(
        "47e0g1/headlesspi/climdata",
        &payload("2021-03-17T10:00:00.123456Z", "2021-03-17T10:00:00.654321Z", 19.3),
        MEASUREMENT,
    )
    .expect("points");

    assert_eq!(items.len(), 2);
    let climate = &items[0];
    assert_eq!(climate.measurement, MEASUREMENT);
    assert_eq!(climate.tags.sensor_id, "564ac640bedb");
    assert_eq!(climate.tags.location, "47e0g1");
    assert_eq!(climate.fields.temperature_c, 21.7);
    assert_eq!(climate.fields.pressure_hpa, Some(1013.0));
    assert_eq!(climate.fields.humidity_rh, Some(45.0));
    assert_eq!(climate.time.timestamp_subsec_micros(), 123456);

    let probe = &items[1];
    assert_eq!(probe.tags.sensor_id, "0316a2795fff");
    assert_eq!(probe.fields.temperature_c, 19.3);
    assert!(probe.fields.pressure_hpa.is_none());
    assert_eq!(probe.time.timestamp_subsec_micros(), 654321);
}

#[test]
fn malformed_payload_is_a_decode_error() {
    let err = points_from_message("a/b", br#"{"bme280id":"x"}"#, MEASUREMENT)
        .expect_err("malformed");
    assert!(matches!(err, PipelineError::Decode(_)));
}

#[test]
fn non_rfc3339_key_is_a_timestamp_error() {
    let raw = payload("2021-03-17 10:00:00", "2021-03-17T10:00:00Z", 1.0);
    let err = points_from_message("a/b", &raw, MEASUREMENT).expect_err("timestamp");
    assert!(matches!(err, PipelineError::Timestamp(_)));
}

#[tokio::test]
async fn writer_drains_queue_before_finishing() {
    let store = Arc::new(InMemoryTimeSeriesStore::new());
    let (queue, worker) = PersistPipeline::spawn(store.clone(), config());

    for second in 0..3 {
        queue.submit(points(second)).expect("submit");
    }
    drop(queue);
    let stats = worker.finish().await.expect("finish");

    assert_eq!(
        stats,
        WriterStats {
            batches: 3,
            points_written: 6,
            duplicates_skipped: 0,
            failed_batches: 0,
        }
    );
    let indoor = store
        .query_points(&SeriesQuery::new(MEASUREMENT).sensor("564ac640bedb"))
        .await
        .expect("query");
    assert_eq!(indoor.len(), 3);
}

#[tokio::test]
async fn redelivered_message_is_written_once() {
    let store = Arc::new(InMemoryTimeSeriesStore::new());
    let (queue, worker) = PersistPipeline::spawn(store.clone(), config());

    queue.submit(points(1)).expect("submit");
    queue.submit(points(1)).expect("submit");
    drop(queue);
    let stats = worker.finish().await.expect("finish");

    assert_eq!(stats.points_written, 2);
    assert_eq!(stats.duplicates_skipped, 2);
    assert_eq!(store.len(), 2);
}

/// 前 `failures` 次写入失败。
struct FlakySink {
    failures: usize,
    calls: AtomicUsize,
    inner: InMemoryTimeSeriesStore,
}

#[async_trait]
impl TimeSeriesSink for FlakySink {
    async fn write_point(&self, point: &TimeSeriesPoint) -> Result<(), StorageError> {
        self.write_points(std::slice::from_ref(point)).await.map(|_| ())
    }

    async fn write_points(&self, points: &[TimeSeriesPoint]) -> Result<usize, StorageError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.failures {
            return Err(StorageError::InvalidPoint("database unavailable".to_string()));
        }
        self.inner.write_points(points).await
    }

    async fn query_points(
        &self,
        query: &SeriesQuery,
    ) -> Result<Vec<TimeSeriesPoint>, StorageError> {
        self.inner.query_points(query).await
    }
}

#[tokio::test]
async fn transient_write_failures_are_retried() {
    let sink = Arc::new(FlakySink {
        failures: 2,
        calls: AtomicUsize::new(0),
        inner: InMemoryTimeSeriesStore::new(),
    });
    let (queue, worker) = PersistPipeline::spawn(sink.clone(), config());

    queue.submit(points(0)).expect("submit");
    drop(queue);
    let stats = worker.finish().await.expect("finish");

    assert_eq!(stats.points_written, 2);
    assert_eq!(stats.failed_batches, 0);
    assert_eq!(sink.calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn exhausted_retries_drop_batch_and_continue() {
    let sink = Arc::new(FlakySink {
        failures: 3,
        calls: AtomicUsize::new(0),
        inner: InMemoryTimeSeriesStore::new(),
    });
    let (queue, worker) = PersistPipeline::spawn(sink.clone(), config());

    queue.submit(points(0)).expect("submit");
    queue.submit(points(1)).expect("submit");
    drop(queue);
    let stats = worker.finish().await.expect("finish");

    assert_eq!(stats.failed_batches, 1);
    assert_eq!(stats.batches, 1);
    assert_eq!(sink.inner.len(), 2);
}

/// 每次写入先通知 `started`，再等待一个放行许可。
struct GatedSink {
    started: Notify,
    gate: Semaphore,
    inner: InMemoryTimeSeriesStore,
}

#[async_trait]
impl TimeSeriesSink for GatedSink {
    async fn write_point(&self, point: &TimeSeriesPoint) -> Result<(), StorageError> {
        self.write_points(std::slice::from_ref(point)).await.map(|_| ())
    }

    async fn write_points(&self, points: &[TimeSeriesPoint]) -> Result<usize, StorageError> {
        self.started.notify_one();
        let permit = self.gate.acquire().await.map_err(|_| StorageError::Lock)?;
        permit.forget();
        self.inner.write_points(points).await
    }

    async fn query_points(
        &self,
        query: &SeriesQuery,
    ) -> Result<Vec<TimeSeriesPoint>, StorageError> {
        self.inner.query_points(query).await
    }
}

#[tokio::test]
async fn full_queue_reports_backpressure() {
    let sink = Arc::new(GatedSink {
        started: Notify::new(),
        gate: Semaphore::new(0),
        inner: InMemoryTimeSeriesStore::new(),
    });
    let (queue, worker) = PersistPipeline::spawn(
        sink.clone(),
        PersistConfig {
            queue_capacity: 1,
            ..config()
        },
    );

    queue.submit(points(0)).expect("submit");
    sink.started.notified().await;
    queue.submit(points(1)).expect("queued");
    let err = queue.submit(points(2)).expect_err("full");
    assert!(matches!(err, PipelineError::Backpressure(_)));

    sink.gate.add_permits(2);
    drop(queue);
    let stats = worker.finish().await.expect("finish");
    assert_eq!(stats.points_written, 4);
}
