use climlog_storage::TimeSeriesPoint;
use std::collections::{HashMap, VecDeque};

/// 同一传感器同一采样时间、同一数值的点视为重复（QoS 1 重投）。
#[derive(Debug, Clone, PartialEq, Eq)]
struct PointSignature {
    time_micros: i64,
    fields: [Option<u64>; 3],
}

impl PointSignature {
    fn of(point: &TimeSeriesPoint) -> Self {
        Self {
            time_micros: point.time.timestamp_micros(),
            fields: [
                Some(point.fields.temperature_c.to_bits()),
                point.fields.pressure_hpa.map(f64::to_bits),
                point.fields.humidity_rh.map(f64::to_bits),
            ],
        }
    }
}

/// 每个 (measurement, sensor) 只保留最近一次签名，按插入顺序淘汰。
pub(crate) struct DedupState {
    map: HashMap<String, (PointSignature, u64)>,
    order: VecDeque<(String, u64)>,
    counter: u64,
    capacity: usize,
}

impl DedupState {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            map: HashMap::new(),
            order: VecDeque::new(),
            counter: 0,
            capacity,
        }
    }

    /// 是否与该传感器最近一次写入的点完全相同。
    pub(crate) fn is_duplicate(&self, point: &TimeSeriesPoint) -> bool {
        if self.capacity == 0 {
            return false;
        }
        self.map
            .get(&dedup_key(point))
            .is_some_and(|(existing, _)| *existing == PointSignature::of(point))
    }

    /// 记录已写入的点。
    pub(crate) fn remember(&mut self, point: &TimeSeriesPoint) {
        if self.capacity == 0 {
            return;
        }
        let key = dedup_key(point);
        self.counter = self.counter.saturating_add(1);
        let token = self.counter;
        self.map.insert(key.clone(), (PointSignature::of(point), token));
        self.order.push_back((key, token));
        while self.map.len() > self.capacity {
            let Some((evict_key, evict_token)) = self.order.pop_front() else {
                break;
            };
            let current = self
                .map
                .get(&evict_key)
                .is_some_and(|(_, token)| *token == evict_token);
            if current {
                self.map.remove(&evict_key);
            }
        }
        if self.order.len() > self.capacity.saturating_mul(2) {
            let map = &self.map;
            self.order
                .retain(|(key, token)| map.get(key).is_some_and(|(_, current)| current == token));
        }
    }
}

fn dedup_key(point: &TimeSeriesPoint) -> String {
    format!("{}:{}", point.measurement, point.tags.sensor_id)
}
