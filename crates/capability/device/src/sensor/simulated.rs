use super::{Sensor, rfc3339_now};
use crate::error::DeviceError;
use domain::SensorReading;

/// 模拟传感器，数值围绕基准值做小幅周期摆动。
pub struct SimulatedSensor {
    id: String,
    base: SensorReading,
    tick: u64,
}

impl SimulatedSensor {
    /// 模拟多量传感器。
    pub fn climate(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            base: SensorReading::climate(id.clone(), "", 21.5, 1013.25, 45.0),
            id,
            tick: 0,
        }
    }

    /// 模拟单量探头。
    pub fn probe(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            base: SensorReading::temperature_only(id.clone(), "", 8.0),
            id,
            tick: 0,
        }
    }
}

impl Sensor for SimulatedSensor {
    fn id(&self) -> &str {
        &self.id
    }

    fn sample(&mut self) -> Result<SensorReading, DeviceError> {
        let offset = (self.tick % 20) as f64 * 0.05 - 0.5;
        self.tick = self.tick.wrapping_add(1);
        Ok(SensorReading {
            source_id: self.id.clone(),
            timestamp: rfc3339_now(),
            temperature_c: self.base.temperature_c + offset,
            pressure_hpa: self.base.pressure_hpa.map(|value| value + offset),
            humidity_rh: self.base.humidity_rh.map(|value| value - offset),
        })
    }
}
