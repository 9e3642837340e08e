//! 采集站与记录器共享的领域模型。

pub mod data;

pub use data::{
    ButtonEvent, ButtonState, Color, ConnectionState, DisplaySnapshot, SensorReading,
};
