//! 采集站设备能力：传感器、GPIO、背光、电源控制与显示。

pub mod display;
pub mod error;
pub mod gpio;
pub mod power;
pub mod sensor;

pub use display::{
    ALIVE_TICKER, DisplayRenderer, DisplaySurface, DrawOp, FontSize, HeadlessSurface,
    MISSING_VALUE, Point, Rect,
};
pub use error::DeviceError;
pub use gpio::{
    ActiveLowButton, Backlight, DigitalInput, DigitalOutput, IdleInput, NullOutput, PinDirection,
    SysfsPin,
};
pub use power::{DryRunPowerControl, PowerControl, ShellPowerControl};
pub use sensor::{
    IioClimateSensor, SamplePair, SampleSource, Sensor, SimulatedSensor, W1SlaveError,
    W1ThermProbe, parse_w1_slave, rfc3339_now,
};
