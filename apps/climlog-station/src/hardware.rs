//! 采集站硬件装配：按配置选择真实设备或模拟设备。

use climlog_config::{SensorBackend, StationConfig};
use climlog_device::{
    ActiveLowButton, DeviceError, DigitalInput, DigitalOutput, DryRunPowerControl, IdleInput,
    IioClimateSensor, NullOutput, PinDirection, PowerControl, SampleSource, ShellPowerControl,
    SimulatedSensor, SysfsPin, W1ThermProbe,
};
use std::sync::Arc;
use tracing::info;

const SIMULATED_PROBE_ID: &str = "0316a2795fff";

/// 背光输出与两个按钮输入。
pub struct GpioSet {
    pub backlight: Box<dyn DigitalOutput>,
    pub backlight_button: Box<dyn DigitalInput>,
    pub power_button: Box<dyn DigitalInput>,
}

/// 打开两个传感器。任一传感器不可用都视为初始化失败。
pub fn open_sensors(config: &StationConfig) -> Result<SampleSource, DeviceError> {
    match config.sensor_backend {
        SensorBackend::Hardware => {
            let climate =
                IioClimateSensor::open(config.climate_sensor_id.clone(), &config.iio_device_dir)?;
            let probe = W1ThermProbe::discover(&config.w1_devices_dir)?;
            info!(
                target: "climlog.station",
                iio = %config.iio_device_dir.display(),
                w1 = %config.w1_devices_dir.display(),
                "sensors_opened"
            );
            Ok(SampleSource::new(Box::new(climate), Box::new(probe)))
        }
        SensorBackend::Simulated => {
            info!(target: "climlog.station", "sensors_simulated");
            Ok(SampleSource::new(
                Box::new(SimulatedSensor::climate(config.climate_sensor_id.clone())),
                Box::new(SimulatedSensor::probe(SIMULATED_PROBE_ID)),
            ))
        }
    }
}

/// 打开背光与按钮引脚；模拟后端不访问 sysfs。
pub fn open_gpio(config: &StationConfig) -> Result<GpioSet, DeviceError> {
    match config.sensor_backend {
        SensorBackend::Hardware => {
            let root = config.gpio.sysfs_root.as_path();
            Ok(GpioSet {
                backlight: Box::new(SysfsPin::open(root, config.gpio.backlight, PinDirection::Out)?),
                backlight_button: Box::new(ActiveLowButton::open(
                    root,
                    config.gpio.backlight_button,
                )?),
                power_button: Box::new(ActiveLowButton::open(root, config.gpio.power_button)?),
            })
        }
        SensorBackend::Simulated => Ok(GpioSet {
            backlight: Box::new(NullOutput::default()),
            backlight_button: Box::new(IdleInput),
            power_button: Box::new(IdleInput),
        }),
    }
}

pub fn power_control(config: &StationConfig) -> Arc<dyn PowerControl> {
    if config.power_dry_run {
        Arc::new(DryRunPowerControl)
    } else {
        Arc::new(ShellPowerControl)
    }
}
