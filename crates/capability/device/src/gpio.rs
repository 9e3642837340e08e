//! # GPIO 能力
//!
//! 通过 `/sys/class/gpio` 访问按钮输入与背光输出。按钮为低电平有效
//! （上拉，按下接地）。

use crate::error::DeviceError;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, warn};

/// 数字输入（按钮）。
pub trait DigitalInput: Send {
    /// 当前是否处于按下状态。
    fn is_pressed(&mut self) -> Result<bool, DeviceError>;
}

/// 数字输出（背光）。
pub trait DigitalOutput: Send {
    fn write(&mut self, high: bool) -> Result<(), DeviceError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinDirection {
    In,
    Out,
}

impl PinDirection {
    fn as_str(&self) -> &'static str {
        match self {
            PinDirection::In => "in",
            PinDirection::Out => "out",
        }
    }
}

/// sysfs GPIO 引脚（BCM 编号）。
#[derive(Debug)]
pub struct SysfsPin {
    value_path: PathBuf,
}

impl SysfsPin {
    /// 导出引脚并设置方向；已导出的引脚直接复用。
    pub fn open(sysfs_root: &Path, pin: u32, direction: PinDirection) -> Result<Self, DeviceError> {
        let pin_dir = sysfs_root.join(format!("gpio{pin}"));
        if !pin_dir.exists() {
            let export = sysfs_root.join("export");
            std::fs::write(&export, pin.to_string()).map_err(|err| DeviceError::io(&export, err))?;
            debug!(target: "climlog.gpio", pin, "gpio_exported");
        }
        let direction_path = pin_dir.join("direction");
        std::fs::write(&direction_path, direction.as_str())
            .map_err(|err| DeviceError::io(&direction_path, err))?;
        Ok(Self {
            value_path: pin_dir.join("value"),
        })
    }

    fn read_level(&self) -> Result<bool, DeviceError> {
        let raw = std::fs::read_to_string(&self.value_path)
            .map_err(|err| DeviceError::io(&self.value_path, err))?;
        match raw.trim() {
            "0" => Ok(false),
            "1" => Ok(true),
            other => Err(DeviceError::Parse {
                path: self.value_path.clone(),
                value: other.to_string(),
            }),
        }
    }
}

impl DigitalOutput for SysfsPin {
    fn write(&mut self, high: bool) -> Result<(), DeviceError> {
        let level = if high { "1" } else { "0" };
        std::fs::write(&self.value_path, level).map_err(|err| DeviceError::io(&self.value_path, err))
    }
}

/// 低电平有效的按钮。
#[derive(Debug)]
pub struct ActiveLowButton {
    pin: SysfsPin,
}

impl ActiveLowButton {
    pub fn open(sysfs_root: &Path, pin: u32) -> Result<Self, DeviceError> {
        Ok(Self {
            pin: SysfsPin::open(sysfs_root, pin, PinDirection::In)?,
        })
    }
}

impl DigitalInput for ActiveLowButton {
    fn is_pressed(&mut self) -> Result<bool, DeviceError> {
        Ok(!self.pin.read_level()?)
    }
}

struct BacklightInner {
    output: Box<dyn DigitalOutput>,
    on: bool,
}

/// 背光开关。
///
/// 按钮线程与主流程都会写入，所有读写都经过同一把锁。
pub struct Backlight {
    inner: Mutex<BacklightInner>,
}

impl Backlight {
    /// 包装输出引脚，初始视为关闭（不写引脚）。
    pub fn new(output: Box<dyn DigitalOutput>) -> Self {
        Self {
            inner: Mutex::new(BacklightInner { output, on: false }),
        }
    }

    pub fn set(&self, on: bool) -> Result<(), DeviceError> {
        let mut inner = self.inner.lock().map_err(|_| DeviceError::Lock)?;
        inner.output.write(on)?;
        inner.on = on;
        debug!(target: "climlog.gpio", on, "backlight_set");
        Ok(())
    }

    /// 翻转背光，返回翻转后的状态。
    pub fn toggle(&self) -> Result<bool, DeviceError> {
        let mut inner = self.inner.lock().map_err(|_| DeviceError::Lock)?;
        let next = !inner.on;
        inner.output.write(next)?;
        inner.on = next;
        debug!(target: "climlog.gpio", on = next, "backlight_toggled");
        Ok(next)
    }

    pub fn is_on(&self) -> bool {
        match self.inner.lock() {
            Ok(inner) => inner.on,
            Err(_) => {
                warn!(target: "climlog.gpio", "backlight_lock_poisoned");
                false
            }
        }
    }
}

/// 不接硬件时使用的输出，只记录电平。
#[derive(Debug, Default)]
pub struct NullOutput {
    level: bool,
}

impl NullOutput {
    pub fn level(&self) -> bool {
        self.level
    }
}

impl DigitalOutput for NullOutput {
    fn write(&mut self, high: bool) -> Result<(), DeviceError> {
        self.level = high;
        Ok(())
    }
}

/// 不接硬件时使用的输入，始终未按下。
#[derive(Debug, Default)]
pub struct IdleInput;

impl DigitalInput for IdleInput {
    fn is_pressed(&mut self) -> Result<bool, DeviceError> {
        Ok(false)
    }
}
