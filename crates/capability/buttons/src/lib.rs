//! # 按钮监视
//!
//! 两个物理按钮在辅助线程中以固定节拍轮询：
//!
//! - 背光按钮：按下沿翻转一次背光，松开前不再重复（锁存去抖）。
//! - 电源按钮：按住期间每拍计数一次，松开时按计数区分长按（关机）与
//!   短按（重启），随后计数清零。
//!
//! 轮询间隔同时是去抖间隔与长按阈值的计数单位。

mod machine;
mod monitor;

pub use machine::{BacklightLatch, PowerButton};
pub use monitor::{ButtonMonitor, ButtonMonitorHandle, MonitorError};

use std::time::Duration;

/// 轮询间隔。
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// 长按阈值：松开时计数严格大于该值才算长按（约 3 秒）。
pub const LONG_PRESS_TICKS: u32 = 30;
