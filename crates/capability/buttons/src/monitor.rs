use crate::POLL_INTERVAL;
use crate::machine::{BacklightLatch, PowerButton};
use climlog_device::{Backlight, DeviceError, DigitalInput, PowerControl};
use domain::ButtonEvent;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use tracing::{debug, info, warn};

#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    #[error("failed to spawn button thread: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("button thread panicked")]
    Panicked,
}

/// 按钮轮询器：读取输入、推进状态机并执行对应动作。
pub struct ButtonMonitor {
    backlight_button: Box<dyn DigitalInput>,
    power_button: Box<dyn DigitalInput>,
    backlight: Arc<Backlight>,
    power: Arc<dyn PowerControl>,
    latch: BacklightLatch,
    power_state: PowerButton,
}

impl ButtonMonitor {
    pub fn new(
        backlight_button: Box<dyn DigitalInput>,
        power_button: Box<dyn DigitalInput>,
        backlight: Arc<Backlight>,
        power: Arc<dyn PowerControl>,
    ) -> Self {
        Self {
            backlight_button,
            power_button,
            backlight,
            power,
            latch: BacklightLatch::default(),
            power_state: PowerButton::default(),
        }
    }

    /// 执行一拍轮询，返回本拍产生的事件。
    ///
    /// 任一输入读取失败时整拍跳过，状态机保持不变。
    pub fn step(&mut self) -> Vec<ButtonEvent> {
        let levels = self
            .backlight_button
            .is_pressed()
            .and_then(|backlight| Ok((backlight, self.power_button.is_pressed()?)));
        let (backlight_pressed, power_pressed) = match levels {
            Ok(levels) => levels,
            Err(err) => {
                warn!(target: "climlog.buttons", error = %err, "button_read_failed");
                return Vec::new();
            }
        };

        let mut events = Vec::new();
        if self.latch.poll(backlight_pressed) {
            events.push(ButtonEvent::BacklightToggle);
        }
        events.extend(self.power_state.poll(power_pressed));

        for event in &events {
            self.dispatch(*event);
        }
        events
    }

    fn dispatch(&self, event: ButtonEvent) {
        let result: Result<(), DeviceError> = match event {
            ButtonEvent::BacklightToggle => self.backlight.toggle().map(|on| {
                info!(target: "climlog.buttons", on, "backlight_button_pressed");
            }),
            ButtonEvent::PowerShortPress { held_ticks } => {
                info!(target: "climlog.buttons", held_ticks, "power_short_press_restart");
                self.power.restart()
            }
            ButtonEvent::PowerLongPress { held_ticks } => {
                info!(target: "climlog.buttons", held_ticks, "power_long_press_shutdown");
                self.power.shutdown()
            }
        };
        if let Err(err) = result {
            warn!(target: "climlog.buttons", event = ?event, error = %err, "button_action_failed");
        }
    }

    /// 在名为 `button-monitor` 的线程中持续轮询，直到句柄被停止。
    pub fn spawn(mut self) -> Result<ButtonMonitorHandle, MonitorError> {
        let exit = Arc::new(AtomicBool::new(false));
        let thread_exit = Arc::clone(&exit);
        let join = std::thread::Builder::new()
            .name("button-monitor".to_string())
            .spawn(move || {
                info!(target: "climlog.buttons", "button_monitor_started");
                loop {
                    std::thread::sleep(POLL_INTERVAL);
                    // 清理开始后不再读取按钮或执行动作。
                    if thread_exit.load(Ordering::Acquire) {
                        break;
                    }
                    self.step();
                }
                debug!(target: "climlog.buttons", "button_monitor_exited");
            })
            .map_err(MonitorError::Spawn)?;
        Ok(ButtonMonitorHandle {
            exit,
            join: Some(join),
        })
    }
}

/// 按钮线程句柄。
pub struct ButtonMonitorHandle {
    exit: Arc<AtomicBool>,
    join: Option<JoinHandle<()>>,
}

impl ButtonMonitorHandle {
    /// 设置退出标志并等待线程结束（最多多等一个轮询间隔）。
    pub fn stop(mut self) -> Result<(), MonitorError> {
        self.exit.store(true, Ordering::Release);
        match self.join.take() {
            Some(join) => join.join().map_err(|_| MonitorError::Panicked),
            None => Ok(()),
        }
    }

    pub fn is_running(&self) -> bool {
        self.join.as_ref().is_some_and(|join| !join.is_finished())
    }
}

impl Drop for ButtonMonitorHandle {
    fn drop(&mut self) {
        self.exit.store(true, Ordering::Release);
    }
}
