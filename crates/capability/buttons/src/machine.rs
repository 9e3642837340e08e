use crate::LONG_PRESS_TICKS;
use domain::{ButtonEvent, ButtonState};

/// 背光按钮的边沿检测。
#[derive(Debug, Clone, Copy)]
pub struct BacklightLatch {
    armed: bool,
}

impl Default for BacklightLatch {
    fn default() -> Self {
        Self { armed: true }
    }
}

impl BacklightLatch {
    /// 输入一次采样，返回本拍是否应翻转背光。
    pub fn poll(&mut self, pressed: bool) -> bool {
        if pressed {
            let fire = self.armed;
            self.armed = false;
            fire
        } else {
            self.armed = true;
            false
        }
    }
}

/// 电源按钮的长短按状态机。
#[derive(Debug, Clone, Copy, Default)]
pub struct PowerButton {
    state: ButtonState,
}

impl PowerButton {
    pub fn state(&self) -> ButtonState {
        self.state
    }

    /// 输入一次采样；只有在松开的那一拍才可能产生事件。
    pub fn poll(&mut self, pressed: bool) -> Option<ButtonEvent> {
        if pressed {
            self.state.is_pressed = true;
            self.state.press_duration_ticks = self.state.press_duration_ticks.saturating_add(1);
            return None;
        }

        let held_ticks = self.state.press_duration_ticks;
        let was_pressed = self.state.is_pressed;
        self.state = ButtonState::default();

        if held_ticks > LONG_PRESS_TICKS {
            Some(ButtonEvent::PowerLongPress { held_ticks })
        } else if was_pressed {
            Some(ButtonEvent::PowerShortPress { held_ticks })
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hold(button: &mut PowerButton, ticks: u32) -> Vec<ButtonEvent> {
        let mut events = Vec::new();
        for _ in 0..ticks {
            events.extend(button.poll(true));
        }
        events.extend(button.poll(false));
        events
    }

    #[test]
    fn thirty_ticks_is_still_short() {
        let mut button = PowerButton::default();
        assert_eq!(
            hold(&mut button, 30),
            vec![ButtonEvent::PowerShortPress { held_ticks: 30 }]
        );
    }

    #[test]
    fn thirty_one_ticks_is_long() {
        let mut button = PowerButton::default();
        assert_eq!(
            hold(&mut button, 31),
            vec![ButtonEvent::PowerLongPress { held_ticks: 31 }]
        );
    }

    #[test]
    fn single_tick_is_short() {
        let mut button = PowerButton::default();
        assert_eq!(
            hold(&mut button, 1),
            vec![ButtonEvent::PowerShortPress { held_ticks: 1 }]
        );
    }

    #[test]
    fn never_pressed_emits_nothing() {
        let mut button = PowerButton::default();
        for _ in 0..100 {
            assert_eq!(button.poll(false), None);
        }
    }

    #[test]
    fn nothing_fires_while_held() {
        let mut button = PowerButton::default();
        for tick in 1..=500 {
            assert_eq!(button.poll(true), None);
            assert_eq!(button.state().press_duration_ticks, tick);
        }
    }

    #[test]
    fn counter_resets_after_release() {
        let mut button = PowerButton::default();
        hold(&mut button, 45);
        assert_eq!(button.state(), ButtonState::default());
        assert_eq!(
            hold(&mut button, 2),
            vec![ButtonEvent::PowerShortPress { held_ticks: 2 }]
        );
    }

    #[test]
    fn latch_fires_once_per_press() {
        let mut latch = BacklightLatch::default();
        let fired: Vec<bool> = [false, true, true, true, false, true, false]
            .into_iter()
            .map(|pressed| latch.poll(pressed))
            .collect();
        assert_eq!(fired, vec![false, true, false, false, false, true, false]);
    }
}
