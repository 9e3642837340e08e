use domain::Color;

/// 存活指示符颜色：每拍在白色与链路色之间交替。
///
/// 链路色在已连接时为蓝色，否则为红色。
#[derive(Debug, Clone, Copy)]
pub struct BlinkIndicator {
    current: Color,
}

impl Default for BlinkIndicator {
    fn default() -> Self {
        Self {
            current: Color::WHITE,
        }
    }
}

impl BlinkIndicator {
    pub fn next(&mut self, connected: bool) -> Color {
        let link = if connected {
            Color::LINK_BLUE
        } else {
            Color::ALERT_RED
        };
        self.current = if self.current == Color::WHITE {
            link
        } else {
            Color::WHITE
        };
        self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alternates_with_link_color() {
        let mut indicator = BlinkIndicator::default();
        assert_eq!(indicator.next(true), Color::LINK_BLUE);
        assert_eq!(indicator.next(true), Color::WHITE);
        assert_eq!(indicator.next(false), Color::ALERT_RED);
        assert_eq!(indicator.next(false), Color::WHITE);
    }
}
