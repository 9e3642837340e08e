//! # 显示能力
//!
//! [`DisplaySurface`] 只提供矩形填充与文字放置两种原语，字形光栅化由
//! 具体的面板驱动负责。[`DisplayRenderer`] 把 [`DisplaySnapshot`] 排版为
//! 一组绘制调用，调用之间不保存状态。

use crate::error::DeviceError;
use domain::{Color, DisplaySnapshot};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Point {
    pub x: u32,
    pub y: u32,
}

impl Point {
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub origin: Point,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            origin: Point::new(x, y),
            width,
            height,
        }
    }
}

/// 字号档位。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontSize {
    /// 室内温度数值。
    Large,
    /// 标签与室外温度。
    Medium,
    /// 单位、下标与底部信息。
    Small,
}

/// 面板绘制原语。
pub trait DisplaySurface: Send {
    /// 面板像素尺寸 `(width, height)`。
    fn size(&self) -> (u32, u32);

    fn fill_rect(&mut self, rect: Rect, color: Color) -> Result<(), DeviceError>;

    fn place_text(
        &mut self,
        at: Point,
        text: &str,
        font: FontSize,
        color: Color,
    ) -> Result<(), DeviceError>;

    /// 把本帧提交到面板。
    fn present(&mut self) -> Result<(), DeviceError>;
}

/// 室外温度行末尾的存活指示符。
pub const ALIVE_TICKER: &str = "»«";
/// 缺失数值时显示的占位符。
pub const MISSING_VALUE: &str = "--";

/// 快照排版器。
#[derive(Debug, Clone, Copy)]
pub struct DisplayRenderer {
    background: Color,
    primary: Color,
}

impl Default for DisplayRenderer {
    fn default() -> Self {
        Self {
            background: Color::LINK_BLUE,
            primary: Color::WHITE,
        }
    }
}

impl DisplayRenderer {
    /// 绘制一帧：上半区室内/室外温度，下半区气压与湿度。
    pub fn render(
        &self,
        surface: &mut dyn DisplaySurface,
        snapshot: &DisplaySnapshot,
    ) -> Result<(), DeviceError> {
        let (width, height) = surface.size();
        let divider_y = height * 170 / 240;
        let half = width / 2;

        surface.fill_rect(Rect::new(0, 0, width, height), self.background)?;

        surface.place_text(Point::new(5, 5), "T", FontSize::Medium, self.primary)?;
        surface.place_text(Point::new(22, 17), "in", FontSize::Small, self.primary)?;
        surface.place_text(Point::new(40, 5), "=", FontSize::Medium, self.primary)?;
        let indoor = rounded(Some(snapshot.indoor.temperature_c));
        surface.place_text(Point::new(30, 30), &indoor, FontSize::Large, self.primary)?;
        surface.place_text(Point::new(200, 40), "°C", FontSize::Medium, self.primary)?;

        let outdoor_y = divider_y.saturating_sub(38);
        surface.place_text(Point::new(5, outdoor_y), "[T", FontSize::Medium, self.primary)?;
        surface.place_text(
            Point::new(33, outdoor_y + 12),
            "out",
            FontSize::Small,
            self.primary,
        )?;
        let outdoor = format!("={}°C]", rounded(Some(snapshot.outdoor.temperature_c)));
        surface.place_text(Point::new(63, outdoor_y), &outdoor, FontSize::Medium, self.primary)?;
        surface.place_text(
            Point::new(190, outdoor_y + 8),
            ALIVE_TICKER,
            FontSize::Small,
            snapshot.link_indicator_color,
        )?;

        surface.fill_rect(Rect::new(0, divider_y, width, 1), self.primary)?;
        surface.fill_rect(
            Rect::new(half, divider_y, 1, height.saturating_sub(divider_y)),
            self.primary,
        )?;

        let label_y = divider_y + 5;
        let value_y = divider_y + 35;
        surface.place_text(Point::new(5, label_y), "P=", FontSize::Small, self.primary)?;
        let pressure = format!("{} hPa", rounded(snapshot.indoor.pressure_hpa));
        surface.place_text(Point::new(5, value_y), &pressure, FontSize::Small, self.primary)?;
        surface.place_text(Point::new(half + 5, label_y), "H=", FontSize::Small, self.primary)?;
        let humidity = format!("{} %", rounded(snapshot.indoor.humidity_rh));
        surface.place_text(
            Point::new(half + 5, value_y),
            &humidity,
            FontSize::Small,
            self.primary,
        )?;

        surface.present()
    }

    /// 清屏（全黑）。
    pub fn clear(&self, surface: &mut dyn DisplaySurface) -> Result<(), DeviceError> {
        let (width, height) = surface.size();
        surface.fill_rect(Rect::new(0, 0, width, height), Color::BLACK)?;
        surface.present()
    }
}

fn rounded(value: Option<f64>) -> String {
    match value {
        Some(value) if value.is_finite() => format!("{:.0}", value.round()),
        _ => MISSING_VALUE.to_string(),
    }
}

/// 记录下来的一次绘制调用。
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    Fill {
        rect: Rect,
        color: Color,
    },
    Text {
        at: Point,
        text: String,
        font: FontSize,
        color: Color,
    },
}

/// 无面板时使用的表面：保存最近一帧的绘制调用，提交时输出 debug 日志。
#[derive(Debug, Default)]
pub struct HeadlessSurface {
    width: u32,
    height: u32,
    pending: Vec<DrawOp>,
    last_frame: Vec<DrawOp>,
    frames: u64,
}

impl HeadlessSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Default::default()
        }
    }

    /// 最近一次提交的帧。
    pub fn last_frame(&self) -> &[DrawOp] {
        &self.last_frame
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// 最近一帧中的全部文字。
    pub fn texts(&self) -> Vec<&str> {
        self.last_frame
            .iter()
            .filter_map(|op| match op {
                DrawOp::Text { text, .. } => Some(text.as_str()),
                DrawOp::Fill { .. } => None,
            })
            .collect()
    }
}

impl DisplaySurface for HeadlessSurface {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn fill_rect(&mut self, rect: Rect, color: Color) -> Result<(), DeviceError> {
        self.pending.push(DrawOp::Fill { rect, color });
        Ok(())
    }

    fn place_text(
        &mut self,
        at: Point,
        text: &str,
        font: FontSize,
        color: Color,
    ) -> Result<(), DeviceError> {
        self.pending.push(DrawOp::Text {
            at,
            text: text.to_string(),
            font,
            color,
        });
        Ok(())
    }

    fn present(&mut self) -> Result<(), DeviceError> {
        self.last_frame = std::mem::take(&mut self.pending);
        self.frames += 1;
        debug!(
            target: "climlog.display",
            frame = self.frames,
            ops = self.last_frame.len(),
            "frame_presented"
        );
        Ok(())
    }
}
