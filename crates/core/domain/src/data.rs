/// 单个传感器的一次采样。
///
/// 由 SampleSource 每个采样周期产生，编码与显示后即丢弃，从不修改。
#[derive(Debug, Clone, PartialEq)]
pub struct SensorReading {
    pub source_id: String,
    /// RFC3339 时间戳（UTC，带 `Z` 后缀）。
    pub timestamp: String,
    pub temperature_c: f64,
    /// 仅多量传感器提供。
    pub pressure_hpa: Option<f64>,
    /// 仅多量传感器提供。
    pub humidity_rh: Option<f64>,
}

impl SensorReading {
    /// 单量（仅温度）读数。
    pub fn temperature_only(
        source_id: impl Into<String>,
        timestamp: impl Into<String>,
        temperature_c: f64,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            timestamp: timestamp.into(),
            temperature_c,
            pressure_hpa: None,
            humidity_rh: None,
        }
    }

    /// 多量（温度/气压/湿度）读数。
    pub fn climate(
        source_id: impl Into<String>,
        timestamp: impl Into<String>,
        temperature_c: f64,
        pressure_hpa: f64,
        humidity_rh: f64,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            timestamp: timestamp.into(),
            temperature_c,
            pressure_hpa: Some(pressure_hpa),
            humidity_rh: Some(humidity_rh),
        }
    }
}

/// 显示颜色（RGB888）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0x00, 0x00, 0x00);
    pub const WHITE: Color = Color::rgb(0xFF, 0xFF, 0xFF);
    /// 背景色，同时也是链路正常时的指示色。
    pub const LINK_BLUE: Color = Color::rgb(0x1A, 0xA3, 0xFF);
    pub const ALERT_RED: Color = Color::rgb(0xFF, 0x00, 0x00);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// `#RRGGBB` 形式。
    pub fn to_hex(&self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

/// 每个周期重新计算的显示视图。
#[derive(Debug, Clone, PartialEq)]
pub struct DisplaySnapshot {
    pub indoor: SensorReading,
    pub outdoor: SensorReading,
    pub link_indicator_color: Color,
}

/// 与 broker 之间的连接状态。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Failed,
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Failed => "failed",
        }
    }
}

/// 物理按键的轮询状态。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ButtonState {
    pub is_pressed: bool,
    pub press_duration_ticks: u32,
}

/// 按键状态机输出的事件。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonEvent {
    /// 背光键按下沿。
    BacklightToggle,
    /// 电源键短按释放：重启主机。
    PowerShortPress { held_ticks: u32 },
    /// 电源键长按释放：关闭主机。
    PowerLongPress { held_ticks: u32 },
}
