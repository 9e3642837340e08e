use rumqttc::QoS;
use tracing::warn;

/// 支持的服务质量等级（不支持 2）。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QosLevel {
    AtMostOnce,
    AtLeastOnce,
}

impl QosLevel {
    pub fn as_u8(&self) -> u8 {
        match self {
            QosLevel::AtMostOnce => 0,
            QosLevel::AtLeastOnce => 1,
        }
    }

    pub(crate) fn to_mqtt(self) -> QoS {
        match self {
            QosLevel::AtMostOnce => QoS::AtMostOnce,
            QosLevel::AtLeastOnce => QoS::AtLeastOnce,
        }
    }
}

/// 0/1 原样使用，其他值回落到 1 并告警。
pub fn qos_from_u8(value: u8) -> QosLevel {
    match value {
        0 => QosLevel::AtMostOnce,
        1 => QosLevel::AtLeastOnce,
        other => {
            warn!(target: "climlog.transport", requested = other, "qos_coerced_to_at_least_once");
            QosLevel::AtLeastOnce
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qos_values_outside_range_become_one() {
        assert_eq!(qos_from_u8(0), QosLevel::AtMostOnce);
        assert_eq!(qos_from_u8(1), QosLevel::AtLeastOnce);
        assert_eq!(qos_from_u8(2), QosLevel::AtLeastOnce);
        assert_eq!(qos_from_u8(255), QosLevel::AtLeastOnce);
    }
}
