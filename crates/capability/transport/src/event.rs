use rumqttc::{Event, Outgoing, Packet, SubscribeReasonCode};

/// 连接层事件。
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// 收到连接确认。
    Connected { session_present: bool },
    /// 连接断开；`unexpected` 为 false 表示本端主动断开。
    Disconnected { unexpected: bool },
    /// QoS 1 发布得到确认。
    Published { packet_id: u16 },
    /// 订阅确认；每个主题对应一个授予等级，`None` 表示被拒绝。
    Subscribed {
        packet_id: u16,
        granted: Vec<Option<u8>>,
    },
    /// 收到一条消息。
    Message {
        topic: String,
        payload: Vec<u8>,
        qos: u8,
        retain: bool,
    },
}

/// 发布端事件回调，在网络循环任务中调用，不得阻塞。
pub trait TransportEventHandler: Send + Sync {
    fn on_event(&self, event: TransportEvent);
}

/// 把 rumqttc 事件转换为 [`TransportEvent`]；无关事件返回 `None`。
pub fn map_event(event: Event) -> Option<TransportEvent> {
    match event {
        Event::Incoming(Packet::ConnAck(ack)) => Some(TransportEvent::Connected {
            session_present: ack.session_present,
        }),
        Event::Incoming(Packet::Disconnect) => {
            Some(TransportEvent::Disconnected { unexpected: true })
        }
        Event::Incoming(Packet::PubAck(ack)) => Some(TransportEvent::Published {
            packet_id: ack.pkid,
        }),
        Event::Incoming(Packet::SubAck(ack)) => Some(TransportEvent::Subscribed {
            packet_id: ack.pkid,
            granted: ack
                .return_codes
                .iter()
                .map(|code| match code {
                    SubscribeReasonCode::Success(qos) => Some(*qos as u8),
                    SubscribeReasonCode::Failure => None,
                })
                .collect(),
        }),
        Event::Incoming(Packet::Publish(publish)) => Some(TransportEvent::Message {
            topic: publish.topic,
            payload: publish.payload.to_vec(),
            qos: publish.qos as u8,
            retain: publish.retain,
        }),
        Event::Outgoing(Outgoing::Disconnect) => {
            Some(TransportEvent::Disconnected { unexpected: false })
        }
        _ => None,
    }
}
