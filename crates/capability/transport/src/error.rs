/// 传输错误。
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("connect failed: {0}")]
    Connect(String),
    #[error("not connected")]
    NotConnected,
    #[error("publish failed: {0}")]
    Publish(String),
    #[error("subscribe failed: {0}")]
    Subscribe(String),
    #[error("disconnect failed: {0}")]
    Disconnect(String),
    #[error("connection error: {0}")]
    Connection(String),
}
