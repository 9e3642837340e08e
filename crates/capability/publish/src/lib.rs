//! # 发布流水线
//!
//! 采集站主流程：建立 broker 连接（有限次重试 + 握手确认），随后按固定
//! 节拍采样、刷新显示并发布测量报文。连接始终建立不起来时进入降级模式，
//! 采样与显示照常，发布被跳过。

mod connection;
mod indicator;
mod pipeline;

pub use connection::{ConnectionTracker, HandshakePolicy, RetryPolicy};
pub use indicator::BlinkIndicator;
pub use pipeline::{PublishPipeline, PublishSettings, PublishSummary};
