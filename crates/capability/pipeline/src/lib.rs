//! # 持久化流水线
//!
//! 报文 → 时序点 → 有界队列 → 写入任务 → 时序存储。
//!
//! 订阅循环只做解码与入队，写入在独立任务中进行，数据库变慢时订阅
//! 循环不被阻塞；队列满时直接丢弃并记为背压。

mod convert;
mod dedup;
mod writer;

pub use convert::{location_from_topic, parse_timestamp, points_from_message};
pub use writer::{PersistConfig, PersistPipeline, PersistQueue, PersistWorker, WriterStats};

/// 流水线错误。
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("decode error: {0}")]
    Decode(#[from] message_contract::DecodeError),
    #[error("invalid timestamp {0:?}")]
    Timestamp(String),
    #[error("writer error: {0}")]
    Writer(String),
    #[error("backpressure: {0}")]
    Backpressure(String),
    #[error("writer closed")]
    Closed,
}
