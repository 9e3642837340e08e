//! # 时序存储
//!
//! 记录器把每条测量报文拆成每个传感器一个时序点写入存储。
//!
//! - [`models`]：时序点（measurement + tags + fields + 时间戳）
//! - [`traits`]：写入/查询接口 [`TimeSeriesSink`]
//! - [`validation`]：写入前校验
//! - [`connection`]：PostgreSQL 连接池
//! - [`in_memory`]：内存实现（测试与本地运行）
//! - [`postgres`]：PostgreSQL 实现，表结构在启动时按需创建
//!
//! 时间戳使用读数自带的采样时间，而不是接收时间。

pub mod connection;
pub mod error;
pub mod in_memory;
pub mod models;
pub mod postgres;
pub mod traits;
pub mod validation;

pub use connection::*;
pub use error::*;
pub use models::*;
pub use traits::*;
pub use validation::*;

pub use in_memory::InMemoryTimeSeriesStore;
pub use postgres::PgTimeSeriesStore;
