//! 内存存储实现
//!
//! 用于测试与不接数据库的本地运行。

pub mod series;

pub use series::*;
