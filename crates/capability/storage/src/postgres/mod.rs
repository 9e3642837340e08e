//! # PostgreSQL 存储实现
//!
//! 时序点写入表 `climate_measurements`：
//!
//! | 列 | 类型 |
//! |----|------|
//! | `measurement` | text |
//! | `ts` | timestamptz（读数采样时间） |
//! | `sensor_id` / `location` | text（标签） |
//! | `temperature_c` | double precision |
//! | `pressure_hpa` / `humidity_rh` | double precision，可空 |
//!
//! 索引 `(measurement, sensor_id, ts)` 覆盖按传感器的时间范围查询。
//! 所有 SQL 使用参数绑定。

pub mod series;

pub use series::*;
