//! 设备层错误类型

use std::path::PathBuf;

/// 设备访问错误。
///
/// 采样、GPIO、显示与电源控制共用；调用方根据所处阶段决定是
/// 初始化失败（致命）还是单周期失败（记录后继续）。
#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("unparseable value in {path}: {value:?}")]
    Parse { path: PathBuf, value: String },
    #[error("crc check failed on {0}")]
    Crc(PathBuf),
    #[error("device not found: {0}")]
    NotFound(String),
    #[error("device lock poisoned")]
    Lock,
    #[error("command {command} failed: {message}")]
    Command { command: String, message: String },
}

impl DeviceError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
