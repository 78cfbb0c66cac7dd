//! 服务错误类型

use reclog::LogError;
use std::io;
use thiserror::Error;

/// 单个连接或写入任务的错误，只影响出错的任务本身
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("log error: {0}")]
    Log(#[from] LogError),
    #[error("log store already released")]
    Released,
    #[error("shutdown in progress")]
    Shutdown,
}
