//! 错误类型

use thiserror::Error;

/// 定位失败原因，游标保持不变
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SeekError {
    #[error("record index {index} out of range ({live} live records)")]
    RecordOutOfRange { index: usize, live: usize },
    #[error("offset {offset} out of range for record of {size} bytes")]
    OffsetOutOfRange { offset: usize, size: usize },
    #[error("malformed seek command")]
    Malformed,
    #[error("invalid position")]
    InvalidPosition,
}

/// 日志错误
#[derive(Debug, Error)]
pub enum LogError {
    #[error("ring capacity must be greater than zero")]
    ZeroCapacity,
    #[error("failed to grow record buffer by {0} bytes")]
    Alloc(usize),
    #[error("seek failed: {0}")]
    Seek(#[from] SeekError),
    #[error("log lock poisoned")]
    Poisoned,
}
