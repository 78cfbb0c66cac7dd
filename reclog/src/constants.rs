//! 常量定义
//!
//! 环形记录日志的容量、分隔符和控制命令等常量

/// 默认环形容量（设备侧最多保留的写入次数）
pub const DEFAULT_CAPACITY: usize = 10;

/// 记录分隔符
pub const DELIMITER: u8 = b'\n';

/// 定位控制命令前缀，格式: `AESDCHAR_IOCSEEKTO:<记录号>,<记录内偏移>`
pub const SEEK_COMMAND_PREFIX: &str = "AESDCHAR_IOCSEEKTO:";

/// 单次读取的默认最大字节数
pub const DEFAULT_READ_CHUNK: usize = 4096;
