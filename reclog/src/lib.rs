//! reclog - 有界环形记录日志
//!
//! 特性：
//! - 环形存储：固定容量，写满后淘汰最旧记录
//! - 记录拼接：按全局字节偏移定位到 (记录, 记录内偏移)
//! - 记录定位：按记录号 + 记录内偏移移动读游标
//! - 单锁并发：`LogDevice` 内所有读写和游标修改共用一把锁

pub mod constants;
pub mod control;
pub mod device;
pub mod error;
pub mod record;
pub mod resolver;
pub mod ring;


pub use constants::{DEFAULT_CAPACITY, DELIMITER, SEEK_COMMAND_PREFIX};
pub use control::SeekTo;
pub use device::{LogDevice, LogStats, RingLog, WriteOutcome};
pub use error::{LogError, SeekError};
pub use record::{Record, RecordStore};
pub use ring::RingIndex;
