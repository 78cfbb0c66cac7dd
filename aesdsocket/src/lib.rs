//! aesdsocket - 记录日志 TCP 服务
//!
//! 客户端发送以换行结尾的记录，服务端追加到共享日志后把日志内容发回并关闭连接。
//!
//! 后端存储：
//! - `file`: 平铺文件（默认 `/var/tmp/aesdsocketdata`），定时追加时间戳，退出时删除
//! - `device`: 内存环形日志，只保留最近 N 条记录
//!
//! 控制命令 `AESDCHAR_IOCSEEKTO:<记录号>,<偏移>\n` 不追加，只移动回传起点。

pub mod backing;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod server;
pub mod shared;
pub mod timestamp;
pub mod worker;

pub use backing::{Backing, FileLog};
pub use config::{BackingKind, ServerConfig, DEFAULT_DATA_FILE, DEFAULT_PORT};
pub use error::WorkerError;
pub use lifecycle::{Lifecycle, Shutdown};
pub use server::Server;
pub use shared::{ApplyOutcome, Request, SharedLog};
pub use worker::{handle_connection, WorkerReport, RECV_CHUNK_SIZE, STREAM_CHUNK_SIZE};
