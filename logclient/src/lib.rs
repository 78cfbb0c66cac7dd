//! 记录日志服务客户端库
//!
//! # 示例
//!
//! ```rust,no_run
//! use logclient::{ClientConfig, LogClient};
//!
//! #[tokio::main]
//! async fn main() {
//!     let client = LogClient::new(ClientConfig::default());
//!
//!     // 追加一条记录，返回完整日志
//!     let log = client.send_line("hello").await.unwrap();
//!     print!("{}", String::from_utf8_lossy(&log));
//!
//!     // 从第 1 条记录的第 2 个字节开始读取
//!     let tail = client.seek(1, 2).await.unwrap();
//!     print!("{}", String::from_utf8_lossy(&tail));
//! }
//! ```

pub mod client;

pub use client::{ClientConfig, ClientError, LogClient, DEFAULT_PORT};
