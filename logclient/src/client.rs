//! 记录日志服务客户端

use bytes::BytesMut;
use reclog::{SeekTo, DELIMITER};
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::{timeout, Duration};
use tracing::{debug, info};

/// 服务默认端口
pub const DEFAULT_PORT: u16 = 9000;

/// 客户端错误
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("connection failed: {0}")]
    ConnectionFailed(#[from] std::io::Error),
    #[error("timeout")]
    Timeout,
    #[error("record must end with a newline")]
    InvalidRecord,
}

/// 客户端配置
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub host: String,
    pub port: u16,
    pub timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            timeout_secs: 5,
        }
    }
}

/// 记录日志服务客户端
///
/// 每次请求一个连接：发送数据，读取服务端回传的日志直到对方关闭。
pub struct LogClient {
    config: ClientConfig,
}

impl LogClient {
    pub fn new(config: ClientConfig) -> Self {
        Self { config }
    }

    /// 连接到 `127.0.0.1:port`
    pub fn local(port: u16) -> Self {
        Self::new(ClientConfig {
            port,
            ..Default::default()
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// 发送一条记录，返回日志内容
    pub async fn send_record(&self, record: &[u8]) -> Result<Vec<u8>, ClientError> {
        if record.last() != Some(&DELIMITER) {
            return Err(ClientError::InvalidRecord);
        }
        self.exchange(record).await
    }

    /// 发送一行文本，缺少换行时补上
    pub async fn send_line(&self, line: &str) -> Result<Vec<u8>, ClientError> {
        let mut data = line.as_bytes().to_vec();
        if data.last() != Some(&DELIMITER) {
            data.push(DELIMITER);
        }
        self.exchange(&data).await
    }

    /// 发送定位命令，返回从新游标开始的内容
    pub async fn seek(&self, record: usize, offset: usize) -> Result<Vec<u8>, ClientError> {
        let line = SeekTo::new(record, offset).to_line();
        self.exchange(line.as_bytes()).await
    }

    /// 原样发送任意字节后关闭写方向，返回服务端回传的全部内容
    pub async fn exchange(&self, data: &[u8]) -> Result<Vec<u8>, ClientError> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let result = timeout(Duration::from_secs(self.config.timeout_secs), async {
            let mut stream = TcpStream::connect(&addr).await?;
            info!("Connected to {}", addr);

            stream.write_all(data).await?;
            stream.shutdown().await?;
            debug!("Sent {} bytes", data.len());

            let mut buf = BytesMut::with_capacity(4096);
            while stream.read_buf(&mut buf).await? != 0 {}
            debug!("Received {} bytes", buf.len());
            Ok::<_, ClientError>(buf.to_vec())
        })
        .await;

        match result {
            Ok(res) => res,
            Err(_) => Err(ClientError::Timeout),
        }
    }
}
