//! 服务配置
//!
//! 支持从 JSON 配置文件读取，缺省字段使用默认值；命令行参数覆盖文件中的值。

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// 默认监听端口
pub const DEFAULT_PORT: u16 = 9000;

/// 默认数据文件
pub const DEFAULT_DATA_FILE: &str = "/var/tmp/aesdsocketdata";

/// 后端类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BackingKind {
    /// 平铺文件，保存全部记录
    File,
    /// 内存环形日志，只保留最近的记录
    Device,
}

/// 服务配置（JSON 格式）
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// 监听地址
    pub bind: String,

    /// 监听端口
    pub port: u16,

    /// 后端类型
    pub backing: BackingKind,

    /// 文件后端的数据文件路径
    pub data_file: PathBuf,

    /// 环形日志容量（记录数）
    pub capacity: usize,

    /// 时间戳注入间隔（秒），仅文件后端
    pub timestamp_interval_secs: u64,

    /// 退出时等待连接结束的最长时间（秒）
    pub drain_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            backing: BackingKind::File,
            data_file: PathBuf::from(DEFAULT_DATA_FILE),
            capacity: reclog::DEFAULT_CAPACITY,
            timestamp_interval_secs: 10,
            drain_timeout_secs: 3,
        }
    }
}

impl ServerConfig {
    /// 从 JSON 文件加载配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let config: ServerConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.capacity == 0 {
            anyhow::bail!("capacity must be greater than zero");
        }
        if self.timestamp_interval_secs == 0 {
            anyhow::bail!("timestamp_interval_secs must be greater than zero");
        }
        self.socket_addr()?;
        Ok(())
    }

    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        let ip: IpAddr = self
            .bind
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid bind address {}: {}", self.bind, e))?;
        Ok(SocketAddr::new(ip, self.port))
    }

    /// 时间戳注入间隔，设备后端不注入
    pub fn timestamp_interval(&self) -> Option<Duration> {
        match self.backing {
            BackingKind::File => Some(Duration::from_secs(self.timestamp_interval_secs)),
            BackingKind::Device => None,
        }
    }

    pub fn drain_timeout(&self) -> Duration {
        Duration::from_secs(self.drain_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 9000);
        assert_eq!(config.backing, BackingKind::File);
        assert_eq!(config.data_file, PathBuf::from("/var/tmp/aesdsocketdata"));
        assert_eq!(config.capacity, 10);
        assert_eq!(config.timestamp_interval(), Some(Duration::from_secs(10)));
        assert_eq!(config.drain_timeout(), Duration::from_secs(3));
        assert_eq!(
            config.socket_addr().unwrap(),
            "0.0.0.0:9000".parse::<SocketAddr>().unwrap()
        );
    }

    #[test]
    fn partial_json_uses_defaults() {
        let config: ServerConfig =
            serde_json::from_str(r#"{ "port": 9100, "backing": "device", "capacity": 4 }"#)
                .unwrap();
        assert_eq!(config.port, 9100);
        assert_eq!(config.backing, BackingKind::Device);
        assert_eq!(config.capacity, 4);
        assert_eq!(config.bind, "0.0.0.0");
        assert_eq!(config.timestamp_interval(), None);
    }

    #[test]
    fn from_file_validates() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.json");
        fs::write(&good, r#"{ "bind": "127.0.0.1", "data_file": "/tmp/x" }"#).unwrap();
        let config = ServerConfig::from_file(&good).unwrap();
        assert_eq!(config.bind, "127.0.0.1");
        assert_eq!(config.data_file, PathBuf::from("/tmp/x"));

        let bad = dir.path().join("bad.json");
        fs::write(&bad, r#"{ "capacity": 0 }"#).unwrap();
        assert!(ServerConfig::from_file(&bad).is_err());

        fs::write(&bad, r#"{ "bind": "not-an-ip" }"#).unwrap();
        assert!(ServerConfig::from_file(&bad).is_err());

        fs::write(&bad, r#"{ "backing": "tape" }"#).unwrap();
        assert!(ServerConfig::from_file(&bad).is_err());
    }
}
