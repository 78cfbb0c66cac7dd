//! aesdsocket - 记录日志 TCP 服务
//!
//! 默认监听 9000 端口，数据写入 /var/tmp/aesdsocketdata；
//! SIGINT / SIGTERM 触发退出，等待连接结束后删除数据文件。

use aesdsocket::{BackingKind, Server, ServerConfig, Shutdown};
use anyhow::Result;
use clap::Parser;
use std::io;
use std::path::PathBuf;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "aesdsocket")]
#[command(about = "Record log socket server - append newline-terminated records, get the log back")]
struct Cli {
    /// 监听端口
    #[arg(short, long)]
    port: Option<u16>,

    /// 监听地址
    #[arg(short, long)]
    bind: Option<String>,

    /// 后端类型
    #[arg(long, value_enum)]
    backing: Option<BackingKind>,

    /// 数据文件路径（file 后端）
    #[arg(short = 'f', long)]
    data_file: Option<PathBuf>,

    /// 环形日志容量（device 后端）
    #[arg(short, long)]
    capacity: Option<usize>,

    /// 时间戳间隔（秒）
    #[arg(short, long)]
    timestamp_interval: Option<u64>,

    /// JSON 配置文件，命令行参数优先
    #[arg(short = 'C', long)]
    config: Option<PathBuf>,

    /// 详细输出
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn server_config(&self) -> Result<ServerConfig> {
        let mut config = match &self.config {
            Some(path) => {
                info!("Loading config from {}", path.display());
                ServerConfig::from_file(path)?
            }
            None => ServerConfig::default(),
        };
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(bind) = &self.bind {
            config.bind = bind.clone();
        }
        if let Some(backing) = self.backing {
            config.backing = backing;
        }
        if let Some(data_file) = &self.data_file {
            config.data_file = data_file.clone();
        }
        if let Some(capacity) = self.capacity {
            config.capacity = capacity;
        }
        if let Some(secs) = self.timestamp_interval {
            config.timestamp_interval_secs = secs;
        }
        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = cli.server_config()?;
    let shutdown = Shutdown::new();
    let server = Server::bind(config, shutdown.clone()).await?;

    let signal_shutdown = shutdown.clone();
    tokio::spawn(async move {
        match wait_for_signal().await {
            Ok(()) => {
                info!("Caught signal, exiting");
                signal_shutdown.trigger();
            }
            Err(e) => error!("Failed to install signal handler: {}", e),
        }
    });

    server.run().await?;
    info!("aesdsocket: Exited");
    Ok(())
}

#[cfg(unix)]
async fn wait_for_signal() -> io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut term = signal(SignalKind::terminate())?;
    tokio::select! {
        res = tokio::signal::ctrl_c() => res,
        _ = term.recv() => Ok(()),
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() -> io::Result<()> {
    tokio::signal::ctrl_c().await
}
