//! TCP 服务
//!
//! 接收连接并为每个连接启动一个任务；收到退出信号后停止接收，交给 `Lifecycle` 收尾。

use anyhow::{Context, Result};
use std::io;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::backing::Backing;
use crate::config::{BackingKind, ServerConfig};
use crate::lifecycle::{Lifecycle, Shutdown};
use crate::shared::SharedLog;
use crate::timestamp::run_injector;
use crate::worker::handle_connection;

pub struct Server {
    listener: TcpListener,
    config: ServerConfig,
    log: SharedLog,
    shutdown: Shutdown,
}

impl Server {
    /// 监听端口并打开后端存储
    pub async fn bind(config: ServerConfig, shutdown: Shutdown) -> Result<Self> {
        config.validate()?;
        let addr = config.socket_addr()?;
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("failed to bind {}", addr))?;

        let backing = Backing::open(&config).with_context(|| match config.backing {
            BackingKind::File => {
                format!("failed to open {}", config.data_file.display())
            }
            BackingKind::Device => "failed to create ring log".to_string(),
        })?;
        info!(
            "Listening on {}, backing {:?}",
            listener.local_addr()?,
            backing.kind()
        );

        Ok(Self {
            listener,
            config,
            log: SharedLog::new(backing),
            shutdown,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn log(&self) -> SharedLog {
        self.log.clone()
    }

    pub async fn run(self) -> Result<()> {
        let Server {
            listener,
            config,
            log,
            shutdown,
        } = self;

        let mut lifecycle = Lifecycle::new(log.clone(), shutdown.clone(), config.drain_timeout());
        if let Some(period) = config.timestamp_interval() {
            lifecycle.set_injector(tokio::spawn(run_injector(
                log.clone(),
                period,
                shutdown.subscribe(),
            )));
        }

        let mut stop = shutdown.subscribe();
        while !shutdown.is_triggered() {
            tokio::select! {
                changed = stop.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        lifecycle.spawn_worker(handle_connection(
                            stream,
                            peer,
                            log.clone(),
                            shutdown.subscribe(),
                        ));
                    }
                    Err(e) => {
                        warn!("accept failed: {}", e);
                        tokio::time::sleep(Duration::from_millis(100)).await;
                    }
                },
            }
            lifecycle.reap();
        }

        drop(listener);
        info!("Stopped accepting connections");
        lifecycle.shutdown().await;
        Ok(())
    }
}
