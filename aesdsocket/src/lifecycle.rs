//! 生命周期管理
//!
//! - `Shutdown`: 退出信号，可以从任意任务触发，多次触发只生效一次
//! - `Lifecycle`: 持有全部连接任务和时间戳任务，退出时按顺序收尾：
//!   停止接收新连接 → 等待连接结束（超时后强制取消）→ 停止时间戳任务 → 释放日志

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::{JoinError, JoinHandle, JoinSet};
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::shared::SharedLog;
use crate::worker::WorkerReport;

/// 退出信号
#[derive(Debug, Clone)]
pub struct Shutdown {
    tx: Arc<watch::Sender<bool>>,
    fired: Arc<AtomicBool>,
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self {
            tx: Arc::new(tx),
            fired: Arc::new(AtomicBool::new(false)),
        }
    }

    /// 触发退出，返回是否为第一次触发
    pub fn trigger(&self) -> bool {
        if self.fired.swap(true, Ordering::SeqCst) {
            return false;
        }
        self.tx.send_replace(true);
        true
    }

    pub fn is_triggered(&self) -> bool {
        self.fired.load(Ordering::SeqCst)
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }

    /// 等待退出信号
    pub async fn wait(&self) {
        let mut rx = self.subscribe();
        while !*rx.borrow_and_update() {
            if rx.changed().await.is_err() {
                return;
            }
        }
    }
}

pub struct Lifecycle {
    workers: JoinSet<WorkerReport>,
    injector: Option<JoinHandle<usize>>,
    shutdown: Shutdown,
    log: SharedLog,
    drain_timeout: Duration,
}

impl Lifecycle {
    pub fn new(log: SharedLog, shutdown: Shutdown, drain_timeout: Duration) -> Self {
        Self {
            workers: JoinSet::new(),
            injector: None,
            shutdown,
            log,
            drain_timeout,
        }
    }

    pub fn spawn_worker<F>(&mut self, worker: F)
    where
        F: Future<Output = WorkerReport> + Send + 'static,
    {
        self.workers.spawn(worker);
    }

    pub fn set_injector(&mut self, handle: JoinHandle<usize>) {
        self.injector = Some(handle);
    }

    /// 回收已结束的连接任务，不阻塞
    pub fn reap(&mut self) -> usize {
        let mut reaped = 0;
        while let Some(result) = self.workers.try_join_next() {
            log_worker(result);
            reaped += 1;
        }
        reaped
    }

    /// 仍在运行的连接数
    pub fn active(&self) -> usize {
        self.workers.len()
    }

    /// 收尾，任何一步失败都只记录日志，收尾总会完成
    pub async fn shutdown(mut self) {
        self.shutdown.trigger();

        let active = self.workers.len();
        if active > 0 {
            info!("Waiting for {} connections to finish", active);
        }
        let workers = &mut self.workers;
        let drained = timeout(self.drain_timeout, async {
            while let Some(result) = workers.join_next().await {
                log_worker(result);
            }
        })
        .await;
        if drained.is_err() {
            warn!(
                "{} connections still active after {:?}, aborting",
                self.workers.len(),
                self.drain_timeout
            );
            self.workers.abort_all();
            while let Some(result) = self.workers.join_next().await {
                log_worker(result);
            }
        }

        if let Some(handle) = self.injector.take() {
            let abort = handle.abort_handle();
            match timeout(self.drain_timeout, handle).await {
                Ok(Ok(count)) => info!("Timestamp injector stopped after {} records", count),
                Ok(Err(e)) => error!("Timestamp injector failed: {}", e),
                Err(_) => {
                    warn!("Timestamp injector did not stop, aborting");
                    abort.abort();
                }
            }
        }

        match self.log.release().await {
            Ok(true) => info!("Log store released"),
            Ok(false) => debug!("Log store already released"),
            Err(e) => error!("Failed to release log store: {}", e),
        }
    }
}

fn log_worker(result: Result<WorkerReport, JoinError>) {
    match result {
        Ok(report) => debug!("connection finished: {}", report),
        Err(e) if e.is_cancelled() => debug!("connection task cancelled"),
        Err(e) => error!("connection task panicked: {}", e),
    }
}
