//! 共享日志状态
//!
//! 所有连接和时间戳任务共用一个 `SharedLog`。追加、定位、读取都在同一把锁内完成，
//! 锁只在拷贝数据时持有，网络收发前释放。

use bytes::Bytes;
use reclog::{Record, SeekTo};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

use crate::backing::Backing;
use crate::config::BackingKind;
use crate::error::WorkerError;

/// 一条完整记录对应的操作
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// 普通记录，追加到日志
    Append(Record),
    /// 定位命令
    Seek(SeekTo),
    /// 带命令前缀但参数不合法
    BadSeek,
}

impl Request {
    pub fn classify(record: Record) -> Self {
        match SeekTo::parse(record.as_bytes()) {
            None => Request::Append(record),
            Some(Ok(cmd)) => Request::Seek(cmd),
            Some(Err(_)) => Request::BadSeek,
        }
    }
}

/// 一批操作的结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyOutcome {
    /// 操作完成后的游标（同一次加锁内取得）
    pub cursor: usize,
    pub appended: usize,
    pub seeks: usize,
    pub rejected: usize,
    /// 环形日志从游标开始的完整回传内容，文件后端为 `None`
    pub snapshot: Option<Bytes>,
}

#[derive(Debug)]
struct LogState {
    /// 释放后为 `None`
    backing: Option<Backing>,
    cursor: usize,
}

/// 共享日志句柄
#[derive(Debug, Clone)]
pub struct SharedLog {
    inner: Arc<Mutex<LogState>>,
}

impl SharedLog {
    pub fn new(backing: Backing) -> Self {
        Self {
            inner: Arc::new(Mutex::new(LogState {
                backing: Some(backing),
                cursor: 0,
            })),
        }
    }

    /// 按顺序执行一批操作
    ///
    /// 追加后游标回到 0；定位失败时游标不变。
    pub async fn apply(&self, requests: Vec<Request>) -> Result<ApplyOutcome, WorkerError> {
        let mut guard = self.inner.lock().await;
        let state = &mut *guard;
        let backing = state.backing.as_mut().ok_or(WorkerError::Released)?;

        let mut outcome = ApplyOutcome::default();
        for request in requests {
            match request {
                Request::Append(record) => {
                    if backing.append(record)? {
                        debug!("oldest record evicted");
                    }
                    state.cursor = 0;
                    outcome.appended += 1;
                }
                Request::Seek(cmd) => match backing.seek_offset(cmd.record, cmd.offset) {
                    Ok(offset) => {
                        debug!("{} -> offset {}", cmd, offset);
                        state.cursor = offset;
                        outcome.seeks += 1;
                    }
                    Err(e) => {
                        debug!("{} rejected: {}", cmd, e);
                        outcome.rejected += 1;
                    }
                },
                Request::BadSeek => {
                    debug!("malformed seek command ignored");
                    outcome.rejected += 1;
                }
            }
        }
        outcome.cursor = state.cursor;
        outcome.snapshot = backing.snapshot_from(state.cursor);
        Ok(outcome)
    }

    /// 追加一条记录
    pub async fn submit(&self, record: Record) -> Result<(), WorkerError> {
        self.apply(vec![Request::Append(record)]).await.map(|_| ())
    }

    /// 拷贝从 `offset` 开始的最多 `max` 字节，到达末尾返回 `None`
    pub async fn read_chunk(&self, offset: usize, max: usize) -> Result<Option<Bytes>, WorkerError> {
        let mut state = self.inner.lock().await;
        let backing = state.backing.as_mut().ok_or(WorkerError::Released)?;
        Ok(backing.read_from(offset, max)?)
    }

    /// 读取全部内容
    pub async fn contents(&self) -> Result<Vec<u8>, WorkerError> {
        let mut state = self.inner.lock().await;
        let backing = state.backing.as_mut().ok_or(WorkerError::Released)?;
        let mut out = Vec::with_capacity(backing.total_bytes());
        while let Some(chunk) = backing.read_from(out.len(), reclog::constants::DEFAULT_READ_CHUNK)? {
            out.extend_from_slice(&chunk);
        }
        Ok(out)
    }

    pub async fn total_bytes(&self) -> Result<usize, WorkerError> {
        let state = self.inner.lock().await;
        let backing = state.backing.as_ref().ok_or(WorkerError::Released)?;
        Ok(backing.total_bytes())
    }

    pub async fn records(&self) -> Result<usize, WorkerError> {
        let state = self.inner.lock().await;
        let backing = state.backing.as_ref().ok_or(WorkerError::Released)?;
        Ok(backing.records())
    }

    pub async fn cursor(&self) -> usize {
        self.inner.lock().await.cursor
    }

    pub async fn kind(&self) -> Option<BackingKind> {
        self.inner.lock().await.backing.as_ref().map(Backing::kind)
    }

    /// 释放存储，只有第一次调用生效，返回是否执行了释放
    pub async fn release(&self) -> Result<bool, WorkerError> {
        let backing = {
            let mut state = self.inner.lock().await;
            state.cursor = 0;
            state.backing.take()
        };
        match backing {
            Some(backing) => {
                backing.release()?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
