//! 设备侧日志
//!
//! `RingLog` 把环形索引、待完成记录缓冲和读游标组合在一起，本身不加锁；
//! `LogDevice` 用一把互斥锁包住 `RingLog`，所有读写和游标修改都在锁内完成。

use std::fmt;
use std::io::SeekFrom;
use std::sync::{Mutex, MutexGuard};

use bytes::Bytes;
use tracing::debug;

use crate::error::{LogError, SeekError};
use crate::record::{Record, RecordStore};
use crate::resolver;
use crate::ring::RingIndex;

/// 一次写入的结果
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteOutcome {
    /// 接收的字节数
    pub accepted: usize,
    /// 本次写入完成的记录数
    pub completed: usize,
    /// 因写满被淘汰并释放的记录数
    pub evicted: usize,
}

/// 统计信息
#[derive(Debug, Clone)]
pub struct LogStats {
    pub capacity: usize,
    pub records: usize,
    pub total_bytes: usize,
    pub pending_bytes: usize,
    pub full: bool,
    pub appended: u64,
    pub evicted: u64,
    pub cursor: usize,
}

impl fmt::Display for LogStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Ring Log Statistics:")?;
        writeln!(
            f,
            "  Records: {}/{}{}",
            self.records,
            self.capacity,
            if self.full { " (full)" } else { "" }
        )?;
        writeln!(f, "  Bytes: {}", self.total_bytes)?;
        writeln!(f, "  Pending: {} bytes", self.pending_bytes)?;
        writeln!(f, "  Appended: {}", self.appended)?;
        writeln!(f, "  Evicted: {}", self.evicted)?;
        writeln!(f, "  Cursor: {}", self.cursor)?;
        Ok(())
    }
}

/// 未加锁的环形日志
#[derive(Debug)]
pub struct RingLog {
    ring: RingIndex,
    pending: RecordStore,
    cursor: usize,
    appended: u64,
    evicted: u64,
}

impl RingLog {
    pub fn new(capacity: usize) -> Result<Self, LogError> {
        Ok(Self {
            ring: RingIndex::new(capacity)?,
            pending: RecordStore::new(),
            cursor: 0,
            appended: 0,
            evicted: 0,
        })
    }

    pub fn ring(&self) -> &RingIndex {
        &self.ring
    }

    /// 写入任意字节，按分隔符切分成记录追加到环形索引
    ///
    /// 未结束的尾部字节保留到下一次写入。写入后游标回到 0。
    pub fn write(&mut self, data: &[u8]) -> Result<WriteOutcome, LogError> {
        self.pending.push(data)?;

        let mut outcome = WriteOutcome {
            accepted: data.len(),
            ..Default::default()
        };
        while let Some(record) = self.pending.take_record() {
            outcome.completed += 1;
            if self.append(record).is_some() {
                outcome.evicted += 1;
            }
        }
        self.cursor = 0;

        debug!(
            "write {} bytes: {} records completed, {} evicted, {} pending",
            data.len(),
            outcome.completed,
            outcome.evicted,
            self.pending.pending_len()
        );
        Ok(outcome)
    }

    /// 追加一条完整记录，返回被淘汰的记录（由调用者释放）
    pub fn append(&mut self, record: Record) -> Option<Record> {
        self.appended += 1;
        let evicted = self.ring.append(record);
        if evicted.is_some() {
            self.evicted += 1;
        }
        evicted
    }

    /// 从全局偏移 `offset` 读取，最多 `max` 字节，不跨记录
    ///
    /// `max` 为 0 时返回 `None`，和读到末尾一样。
    pub fn read_from(&self, offset: usize, max: usize) -> Option<Bytes> {
        if max == 0 {
            return None;
        }
        let (record, local) = self.ring.find(offset)?;
        let available = record.len() - local;
        Some(record.slice_from(local, available.min(max)))
    }

    /// 从游标处读取并推进游标
    pub fn read(&mut self, max: usize) -> Option<Bytes> {
        let chunk = self.read_from(self.cursor, max)?;
        self.cursor += chunk.len();
        Some(chunk)
    }

    /// 定位到第 `index` 条记录的第 `local` 字节，失败时游标不变
    pub fn seek(&mut self, index: usize, local: usize) -> Result<usize, SeekError> {
        let offset = self.ring.seek_offset(index, local)?;
        self.cursor = offset;
        debug!("seek to record {} offset {} -> {}", index, local, offset);
        Ok(offset)
    }

    pub fn llseek(&mut self, pos: SeekFrom) -> Result<usize, SeekError> {
        let offset = resolver::llseek(self.cursor, self.ring.total_bytes(), pos)?;
        self.cursor = offset;
        Ok(offset)
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn total_bytes(&self) -> usize {
        self.ring.total_bytes()
    }

    pub fn contents(&self) -> Vec<u8> {
        self.ring.contents()
    }

    pub fn stats(&self) -> LogStats {
        LogStats {
            capacity: self.ring.capacity(),
            records: self.ring.len(),
            total_bytes: self.ring.total_bytes(),
            pending_bytes: self.pending.pending_len(),
            full: self.ring.is_full(),
            appended: self.appended,
            evicted: self.evicted,
            cursor: self.cursor,
        }
    }

    /// 释放全部记录和待完成缓冲
    pub fn reset(&mut self) {
        self.ring.reset();
        self.pending.clear();
        self.cursor = 0;
    }
}

/// 带锁的设备接口
///
/// 每个操作独占一次锁；锁中毒时返回 `LogError::Poisoned`，
/// 只放弃当前操作。
#[derive(Debug)]
pub struct LogDevice {
    inner: Mutex<RingLog>,
}

impl LogDevice {
    pub fn new(capacity: usize) -> Result<Self, LogError> {
        Ok(Self {
            inner: Mutex::new(RingLog::new(capacity)?),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, RingLog>, LogError> {
        self.inner.lock().map_err(|_| LogError::Poisoned)
    }

    /// 在锁内执行任意操作
    pub fn with<R>(&self, f: impl FnOnce(&mut RingLog) -> R) -> Result<R, LogError> {
        let mut log = self.lock()?;
        Ok(f(&mut log))
    }

    pub fn write(&self, data: &[u8]) -> Result<WriteOutcome, LogError> {
        self.lock()?.write(data)
    }

    pub fn append(&self, record: Record) -> Result<Option<Record>, LogError> {
        Ok(self.lock()?.append(record))
    }

    pub fn read_from(&self, offset: usize, max: usize) -> Result<Option<Bytes>, LogError> {
        Ok(self.lock()?.read_from(offset, max))
    }

    pub fn read(&self, max: usize) -> Result<Option<Bytes>, LogError> {
        Ok(self.lock()?.read(max))
    }

    pub fn seek(&self, index: usize, local: usize) -> Result<usize, LogError> {
        Ok(self.lock()?.seek(index, local)?)
    }

    pub fn llseek(&self, pos: SeekFrom) -> Result<usize, LogError> {
        Ok(self.lock()?.llseek(pos)?)
    }

    pub fn cursor(&self) -> Result<usize, LogError> {
        Ok(self.lock()?.cursor())
    }

    pub fn total_bytes(&self) -> Result<usize, LogError> {
        Ok(self.lock()?.total_bytes())
    }

    pub fn contents(&self) -> Result<Vec<u8>, LogError> {
        Ok(self.lock()?.contents())
    }

    pub fn stats(&self) -> Result<LogStats, LogError> {
        Ok(self.lock()?.stats())
    }

    /// 卸载时释放所有记录
    pub fn release(&self) -> Result<(), LogError> {
        self.lock()?.reset();
        Ok(())
    }
}
