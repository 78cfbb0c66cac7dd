//! 后端存储
//!
//! 两种部署方式：
//! - `Device`: 内存环形日志（固定容量，写满淘汰最旧记录），不落盘
//! - `File`: 平铺文件，保存本进程接收的全部记录，退出时删除
//!
//! 两者都以“全局偏移”对外提供读取和按记录定位。

use bytes::{Bytes, BytesMut};
use reclog::{Record, RingLog, SeekError};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::config::{BackingKind, ServerConfig};

/// 平铺文件后端
///
/// 文件内容为所有记录的拼接；`sizes` 记录每条记录的长度，用于按记录定位。
#[derive(Debug)]
pub struct FileLog {
    path: PathBuf,
    file: File,
    sizes: Vec<usize>,
    len: usize,
}

impl FileLog {
    /// 创建（或截断）数据文件
    pub fn create<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir)?;
            }
        }
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)?;
        Ok(Self {
            path,
            file,
            sizes: Vec::new(),
            len: 0,
        })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn records(&self) -> usize {
        self.sizes.len()
    }

    pub fn append(&mut self, record: &Record) -> io::Result<()> {
        self.file.seek(SeekFrom::Start(self.len as u64))?;
        self.file.write_all(record.as_bytes())?;
        self.file.flush()?;
        self.sizes.push(record.len());
        self.len += record.len();
        Ok(())
    }

    /// 从 `offset` 读取最多 `max` 字节，`offset` 到达末尾时返回 `None`
    pub fn read_from(&mut self, offset: usize, max: usize) -> io::Result<Option<Bytes>> {
        if offset >= self.len {
            return Ok(None);
        }
        let n = (self.len - offset).min(max);
        let mut buf = vec![0u8; n];
        self.file.seek(SeekFrom::Start(offset as u64))?;
        self.file.read_exact(&mut buf)?;
        Ok(Some(Bytes::from(buf)))
    }

    pub fn seek_offset(&self, index: usize, local: usize) -> Result<usize, SeekError> {
        let size = *self.sizes.get(index).ok_or(SeekError::RecordOutOfRange {
            index,
            live: self.sizes.len(),
        })?;
        if local >= size {
            return Err(SeekError::OffsetOutOfRange {
                offset: local,
                size,
            });
        }
        Ok(self.sizes[..index].iter().sum::<usize>() + local)
    }

    /// 关闭并删除数据文件
    pub fn remove(self) -> io::Result<()> {
        let Self { path, file, .. } = self;
        drop(file);
        fs::remove_file(path)
    }
}

/// 后端存储
#[derive(Debug)]
pub enum Backing {
    Device(RingLog),
    File(FileLog),
}

impl Backing {
    pub fn open(config: &ServerConfig) -> anyhow::Result<Self> {
        Ok(match config.backing {
            BackingKind::Device => Backing::Device(RingLog::new(config.capacity)?),
            BackingKind::File => Backing::File(FileLog::create(&config.data_file)?),
        })
    }

    pub fn kind(&self) -> BackingKind {
        match self {
            Backing::Device(_) => BackingKind::Device,
            Backing::File(_) => BackingKind::File,
        }
    }

    /// 追加记录，返回是否淘汰了旧记录
    pub fn append(&mut self, record: Record) -> io::Result<bool> {
        match self {
            Backing::Device(log) => Ok(log.append(record).is_some()),
            Backing::File(file) => file.append(&record).map(|_| false),
        }
    }

    pub fn read_from(&mut self, offset: usize, max: usize) -> io::Result<Option<Bytes>> {
        match self {
            Backing::Device(log) => Ok(log.read_from(offset, max)),
            Backing::File(file) => file.read_from(offset, max),
        }
    }

    /// 环形日志：拷贝 `offset` 之后的全部内容（最多 N 条记录）
    ///
    /// 环形日志的偏移在淘汰后会整体前移，回传内容必须在同一次加锁内取完。
    /// 文件后端不会淘汰，返回 `None`，由调用者分块读取。
    pub fn snapshot_from(&self, offset: usize) -> Option<Bytes> {
        match self {
            Backing::Device(log) => {
                let mut out = BytesMut::with_capacity(log.total_bytes().saturating_sub(offset));
                while let Some(chunk) = log.read_from(offset + out.len(), usize::MAX) {
                    out.extend_from_slice(&chunk);
                }
                Some(out.freeze())
            }
            Backing::File(_) => None,
        }
    }

    pub fn seek_offset(&self, index: usize, local: usize) -> Result<usize, SeekError> {
        match self {
            Backing::Device(log) => log.ring().seek_offset(index, local),
            Backing::File(file) => file.seek_offset(index, local),
        }
    }

    pub fn total_bytes(&self) -> usize {
        match self {
            Backing::Device(log) => log.total_bytes(),
            Backing::File(file) => file.len(),
        }
    }

    pub fn records(&self) -> usize {
        match self {
            Backing::Device(log) => log.ring().len(),
            Backing::File(file) => file.records(),
        }
    }

    /// 释放存储：环形日志清空，文件删除
    pub fn release(self) -> io::Result<()> {
        match self {
            Backing::Device(mut log) => {
                log.reset();
                Ok(())
            }
            Backing::File(file) => file.remove(),
        }
    }
}
