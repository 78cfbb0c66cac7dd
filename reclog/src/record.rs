//! 记录结构
//!
//! `Record` 是一条以分隔符结尾的完整记录，写入环形索引后不可变；
//! `RecordStore` 是生产者侧尚未结束的记录缓冲。

use bytes::Bytes;

use crate::constants::DELIMITER;
use crate::error::LogError;

/// 单条完整记录
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    data: Bytes,
}

impl Record {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self { data: data.into() }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// 从 `offset` 开始最多取 `max` 字节，返回数据的一份廉价拷贝
    pub fn slice_from(&self, offset: usize, max: usize) -> Bytes {
        let end = offset.saturating_add(max).min(self.data.len());
        self.data.slice(offset.min(end)..end)
    }
}

impl From<&'static [u8]> for Record {
    fn from(data: &'static [u8]) -> Self {
        Self::new(data)
    }
}

impl From<Vec<u8>> for Record {
    fn from(data: Vec<u8>) -> Self {
        Self::new(data)
    }
}

/// 待完成记录的累积缓冲
///
/// 字节可以分多次到达；每遇到一个分隔符就切出一条 `Record`，
/// 分隔符之后的剩余字节留在缓冲中等待后续数据。
#[derive(Debug, Default)]
pub struct RecordStore {
    buf: Vec<u8>,
}

impl RecordStore {
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }

    /// 追加字节。扩容失败时返回 `LogError::Alloc`，已有内容不受影响
    pub fn push(&mut self, data: &[u8]) -> Result<(), LogError> {
        self.buf
            .try_reserve(data.len())
            .map_err(|_| LogError::Alloc(data.len()))?;
        self.buf.extend_from_slice(data);
        Ok(())
    }

    /// 缓冲中是否已有完整记录
    pub fn has_record(&self) -> bool {
        self.buf.contains(&DELIMITER)
    }

    /// 取出第一条完整记录（包含分隔符）
    pub fn take_record(&mut self) -> Option<Record> {
        let end = self.buf.iter().position(|&b| b == DELIMITER)? + 1;
        let rest = self.buf.split_off(end);
        let data = std::mem::replace(&mut self.buf, rest);
        Some(Record::new(data))
    }

    /// 取出所有完整记录
    pub fn drain_records(&mut self) -> Vec<Record> {
        let mut records = Vec::new();
        while let Some(record) = self.take_record() {
            records.push(record);
        }
        records
    }

    pub fn pending_len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// 丢弃未结束的字节
    pub fn clear(&mut self) {
        self.buf = Vec::new();
    }
}
