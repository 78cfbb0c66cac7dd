//! 环形记录索引
//!
//! 固定容量 N 的槽位数组，`head` 指向最旧记录，`tail` 指向下一个写入槽。
//! 写满后每次追加先淘汰最旧记录，被淘汰的记录交还调用者释放。
//!
//! ```text
//! ┌────────┬────────┬────────┬────────┬────────┐
//! │ rec 3  │ rec 4  │ rec 0  │ rec 1  │ rec 2  │   full = true
//! └────────┴────────┴────────┴────────┴────────┘
//!               ↑ tail/head (写满时重合)
//! ```
//!
//! 全局偏移 = 所有存活记录按从旧到新拼接后的字节位置。

use crate::error::{LogError, SeekError};
use crate::record::Record;
use crate::resolver;

/// 环形索引
#[derive(Debug)]
pub struct RingIndex {
    slots: Box<[Option<Record>]>,
    head: usize, // 最旧记录
    tail: usize, // 下一个写入位置
    full: bool,
    total_bytes: usize,
}

impl RingIndex {
    pub fn new(capacity: usize) -> Result<Self, LogError> {
        if capacity == 0 {
            return Err(LogError::ZeroCapacity);
        }
        Ok(Self {
            slots: (0..capacity).map(|_| None).collect(),
            head: 0,
            tail: 0,
            full: false,
            total_bytes: 0,
        })
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// 存活记录数
    pub fn len(&self) -> usize {
        if self.full {
            self.capacity()
        } else if self.tail >= self.head {
            self.tail - self.head
        } else {
            self.capacity() - self.head + self.tail
        }
    }

    pub fn is_empty(&self) -> bool {
        !self.full && self.head == self.tail
    }

    /// 是否曾经写满（reset 之前一直保持）
    pub fn is_full(&self) -> bool {
        self.full
    }

    /// 追加记录，写满时返回被淘汰的最旧记录
    pub fn append(&mut self, record: Record) -> Option<Record> {
        let cap = self.capacity();
        let evicted = if self.full {
            let old = self.slots[self.head].take();
            self.head = (self.head + 1) % cap;
            old
        } else {
            None
        };
        if let Some(ref old) = evicted {
            self.total_bytes -= old.len();
        }

        self.total_bytes += record.len();
        self.slots[self.tail] = Some(record);
        self.tail = (self.tail + 1) % cap;
        if self.tail == self.head {
            self.full = true;
        }

        evicted
    }

    /// 所有存活记录的字节总数
    pub fn total_bytes(&self) -> usize {
        self.total_bytes
    }

    /// 第 `index` 条存活记录（最旧为 0）
    pub fn get(&self, index: usize) -> Option<&Record> {
        if index >= self.len() {
            return None;
        }
        let slot = (self.head + index) % self.capacity();
        self.slots[slot].as_ref()
    }

    /// 按从旧到新的顺序遍历
    pub fn iter(&self) -> impl Iterator<Item = &Record> + '_ {
        (0..self.len()).filter_map(move |i| self.get(i))
    }

    /// 全局偏移 -> (记录, 记录内偏移)
    ///
    /// 偏移恰好落在记录边界时指向下一条记录的第 0 字节。
    pub fn find(&self, offset: usize) -> Option<(&Record, usize)> {
        let (index, local) = resolver::resolve(self, offset)?;
        self.get(index).map(|rec| (rec, local))
    }

    /// (记录号, 记录内偏移) -> 全局偏移
    pub fn seek_offset(&self, index: usize, local: usize) -> Result<usize, SeekError> {
        resolver::seek_offset(self, index, local)
    }

    /// 拼接所有存活记录
    pub fn contents(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.total_bytes);
        for rec in self.iter() {
            out.extend_from_slice(rec.as_bytes());
        }
        out
    }

    /// 清空所有槽位并释放记录
    pub fn reset(&mut self) {
        for slot in self.slots.iter_mut() {
            *slot = None;
        }
        self.head = 0;
        self.tail = 0;
        self.full = false;
        self.total_bytes = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ring_of(capacity: usize, records: &[&'static [u8]]) -> RingIndex {
        let mut ring = RingIndex::new(capacity).unwrap();
        for r in records {
            assert!(ring.append(Record::from(*r)).is_none());
        }
        ring
    }

    #[test]
    fn zero_capacity_rejected() {
        assert!(matches!(RingIndex::new(0), Err(LogError::ZeroCapacity)));
    }

    #[test]
    fn append_until_full() {
        let mut ring = RingIndex::new(3).unwrap();
        assert!(ring.is_empty());
        ring.append(Record::from(b"a\n".as_slice()));
        ring.append(Record::from(b"bb\n".as_slice()));
        assert_eq!(ring.len(), 2);
        assert!(!ring.is_full());

        ring.append(Record::from(b"ccc\n".as_slice()));
        assert_eq!(ring.len(), 3);
        assert!(ring.is_full());
        assert_eq!(ring.total_bytes(), 9);
    }

    #[test]
    fn overflow_evicts_oldest() {
        let mut ring = ring_of(3, &[b"a\n", b"bb\n", b"ccc\n"]);

        let evicted = ring.append(Record::from(b"dddd\n".as_slice())).unwrap();
        assert_eq!(evicted.as_bytes(), b"a\n");
        assert_eq!(ring.len(), 3);
        assert!(ring.is_full());
        assert_eq!(ring.total_bytes(), 12);
        assert_eq!(ring.get(0).unwrap().as_bytes(), b"bb\n");
        assert_eq!(ring.get(2).unwrap().as_bytes(), b"dddd\n");
        assert!(ring.get(3).is_none());

        // 再转一圈，依然只保留最新的 3 条
        for i in 0..5u8 {
            let evicted = ring.append(Record::from(vec![b'0' + i, b'\n']));
            assert!(evicted.is_some());
        }
        assert_eq!(ring.contents(), b"2\n3\n4\n");
        assert_eq!(ring.total_bytes(), 6);
    }

    #[test]
    fn find_resolves_boundaries() {
        let ring = ring_of(3, &[b"a\n", b"bb\n", b"ccc\n"]);

        let (rec, off) = ring.find(0).unwrap();
        assert_eq!((rec.as_bytes(), off), (b"a\n".as_slice(), 0));
        let (rec, off) = ring.find(1).unwrap();
        assert_eq!((rec.as_bytes(), off), (b"a\n".as_slice(), 1));
        let (rec, off) = ring.find(2).unwrap();
        assert_eq!((rec.as_bytes(), off), (b"bb\n".as_slice(), 0));
        let (rec, off) = ring.find(8).unwrap();
        assert_eq!((rec.as_bytes(), off), (b"ccc\n".as_slice(), 3));
        assert!(ring.find(9).is_none());
        assert!(ring.find(usize::MAX).is_none());
    }

    #[test]
    fn find_after_eviction_skips_evicted() {
        let mut ring = ring_of(3, &[b"a\n", b"bb\n", b"ccc\n"]);
        ring.append(Record::from(b"dddd\n".as_slice()));

        let (rec, off) = ring.find(0).unwrap();
        assert_eq!((rec.as_bytes(), off), (b"bb\n".as_slice(), 0));
        for offset in 0..ring.total_bytes() {
            let (rec, _) = ring.find(offset).unwrap();
            assert_ne!(rec.as_bytes(), b"a\n");
        }
        assert!(ring.find(12).is_none());
    }

    #[test]
    fn every_offset_matches_concatenation() {
        let ring = ring_of(10, &[b"hello\n", b"this\n", b"is\n", b"AESD\n", b"\n"]);
        let flat = ring.contents();
        assert_eq!(flat.len(), ring.total_bytes());
        for (offset, byte) in flat.iter().enumerate() {
            let (rec, local) = ring.find(offset).unwrap();
            assert!(local < rec.len());
            assert_eq!(rec.as_bytes()[local], *byte);
        }
    }

    #[test]
    fn reset_releases_everything() {
        let mut ring = ring_of(2, &[b"x\n", b"y\n"]);
        assert!(ring.is_full());
        ring.reset();
        assert!(ring.is_empty());
        assert!(!ring.is_full());
        assert_eq!(ring.total_bytes(), 0);
        assert!(ring.find(0).is_none());
        assert!(ring.append(Record::from(b"z\n".as_slice())).is_none());
        assert_eq!(ring.contents(), b"z\n");
    }
}
