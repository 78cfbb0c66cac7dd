//! 偏移解析
//!
//! 读路径只认全局偏移；定位（记录号 + 记录内偏移）先换算成全局偏移，
//! 再交给读路径解析。所有函数都是无状态的，加锁由调用者负责。

use std::io::SeekFrom;

use crate::error::SeekError;
use crate::ring::RingIndex;

/// 全局偏移 -> (记录号, 记录内偏移)
///
/// 按从旧到新遍历存活记录，逐条扣减记录长度，直到剩余偏移落在某条记录内。
/// `offset >= total_bytes()` 时返回 `None`。
pub fn resolve(ring: &RingIndex, offset: usize) -> Option<(usize, usize)> {
    if offset >= ring.total_bytes() {
        return None;
    }

    let mut remaining = offset;
    for (index, rec) in ring.iter().enumerate() {
        if remaining < rec.len() {
            return Some((index, remaining));
        }
        remaining -= rec.len();
    }
    None
}

/// (记录号, 记录内偏移) -> 全局偏移
pub fn seek_offset(ring: &RingIndex, index: usize, local: usize) -> Result<usize, SeekError> {
    let live = ring.len();
    let target = ring
        .get(index)
        .ok_or(SeekError::RecordOutOfRange { index, live })?;
    if local >= target.len() {
        return Err(SeekError::OffsetOutOfRange {
            offset: local,
            size: target.len(),
        });
    }

    let before: usize = ring.iter().take(index).map(|r| r.len()).sum();
    Ok(before + local)
}

/// 标准 llseek 语义，结果必须落在 `[0, total]`
pub fn llseek(current: usize, total: usize, pos: SeekFrom) -> Result<usize, SeekError> {
    let (base, delta) = match pos {
        SeekFrom::Start(n) => {
            let n = usize::try_from(n).map_err(|_| SeekError::InvalidPosition)?;
            (n as i128, 0i128)
        }
        SeekFrom::Current(d) => (current as i128, d as i128),
        SeekFrom::End(d) => (total as i128, d as i128),
    };
    let target = base + delta;
    if target < 0 || target > total as i128 {
        return Err(SeekError::InvalidPosition);
    }
    Ok(target as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Record;

    fn sample() -> RingIndex {
        let mut ring = RingIndex::new(3).unwrap();
        ring.append(Record::from(b"a\n".as_slice()));
        ring.append(Record::from(b"bb\n".as_slice()));
        ring.append(Record::from(b"ccc\n".as_slice()));
        ring
    }

    #[test]
    fn resolve_walks_oldest_first() {
        let ring = sample();
        assert_eq!(resolve(&ring, 0), Some((0, 0)));
        assert_eq!(resolve(&ring, 1), Some((0, 1)));
        assert_eq!(resolve(&ring, 2), Some((1, 0)));
        assert_eq!(resolve(&ring, 4), Some((1, 2)));
        assert_eq!(resolve(&ring, 5), Some((2, 0)));
        assert_eq!(resolve(&ring, 8), Some((2, 3)));
        assert_eq!(resolve(&ring, 9), None);
    }

    #[test]
    fn resolve_on_empty_ring() {
        let ring = RingIndex::new(4).unwrap();
        assert_eq!(resolve(&ring, 0), None);
    }

    #[test]
    fn seek_round_trip() {
        let ring = sample();
        for index in 0..ring.len() {
            let size = ring.get(index).unwrap().len();
            for local in 0..size {
                let offset = seek_offset(&ring, index, local).unwrap();
                assert_eq!(resolve(&ring, offset), Some((index, local)));
            }
        }
        assert_eq!(seek_offset(&ring, 1, 1), Ok(3));
    }

    #[test]
    fn seek_out_of_range() {
        let ring = sample();
        assert_eq!(
            seek_offset(&ring, 3, 0),
            Err(SeekError::RecordOutOfRange { index: 3, live: 3 })
        );
        assert_eq!(
            seek_offset(&ring, 1, 3),
            Err(SeekError::OffsetOutOfRange { offset: 3, size: 3 })
        );
    }

    #[test]
    fn llseek_bounds() {
        assert_eq!(llseek(0, 9, SeekFrom::Start(9)), Ok(9));
        assert_eq!(llseek(4, 9, SeekFrom::Current(-4)), Ok(0));
        assert_eq!(llseek(4, 9, SeekFrom::End(-1)), Ok(8));
        assert_eq!(llseek(0, 9, SeekFrom::Start(10)), Err(SeekError::InvalidPosition));
        assert_eq!(llseek(2, 9, SeekFrom::Current(-3)), Err(SeekError::InvalidPosition));
        assert_eq!(llseek(0, 9, SeekFrom::End(1)), Err(SeekError::InvalidPosition));
    }
}
