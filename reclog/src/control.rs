//! 定位控制命令
//!
//! 写入内容若为 `AESDCHAR_IOCSEEKTO:<记录号>,<记录内偏移>\n`，不作为记录追加，
//! 而是把游标移动到对应位置。

use std::fmt;
use std::str;

use crate::constants::SEEK_COMMAND_PREFIX;
use crate::error::SeekError;

/// 定位到第 `record` 条记录的第 `offset` 字节
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeekTo {
    pub record: usize,
    pub offset: usize,
}

impl SeekTo {
    pub fn new(record: usize, offset: usize) -> Self {
        Self { record, offset }
    }

    /// 判断一行数据是否为控制命令
    ///
    /// - 不带前缀：`None`，按普通记录处理
    /// - 带前缀但数字不合法：`Some(Err(SeekError::Malformed))`
    pub fn parse(line: &[u8]) -> Option<Result<Self, SeekError>> {
        let rest = line.strip_prefix(SEEK_COMMAND_PREFIX.as_bytes())?;
        Some(Self::parse_args(rest))
    }

    fn parse_args(rest: &[u8]) -> Result<Self, SeekError> {
        let text = str::from_utf8(rest).map_err(|_| SeekError::Malformed)?;
        let text = text.strip_suffix('\n').unwrap_or(text);
        let text = text.strip_suffix('\r').unwrap_or(text);

        let (record, offset) = text.split_once(',').ok_or(SeekError::Malformed)?;
        Ok(Self {
            record: parse_unsigned(record)?,
            offset: parse_unsigned(offset)?,
        })
    }

    /// 编码为一行命令（含分隔符）
    pub fn to_line(&self) -> String {
        format!("{}\n", self)
    }
}

impl fmt::Display for SeekTo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{},{}", SEEK_COMMAND_PREFIX, self.record, self.offset)
    }
}

fn parse_unsigned(field: &str) -> Result<usize, SeekError> {
    let field = field.trim_matches(|c: char| c == ' ' || c == '\t');
    // usize::from_str 接受前导 '+'，这里只要纯数字
    if field.is_empty() || !field.bytes().all(|b| b.is_ascii_digit()) {
        return Err(SeekError::Malformed);
    }
    field.parse().map_err(|_| SeekError::Malformed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_valid_command() {
        assert_eq!(
            SeekTo::parse(b"AESDCHAR_IOCSEEKTO:3,12\n"),
            Some(Ok(SeekTo::new(3, 12)))
        );
        assert_eq!(
            SeekTo::parse(b"AESDCHAR_IOCSEEKTO:0,0"),
            Some(Ok(SeekTo::new(0, 0)))
        );
        assert_eq!(
            SeekTo::parse(b"AESDCHAR_IOCSEEKTO: 1 , 1\r\n"),
            Some(Ok(SeekTo::new(1, 1)))
        );
    }

    #[test]
    fn plain_records_are_not_commands() {
        assert_eq!(SeekTo::parse(b"hello world\n"), None);
        assert_eq!(SeekTo::parse(b"aesdchar_iocseekto:1,1\n"), None);
        assert_eq!(SeekTo::parse(b" AESDCHAR_IOCSEEKTO:1,1\n"), None);
    }

    #[test]
    fn malformed_arguments() {
        let lines: [&[u8]; 8] = [
            b"AESDCHAR_IOCSEEKTO:\n",
            b"AESDCHAR_IOCSEEKTO:1\n",
            b"AESDCHAR_IOCSEEKTO:a,1\n",
            b"AESDCHAR_IOCSEEKTO:1,-1\n",
            b"AESDCHAR_IOCSEEKTO:+1,1\n",
            b"AESDCHAR_IOCSEEKTO:1,2,3\n",
            b"AESDCHAR_IOCSEEKTO:99999999999999999999999,1\n",
            b"AESDCHAR_IOCSEEKTO:1,\xff\n",
        ];
        for line in lines {
            assert_eq!(SeekTo::parse(line), Some(Err(SeekError::Malformed)));
        }
    }

    #[test]
    fn display_round_trips() {
        let cmd = SeekTo::new(4, 7);
        assert_eq!(cmd.to_line(), "AESDCHAR_IOCSEEKTO:4,7\n");
        assert_eq!(SeekTo::parse(cmd.to_line().as_bytes()), Some(Ok(cmd)));
    }
}
