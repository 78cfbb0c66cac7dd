//! 连接处理
//!
//! 每个连接一个任务，状态机：
//! `Accumulating` → `Appending` → `Streaming`（文件）/ `Replying`（环形日志）→ `Done`
//!
//! 1. 接收数据直到某个数据块中出现分隔符（连接在此之前关闭则不追加任何内容）
//! 2. 依次处理缓冲中的完整记录：定位命令修改游标，其余记录追加；最后一个分隔符之后的字节丢弃
//! 3. 从游标处把日志内容原样发回：环形日志在追加的同一次加锁内整体拷贝后发送，
//!    文件后端按块读取（文件只增不减，偏移不会失效）
//! 4. 关闭连接

use bytes::{Bytes, BytesMut};
use reclog::{Record, RecordStore};
use std::fmt;
use std::net::SocketAddr;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::error::WorkerError;
use crate::shared::{Request, SharedLog};

/// 单次接收的数据块大小
pub const RECV_CHUNK_SIZE: usize = 1024;

/// 回传时单次拷贝的最大字节数
pub const STREAM_CHUNK_SIZE: usize = 4096;

#[derive(Debug)]
enum WorkerState {
    Accumulating,
    Appending(Vec<Record>),
    Streaming { pos: usize },
    Replying(Bytes),
    Done,
}

/// 连接结束时的汇总
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerReport {
    pub peer: SocketAddr,
    pub records: usize,
    pub seeks: usize,
    pub rejected: usize,
    pub bytes_sent: usize,
}

impl WorkerReport {
    fn new(peer: SocketAddr) -> Self {
        Self {
            peer,
            records: 0,
            seeks: 0,
            rejected: 0,
            bytes_sent: 0,
        }
    }
}

impl fmt::Display for WorkerReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} records, {} seeks, {} rejected, {} bytes sent",
            self.peer, self.records, self.seeks, self.rejected, self.bytes_sent
        )
    }
}

/// 处理一个连接，任何错误都只结束本连接
pub async fn handle_connection<S>(
    mut stream: S,
    peer: SocketAddr,
    log: SharedLog,
    mut shutdown: watch::Receiver<bool>,
) -> WorkerReport
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    info!("Accepted connection from {}", peer.ip());

    let mut report = WorkerReport::new(peer);
    let mut state = WorkerState::Accumulating;

    loop {
        state = match state {
            WorkerState::Accumulating => match receive(&mut stream, &mut shutdown).await {
                Ok(Some(records)) => WorkerState::Appending(records),
                Ok(None) => {
                    debug!("{} closed before a complete record", peer);
                    WorkerState::Done
                }
                Err(e) => {
                    warn!("receive from {} failed: {}", peer, e);
                    WorkerState::Done
                }
            },
            WorkerState::Appending(records) => {
                let requests = records.into_iter().map(Request::classify).collect();
                match log.apply(requests).await {
                    Ok(outcome) => {
                        report.records += outcome.appended;
                        report.seeks += outcome.seeks;
                        report.rejected += outcome.rejected;
                        match outcome.snapshot {
                            Some(snapshot) => WorkerState::Replying(snapshot),
                            None => WorkerState::Streaming {
                                pos: outcome.cursor,
                            },
                        }
                    }
                    Err(e) => {
                        warn!("append from {} failed: {}", peer, e);
                        WorkerState::Done
                    }
                }
            }
            WorkerState::Streaming { pos } => {
                match send_chunk(&mut stream, &log, pos).await {
                    Ok(0) => WorkerState::Done,
                    Ok(n) => {
                        report.bytes_sent += n;
                        WorkerState::Streaming { pos: pos + n }
                    }
                    Err(e) => {
                        warn!("send to {} failed: {}", peer, e);
                        WorkerState::Done
                    }
                }
            }
            WorkerState::Replying(mut rest) => {
                if rest.is_empty() {
                    WorkerState::Done
                } else {
                    let chunk = rest.split_to(rest.len().min(STREAM_CHUNK_SIZE));
                    match stream.write_all(&chunk).await {
                        Ok(()) => {
                            report.bytes_sent += chunk.len();
                            WorkerState::Replying(rest)
                        }
                        Err(e) => {
                            warn!("send to {} failed: {}", peer, e);
                            WorkerState::Done
                        }
                    }
                }
            }
            WorkerState::Done => break,
        };
    }

    if let Err(e) = stream.shutdown().await {
        debug!("shutdown of {} failed: {}", peer, e);
    }
    info!("Closed connection from {}", peer.ip());
    report
}

/// 接收到第一个含分隔符的数据块为止，返回其中的完整记录
///
/// 连接在出现分隔符前关闭时返回 `None`。
async fn receive<S>(
    stream: &mut S,
    shutdown: &mut watch::Receiver<bool>,
) -> Result<Option<Vec<Record>>, WorkerError>
where
    S: AsyncRead + Unpin,
{
    let mut store = RecordStore::new();
    let mut buf = BytesMut::with_capacity(RECV_CHUNK_SIZE);

    loop {
        if *shutdown.borrow() {
            return Err(WorkerError::Shutdown);
        }
        buf.clear();
        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() {
                    return Err(WorkerError::Shutdown);
                }
            }
            n = stream.read_buf(&mut buf) => {
                if n? == 0 {
                    return Ok(None);
                }
                store.push(&buf)?;
                if store.has_record() {
                    return Ok(Some(store.drain_records()));
                }
            }
        }
    }
}

/// 拷贝一段数据（持锁）后发送（不持锁），返回发送的字节数
async fn send_chunk<S>(stream: &mut S, log: &SharedLog, pos: usize) -> Result<usize, WorkerError>
where
    S: AsyncWrite + Unpin,
{
    let Some(chunk) = log.read_chunk(pos, STREAM_CHUNK_SIZE).await? else {
        return Ok(0);
    };
    stream.write_all(&chunk).await?;
    Ok(chunk.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backing::Backing;
    use reclog::RingLog;
    use tokio::io::duplex;

    fn peer() -> SocketAddr {
        "127.0.0.1:40000".parse().unwrap()
    }

    fn device(capacity: usize) -> SharedLog {
        SharedLog::new(Backing::Device(RingLog::new(capacity).unwrap()))
    }

    async fn exchange(log: &SharedLog, input: &[u8]) -> (Vec<u8>, WorkerReport) {
        let (_tx, rx) = watch::channel(false);
        let (mut client, server) = duplex(64 * 1024);
        let worker = tokio::spawn(handle_connection(server, peer(), log.clone(), rx));

        client.write_all(input).await.unwrap();
        client.shutdown().await.unwrap();
        let mut out = Vec::new();
        client.read_to_end(&mut out).await.unwrap();
        (out, worker.await.unwrap())
    }

    #[tokio::test]
    async fn append_returns_whole_log() {
        let log = device(10);
        let (out, report) = exchange(&log, b"hello\n").await;
        assert_eq!(out, b"hello\n");
        assert_eq!(report.records, 1);

        let (out, report) = exchange(&log, b"world\n").await;
        assert_eq!(out, b"hello\nworld\n");
        assert_eq!(report.bytes_sent, 12);
    }

    #[tokio::test]
    async fn several_records_in_one_chunk() {
        let log = device(10);
        let (out, report) = exchange(&log, b"a\nbb\ntail").await;
        assert_eq!(out, b"a\nbb\n");
        assert_eq!(report.records, 2);
        assert_eq!(log.contents().await.unwrap(), b"a\nbb\n");
    }

    #[tokio::test]
    async fn seek_streams_from_cursor() {
        let log = device(10);
        exchange(&log, b"a\nbb\nccc\n").await;

        let (out, report) = exchange(&log, b"AESDCHAR_IOCSEEKTO:1,1\n").await;
        assert_eq!(out, b"b\nccc\n");
        assert_eq!(report.seeks, 1);
        assert_eq!(report.records, 0);
    }

    #[tokio::test]
    async fn rejected_seek_streams_from_unchanged_cursor() {
        let log = device(10);
        exchange(&log, b"a\nbb\n").await;

        let (out, report) = exchange(&log, b"AESDCHAR_IOCSEEKTO:9,0\n").await;
        assert_eq!(out, b"a\nbb\n");
        assert_eq!(report.rejected, 1);
    }

    #[tokio::test]
    async fn close_without_delimiter_appends_nothing() {
        let log = device(10);
        let (out, report) = exchange(&log, b"no newline").await;
        assert!(out.is_empty());
        assert_eq!(report.records, 0);
        assert_eq!(log.total_bytes().await.unwrap(), 0);
    }

    /// 慢速客户端读取回传期间，另一个写入淘汰了最旧记录
    #[tokio::test]
    async fn eviction_during_reply_keeps_records_whole() {
        let log = device(3);
        exchange(&log, b"a\nbb\n").await;

        let (_tx, rx) = watch::channel(false);
        let (mut client, server) = duplex(2);
        let worker = tokio::spawn(handle_connection(server, peer(), log.clone(), rx));

        client.write_all(b"ccc\n").await.unwrap();
        client.shutdown().await.unwrap();

        // 收到回传的前几个字节说明追加已完成，此时回传还没发完
        let mut head = [0u8; 2];
        client.read_exact(&mut head).await.unwrap();
        log.submit(Record::from(b"dddd\n".as_slice())).await.unwrap();

        let mut out = head.to_vec();
        client.read_to_end(&mut out).await.unwrap();
        let report = worker.await.unwrap();

        assert_eq!(out, b"a\nbb\nccc\n");
        assert_eq!(report.bytes_sent, out.len());
        assert_eq!(log.contents().await.unwrap(), b"bb\nccc\ndddd\n");
    }

    #[tokio::test]
    async fn shutdown_ends_waiting_worker() {
        let log = device(10);
        let (tx, rx) = watch::channel(false);
        let (mut client, server) = duplex(1024);
        let worker = tokio::spawn(handle_connection(server, peer(), log.clone(), rx));

        client.write_all(b"partial").await.unwrap();
        tx.send(true).unwrap();

        let report = worker.await.unwrap();
        assert_eq!(report.records, 0);
        let mut out = Vec::new();
        client.read_to_end(&mut out).await.unwrap();
        assert!(out.is_empty());
    }
}
