//! 时间戳注入
//!
//! 文件后端下每隔固定间隔追加一条本地时间记录：
//! `timestamp:Tue, 05 Mar 2024 07:08:09 +0800\n`

use chrono::{DateTime, Local, TimeZone};
use reclog::Record;
use std::fmt::Display;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, warn};

use crate::error::WorkerError;
use crate::shared::SharedLog;

const TIMESTAMP_FORMAT: &str = "timestamp:%a, %d %b %Y %H:%M:%S %z\n";

pub fn format_timestamp<Tz>(now: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    now.format(TIMESTAMP_FORMAT).to_string()
}

/// 定时追加时间戳，收到退出信号后返回已追加的条数
///
/// 第一次在启动后一个间隔时触发；每次追加完成后才等待下一次。
pub async fn run_injector(
    log: SharedLog,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> usize {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut count = 0;

    loop {
        if *shutdown.borrow() {
            break;
        }
        tokio::select! {
            biased;
            changed = shutdown.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            _ = ticker.tick() => {
                let line = format_timestamp(&Local::now());
                match log.submit(Record::from(line.into_bytes())).await {
                    Ok(()) => {
                        count += 1;
                        debug!("timestamp record appended");
                    }
                    Err(WorkerError::Released) => break,
                    Err(e) => warn!("timestamp append failed: {}", e),
                }
            }
        }
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backing::Backing;
    use chrono::FixedOffset;
    use reclog::RingLog;

    #[test]
    fn timestamp_format() {
        let utc = FixedOffset::east_opt(0).unwrap();
        let t = utc.with_ymd_and_hms(2024, 3, 5, 7, 8, 9).unwrap();
        assert_eq!(
            format_timestamp(&t),
            "timestamp:Tue, 05 Mar 2024 07:08:09 +0000\n"
        );

        let cst = FixedOffset::east_opt(8 * 3600).unwrap();
        let t = cst.with_ymd_and_hms(2023, 12, 31, 23, 59, 59).unwrap();
        assert_eq!(
            format_timestamp(&t),
            "timestamp:Sun, 31 Dec 2023 23:59:59 +0800\n"
        );
    }

    #[tokio::test]
    async fn injector_appends_until_shutdown() {
        let log = SharedLog::new(Backing::Device(RingLog::new(100).unwrap()));
        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(run_injector(log.clone(), Duration::from_millis(40), rx));

        tokio::time::sleep(Duration::from_millis(150)).await;
        tx.send(true).unwrap();
        let count = handle.await.unwrap();
        assert!(count >= 2, "only {} timestamps", count);

        let records = log.records().await.unwrap();
        assert_eq!(records, count);
        let contents = log.contents().await.unwrap();
        let text = String::from_utf8(contents).unwrap();
        assert!(text.lines().all(|l| l.starts_with("timestamp:")));

        // 退出后不再追加
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(log.records().await.unwrap(), count);
    }

    #[tokio::test]
    async fn injector_stops_when_log_released() {
        let log = SharedLog::new(Backing::Device(RingLog::new(4).unwrap()));
        log.release().await.unwrap();
        let (_tx, rx) = watch::channel(false);
        let count = run_injector(log, Duration::from_millis(10), rx).await;
        assert_eq!(count, 0);
    }
}
