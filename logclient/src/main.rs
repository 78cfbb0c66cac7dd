//! 记录日志服务命令行客户端
//!
//! 使用方法:
//!   logclient send "hello world"      # 追加一条记录并打印日志
//!   logclient seek 1 2                # 定位后打印
//!   logclient -H 10.0.0.2 -p 9000 send foo

use anyhow::Result;
use clap::{Parser, Subcommand};
use logclient::{ClientConfig, LogClient, DEFAULT_PORT};
use std::io::{self, Write};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "logclient")]
#[command(about = "Send records or seek commands to an aesdsocket server and print the reply")]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Target host
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Target port
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Timeout in seconds
    #[arg(short, long, default_value_t = 5)]
    timeout: u64,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Append one record (a newline is added if missing)
    Send {
        /// Record text
        text: String,
    },

    /// Seek to record/offset and print from there
    Seek {
        /// Record index (0 = oldest)
        record: usize,
        /// Byte offset inside the record
        offset: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.verbose {
        Level::DEBUG
    } else {
        Level::WARN
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let client = LogClient::new(ClientConfig {
        host: args.host,
        port: args.port,
        timeout_secs: args.timeout,
    });

    let reply = match args.command {
        Command::Send { text } => client.send_line(&text).await?,
        Command::Seek { record, offset } => client.seek(record, offset).await?,
    };

    let mut out = io::stdout().lock();
    out.write_all(&reply)?;
    out.flush()?;
    Ok(())
}
