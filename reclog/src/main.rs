//! reclog 命令行工具
//!
//! 把输入文件逐行写入一个环形日志设备，再按需要导出内容：
//!   reclog dump <input>                 # 导出设备中保留的全部记录
//!   reclog seek <input> <记录号> <偏移>  # 定位后从游标处导出
//!   reclog stats <input>                # 显示统计

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use reclog::constants::DEFAULT_READ_CHUNK;
use reclog::{LogDevice, DEFAULT_CAPACITY};
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use tracing::{debug, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "reclog")]
#[command(about = "Bounded ring record log - feed lines through a log device and read them back")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Ring capacity (records kept before the oldest is evicted)
    #[arg(short, long, default_value_t = DEFAULT_CAPACITY)]
    capacity: usize,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Print every record still held by the ring
    Dump {
        /// Input file, one record per line
        input: String,
    },

    /// Seek to record/offset, then print from the cursor to the end
    Seek {
        /// Input file, one record per line
        input: String,
        /// Record index (0 = oldest live record)
        record: usize,
        /// Byte offset inside the record
        offset: usize,
    },

    /// Show ring statistics
    Stats {
        /// Input file, one record per line
        input: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::WARN
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let device = LogDevice::new(cli.capacity)?;

    match cli.command {
        Commands::Dump { input } => {
            load(&device, &input)?;
            io::stdout().write_all(&device.contents()?)?;
        }
        Commands::Seek {
            input,
            record,
            offset,
        } => {
            load(&device, &input)?;
            let pos = device
                .seek(record, offset)
                .with_context(|| format!("seek to {},{} failed", record, offset))?;
            debug!("cursor at {}", pos);
            let mut out = io::stdout().lock();
            while let Some(chunk) = device.read(DEFAULT_READ_CHUNK)? {
                out.write_all(&chunk)?;
            }
            out.flush()?;
        }
        Commands::Stats { input } => {
            load(&device, &input)?;
            print!("{}", device.stats()?);
        }
    }

    Ok(())
}

/// 逐行写入设备（保留换行符，最后一行缺换行时补上）
fn load(device: &LogDevice, input: &str) -> Result<()> {
    let file = File::open(input).with_context(|| format!("cannot open {}", input))?;
    let mut reader = BufReader::new(file);
    let mut line = Vec::new();

    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line)? == 0 {
            break;
        }
        if line.last() != Some(&b'\n') {
            line.push(b'\n');
        }
        device.write(&line)?;
    }
    Ok(())
}
