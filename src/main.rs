use autotrader::config::TraderConfig;
use autotrader::pairtrade::PairTradeEngine;
use autotrader::ports::jsonl_commands::JsonlCommandWriter;
use autotrader::ports::jsonl_feed::JsonlEventFeed;
use autotrader::trade::execution::venue::ChannelVenue;
use chrono::{DateTime, FixedOffset, Utc};
use env_logger::Builder;
use log::LevelFilter;
use std::env;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::str::FromStr;
use tokio::io::BufReader;
use tokio::sync::mpsc;

fn to_io(e: anyhow::Error) -> io::Error {
    io::Error::new(io::ErrorKind::Other, format!("{:?}", e))
}

#[tokio::main]
async fn main() -> io::Result<()> {
    // Initialize logging with local timezone
    let offset_seconds = env::var("TIMEZONE_OFFSET")
        .unwrap_or_else(|_| "3600".to_string())
        .parse::<i32>()
        .expect("Invalid TIMEZONE_OFFSET");
    let offset = FixedOffset::east_opt(offset_seconds).expect("Invalid offset");
    Builder::from_default_env()
        .format(move |buf, record| {
            let utc_now: DateTime<Utc> = Utc::now();
            let local_now = utc_now.with_timezone(&offset);
            writeln!(
                buf,
                "{} [{}] - {}",
                local_now.format("%Y-%m-%dT%H:%M:%S%z"),
                record.level(),
                record.args()
            )
        })
        .filter(
            None,
            LevelFilter::from_str(&env::var("RUST_LOG").unwrap_or_else(|_| "debug".to_string()))
                .unwrap_or(LevelFilter::Debug),
        )
        // commands may share stdout, keep log lines off it
        .target(env_logger::Target::Stderr)
        .init();

    let git_hash = option_env!("AUTOTRADER_GIT_HASH").unwrap_or("unknown");
    log::info!("autotrader git: {}", git_hash);
    let cfg = TraderConfig::from_env_or_yaml().expect("invalid autotrader config");

    let (tx, rx) = mpsc::unbounded_channel();
    let feed = match &cfg.event_file {
        Some(path) => {
            let feed = JsonlEventFeed::open(path).await.map_err(to_io)?;
            tokio::spawn(feed.forward(tx))
        }
        None => {
            let feed = JsonlEventFeed::new(BufReader::new(tokio::io::stdin()), "stdin");
            tokio::spawn(feed.forward(tx))
        }
    };

    let sink: Box<dyn Write + Send> = match &cfg.command_file {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(io::stdout()),
    };
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
    let writer = tokio::task::spawn_blocking(move || {
        let mut writer = JsonlCommandWriter::new(sink);
        writer.drain(cmd_rx)
    });

    let mut engine = PairTradeEngine::new(&cfg, ChannelVenue::new(cmd_tx));
    log::info!("Starting autotrader loop...");
    let snapshot = engine.run(rx).await;
    drop(engine);

    match feed.await {
        Ok(Ok(_)) => {}
        Ok(Err(e)) => log::error!("[FEED] stopped early: {:?}", e),
        Err(e) => log::error!("[FEED] task failed: {:?}", e),
    }
    match writer.await {
        Ok(Ok(written)) => log::info!("[VENUE] {} commands written", written),
        Ok(Err(e)) => log::error!("[VENUE] command writer stopped: {}", e),
        Err(e) => log::error!("[VENUE] writer task failed: {:?}", e),
    }

    if let Some(path) = &cfg.status_file {
        let file = File::create(path)?;
        serde_json::to_writer_pretty(file, &snapshot)?;
        log::info!("[STATUS] snapshot written to {}", path);
    }
    Ok(())
}
