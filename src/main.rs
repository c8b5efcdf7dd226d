use std::path::PathBuf;

use clap::Parser;
use palaver_common::ViewConfig;
use tokio::sync::mpsc;
use tracing_subscriber::prelude::*;

#[derive(Debug, Parser)]
struct Args {
    /// Minutes of silence before the next message starts a new group.
    #[arg(long, default_value_t = 5)]
    group_gap_minutes: i64,
    /// How long a jumped-to message stays highlighted, in milliseconds.
    #[arg(long, default_value_t = 2000)]
    highlight_clear_ms: u64,
    /// Where debug logs go; the terminal itself belongs to the UI.
    #[arg(long, default_value = "palaver.log")]
    log_file: PathBuf,
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    let args = Args::parse();
    let log_file = std::sync::Mutex::new(std::fs::File::create(&args.log_file)?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(log_file))
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();
    tracing::info!("starting");

    let config = ViewConfig {
        group_gap: chrono::Duration::minutes(args.group_gap_minutes),
        highlight_clear: std::time::Duration::from_millis(args.highlight_clear_ms),
    };
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(palaver_fake_messages::message_sender(tx));
    palaver_tui::run(config, rx).await?;
    Ok(())
}
