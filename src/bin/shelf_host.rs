//! Shelf host
//!
//! Serves line-delimited JSON commands on stdin and writes one JSON response
//! per line to stdout. Logs go to a rolling file set.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use virtual_shelf::{dispatch, CommandResponse, ShelfCommand, ShelfConfig, ShelfStore, SqliteStorage};

#[derive(Parser)]
#[command(name = "shelf-host", about = "Virtual shelf command host")]
struct Cli {
    /// SQLite database file
    #[arg(long, default_value = "shelf.db")]
    db: PathBuf,

    /// JSON config file; defaults apply when it does not exist
    #[arg(long, default_value = "shelf.json")]
    config: PathBuf,

    /// Directory for rolling log files
    #[arg(long, default_value = "logs")]
    log_dir: PathBuf,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("[{}] shelf-host: {}", chrono::Local::now().format("%H:%M:%S%.3f"), e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), String> {
    std::fs::create_dir_all(&cli.log_dir)
        .map_err(|e| format!("Failed to create log dir: {}", e))?;
    rolling_logger::init_logger(&cli.log_dir, "ShelfHost")?;

    let config = ShelfConfig::load(&cli.config).map_err(|e| e.to_string())?;
    let storage = SqliteStorage::open(&cli.db, config.storage_quota_bytes).await?;
    let _ = rolling_logger::info(&format!("Opened {}", cli.db.display()));

    let mut store = ShelfStore::load(Arc::new(storage), config).await;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    while let Some(line) = lines
        .next_line()
        .await
        .map_err(|e| format!("Failed to read stdin: {}", e))?
    {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<ShelfCommand>(line) {
            Ok(command) => dispatch(&mut store, command).await,
            Err(e) => {
                let _ = rolling_logger::error(&format!("Bad command: {}", e));
                CommandResponse::failure(format!("Bad command: {}", e), Vec::new())
            }
        };

        let mut out = serde_json::to_string(&response)
            .map_err(|e| format!("Failed to encode response: {}", e))?;
        out.push('\n');
        stdout
            .write_all(out.as_bytes())
            .await
            .map_err(|e| format!("Failed to write stdout: {}", e))?;
        stdout
            .flush()
            .await
            .map_err(|e| format!("Failed to write stdout: {}", e))?;
    }

    log::info!("stdin closed, shutting down");
    drop(store.teardown());
    Ok(())
}
