//! # target-postgres
//!
//! Driver loop CLI for the tap->target protocol: reads line-delimited
//! SCHEMA/RECORD/STATE/ACTIVATE_VERSION messages on stdin and materializes
//! them into a PostgreSQL schema via staged COPY + UPDATE/INSERT merges.
//! See `tp-schema` for the projector and `tp-io` for the DB-facing half.

mod driver;

use std::path::PathBuf;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tp_core::Config;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use driver::Driver;

/// Reads a Singer-protocol tap stream on stdin and loads it into PostgreSQL.
#[derive(Parser, Debug)]
#[command(name = "target-postgres")]
#[command(about = "Loads a tap stream into a PostgreSQL schema")]
struct Args {
    /// Path to a JSON configuration file. Absent => empty configuration.
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(err) = run().await {
        tracing::error!(%err, "target-postgres exiting with error");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let args = Args::parse();
    let cfg = match &args.config {
        Some(path) => {
            let raw = std::fs::read_to_string(path)?;
            serde_json::from_str::<Config>(&raw)?
        }
        None => Config::default(),
    };

    let mut driver = Driver::new(&cfg);
    let stdin = tokio::io::stdin();
    let mut lines = BufReader::new(stdin).lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let value = Driver::sanitize_and_parse(&line)?;
        driver.handle(value).await?;
    }

    if let Some(state) = driver.drain().await? {
        let mut stdout = tokio::io::stdout();
        let mut payload = serde_json::to_vec(&state)?;
        payload.push(b'\n');
        stdout.write_all(&payload).await?;
        stdout.flush().await?;
    }

    Ok(())
}
