//! Docker host maintenance tool
//!
//! Snapshots the docker directory and its databases, keeps copies on local disk and in an
//! S3-compatible bucket, restores a chosen snapshot, and updates the compose stack.

mod backup;
mod config;
mod errors;
mod restore;
mod storage;
mod update;
mod utils;

use anyhow::{Context, Result};
use config::Config;
use std::env;
use std::process::ExitCode;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

const HELP: &str = "valid arguments are update | snapshot | restore | help";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Update,
    Snapshot,
    Restore,
}

impl Command {
    fn parse(arg: Option<&str>) -> Option<Self> {
        match arg.map(str::trim) {
            Some("update") => Some(Command::Update),
            Some("snapshot") => Some(Command::Snapshot),
            Some("restore") => Some(Command::Restore),
            _ => None,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    init_logging();

    match run_app().await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("❌ Error: {:?}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn run_app() -> Result<()> {
    dotenv::dotenv().ok();

    let args: Vec<String> = env::args().collect();
    let Some(command) = Command::parse(args.get(1).map(String::as_str)) else {
        println!("{}", HELP);
        return Ok(());
    };

    let config = Config::from_env().context("Failed to load configuration from environment")?;
    println!("{}", config.summary());

    match command {
        Command::Update => {
            update::run_update_flow(&config).context("Update process failed")?;
            println!("✅ Containers updated.");
        }
        Command::Snapshot => {
            let archive = backup::run_snapshot_flow(&config)
                .await
                .context("Snapshot process failed")?;
            println!("✅ Snapshot stored at {}", archive.display());
        }
        Command::Restore => {
            let report = restore::run_restore_flow(&config)
                .await
                .context("Restore process failed")?;
            println!(
                "✅ Restored {} into {}",
                report.archive,
                report.extracted_to.display()
            );
        }
    }
    Ok(())
}
