//! Betwire - Batched bet submission client
//!
//! Streams an agency's bets to the lottery draw service in
//! length-prefixed batches, each answered by a fixed-size
//! acknowledgment. After the last batch it asks how many of its bets won.

mod config;
mod network;
mod protocol;
mod source;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use config::Config;
use network::{Client, RunOutcome};
use source::CsvSource;

/// Betwire - batched bet submission client
#[derive(Parser)]
#[command(name = "betwire")]
#[command(author = "Betwire Contributors")]
#[command(version = "0.1.0")]
#[command(about = "Submit agency bets to the draw service in batches", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit bets and ask for this agency's winners
    Submit {
        /// Server address to connect to (host:port)
        #[arg(short, long)]
        server: Option<String>,

        /// Agency id to submit as
        #[arg(short, long)]
        agency: Option<u16>,

        /// Bets per batch frame
        #[arg(short, long)]
        batch_size: Option<usize>,

        /// CSV file with the bets to submit
        #[arg(short, long)]
        data: Option<PathBuf>,
    },

    /// Show current configuration
    Config {
        /// Generate sample configuration
        #[arg(long)]
        generate: bool,

        /// Output path for generated config
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    // Load configuration
    let config = if let Some(config_path) = &cli.config {
        Config::load(config_path)?
    } else {
        Config::load_default().unwrap_or_default()
    };

    match cli.command {
        Commands::Submit {
            server,
            agency,
            batch_size,
            data,
        } => {
            run_submit(config, server, agency, batch_size, data).await?;
        }
        Commands::Config { generate, output } => {
            if generate {
                let sample = config::generate_sample_config();
                if let Some(path) = output {
                    std::fs::write(&path, &sample)?;
                    println!("Configuration written to: {}", path.display());
                } else {
                    println!("{}", sample);
                }
            } else {
                println!("{}", toml::to_string_pretty(&config)?);
            }
        }
    }

    Ok(())
}

/// Run one submission session
async fn run_submit(
    mut config: Config,
    server: Option<String>,
    agency: Option<u16>,
    batch_size: Option<usize>,
    data: Option<PathBuf>,
) -> anyhow::Result<()> {
    // CLI flags win over the file
    if let Some(server) = server {
        config.server.address = server;
    }
    if let Some(agency) = agency {
        config.agency.id = agency;
    }
    if let Some(batch_size) = batch_size {
        config.batch.max_records = batch_size;
    }
    if let Some(data) = data {
        config.agency.data_file = Some(data);
    }
    config.validate()?;

    let data_file = config
        .agency
        .data_file
        .clone()
        .ok_or_else(|| anyhow::anyhow!("no bet data file; pass --data or set agency.data_file"))?;

    tracing::debug!(
        "Effective config: server={} agency={} batch={} data={}",
        config.server.address,
        config.agency.id,
        config.batch.max_records,
        data_file.display()
    );

    let mut source = CsvSource::from_path(&data_file)?;
    let mut client = Client::new(config.client_config());

    match client.run(&mut source, shutdown_signal()).await? {
        RunOutcome::Completed {
            records,
            frames,
            winners,
        } => match winners {
            Some(count) => tracing::info!(
                "Run complete: {} bets in {} frames, {} winners",
                records,
                frames,
                count
            ),
            None => tracing::info!(
                "Run complete: {} bets in {} frames, winners unavailable",
                records,
                frames
            ),
        },
        RunOutcome::Cancelled => {
            tracing::info!("Run cancelled by signal");
        }
    }

    Ok(())
}

/// Resolve on SIGINT or, on Unix, SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
