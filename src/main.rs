//! Grid strategies - main entry point
//!
//! This binary provides two subcommands:
//! - run: replay a candle series through a strategy on the simulated host
//! - inspect: validate a config and preview the grid it would build

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;

#[derive(Parser, Debug)]
#[command(name = "grid-strategies")]
#[command(about = "Grid trading and MA trend strategies with a simulated host for replay runs", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Replay a candle series through a strategy
    Run {
        /// Path to configuration file
        #[arg(short, long, default_value = "configs/grid_600900.json")]
        config: String,

        /// Path to a CSV candle file (datetime,open,high,low,close,volume)
        #[arg(short, long)]
        data: PathBuf,

        /// Starting cash for the simulated account
        #[arg(long, default_value = "100000")]
        cash: f64,

        /// Milliseconds between cycles (0 = as fast as possible)
        #[arg(long, default_value = "0")]
        interval_ms: u64,

        /// Bars consumed before the strategy initializes
        #[arg(long, default_value = "30")]
        warmup: usize,

        /// Strategy name (overrides config file)
        #[arg(short, long)]
        strategy: Option<String>,
    },

    /// Validate a config and preview the grid it would build
    Inspect {
        /// Path to configuration file
        #[arg(short, long, default_value = "configs/grid_600900.json")]
        config: String,

        /// Path to a CSV candle file
        #[arg(short, long)]
        data: PathBuf,
    },
}

fn setup_logging(verbose: bool, command_name: &str) -> Result<()> {
    std::fs::create_dir_all("logs")?;

    let log_filename = format!(
        "{}_{}.log",
        command_name,
        chrono::Local::now().format("%Y-%m-%d_%H-%M-%S")
    );
    let log_path = PathBuf::from("logs").join(&log_filename);

    let level = if verbose { "debug" } else { "info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let file_appender = tracing_appender::rolling::never("logs", &log_filename);

    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_line_number(true)
        .with_file(true)
        .with_ansi(true);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(file_appender)
        .with_target(true)
        .with_line_number(true)
        .with_file(true)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    info!("Logging initialized");
    info!("Log file: {}", log_path.display());

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let cli = Cli::parse();

    let command_name = match &cli.command {
        Commands::Run { .. } => "run",
        Commands::Inspect { .. } => "inspect",
    };
    setup_logging(cli.verbose, command_name)?;

    match cli.command {
        Commands::Run {
            config,
            data,
            cash,
            interval_ms,
            warmup,
            strategy,
        } => {
            commands::run::execute(commands::run::RunArgs {
                config,
                data,
                cash,
                interval_ms,
                warmup,
                strategy,
            })
            .await
        }
        Commands::Inspect { config, data } => commands::inspect::execute(config, data),
    }
}
