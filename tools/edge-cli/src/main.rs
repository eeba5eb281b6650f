//! Edge CLI - Command line tool for critical image data.
//!
//! Commands:
//! - `edge encode` - Encode image URLs into a stored property value
//! - `edge decode` - Decode a stored property value
//! - `edge simulate` - Run a request against a fixture property cache
//! - `edge config` - Show or validate configuration

mod commands;
mod config;
mod context;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{ConfigArgs, DecodeArgs, EncodeArgs, SimulateArgs};

/// Edge CLI - Inspect critical image data stored in the property cache
#[derive(Parser)]
#[command(name = "edge")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Use JSON output format
    #[arg(long, global = true)]
    json: bool,

    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode image URLs into a stored property value
    Encode(EncodeArgs),

    /// Decode a stored property value into image URLs
    Decode(DecodeArgs),

    /// Simulate a page request against a fixture
    Simulate(SimulateArgs),

    /// Manage configuration
    Config(ConfigArgs),
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    // Setup output formatting
    let output = output::Output::new(cli.verbose, cli.json);

    // Load config
    let config_path = cli.config.as_deref();
    let ctx = context::Context::load(config_path, output)?;

    // Execute command
    let result = match cli.command {
        Commands::Encode(args) => commands::codec::encode(args, &ctx),
        Commands::Decode(args) => commands::codec::decode(args, &ctx),
        Commands::Simulate(args) => commands::simulate::run(args, &ctx),
        Commands::Config(args) => commands::config::run(args, &ctx),
    };

    if let Err(e) = result {
        ctx.output.error(&format!("{:#}", e));
        std::process::exit(1);
    }

    Ok(())
}
