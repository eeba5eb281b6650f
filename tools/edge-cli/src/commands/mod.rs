//! CLI command implementations.

pub mod codec;
pub mod config;
pub mod simulate;

use clap::{Args, Subcommand};

/// Arguments for the encode command.
#[derive(Args)]
pub struct EncodeArgs {
    /// Image URLs to encode.
    pub urls: Vec<String>,

    /// Print separators as `\n` instead of raw newlines.
    #[arg(short, long)]
    pub escape: bool,
}

/// Arguments for the decode command.
#[derive(Args)]
pub struct DecodeArgs {
    /// Stored value (read from stdin if omitted).
    pub value: Option<String>,

    /// Treat `\n` in the value as the separator.
    #[arg(short, long)]
    pub escaped: bool,
}

/// Arguments for the simulate command.
#[derive(Args)]
pub struct SimulateArgs {
    /// Fixture file describing the stored properties.
    pub fixture: String,

    /// Image URLs to check for membership.
    #[arg(short, long)]
    pub probe: Vec<String>,

    /// Override the TTL from the config file (milliseconds).
    #[arg(long)]
    pub ttl_ms: Option<i64>,
}

/// Arguments for the config command.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration.
    Show,
    /// Print a default config file.
    Init,
    /// Validate the config file.
    Validate,
}
