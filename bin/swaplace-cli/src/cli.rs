use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;

/// Swaplace - atomic multi-asset swaps
#[derive(Debug, Parser)]
#[command(name = "swaplace", author, version, about, long_about = None)]
pub struct Cli {
    /// Settings file; defaults to ./swaplace.toml when present
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub logs: LogArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Args)]
pub struct LogArgs {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    pub verbosity: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Emit logs as JSON lines
    #[arg(long = "log-json", global = true)]
    pub json: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Pack a contract address and amount or token id into an asset word
    EncodeAsset {
        contract: String,
        /// Decimal or 0x-prefixed hex, at most 96 bits
        amount_or_id: String,
    },

    /// Unpack an asset word
    DecodeAsset { word: String },

    /// Pack a light swap configuration word
    EncodeConfig {
        /// Allowed counterparty; the zero address makes the swap public
        allowed: String,
        /// Expiry as unix seconds
        expiry: u64,
        #[arg(long, default_value_t = 0)]
        aux_a: u8,
        #[arg(long, default_value_t = 0)]
        aux_b: u64,
        /// Current time to validate the expiry against; wall clock by default
        #[arg(long)]
        now: Option<u64>,
    },

    /// Unpack a configuration word
    DecodeConfig { word: String },

    /// Derive the identifier of the swap with the given global sequence
    SwapId { owner: String, sequence: u128 },

    /// Recover owner and sequence from a swap identifier
    DecodeSwapId { id: String },

    /// Run a JSON scenario against an in-memory chain
    Simulate { scenario: PathBuf },
}
