mod cli;
mod logging;
mod scenario;
mod settings;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use ethers::types::U256;
use serde_json::json;
use swaplace_core::{codec, SwapId};
use tracing::debug;

use crate::cli::{Cli, Command};
use crate::scenario::Scenario;
use crate::settings::Settings;

fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref())?;
    logging::init_logging(&cli.logs, &settings);
    debug!("Loaded settings: {:?}", settings);

    let output = run(cli.command, &settings)?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn run(command: Command, settings: &Settings) -> Result<serde_json::Value> {
    let output = match command {
        Command::EncodeAsset {
            contract,
            amount_or_id,
        } => {
            let asset = codec::make_asset(&contract, &amount_or_id)?;
            json!({ "word": asset.0 })
        }
        Command::DecodeAsset { word } => {
            let (contract, amount_or_id) = codec::decode_asset(parse_word(&word)?);
            json!({ "contract": contract, "amount_or_id": amount_or_id })
        }
        Command::EncodeConfig {
            allowed,
            expiry,
            aux_a,
            aux_b,
            now,
        } => {
            let allowed = codec::parse_address(&allowed)?;
            let now = now.unwrap_or_else(|| settings.genesis_timestamp());
            let word = codec::encode_config(allowed, expiry, aux_a, aux_b, now)?;
            json!({ "word": word })
        }
        Command::DecodeConfig { word } => {
            serde_json::to_value(codec::decode_config(parse_word(&word)?))?
        }
        Command::SwapId { owner, sequence } => {
            let id = codec::derive_swap_id(codec::parse_address(&owner)?, sequence)?;
            json!({ "id": id })
        }
        Command::DecodeSwapId { id } => {
            let (owner, sequence) = codec::decode_swap_id(SwapId(parse_word(&id)?));
            json!({ "owner": owner, "sequence": sequence.to_string() })
        }
        Command::Simulate { scenario } => {
            let report = Scenario::from_file(&scenario)?
                .run(settings.swaplace_config()?, settings.genesis_timestamp())?;
            serde_json::to_value(report)?
        }
    };
    Ok(output)
}

/// Parses a 256-bit word given as `0x` hex or decimal
fn parse_word(input: &str) -> Result<U256> {
    let trimmed = input.trim();
    match trimmed.strip_prefix("0x") {
        Some(hex) => U256::from_str_radix(hex, 16).map_err(|e| anyhow!("{}", e)),
        None => U256::from_dec_str(trimmed).map_err(|e| anyhow!("{}", e)),
    }
    .with_context(|| format!("invalid word: {}", input))
}
