use std::path::PathBuf;

use clap::{Parser, Subcommand};
use wheat_core::domain::Price;

#[derive(Parser)]
#[command(name = "wheat")]
#[command(about = "Separate the wheat from the chaff in a card collection", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Import a Moxfield collection export into the database
    LoadCollection {
        /// Collection CSV (defaults to COLLECTION_FILE)
        #[arg(short = 'f', long = "filename")]
        file: Option<PathBuf>,
        /// Replace the current inventory (default)
        #[arg(short = 'o', long, overrides_with = "no_overwrite")]
        overwrite: bool,
        /// Keep the current inventory and add new cards to it
        #[arg(short = 'n', long, overrides_with = "overwrite")]
        no_overwrite: bool,
    },
    /// Fetch prices and deck counts for cards not yet enriched
    Populate {
        /// Also retry cards whose deck count could not be fetched before
        #[arg(long)]
        retry_failed: bool,
    },
    /// List cheap cards that few decks play
    FindChaff {
        /// Only cards priced below this amount
        #[arg(short, long, default_value = "0.50", value_parser = parse_price)]
        price: Price,
        /// Only cards in fewer decks than this
        #[arg(short, long, default_value_t = 50)]
        count: u64,
        /// Also write the report to OUTPUT_FILE
        #[arg(short, long)]
        output: bool,
        /// Print the rows as JSON instead of one line per card
        #[arg(long)]
        json: bool,
    },
}

fn parse_price(raw: &str) -> Result<Price, String> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .and_then(Price::from_decimal)
        .ok_or_else(|| format!("'{raw}' is not a non-negative amount"))
}
