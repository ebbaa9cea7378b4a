//! Command-line interface definitions

use crate::types::Game;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Track gacha pull history and pity statistics
#[derive(Parser)]
#[command(name = "pitystat", version, about, long_about = None)]
pub struct Cli {
    /// Suppress informational log output
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Data directory override
    #[arg(long, global = true, value_name = "DIR", env = "PITYSTAT_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Game to track (hsr or genshin)
    #[arg(long, global = true, default_value = "hsr", value_parser = parse_game)]
    pub game: Game,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Pull new draw history from the game's log API
    Sync {
        /// Player URL carrying the log API credentials
        #[arg(env = "PITYSTAT_PLAYER_URL")]
        url: String,
    },
    /// Compute and print pity statistics
    Report {
        /// Emit the full report as JSON
        #[arg(long)]
        json: bool,

        /// Bucket size for the printed pity histograms
        #[arg(long, value_name = "N", default_value_t = 10)]
        bucket: u32,

        /// Account UIDs to leave out, comma separated
        #[arg(long, value_name = "UID", value_delimiter = ',')]
        exclude: Vec<u64>,
    },
}

fn parse_game(value: &str) -> Result<Game, String> {
    value.parse()
}
