//! pitystat - track gacha pull history and pity statistics
//!
//! This library provides functionality to:
//! - Pull a player's draw history from a HoYoverse-style game log API,
//!   one page at a time with rate-limit backoff and cooperative
//!   cancellation
//! - Deduplicate the history into per-banner ledgers persisted as JSON
//! - Walk the ledgers and derive per-pull pity counts and rate-up
//!   win/loss classification
//! - Aggregate per-banner reports into overall statistics with
//!   pity-frequency histograms for display
//!
//! # Examples
//!
//! ```no_run
//! use pitystat::{
//!     client::{GachaLogClient, RetrievalParams},
//!     progress::NullProgress,
//!     service::HistoryService,
//!     storage::Storage,
//!     types::Game,
//! };
//!
//! #[tokio::main]
//! async fn main() -> pitystat::Result<()> {
//!     let storage = Storage::new(Storage::default_dir());
//!     let (service, _load_errors) = HistoryService::load(storage, Game::HonkaiStarRail);
//!
//!     let params = RetrievalParams::from_player_url(
//!         "https://example.com/getGachaLog?authkey=...",
//!         Game::HonkaiStarRail,
//!     )?;
//!     let client = GachaLogClient::new(params);
//!
//!     let summary = service.synchronize(&client, &NullProgress).await?;
//!     println!("{} new pulls", summary.total_added());
//!
//!     let report = service.recount(&NullProgress).await?;
//!     println!("{} pulls across {} accounts", report.total, report.accounts.len());
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod client;
pub mod counter;
pub mod error;
pub mod histogram;
pub mod ledger;
pub mod progress;
pub mod rateup;
pub mod report;
pub mod service;
pub mod storage;
pub mod sync;
pub mod types;

// Re-export commonly used types
pub use error::{PitystatError, Result};
pub use types::{AccountId, BannerKind, DrawId, Game, PullRecord, Rarity};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
