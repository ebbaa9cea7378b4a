//! Persisted state on disk
//!
//! Each banner's ledger, the rate-up schedules and the account exclusion
//! set live in their own JSON file under a per-game subdirectory of the
//! data root. Loads never fail the operation: errors are collected into
//! the [`LoadReport`] and the affected piece falls back to empty, and a
//! missing file is simply empty state. Saves likewise collect per-file
//! errors so one bad path does not block the rest.

use crate::error::{PitystatError, Result};
use crate::ledger::{GachaData, PullLedger};
use crate::rateup::RateUpSchedule;
use crate::types::{AccountId, BannerKind, Game};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Environment variable overriding the data directory
pub const DATA_DIR_ENV: &str = "PITYSTAT_DATA_DIR";

/// Loaded data together with the errors hit while loading it
#[derive(Debug)]
pub struct LoadReport<T> {
    /// The data loaded, possibly partially defaulted
    pub data: T,
    /// Errors collected along the way
    pub errors: Vec<PitystatError>,
}

impl<T> LoadReport<T> {
    /// A report with no errors
    pub fn clean(data: T) -> Self {
        Self {
            data,
            errors: Vec::new(),
        }
    }

    /// Whether loading completed without errors
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// JSON file storage rooted at a data directory
#[derive(Debug, Clone)]
pub struct Storage {
    root: PathBuf,
}

impl Storage {
    /// Create storage rooted at the given directory
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The platform default data directory
    ///
    /// `PITYSTAT_DATA_DIR` overrides the platform location.
    pub fn default_dir() -> PathBuf {
        if let Ok(custom) = std::env::var(DATA_DIR_ENV) {
            return PathBuf::from(custom);
        }
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("pitystat")
    }

    /// The root directory of this storage
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn game_dir(&self, game: Game) -> PathBuf {
        self.root.join(game.dir_name())
    }

    fn ledger_path(&self, game: Game, kind: BannerKind) -> PathBuf {
        self.game_dir(game).join(format!("{}.json", kind.file_stem()))
    }

    fn schedule_path(&self, game: Game, kind: BannerKind) -> PathBuf {
        self.game_dir(game)
            .join(format!("{}_events.json", kind.file_stem()))
    }

    fn exclusions_path(&self, game: Game) -> PathBuf {
        self.game_dir(game).join("exclusions.json")
    }

    /// Load the ledger of one banner kind
    pub fn load_ledger(&self, game: Game, kind: BannerKind) -> LoadReport<PullLedger> {
        self.load_json(self.ledger_path(game, kind), || PullLedger::new(kind))
    }

    /// Save the ledger of one banner kind
    pub fn save_ledger(&self, game: Game, ledger: &PullLedger) -> Result<()> {
        self.save_json(self.ledger_path(game, ledger.kind()), ledger)
    }

    /// Load the rate-up schedule of one banner kind
    ///
    /// The standard banner carries no schedule and always loads empty.
    pub fn load_schedule(&self, game: Game, kind: BannerKind) -> LoadReport<RateUpSchedule> {
        if kind == BannerKind::Standard {
            return LoadReport::clean(RateUpSchedule::default());
        }
        self.load_json(self.schedule_path(game, kind), RateUpSchedule::default)
    }

    /// Save the rate-up schedule of one banner kind
    pub fn save_schedule(
        &self,
        game: Game,
        kind: BannerKind,
        schedule: &RateUpSchedule,
    ) -> Result<()> {
        self.save_json(self.schedule_path(game, kind), schedule)
    }

    /// Load the persisted account exclusion set
    pub fn load_exclusions(&self, game: Game) -> LoadReport<HashSet<AccountId>> {
        self.load_json(self.exclusions_path(game), HashSet::new)
    }

    /// Save the account exclusion set
    pub fn save_exclusions(&self, game: Game, excluded: &HashSet<AccountId>) -> Result<()> {
        self.save_json(self.exclusions_path(game), excluded)
    }

    /// Load everything for one game, collecting errors across the files
    pub fn load_data(&self, game: Game) -> LoadReport<GachaData> {
        let mut data = GachaData::empty(game);
        let mut errors = Vec::new();

        for kind in BannerKind::ALL {
            let mut report = self.load_ledger(game, kind);
            errors.append(&mut report.errors);
            *data.ledger_mut(kind) = report.data;
        }

        let mut character_events = self.load_schedule(game, BannerKind::Character);
        errors.append(&mut character_events.errors);
        data.character_events = character_events.data;

        let mut weapon_events = self.load_schedule(game, BannerKind::Weapon);
        errors.append(&mut weapon_events.errors);
        data.weapon_events = weapon_events.data;

        debug!(
            "Loaded {} records for {}, {} load error(s)",
            data.total_records(),
            game,
            errors.len()
        );
        LoadReport { data, errors }
    }

    /// Save everything for one game, collecting per-file errors
    pub fn save_data(&self, data: &GachaData) -> Vec<PitystatError> {
        let mut errors = Vec::new();
        for kind in BannerKind::ALL {
            if let Err(err) = self.save_ledger(data.game, data.ledger(kind)) {
                warn!("Failed to save {kind} ledger: {err}");
                errors.push(err);
            }
        }
        for (kind, schedule) in [
            (BannerKind::Character, &data.character_events),
            (BannerKind::Weapon, &data.weapon_events),
        ] {
            if let Err(err) = self.save_schedule(data.game, kind, schedule) {
                warn!("Failed to save {kind} schedule: {err}");
                errors.push(err);
            }
        }
        errors
    }

    fn load_json<T: DeserializeOwned>(
        &self,
        path: PathBuf,
        empty: impl FnOnce() -> T,
    ) -> LoadReport<T> {
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(data) => LoadReport::clean(data),
                Err(err) => {
                    warn!("Failed to parse {}: {err}", path.display());
                    LoadReport {
                        data: empty(),
                        errors: vec![err.into()],
                    }
                }
            },
            // absence of a persisted file is not an error
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => LoadReport::clean(empty()),
            Err(err) => {
                warn!("Failed to read {}: {err}", path.display());
                LoadReport {
                    data: empty(),
                    errors: vec![err.into()],
                }
            }
        }
    }

    fn save_json<T: Serialize>(&self, path: PathBuf, data: &T) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(data)?;
        fs::write(&path, contents)?;
        debug!("Saved {}", path.display());
        Ok(())
    }
}
