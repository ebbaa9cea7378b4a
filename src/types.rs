//! Core domain types for pitystat
//!
//! This module contains the fundamental types used throughout the pitystat
//! library: account and draw identifiers, banner kinds with their pity
//! ceilings, and the pull record itself with its identity and ordering
//! rules.

use crate::error::{PitystatError, Result};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Strongly-typed player account identifier (the in-game UID)
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct AccountId(u64);

impl AccountId {
    /// Create a new AccountId
    pub fn new(uid: u64) -> Self {
        Self(uid)
    }

    /// Get the inner value
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Strongly-typed draw identifier assigned by the remote log API
///
/// Draw ids increase with time, which is why the synchronizer can use the
/// oldest id of a page as the cursor for the next one.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct DrawId(u64);

impl DrawId {
    /// Create a new DrawId
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the inner value
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for DrawId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Supported games
///
/// Selects the remote API's `gacha_type` numbering and the per-game
/// storage subdirectory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Game {
    /// Honkai: Star Rail
    HonkaiStarRail,
    /// Genshin Impact
    Genshin,
}

impl Game {
    /// Directory name used for this game's persisted state
    pub fn dir_name(&self) -> &'static str {
        match self {
            Self::HonkaiStarRail => "hsr",
            Self::Genshin => "genshin",
        }
    }
}

impl fmt::Display for Game {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HonkaiStarRail => write!(f, "Honkai: Star Rail"),
            Self::Genshin => write!(f, "Genshin Impact"),
        }
    }
}

impl std::str::FromStr for Game {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "hsr" | "starrail" | "star-rail" => Ok(Self::HonkaiStarRail),
            "genshin" => Ok(Self::Genshin),
            _ => Err(format!("Unknown game: {s}")),
        }
    }
}

/// The three draw pools, each with its own pity ceilings and ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BannerKind {
    /// Permanent pool with no promotion concept
    Standard,
    /// Limited character banner
    Character,
    /// Limited weapon (light cone) banner
    Weapon,
}

impl BannerKind {
    /// All banner kinds, in synchronization order
    pub const ALL: [BannerKind; 3] = [Self::Standard, Self::Character, Self::Weapon];

    /// Maximum number of draws before a 5 star is guaranteed
    pub fn max_pity_five(&self) -> u32 {
        match self {
            Self::Standard | Self::Character => 90,
            Self::Weapon => 80,
        }
    }

    /// Maximum number of draws before a 4 star is guaranteed
    pub fn max_pity_four(&self) -> u32 {
        10
    }

    /// The `gacha_type` number the remote log API uses for this pool
    pub fn log_type_id(&self, game: Game) -> u32 {
        match (game, self) {
            (Game::HonkaiStarRail, Self::Standard) => 1,
            (Game::HonkaiStarRail, Self::Character) => 11,
            (Game::HonkaiStarRail, Self::Weapon) => 12,
            (Game::Genshin, Self::Standard) => 200,
            (Game::Genshin, Self::Character) => 301,
            (Game::Genshin, Self::Weapon) => 302,
        }
    }

    /// File stem used for this banner's persisted ledger
    pub fn file_stem(&self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Character => "character",
            Self::Weapon => "weapon",
        }
    }
}

impl fmt::Display for BannerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Standard => write!(f, "Standard"),
            Self::Character => write!(f, "Character"),
            Self::Weapon => write!(f, "Weapon"),
        }
    }
}

/// Rarity tier of a drawn item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Rarity {
    /// Filler item, advances pity clocks but resets nothing
    Three,
    /// 4 star
    Four,
    /// 5 star
    Five,
}

impl Rarity {
    /// Numeric tier as reported by the remote API
    pub fn as_u8(&self) -> u8 {
        match self {
            Self::Three => 3,
            Self::Four => 4,
            Self::Five => 5,
        }
    }
}

impl TryFrom<u8> for Rarity {
    type Error = PitystatError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            3 => Ok(Self::Three),
            4 => Ok(Self::Four),
            5 => Ok(Self::Five),
            other => Err(PitystatError::InvalidRarity(other)),
        }
    }
}

impl From<Rarity> for u8 {
    fn from(rarity: Rarity) -> u8 {
        rarity.as_u8()
    }
}

impl fmt::Display for Rarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u8())
    }
}

/// Category of a drawn item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemCategory {
    Character,
    Weapon,
}

impl ItemCategory {
    /// Parse the `item_type` string the remote API reports
    ///
    /// Star Rail reports weapons as "Light Cone".
    pub fn parse(type_name: &str) -> Result<Self> {
        match type_name.to_uppercase().as_str() {
            "CHARACTER" => Ok(Self::Character),
            "LIGHT CONE" | "WEAPON" => Ok(Self::Weapon),
            other => Err(PitystatError::UnknownItemCategory(other.to_string())),
        }
    }
}

/// One gacha draw
///
/// Identity (equality, hashing, dedup) is evaluated on `draw_id` and
/// `item_name` only; two records that agree on those are the same pull
/// even if incidental fields differ. Natural ordering is by `timestamp`,
/// then `draw_id`, then `item_name`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PullRecord {
    /// UID of the account that made the draw
    pub account_id: AccountId,
    /// Identifier of the draw itself
    pub draw_id: DrawId,
    /// Pool the draw was made on
    pub banner: BannerKind,
    /// Numeric id of the item drawn
    pub item_id: u32,
    /// Localized name of the item drawn
    pub item_name: String,
    /// Category of the item drawn
    pub category: ItemCategory,
    /// Rarity tier of the item drawn
    pub rarity: Rarity,
    /// Server-local wall-clock time of the draw
    pub timestamp: NaiveDateTime,
    /// The concrete gacha the draw was made on, as reported by the API
    pub source_gacha_id: u32,
}

impl PartialEq for PullRecord {
    fn eq(&self, other: &Self) -> bool {
        self.draw_id == other.draw_id && self.item_name == other.item_name
    }
}

impl Eq for PullRecord {}

impl Hash for PullRecord {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.draw_id.hash(state);
        self.item_name.hash(state);
    }
}

impl PartialOrd for PullRecord {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PullRecord {
    fn cmp(&self, other: &Self) -> Ordering {
        self.timestamp
            .cmp(&other.timestamp)
            .then_with(|| self.draw_id.cmp(&other.draw_id))
            .then_with(|| self.item_name.cmp(&other.item_name))
    }
}

/// An item as seen across many pulls
///
/// Unlike [`PullRecord`], identity is evaluated on `item_id` and `name`,
/// so all draws of the same item group together.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GachaItem {
    /// Numeric id of the item
    pub item_id: u32,
    /// Localized name of the item
    pub name: String,
    /// Rarity tier of the item
    pub rarity: Rarity,
    /// Category of the item
    pub category: ItemCategory,
}

impl GachaItem {
    /// Project the item out of a pull record
    pub fn from_record(record: &PullRecord) -> Self {
        Self {
            item_id: record.item_id,
            name: record.item_name.clone(),
            rarity: record.rarity,
            category: record.category,
        }
    }
}

impl PartialEq for GachaItem {
    fn eq(&self, other: &Self) -> bool {
        self.item_id == other.item_id && self.name == other.name
    }
}

impl Eq for GachaItem {}

impl Hash for GachaItem {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.item_id.hash(state);
        self.name.hash(state);
    }
}

impl fmt::Display for GachaItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}
