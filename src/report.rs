//! Banner and overall reports
//!
//! A [`BannerReport`] is the output of one counting pass; an
//! [`OverallReport`] merges the three banner reports into the figures the
//! display layer consumes. Aggregation is a pure merge: no re-sorting or
//! re-derivation happens here.

use crate::counter::ProcessedPull;
use crate::histogram::PityHistogram;
use crate::types::{AccountId, BannerKind, GachaItem, Rarity};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Processed pulls grouped by the item they drew
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "Vec<ItemGroup>", into = "Vec<ItemGroup>")]
pub struct ItemMap {
    groups: HashMap<GachaItem, HashSet<ProcessedPull>>,
    total: usize,
}

/// Serialized form of one [`ItemMap`] entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemGroup {
    /// The item drawn
    pub item: GachaItem,
    /// Every processed pull that drew it
    pub pulls: Vec<ProcessedPull>,
}

impl ItemMap {
    /// Create an empty map
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a processed pull under its item
    ///
    /// Returns the number of pulls recorded for that item afterwards.
    pub fn add(&mut self, pull: ProcessedPull) -> usize {
        let item = GachaItem::from_record(&pull.record);
        let group = self.groups.entry(item).or_default();
        if group.insert(pull) {
            self.total += 1;
        }
        group.len()
    }

    /// Iterate over `(item, pull set)` groups in no particular order
    pub fn groups(&self) -> impl Iterator<Item = (&GachaItem, &HashSet<ProcessedPull>)> {
        self.groups.iter()
    }

    /// Iterate over every processed pull
    pub fn pulls(&self) -> impl Iterator<Item = &ProcessedPull> {
        self.groups.values().flatten()
    }

    /// The pulls recorded for one item
    pub fn get(&self, item: &GachaItem) -> Option<&HashSet<ProcessedPull>> {
        self.groups.get(item)
    }

    /// Total number of pulls recorded
    pub fn len(&self) -> usize {
        self.total
    }

    /// Whether no pull was recorded
    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    /// Number of distinct items
    pub fn item_count(&self) -> usize {
        self.groups.len()
    }

    /// A new map holding both operands' pulls, leaving both unchanged
    ///
    /// Pulls of the same item identity from different banners merge into
    /// one group.
    pub fn merge(&self, other: &ItemMap) -> ItemMap {
        let mut result = self.clone();
        for (item, pulls) in other.groups() {
            let group = result.groups.entry(item.clone()).or_default();
            for pull in pulls {
                if group.insert(pull.clone()) {
                    result.total += 1;
                }
            }
        }
        result
    }
}

impl From<Vec<ItemGroup>> for ItemMap {
    fn from(groups: Vec<ItemGroup>) -> Self {
        let mut map = ItemMap::new();
        for group in groups {
            for pull in group.pulls {
                map.add(pull);
            }
        }
        map
    }
}

impl From<ItemMap> for Vec<ItemGroup> {
    fn from(map: ItemMap) -> Self {
        map.groups
            .into_iter()
            .map(|(item, pulls)| ItemGroup {
                item,
                pulls: pulls.into_iter().collect(),
            })
            .collect()
    }
}

/// Pity statistics for one banner kind
///
/// Accounts with zero draws are absent from the counter maps; consumers
/// default them to 0 draws and a won next promotion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BannerReport {
    /// Banner kind this report covers
    pub kind: BannerKind,
    /// Accounts that contributed at least one draw
    pub accounts: HashSet<AccountId>,
    /// Draws since each account's last 4 star
    pub draws_since_four: HashMap<AccountId, u32>,
    /// Draws since each account's last 5 star
    pub draws_since_five: HashMap<AccountId, u32>,
    /// Whether each account's last 4 star was a promoted item
    pub last_four_promoted: HashMap<AccountId, bool>,
    /// Whether each account's last 5 star was a promoted item
    pub last_five_promoted: HashMap<AccountId, bool>,
    /// Number of draws counted
    pub total: usize,
    /// Processed pulls grouped by item
    pub items: ItemMap,
    /// 5 star pity-frequency histogram
    pub pity_five: PityHistogram,
    /// 4 star pity-frequency histogram
    pub pity_four: PityHistogram,
}

impl BannerReport {
    /// An empty report for the given banner kind
    pub fn empty(kind: BannerKind) -> Self {
        Self {
            kind,
            accounts: HashSet::new(),
            draws_since_four: HashMap::new(),
            draws_since_five: HashMap::new(),
            last_four_promoted: HashMap::new(),
            last_five_promoted: HashMap::new(),
            total: 0,
            items: ItemMap::new(),
            pity_five: PityHistogram::new(),
            pity_four: PityHistogram::new(),
        }
    }

    /// The promoted 5 star that ended the losing streak a pull started
    ///
    /// For a 5 star pull that was not itself promoted, returns the
    /// earliest later promoted 5 star of the same account, if one exists.
    /// Display-only convenience; the result is a borrow into this report,
    /// never stored state.
    pub fn superseding_pull(&self, pull: &ProcessedPull) -> Option<&ProcessedPull> {
        if pull.record.rarity != Rarity::Five || pull.is_promoted {
            return None;
        }
        self.items
            .pulls()
            .filter(|candidate| {
                candidate.record.rarity == Rarity::Five
                    && candidate.is_promoted
                    && candidate.record.account_id == pull.record.account_id
                    && candidate.record > pull.record
            })
            .min_by(|a, b| a.record.cmp(&b.record))
    }
}

/// Merged statistics across all three banners
///
/// The weapon banner's 5 star histogram is kept apart from the other two:
/// its pity ceiling is 80 rather than 90, so pooling them would distort
/// the distribution's tail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverallReport {
    /// Union of the three banners' account sets
    pub accounts: HashSet<AccountId>,
    /// Sum of the three banners' totals
    pub total: usize,
    /// Merged item grouping across all banners
    pub items: ItemMap,
    /// 5 star histogram of the standard and character banners combined
    pub pity_five_standard: PityHistogram,
    /// 5 star histogram of the weapon banner alone
    pub pity_five_weapon: PityHistogram,
    /// 4 star histogram of all three banners combined
    pub pity_four: PityHistogram,
    /// Standard banner report
    pub standard: BannerReport,
    /// Character banner report
    pub character: BannerReport,
    /// Weapon banner report
    pub weapon: BannerReport,
}

impl OverallReport {
    /// Merge the three completed banner reports
    ///
    /// Pure and associative; no ordering between the inputs matters.
    pub fn aggregate(
        standard: BannerReport,
        character: BannerReport,
        weapon: BannerReport,
    ) -> Self {
        let mut accounts = standard.accounts.clone();
        accounts.extend(character.accounts.iter().copied());
        accounts.extend(weapon.accounts.iter().copied());

        Self {
            accounts,
            total: standard.total + character.total + weapon.total,
            items: standard.items.merge(&character.items).merge(&weapon.items),
            pity_five_standard: standard.pity_five.merge(&character.pity_five),
            pity_five_weapon: weapon.pity_five.clone(),
            pity_four: standard
                .pity_four
                .merge(&character.pity_four)
                .merge(&weapon.pity_four),
            standard,
            character,
            weapon,
        }
    }
}
