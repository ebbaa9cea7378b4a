//! Deduplicated pull history storage
//!
//! A [`PullLedger`] is the append-only, deduplicated set of pull records
//! for one banner kind. The ledger itself exposes no ordering; all
//! order-sensitive logic lives in the counting engine, which sorts
//! explicitly.

use crate::rateup::RateUpSchedule;
use crate::types::{BannerKind, Game, PullRecord};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Deduplicated pull history for one banner kind
///
/// Records are keyed by their identity `(draw_id, item_name)`; inserting
/// a record whose identity already exists is a no-op.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PullLedger {
    kind: BannerKind,
    records: HashSet<PullRecord>,
}

impl PullLedger {
    /// Create an empty ledger for the given banner kind
    pub fn new(kind: BannerKind) -> Self {
        Self {
            kind,
            records: HashSet::new(),
        }
    }

    /// Create a ledger from existing records, deduplicating on the way in
    pub fn from_records(kind: BannerKind, records: impl IntoIterator<Item = PullRecord>) -> Self {
        Self {
            kind,
            records: records.into_iter().collect(),
        }
    }

    /// The banner kind this ledger tracks
    pub fn kind(&self) -> BannerKind {
        self.kind
    }

    /// Add a record, returning whether it was new
    ///
    /// The synchronizer counts its progress off this return value.
    pub fn add(&mut self, record: PullRecord) -> bool {
        self.records.insert(record)
    }

    /// Whether a record with the same identity is already present
    pub fn contains(&self, record: &PullRecord) -> bool {
        self.records.contains(record)
    }

    /// Add every record of `other` that is not yet present
    ///
    /// Returns the number of newly added records. Merging a ledger into
    /// itself therefore adds zero.
    pub fn merge(&mut self, other: &PullLedger) -> usize {
        let mut added = 0;
        for record in &other.records {
            if self.records.insert(record.clone()) {
                added += 1;
            }
        }
        added
    }

    /// Atomically replace all contents with those of `other`
    ///
    /// Used when switching the tracked game or profile. Returns the number
    /// of records after the reset.
    pub fn reset(&mut self, other: &PullLedger) -> usize {
        self.records.clear();
        self.merge(other)
    }

    /// Remove all records
    pub fn clear(&mut self) {
        self.records.clear();
    }

    /// Number of records stored
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the ledger holds no records
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Iterate over the stored records in no particular order
    pub fn records(&self) -> impl Iterator<Item = &PullRecord> {
        self.records.iter()
    }

    /// A new ledger holding only the records that pass `predicate`
    pub fn filter(&self, predicate: impl Fn(&PullRecord) -> bool) -> PullLedger {
        Self::from_records(
            self.kind,
            self.records.iter().filter(|r| predicate(r)).cloned(),
        )
    }
}

/// All persisted gacha state for one game
///
/// Three per-banner ledgers plus the rate-up schedules of the two limited
/// banners. The standard banner has no promotion concept and carries no
/// schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GachaData {
    /// The game this state belongs to
    pub game: Game,
    /// Standard banner ledger
    pub standard: PullLedger,
    /// Character banner ledger
    pub character: PullLedger,
    /// Weapon banner ledger
    pub weapon: PullLedger,
    /// Promotion windows of the character banner
    pub character_events: RateUpSchedule,
    /// Promotion windows of the weapon banner
    pub weapon_events: RateUpSchedule,
}

impl GachaData {
    /// Create empty state for the given game
    pub fn empty(game: Game) -> Self {
        Self {
            game,
            standard: PullLedger::new(BannerKind::Standard),
            character: PullLedger::new(BannerKind::Character),
            weapon: PullLedger::new(BannerKind::Weapon),
            character_events: RateUpSchedule::default(),
            weapon_events: RateUpSchedule::default(),
        }
    }

    /// The ledger for a banner kind
    pub fn ledger(&self, kind: BannerKind) -> &PullLedger {
        match kind {
            BannerKind::Standard => &self.standard,
            BannerKind::Character => &self.character,
            BannerKind::Weapon => &self.weapon,
        }
    }

    /// Mutable access to the ledger for a banner kind
    pub fn ledger_mut(&mut self, kind: BannerKind) -> &mut PullLedger {
        match kind {
            BannerKind::Standard => &mut self.standard,
            BannerKind::Character => &mut self.character,
            BannerKind::Weapon => &mut self.weapon,
        }
    }

    /// The promotion schedule for a banner kind, empty for the standard pool
    pub fn schedule(&self, kind: BannerKind) -> RateUpSchedule {
        match kind {
            BannerKind::Standard => RateUpSchedule::default(),
            BannerKind::Character => self.character_events.clone(),
            BannerKind::Weapon => self.weapon_events.clone(),
        }
    }

    /// Total records across all three ledgers
    pub fn total_records(&self) -> usize {
        self.standard.len() + self.character.len() + self.weapon.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AccountId, DrawId, ItemCategory, Rarity};
    use chrono::NaiveDate;

    fn record(draw_id: u64, name: &str) -> PullRecord {
        PullRecord {
            account_id: AccountId::new(700_001),
            draw_id: DrawId::new(draw_id),
            banner: BannerKind::Standard,
            item_id: 21_000 + draw_id as u32,
            item_name: name.to_string(),
            category: ItemCategory::Weapon,
            rarity: Rarity::Three,
            timestamp: NaiveDate::from_ymd_opt(2024, 1, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            source_gacha_id: 1001,
        }
    }

    #[test]
    fn test_add_reports_newness() {
        let mut ledger = PullLedger::new(BannerKind::Standard);
        assert!(ledger.add(record(1, "Arrow")));
        assert!(!ledger.add(record(1, "Arrow")));
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_identity_key_dedup() {
        let mut ledger = PullLedger::new(BannerKind::Standard);
        ledger.add(record(1, "Arrow"));
        let mut shifted = record(1, "Arrow");
        shifted.timestamp = shifted.timestamp + chrono::Duration::days(2);
        shifted.rarity = Rarity::Five;
        assert!(!ledger.add(shifted));
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_merge_counts_new_records_only() {
        let mut left = PullLedger::new(BannerKind::Standard);
        left.add(record(1, "Arrow"));
        left.add(record(2, "Sword"));

        let mut right = PullLedger::new(BannerKind::Standard);
        right.add(record(2, "Sword"));
        right.add(record(3, "Shield"));

        assert_eq!(left.merge(&right), 1);
        assert_eq!(left.len(), 3);
    }

    #[test]
    fn test_self_merge_is_idempotent() {
        let mut ledger = PullLedger::new(BannerKind::Standard);
        ledger.add(record(1, "Arrow"));
        ledger.add(record(2, "Sword"));
        let snapshot = ledger.clone();
        assert_eq!(ledger.merge(&snapshot), 0);
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn test_reset_replaces_contents() {
        let mut ledger = PullLedger::new(BannerKind::Standard);
        ledger.add(record(1, "Arrow"));

        let mut replacement = PullLedger::new(BannerKind::Standard);
        replacement.add(record(5, "Spear"));
        replacement.add(record(6, "Bow"));

        assert_eq!(ledger.reset(&replacement), 2);
        assert_eq!(ledger.len(), 2);
        assert!(!ledger.contains(&record(1, "Arrow")));
    }

    #[test]
    fn test_filter_copies_matching_records() {
        let mut ledger = PullLedger::new(BannerKind::Standard);
        ledger.add(record(1, "Arrow"));
        ledger.add(record(2, "Sword"));
        let filtered = ledger.filter(|r| r.item_name == "Sword");
        assert_eq!(filtered.len(), 1);
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn test_serde_round_trip_preserves_dedup() {
        let mut ledger = PullLedger::new(BannerKind::Character);
        ledger.add(record(1, "Arrow"));
        ledger.add(record(2, "Sword"));
        let json = serde_json::to_string(&ledger).unwrap();
        let restored: PullLedger = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.len(), 2);
        assert_eq!(restored.kind(), BannerKind::Character);
    }
}
