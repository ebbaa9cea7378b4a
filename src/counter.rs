//! Pity counting engine
//!
//! Walks a ledger in natural order and derives per-pull pity and rate-up
//! metadata, producing a [`BannerReport`]. The counting pass is a single
//! tight loop with no suspension points; cancellation is handled at the
//! task boundary by the service.
//!
//! The reset rules are asymmetric: a 5 star draw satisfies the 4 star
//! guarantee and resets both clocks, while a 4 star draw leaves the
//! 5 star clock running.

use crate::histogram::PityHistogram;
use crate::ledger::PullLedger;
use crate::progress::{Progress, ProgressSink};
use crate::rateup::RateUpSchedule;
use crate::report::{BannerReport, ItemMap};
use crate::types::{AccountId, PullRecord, Rarity};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::hash::{Hash, Hasher};
use tracing::debug;

/// Report a progress update every this many records
const PROGRESS_STRIDE: usize = 256;

/// A pull record augmented with derived pity metadata
///
/// Identity and ordering delegate to the underlying record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessedPull {
    /// The underlying pull record
    pub record: PullRecord,
    /// Number of draws since the account's previous draw of this tier,
    /// counting this one; 0 for filler pulls
    pub pity_count: u32,
    /// Whether the item was promoted at the time of the draw
    pub is_promoted: bool,
    /// Whether the account's previous draw of this tier won its promotion
    pub won_promotion: bool,
}

impl PartialEq for ProcessedPull {
    fn eq(&self, other: &Self) -> bool {
        self.record == other.record
    }
}

impl Eq for ProcessedPull {}

impl Hash for ProcessedPull {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.record.hash(state);
    }
}

impl PartialOrd for ProcessedPull {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ProcessedPull {
    fn cmp(&self, other: &Self) -> Ordering {
        self.record.cmp(&other.record)
    }
}

/// Derives a [`BannerReport`] from one ledger
///
/// Configured with the banner's promotion schedule (empty when the pool
/// has no promotion concept) and an optional set of accounts to leave
/// out of the run entirely.
#[derive(Debug, Clone, Default)]
pub struct PityCounter {
    schedule: RateUpSchedule,
    excluded: HashSet<AccountId>,
}

impl PityCounter {
    /// Create a counter with no schedule and no exclusions
    pub fn new() -> Self {
        Self::default()
    }

    /// Use the given promotion schedule for rate-up classification
    pub fn with_schedule(mut self, schedule: RateUpSchedule) -> Self {
        self.schedule = schedule;
        self
    }

    /// Exclude the given accounts from the run
    ///
    /// Excluded accounts contribute nothing to any aggregate, including
    /// totals.
    pub fn with_excluded(mut self, excluded: HashSet<AccountId>) -> Self {
        self.excluded = excluded;
        self
    }

    /// Count the ledger and produce its report
    pub fn count(&self, ledger: &PullLedger, progress: &dyn ProgressSink) -> BannerReport {
        let kind = ledger.kind();
        debug!("Started counting pass for {kind} banner");

        let mut sorted: Vec<&PullRecord> = ledger
            .records()
            .filter(|record| !self.excluded.contains(&record.account_id))
            .collect();
        sorted.sort_unstable();

        let mut accounts = HashSet::new();
        let mut items = ItemMap::new();
        let mut since_four: HashMap<AccountId, u32> = HashMap::new();
        let mut since_five: HashMap<AccountId, u32> = HashMap::new();
        let mut last_four_promoted: HashMap<AccountId, bool> = HashMap::new();
        let mut last_five_promoted: HashMap<AccountId, bool> = HashMap::new();
        let mut pity_five = PityHistogram::new();
        let mut pity_four = PityHistogram::new();

        let total = sorted.len();
        for (index, record) in sorted.into_iter().enumerate() {
            if index % PROGRESS_STRIDE == 0 {
                progress.report(
                    &format!("[{kind}] counting {} of {total}", index + 1),
                    Progress::Fraction(index as f64 / total.max(1) as f64),
                );
            }

            let account = record.account_id;
            // every draw advances both pity clocks, regardless of rarity
            *since_four.entry(account).or_insert(0) += 1;
            *since_five.entry(account).or_insert(0) += 1;

            let is_promoted = self
                .schedule
                .is_promoted(&record.item_name, record.timestamp);
            let mut pity_count = 0;
            let mut won_promotion = false;

            match record.rarity {
                Rarity::Five => {
                    pity_count = since_five[&account];
                    // a fresh account has no earlier rare draw to lose against
                    won_promotion = last_five_promoted.get(&account).copied().unwrap_or(true);
                    since_four.insert(account, 0);
                    since_five.insert(account, 0);
                    last_four_promoted.insert(account, is_promoted);
                    last_five_promoted.insert(account, is_promoted);
                    pity_five.add(account, pity_count);
                }
                Rarity::Four => {
                    pity_count = since_four[&account];
                    won_promotion = last_four_promoted.get(&account).copied().unwrap_or(true);
                    since_four.insert(account, 0);
                    last_four_promoted.insert(account, is_promoted);
                    pity_four.add(account, pity_count);
                }
                Rarity::Three => {}
            }

            accounts.insert(account);
            items.add(ProcessedPull {
                record: record.clone(),
                pity_count,
                is_promoted,
                won_promotion,
            });
        }

        progress.report(&format!("[{kind}] done"), Progress::Fraction(1.0));
        debug!(
            "Completed counting pass for {kind} banner, {} records",
            items.len()
        );

        BannerReport {
            kind,
            accounts,
            draws_since_four: since_four,
            draws_since_five: since_five,
            last_four_promoted,
            last_five_promoted,
            total: items.len(),
            items,
            pity_five,
            pity_four,
        }
    }
}
