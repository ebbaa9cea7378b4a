//! Pity-frequency histograms
//!
//! A [`FrequencyMap`] counts how often each pity value occurred; a
//! [`PityHistogram`] keeps one frequency map per account. Reports carry
//! one histogram per rarity tier, and the display layer condenses them
//! into buckets before charting.

use crate::types::AccountId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Frequency of each observed pity value
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FrequencyMap {
    counts: HashMap<u32, u32>,
}

impl FrequencyMap {
    /// Create an empty frequency map
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment the frequency of `value` by 1, returning the new frequency
    pub fn add(&mut self, value: u32) -> u32 {
        self.add_count(value, 1)
    }

    /// Increment the frequency of `value` by `count`, returning the new frequency
    pub fn add_count(&mut self, value: u32, count: u32) -> u32 {
        let freq = self.counts.entry(value).or_insert(0);
        *freq += count;
        *freq
    }

    /// The frequency of `value`, 0 if never observed
    pub fn get(&self, value: u32) -> u32 {
        self.counts.get(&value).copied().unwrap_or(0)
    }

    /// Sum of all stored frequencies
    pub fn total(&self) -> u64 {
        self.counts.values().map(|&c| c as u64).sum()
    }

    /// The largest single frequency, 0 when empty
    pub fn largest(&self) -> u32 {
        self.counts.values().copied().max().unwrap_or(0)
    }

    /// Number of distinct values observed
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    /// Whether no values were observed
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Iterate over `(value, frequency)` pairs in no particular order
    pub fn iter(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.counts.iter().map(|(&v, &c)| (v, c))
    }

    /// A new map holding the sums of both operands, leaving both unchanged
    pub fn merge(&self, other: &FrequencyMap) -> FrequencyMap {
        let mut result = self.clone();
        for (value, count) in other.iter() {
            result.add_count(value, count);
        }
        result
    }
}

/// Per-account pity-frequency histograms
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PityHistogram {
    accounts: HashMap<AccountId, FrequencyMap>,
}

impl PityHistogram {
    /// Create an empty histogram
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment the frequency of `pity` for `account` by 1
    pub fn add(&mut self, account: AccountId, pity: u32) -> u32 {
        self.add_count(account, pity, 1)
    }

    /// Increment the frequency of `pity` for `account` by `count`
    pub fn add_count(&mut self, account: AccountId, pity: u32, count: u32) -> u32 {
        self.accounts
            .entry(account)
            .or_default()
            .add_count(pity, count)
    }

    /// The frequency map of one account, if it ever recorded a value
    pub fn account(&self, account: AccountId) -> Option<&FrequencyMap> {
        self.accounts.get(&account)
    }

    /// Iterate over `(account, frequency map)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (AccountId, &FrequencyMap)> {
        self.accounts.iter().map(|(&acc, map)| (acc, map))
    }

    /// Number of accounts with at least one recorded value
    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    /// Whether no account recorded a value
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    /// Sum of all frequencies across all accounts
    pub fn total(&self) -> u64 {
        self.accounts.values().map(FrequencyMap::total).sum()
    }

    /// A new histogram holding the sums of both operands, leaving both unchanged
    pub fn merge(&self, other: &PityHistogram) -> PityHistogram {
        let mut result = self.clone();
        for (account, map) in other.iter() {
            for (value, count) in map.iter() {
                result.add_count(account, value, count);
            }
        }
        result
    }

    /// Round every pity value up to the next multiple of `bucket`
    ///
    /// Values below one bucket round up to one bucket, so the zero value
    /// lands in the first bucket rather than its own. Per-account totals
    /// are preserved. `bucket` must be at least 1; 0 is treated as 1.
    pub fn condense(&self, bucket: u32) -> PityHistogram {
        let bucket = bucket.max(1);
        let mut result = PityHistogram::new();
        for (account, map) in self.iter() {
            for (value, count) in map.iter() {
                let slot = (value.div_ceil(bucket)).max(1) * bucket;
                result.add_count(account, slot, count);
            }
        }
        result
    }

    /// Collapse all accounts into a single frequency map
    pub fn combine_all(&self) -> FrequencyMap {
        self.accounts
            .values()
            .fold(FrequencyMap::new(), |sum, next| sum.merge(next))
    }
}
