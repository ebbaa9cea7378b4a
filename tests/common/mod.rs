//! Shared test fixtures and builders

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use pitystat::error::Result;
use pitystat::ledger::PullLedger;
use pitystat::sync::PageFetcher;
use pitystat::types::{AccountId, BannerKind, DrawId, ItemCategory, PullRecord, Rarity};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Default test account
pub const UID: u64 = 700_123_456;

/// A timestamp on the fixed test day, offset by `seconds`
pub fn ts(seconds: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 6, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
        + chrono::Duration::seconds(seconds as i64)
}

/// Builder for pull records with sensible defaults
pub struct RecordBuilder {
    record: PullRecord,
}

impl RecordBuilder {
    pub fn new(draw_id: u64) -> Self {
        Self {
            record: PullRecord {
                account_id: AccountId::new(UID),
                draw_id: DrawId::new(draw_id),
                banner: BannerKind::Character,
                item_id: 1000 + draw_id as u32,
                item_name: format!("Item {draw_id}"),
                category: ItemCategory::Character,
                rarity: Rarity::Three,
                timestamp: ts(draw_id as u32),
                source_gacha_id: 2003,
            },
        }
    }

    pub fn account(mut self, uid: u64) -> Self {
        self.record.account_id = AccountId::new(uid);
        self
    }

    pub fn banner(mut self, kind: BannerKind) -> Self {
        self.record.banner = kind;
        self
    }

    pub fn name(mut self, name: &str) -> Self {
        self.record.item_name = name.to_string();
        self
    }

    pub fn rarity(mut self, rarity: Rarity) -> Self {
        self.record.rarity = rarity;
        self
    }

    pub fn at(mut self, time: NaiveDateTime) -> Self {
        self.record.timestamp = time;
        self
    }

    pub fn build(self) -> PullRecord {
        self.record
    }
}

/// A plain filler record
pub fn filler(draw_id: u64) -> PullRecord {
    RecordBuilder::new(draw_id).build()
}

/// A ledger holding the given records
pub fn ledger_of(kind: BannerKind, records: impl IntoIterator<Item = PullRecord>) -> PullLedger {
    PullLedger::from_records(kind, records)
}

/// Page fetcher that serves a fixed script of pages and counts fetches
pub struct ScriptedPages {
    pages: Mutex<Vec<Vec<PullRecord>>>,
    fetches: AtomicUsize,
}

impl ScriptedPages {
    pub fn new(pages: Vec<Vec<PullRecord>>) -> Self {
        Self {
            pages: Mutex::new(pages),
            fetches: AtomicUsize::new(0),
        }
    }

    /// Pages of descending draw ids: `full` pages of `page_size` records,
    /// then one page of `tail` records
    pub fn descending(page_size: usize, full: usize, tail: usize) -> Self {
        let total = full * page_size + tail;
        let mut ids: Vec<u64> = (1..=total as u64).rev().collect();
        let mut pages = Vec::new();
        while !ids.is_empty() {
            let take = ids.len().min(page_size);
            pages.push(ids.drain(..take).map(filler).collect());
        }
        Self::new(pages)
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageFetcher for ScriptedPages {
    async fn fetch_page(
        &self,
        _kind: BannerKind,
        _end_id: DrawId,
        _page: u32,
    ) -> Result<Vec<PullRecord>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let mut pages = self.pages.lock().unwrap();
        if pages.is_empty() {
            Ok(Vec::new())
        } else {
            Ok(pages.remove(0))
        }
    }
}
