//! Incremental history synchronization
//!
//! Pages backward through the remote draw log, newest first, merging
//! records into the ledger until a page yields fewer new records than its
//! size. A page scan stops at the first already-known identity, so one
//! termination test covers both "no more remote data" and "caught up to
//! local history". Known limitation, kept for compatibility with the log
//! API's behavior: a genuinely short remote page with older un-synced
//! history behind it is also treated as complete.
//!
//! Between pages the synchronizer sleeps a randomized backoff to stay
//! under the remote rate limit. The sleep is consumed in small ticks with
//! a cancellation check between ticks, and cancellation is also checked
//! before every fetch; merged records are never rolled back.

use crate::error::{PitystatError, Result};
use crate::ledger::PullLedger;
use crate::progress::{Progress, ProgressSink};
use crate::types::{BannerKind, DrawId, PullRecord};
use async_trait::async_trait;
use rand::Rng;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Records requested per page; the remote caps larger requests
pub const DEFAULT_PAGE_SIZE: usize = 5;

/// Source of one page of draw log records
///
/// Pages are ordered newest to oldest. `end_id` is the draw id cursor: 0
/// for the first page, then the id of the oldest record of the previous
/// page. `page` is the 1-based page index.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch one page of records for the given banner kind
    async fn fetch_page(
        &self,
        kind: BannerKind,
        end_id: DrawId,
        page: u32,
    ) -> Result<Vec<PullRecord>>;
}

#[async_trait]
impl<T: PageFetcher + ?Sized> PageFetcher for &T {
    async fn fetch_page(
        &self,
        kind: BannerKind,
        end_id: DrawId,
        page: u32,
    ) -> Result<Vec<PullRecord>> {
        (**self).fetch_page(kind, end_id, page).await
    }
}

#[async_trait]
impl<T: PageFetcher + ?Sized> PageFetcher for std::sync::Arc<T> {
    async fn fetch_page(
        &self,
        kind: BannerKind,
        end_id: DrawId,
        page: u32,
    ) -> Result<Vec<PullRecord>> {
        (**self).fetch_page(kind, end_id, page).await
    }
}

/// Tuning knobs for a synchronization run
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Records requested per page
    pub page_size: usize,
    /// Fixed part of the inter-page backoff
    pub backoff_base: Duration,
    /// Upper bound of the random part of the backoff
    pub backoff_spread: Duration,
    /// Granularity of the backoff sleep; cancellation is observed between
    /// ticks
    pub tick: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            backoff_base: Duration::from_millis(1000),
            backoff_spread: Duration::from_millis(2500),
            tick: Duration::from_millis(100),
        }
    }
}

/// Merges remote draw history into a ledger, page by page
pub struct HistorySynchronizer<F> {
    fetcher: F,
    config: SyncConfig,
}

impl<F: PageFetcher> HistorySynchronizer<F> {
    /// Create a synchronizer with default tuning
    pub fn new(fetcher: F) -> Self {
        Self {
            fetcher,
            config: SyncConfig::default(),
        }
    }

    /// Override the tuning knobs
    pub fn with_config(mut self, config: SyncConfig) -> Self {
        self.config = config;
        self
    }

    /// Pull new records for the ledger's banner kind until caught up
    ///
    /// Returns the number of records added. On cancellation or a remote
    /// failure the records merged so far stay in the ledger.
    pub async fn synchronize(
        &self,
        ledger: &mut PullLedger,
        cancel: &CancellationToken,
        progress: &dyn ProgressSink,
    ) -> Result<usize> {
        let kind = ledger.kind();
        debug!("Started history synchronization for {kind} banner");

        let mut page = 1u32;
        let mut end_id = DrawId::new(0);
        let mut total_added = 0usize;

        loop {
            if cancel.is_cancelled() {
                return Err(PitystatError::Cancelled);
            }

            let records = self.fetcher.fetch_page(kind, end_id, page).await?;
            let added = merge_page(ledger, &records);
            total_added += added;
            debug!(
                "Added {added} of {} retrieved records to {kind} banner (total {total_added})",
                records.len()
            );
            progress.report(
                &format!("[{kind}] added {total_added} pulls"),
                Progress::Indeterminate,
            );

            if added < self.config.page_size {
                break;
            }

            // the page was full and all of it was new: older history remains
            end_id = records
                .last()
                .map(|record| record.draw_id)
                .unwrap_or(end_id);
            page += 1;

            let backoff = self.next_backoff();
            debug!("Sleeping {}ms before next {kind} page", backoff.as_millis());
            self.sleep_cancellable(backoff, kind, total_added, cancel, progress)
                .await?;
        }

        info!("Completed {kind} banner synchronization, {total_added} new records");
        progress.report(
            &format!("[{kind}] added {total_added} pulls (done)"),
            Progress::Fraction(1.0),
        );
        Ok(total_added)
    }

    /// Randomized inter-page delay to avoid the remote "visit too
    /// frequently" rejection
    fn next_backoff(&self) -> Duration {
        let spread = self.config.backoff_spread.as_millis() as u64;
        let jitter = if spread == 0 {
            0
        } else {
            rand::rng().random_range(0..spread)
        };
        self.config.backoff_base + Duration::from_millis(jitter)
    }

    async fn sleep_cancellable(
        &self,
        total: Duration,
        kind: BannerKind,
        total_added: usize,
        cancel: &CancellationToken,
        progress: &dyn ProgressSink,
    ) -> Result<()> {
        let mut remaining = total;
        while !remaining.is_zero() {
            if cancel.is_cancelled() {
                return Err(PitystatError::Cancelled);
            }
            let step = remaining.min(self.config.tick);
            tokio::time::sleep(step).await;
            remaining -= step;
            let fraction = 1.0 - remaining.as_secs_f64() / total.as_secs_f64();
            progress.report(
                &format!(
                    "[{kind}] added {total_added} pulls (waiting {}ms)",
                    remaining.as_millis()
                ),
                Progress::Fraction(fraction),
            );
        }
        if cancel.is_cancelled() {
            return Err(PitystatError::Cancelled);
        }
        Ok(())
    }
}

/// Merge one page into the ledger, stopping at the first known record
///
/// Everything behind a known identity is assumed already stored.
fn merge_page(ledger: &mut PullLedger, records: &[PullRecord]) -> usize {
    let mut added = 0;
    for record in records {
        if ledger.contains(record) {
            break;
        }
        ledger.add(record.clone());
        added += 1;
    }
    added
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::NullProgress;
    use crate::types::{AccountId, ItemCategory, Rarity};
    use chrono::NaiveDate;
    use std::sync::Mutex;

    fn record(draw_id: u64) -> PullRecord {
        PullRecord {
            account_id: AccountId::new(700_001),
            draw_id: DrawId::new(draw_id),
            banner: BannerKind::Standard,
            item_id: 21_000,
            item_name: format!("Item {draw_id}"),
            category: ItemCategory::Weapon,
            rarity: Rarity::Three,
            timestamp: NaiveDate::from_ymd_opt(2024, 1, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap()
                + chrono::Duration::seconds(draw_id as i64),
            source_gacha_id: 1001,
        }
    }

    /// Serves pre-scripted pages and records every fetch
    struct ScriptedFetcher {
        pages: Mutex<Vec<Vec<PullRecord>>>,
        fetches: Mutex<Vec<(DrawId, u32)>>,
    }

    impl ScriptedFetcher {
        fn new(pages: Vec<Vec<PullRecord>>) -> Self {
            Self {
                pages: Mutex::new(pages),
                fetches: Mutex::new(Vec::new()),
            }
        }

        fn fetch_count(&self) -> usize {
            self.fetches.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl PageFetcher for ScriptedFetcher {
        async fn fetch_page(
            &self,
            _kind: BannerKind,
            end_id: DrawId,
            page: u32,
        ) -> Result<Vec<PullRecord>> {
            self.fetches.lock().unwrap().push((end_id, page));
            let mut pages = self.pages.lock().unwrap();
            if pages.is_empty() {
                Ok(Vec::new())
            } else {
                Ok(pages.remove(0))
            }
        }
    }

    fn fast_config() -> SyncConfig {
        SyncConfig {
            backoff_base: Duration::from_millis(1),
            backoff_spread: Duration::ZERO,
            tick: Duration::from_millis(1),
            ..SyncConfig::default()
        }
    }

    #[tokio::test]
    async fn test_short_final_page_terminates() {
        // three full pages of 5, then a final page of 2: 17 records, 4 fetches
        let pages = vec![
            (13..=17).rev().map(record).collect(),
            (8..=12).rev().map(record).collect(),
            (3..=7).rev().map(record).collect(),
            (1..=2).rev().map(record).collect(),
        ];
        let fetcher = ScriptedFetcher::new(pages);
        let sync = HistorySynchronizer::new(&fetcher).with_config(fast_config());
        let mut ledger = PullLedger::new(BannerKind::Standard);

        let added = sync
            .synchronize(&mut ledger, &CancellationToken::new(), &NullProgress)
            .await
            .unwrap();

        assert_eq!(added, 17);
        assert_eq!(ledger.len(), 17);
        assert_eq!(fetcher.fetch_count(), 4);
    }

    #[tokio::test]
    async fn test_cursor_follows_oldest_record() {
        let pages = vec![
            vec![record(10), record(9), record(8), record(7), record(6)],
            vec![record(5), record(4)],
        ];
        let fetcher = ScriptedFetcher::new(pages);
        let sync = HistorySynchronizer::new(&fetcher).with_config(fast_config());
        let mut ledger = PullLedger::new(BannerKind::Standard);

        sync.synchronize(&mut ledger, &CancellationToken::new(), &NullProgress)
            .await
            .unwrap();

        let fetches = fetcher.fetches.lock().unwrap().clone();
        assert_eq!(fetches, vec![(DrawId::new(0), 1), (DrawId::new(6), 2)]);
    }

    #[tokio::test]
    async fn test_known_record_stops_page_scan() {
        let mut ledger = PullLedger::new(BannerKind::Standard);
        ledger.add(record(3));
        // newest first: 5 and 4 are new, 3 is known, 2 and 1 never examined
        let pages = vec![vec![record(5), record(4), record(3), record(2), record(1)]];
        let fetcher = ScriptedFetcher::new(pages);
        let sync = HistorySynchronizer::new(&fetcher).with_config(fast_config());

        let added = sync
            .synchronize(&mut ledger, &CancellationToken::new(), &NullProgress)
            .await
            .unwrap();

        assert_eq!(added, 2);
        assert_eq!(ledger.len(), 3);
        assert!(!ledger.contains(&record(2)));
        assert_eq!(fetcher.fetch_count(), 1);
    }

    #[tokio::test]
    async fn test_remote_error_keeps_partial_merge() {
        struct FailingSecondPage {
            first: Mutex<Option<Vec<PullRecord>>>,
        }

        #[async_trait]
        impl PageFetcher for FailingSecondPage {
            async fn fetch_page(
                &self,
                _kind: BannerKind,
                _end_id: DrawId,
                _page: u32,
            ) -> Result<Vec<PullRecord>> {
                match self.first.lock().unwrap().take() {
                    Some(page) => Ok(page),
                    None => Err(PitystatError::Remote("visit too frequently".into())),
                }
            }
        }

        let fetcher = FailingSecondPage {
            first: Mutex::new(Some((1..=5).rev().map(record).collect())),
        };
        let sync = HistorySynchronizer::new(&fetcher).with_config(fast_config());
        let mut ledger = PullLedger::new(BannerKind::Standard);

        let err = sync
            .synchronize(&mut ledger, &CancellationToken::new(), &NullProgress)
            .await
            .unwrap_err();

        assert!(matches!(err, PitystatError::Remote(_)));
        assert_eq!(ledger.len(), 5);
    }

    #[tokio::test]
    async fn test_pre_cancelled_token_fetches_nothing() {
        let fetcher = ScriptedFetcher::new(vec![(1..=5).rev().map(record).collect()]);
        let sync = HistorySynchronizer::new(&fetcher).with_config(fast_config());
        let mut ledger = PullLedger::new(BannerKind::Standard);

        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = sync
            .synchronize(&mut ledger, &cancel, &NullProgress)
            .await
            .unwrap_err();

        assert!(matches!(err, PitystatError::Cancelled));
        assert_eq!(fetcher.fetch_count(), 0);
        assert!(ledger.is_empty());
    }
}
