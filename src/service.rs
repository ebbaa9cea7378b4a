//! Orchestration of synchronization, counting and persistence
//!
//! [`HistoryService`] owns the in-memory gacha state behind a read/write
//! lock: report generation takes the read side, synchronization and
//! resets the write side. A single run gate rejects a second
//! synchronization or counting run while one is in flight; callers get
//! [`PitystatError::Busy`] rather than a queue. Each run gets a fresh
//! cancellation token, and [`HistoryService::cancel`] stops the active
//! run at its next fetch or backoff boundary.

use crate::counter::PityCounter;
use crate::error::{PitystatError, Result};
use crate::ledger::{GachaData, PullLedger};
use crate::progress::ProgressSink;
use crate::report::OverallReport;
use crate::storage::Storage;
use crate::sync::{HistorySynchronizer, PageFetcher, SyncConfig};
use crate::types::{AccountId, BannerKind, Game};
use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Outcome of a full synchronization run
#[derive(Debug, Default)]
pub struct SyncSummary {
    /// Records added per completed banner kind, in run order
    pub added: Vec<(BannerKind, usize)>,
    /// The banner kind and error that aborted the run, if any
    pub failure: Option<(BannerKind, PitystatError)>,
    /// Errors collected while persisting the merged ledgers
    pub persistence_errors: Vec<PitystatError>,
}

impl SyncSummary {
    /// Total records added across completed banner kinds
    pub fn total_added(&self) -> usize {
        self.added.iter().map(|(_, n)| n).sum()
    }

    /// Whether the run completed every banner kind without failure
    pub fn is_complete(&self) -> bool {
        self.failure.is_none()
    }
}

/// The engine facade the display layer talks to
pub struct HistoryService {
    storage: Storage,
    data: RwLock<GachaData>,
    excluded: RwLock<HashSet<AccountId>>,
    running: AtomicBool,
    cancel: Mutex<CancellationToken>,
    sync_config: SyncConfig,
}

impl HistoryService {
    /// Load the service state for one game from storage
    ///
    /// Load errors are collected and returned alongside the service; the
    /// state that did load stays authoritative.
    pub fn load(storage: Storage, game: Game) -> (Self, Vec<PitystatError>) {
        let mut data_report = storage.load_data(game);
        let mut exclusions_report = storage.load_exclusions(game);
        let mut errors = Vec::new();
        errors.append(&mut data_report.errors);
        errors.append(&mut exclusions_report.errors);

        let service = Self {
            storage,
            data: RwLock::new(data_report.data),
            excluded: RwLock::new(exclusions_report.data),
            running: AtomicBool::new(false),
            cancel: Mutex::new(CancellationToken::new()),
            sync_config: SyncConfig::default(),
        };
        (service, errors)
    }

    /// Create a service around already-loaded state
    pub fn with_data(storage: Storage, data: GachaData) -> Self {
        Self {
            storage,
            data: RwLock::new(data),
            excluded: RwLock::new(HashSet::new()),
            running: AtomicBool::new(false),
            cancel: Mutex::new(CancellationToken::new()),
            sync_config: SyncConfig::default(),
        }
    }

    /// Override the synchronizer tuning
    pub fn with_sync_config(mut self, config: SyncConfig) -> Self {
        self.sync_config = config;
        self
    }

    /// Request cancellation of the active run, if any
    ///
    /// Best effort: the run stops at its next fetch or backoff tick.
    pub fn cancel(&self) {
        self.cancel.lock().expect("cancel lock poisoned").cancel();
    }

    /// Replace the account exclusion set and persist it
    pub async fn set_exclusions(&self, excluded: HashSet<AccountId>) -> Vec<PitystatError> {
        let game = self.data.read().await.game;
        let mut guard = self.excluded.write().await;
        *guard = excluded;
        match self.storage.save_exclusions(game, &guard) {
            Ok(()) => Vec::new(),
            Err(err) => vec![err],
        }
    }

    /// The current account exclusion set
    pub async fn exclusions(&self) -> HashSet<AccountId> {
        self.excluded.read().await.clone()
    }

    /// Pull new records for every banner kind and persist the results
    ///
    /// Banner kinds are synchronized in order; the first failure aborts
    /// the run, keeping the merges and saves of the kinds that completed.
    pub async fn synchronize<F: PageFetcher>(
        &self,
        fetcher: &F,
        progress: &dyn ProgressSink,
    ) -> Result<SyncSummary> {
        let _gate = self.begin_run()?;
        let cancel = self.current_token();
        let synchronizer =
            HistorySynchronizer::new(fetcher).with_config(self.sync_config.clone());

        let mut summary = SyncSummary::default();
        let mut data = self.data.write().await;
        let game = data.game;

        for kind in BannerKind::ALL {
            match synchronizer
                .synchronize(data.ledger_mut(kind), &cancel, progress)
                .await
            {
                Ok(added) => {
                    summary.added.push((kind, added));
                    if let Err(err) = self.storage.save_ledger(game, data.ledger(kind)) {
                        warn!("Failed to persist {kind} ledger: {err}");
                        summary.persistence_errors.push(err);
                    }
                }
                Err(err) => {
                    // partial merges of this kind stay in memory; persist them too
                    if let Err(save_err) = self.storage.save_ledger(game, data.ledger(kind)) {
                        summary.persistence_errors.push(save_err);
                    }
                    summary.failure = Some((kind, err));
                    break;
                }
            }
        }

        info!(
            "Synchronization finished: {} new records, complete = {}",
            summary.total_added(),
            summary.is_complete()
        );
        Ok(summary)
    }

    /// Pull new records for a single banner kind and persist its ledger
    pub async fn synchronize_banner<F: PageFetcher>(
        &self,
        kind: BannerKind,
        fetcher: &F,
        progress: &dyn ProgressSink,
    ) -> Result<usize> {
        let _gate = self.begin_run()?;
        let cancel = self.current_token();
        let synchronizer =
            HistorySynchronizer::new(fetcher).with_config(self.sync_config.clone());

        let mut data = self.data.write().await;
        let game = data.game;
        let result = synchronizer
            .synchronize(data.ledger_mut(kind), &cancel, progress)
            .await;
        // partial merges are kept and persisted whatever the outcome
        if let Err(err) = self.storage.save_ledger(game, data.ledger(kind)) {
            warn!("Failed to persist {kind} ledger: {err}");
        }
        result
    }

    /// Count every banner and aggregate the three reports
    ///
    /// Counting itself is a single tight pass; cancellation is observed
    /// between banners only.
    pub async fn recount(&self, progress: &dyn ProgressSink) -> Result<OverallReport> {
        let _gate = self.begin_run()?;
        let cancel = self.current_token();
        let excluded = self.excluded.read().await.clone();
        let data = self.data.read().await;

        let count_banner = |kind: BannerKind| {
            if cancel.is_cancelled() {
                return Err(PitystatError::Cancelled);
            }
            let counter = PityCounter::new()
                .with_schedule(data.schedule(kind))
                .with_excluded(excluded.clone());
            Ok(counter.count(data.ledger(kind), progress))
        };

        let standard = count_banner(BannerKind::Standard)?;
        let character = count_banner(BannerKind::Character)?;
        let weapon = count_banner(BannerKind::Weapon)?;
        Ok(OverallReport::aggregate(standard, character, weapon))
    }

    /// Atomically replace one banner's ledger and persist it
    pub async fn reset_ledger(
        &self,
        kind: BannerKind,
        new_ledger: &PullLedger,
    ) -> Result<usize> {
        let mut data = self.data.write().await;
        let count = data.ledger_mut(kind).reset(new_ledger);
        let game = data.game;
        self.storage.save_ledger(game, data.ledger(kind))?;
        info!("Reset {kind} ledger to {count} records");
        Ok(count)
    }

    /// Persist all in-memory state, collecting per-file errors
    pub async fn save(&self) -> Vec<PitystatError> {
        let data = self.data.read().await;
        let mut errors = self.storage.save_data(&data);
        if let Err(err) = self.storage.save_exclusions(data.game, &*self.excluded.read().await) {
            errors.push(err);
        }
        errors
    }

    /// Read-only snapshot of per-banner record counts
    pub async fn record_counts(&self) -> Vec<(BannerKind, usize)> {
        let data = self.data.read().await;
        BannerKind::ALL
            .iter()
            .map(|&kind| (kind, data.ledger(kind).len()))
            .collect()
    }

    fn begin_run(&self) -> Result<RunGate<'_>> {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(PitystatError::Busy);
        }
        // fresh token per run so an old cancel request cannot leak in
        *self.cancel.lock().expect("cancel lock poisoned") = CancellationToken::new();
        Ok(RunGate { service: self })
    }

    fn current_token(&self) -> CancellationToken {
        self.cancel.lock().expect("cancel lock poisoned").clone()
    }
}

/// Releases the run gate when the run ends, however it ends
struct RunGate<'a> {
    service: &'a HistoryService,
}

impl Drop for RunGate<'_> {
    fn drop(&mut self) {
        self.service.running.store(false, Ordering::Release);
    }
}
