//! Rate-up windows and promotion classification
//!
//! Limited banners promote a rotating set of items during timed windows.
//! A [`RateUpSchedule`] holds the windows configured for one banner kind
//! and answers whether a given item was promoted at a given time.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// One promotion window on a limited banner
///
/// Unset bounds span to the beginning or end of time, so a window with
/// neither bound covers every draw.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateUpWindow {
    /// Start of the window, inclusive
    #[serde(default)]
    pub start: Option<NaiveDateTime>,
    /// End of the window, inclusive
    #[serde(default)]
    pub end: Option<NaiveDateTime>,
    /// Names of the items promoted during the window
    #[serde(default)]
    pub promoted: HashSet<String>,
}

impl RateUpWindow {
    /// Create a window over the given bounds
    pub fn new(
        start: Option<NaiveDateTime>,
        end: Option<NaiveDateTime>,
        promoted: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            start,
            end,
            promoted: promoted.into_iter().collect(),
        }
    }

    /// Whether `time` falls within the window, both bounds inclusive
    pub fn covers(&self, time: NaiveDateTime) -> bool {
        self.start.is_none_or(|start| start <= time) && self.end.is_none_or(|end| time <= end)
    }

    /// Whether the named item is promoted by this window
    pub fn promotes(&self, item_name: &str) -> bool {
        self.promoted.contains(item_name)
    }

    fn sort_key(&self) -> (NaiveDateTime, NaiveDateTime) {
        (
            self.start.unwrap_or(NaiveDateTime::MIN),
            self.end.unwrap_or(NaiveDateTime::MAX),
        )
    }
}

/// The ordered set of promotion windows for one banner kind
///
/// An empty schedule classifies every pull as promoted: pools without a
/// promotion concept (the standard banner) would otherwise record every
/// rare draw as a lost rate-up.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "Vec<RateUpWindow>", into = "Vec<RateUpWindow>")]
pub struct RateUpSchedule {
    windows: Vec<RateUpWindow>,
}

impl RateUpSchedule {
    /// Build a schedule, ordering windows by `(start, end)`
    pub fn new(windows: impl IntoIterator<Item = RateUpWindow>) -> Self {
        let mut windows: Vec<RateUpWindow> = windows.into_iter().collect();
        windows.sort_by_key(RateUpWindow::sort_key);
        Self { windows }
    }

    /// Whether the named item was promoted at `time`
    ///
    /// True unconditionally when no windows are configured; otherwise true
    /// iff at least one window covers `time` and promotes the item.
    /// Overlapping windows are fine, any match suffices.
    pub fn is_promoted(&self, item_name: &str, time: NaiveDateTime) -> bool {
        if self.windows.is_empty() {
            return true;
        }
        self.windows
            .iter()
            .any(|window| window.covers(time) && window.promotes(item_name))
    }

    /// Number of configured windows
    pub fn len(&self) -> usize {
        self.windows.len()
    }

    /// Whether no windows are configured
    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    /// The windows in `(start, end)` order
    pub fn windows(&self) -> &[RateUpWindow] {
        &self.windows
    }
}

impl From<Vec<RateUpWindow>> for RateUpSchedule {
    fn from(windows: Vec<RateUpWindow>) -> Self {
        Self::new(windows)
    }
}

impl From<RateUpSchedule> for Vec<RateUpWindow> {
    fn from(schedule: RateUpSchedule) -> Self {
        schedule.windows
    }
}
