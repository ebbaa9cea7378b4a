//! Progress reporting for long-running tasks
//!
//! The synchronizer and counting engine report `(message, progress)`
//! pairs through a [`ProgressSink`] so callers can surface them however
//! they like. The CLI wires up an indicatif bar; library consumers and
//! tests use [`NullProgress`].

use indicatif::{ProgressBar, ProgressStyle};

/// How far along a task is
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Progress {
    /// The task cannot estimate its remaining work
    Indeterminate,
    /// Fraction of the task completed, in `[0, 1]`
    Fraction(f64),
}

/// Observer for task progress updates
pub trait ProgressSink: Send + Sync {
    /// Report the current status message and progress
    fn report(&self, message: &str, progress: Progress);
}

/// Sink that discards every update
#[derive(Debug, Default, Clone, Copy)]
pub struct NullProgress;

impl ProgressSink for NullProgress {
    fn report(&self, _message: &str, _progress: Progress) {}
}

/// Terminal progress bar backed by indicatif
pub struct BarProgress {
    bar: ProgressBar,
}

/// Resolution of the underlying bar; fractions are scaled onto it
const BAR_SCALE: u64 = 1000;

impl BarProgress {
    /// Create a new terminal progress bar
    pub fn new() -> Self {
        let bar = ProgressBar::new(BAR_SCALE);
        bar.set_style(
            ProgressStyle::with_template("{spinner:.green} [{bar:30.cyan/blue}] {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        Self { bar }
    }

    /// Clear the bar from the terminal
    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl Default for BarProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressSink for BarProgress {
    fn report(&self, message: &str, progress: Progress) {
        self.bar.set_message(message.to_string());
        match progress {
            Progress::Indeterminate => self.bar.tick(),
            Progress::Fraction(fraction) => {
                let clamped = fraction.clamp(0.0, 1.0);
                self.bar.set_position((clamped * BAR_SCALE as f64) as u64);
            }
        }
    }
}
