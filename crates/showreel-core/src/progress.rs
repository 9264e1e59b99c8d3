//! Monotonic page-load progress.
//!
//! Several asynchronous milestones race to advance one shared fraction. The
//! value is max-clamped so their arrival order never moves the bar backwards,
//! and `finish` runs its side effects exactly once.

use std::cell::Cell;

use crate::config::ProgressConfig;
use crate::time::Delay;

/// Rendering target for the progress value.
pub trait ProgressSink {
    /// Publish the current fraction, e.g. as a CSS custom property.
    fn render(&self, value: f64);

    /// Mark the indicator visually complete and remove it after `removal_delay`.
    fn complete(&self, removal_delay: Delay);
}

/// Shared progress state.
///
/// Uses `Cell` so an `Rc<ProgressTracker<_>>` can be advanced from any
/// callback on the single browser thread without borrow bookkeeping.
pub struct ProgressTracker<S> {
    sink: Option<S>,
    value: Cell<f64>,
    done: Cell<bool>,
    config: ProgressConfig,
}

impl<S: ProgressSink> ProgressTracker<S> {
    /// Create a tracker. With no sink every operation is a no-op.
    pub fn new(sink: Option<S>, config: ProgressConfig) -> Self {
        Self {
            sink,
            value: Cell::new(0.0),
            done: Cell::new(false),
            config,
        }
    }

    pub fn value(&self) -> f64 {
        self.value.get()
    }

    pub fn is_done(&self) -> bool {
        self.done.get()
    }

    /// `value = max(value, min(p, 1))`, then render.
    pub fn set(&self, p: f64) {
        let Some(sink) = &self.sink else {
            return;
        };
        if p.is_nan() {
            return;
        }
        let next = self.value.get().max(p.min(1.0));
        self.value.set(next);
        sink.render(next);
    }

    /// Document parsed.
    pub fn parsed(&self) {
        self.set(self.config.parsed);
    }

    /// First hero (or first available) frame decoded.
    pub fn first_frame(&self) {
        self.set(self.config.first_frame);
    }

    /// One above-the-fold tile settled: step up from at least the first-frame
    /// level, never past the tile cap.
    pub fn tile_ready(&self) {
        let base = self.value.get().max(self.config.first_frame);
        self.set((base + self.config.tile_step).min(self.config.tile_cap));
    }

    /// Lift the bar to the tile cap if it is still below it.
    pub fn settle_floor(&self) {
        if self.value.get() < self.config.tile_cap {
            self.set(self.config.tile_cap);
        }
    }

    /// Force the value to 1 and hand the indicator to its sink for removal.
    /// Later calls have no visible effect.
    pub fn finish(&self) {
        if self.sink.is_none() || self.done.get() {
            return;
        }
        self.set(1.0);
        self.done.set(true);
        if let Some(sink) = &self.sink {
            sink.complete(self.config.removal_delay);
        }
        tracing::debug!("progress finished");
    }

    pub fn config(&self) -> &ProgressConfig {
        &self.config
    }
}
