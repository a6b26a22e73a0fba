//! Sliding-window byte-rate estimator.
//!
//! Samples are kept in arrival order and expired from the front, the same
//! shape as the arrival-time windowing used for TWCC bookkeeping.

use std::collections::VecDeque;

pub const DEFAULT_WINDOW_MS: i64 = 1000;

/// A sliding window over `(timestamp_ms, bytes)` samples producing a
/// bits-per-second rate.
#[derive(Debug, Clone)]
pub struct RateCounter {
    window_size_ms: i64,
    samples: VecDeque<(i64, u64)>,
    first_sample_ms: Option<i64>,
}

impl RateCounter {
    pub fn new(window_size_ms: i64) -> Self {
        Self {
            window_size_ms,
            samples: VecDeque::new(),
            first_sample_ms: None,
        }
    }

    pub fn window_size_ms(&self) -> i64 {
        self.window_size_ms
    }

    /// Append a sample. `now_ms` must be non-decreasing across calls.
    pub fn add(&mut self, bytes: u64, now_ms: i64) {
        self.first_sample_ms.get_or_insert(now_ms);
        self.samples.push_back((now_ms, bytes));
    }

    /// Expire samples older than the window and return the current rate in
    /// bits/sec, or `None` if fewer than two samples remain or they span no
    /// time.
    ///
    /// Once this counter has been alive for a full window, the rate is
    /// normalized by `window_size_ms` so a quiet period lets it decay
    /// towards zero as it ages rather than holding the last burst's
    /// instantaneous rate until its samples expire outright. Before that,
    /// it is normalized by the time actually elapsed since the first
    /// sample, since there isn't a full window's worth of history yet.
    pub fn rate(&mut self, now_ms: i64) -> Option<u64> {
        while let Some(&(sample_ms, _)) = self.samples.front() {
            if now_ms - sample_ms >= self.window_size_ms {
                self.samples.pop_front();
            } else {
                break;
            }
        }

        if self.samples.len() < 2 {
            return None;
        }

        let first_ms = self.first_sample_ms?;
        let full_window = now_ms - first_ms >= self.window_size_ms;
        let span_ms = if full_window {
            self.window_size_ms
        } else {
            now_ms - self.samples.front().unwrap().0
        };
        if span_ms <= 0 {
            return None;
        }

        let sum_bytes: u64 = self.samples.iter().map(|(_, bytes)| *bytes).sum();
        Some(sum_bytes * 8 * 1000 / span_ms as u64)
    }
}

impl Default for RateCounter {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_MS)
    }
}
